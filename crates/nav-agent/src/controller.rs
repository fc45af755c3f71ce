//! The per-step movement controller.
//!
//! # Stages
//!
//! ```text
//! ControlInput ──steer──▶ Steering ──avoidance──▶ resolved velocity ──finalize──▶ ResolvedMovement
//!      ▲ before_control       ▲ after_control                                        ▲ before_movement
//! ```
//!
//! `steer` turns the next corners into a desired velocity and a target
//! rotation.  `finalize` applies the acceleration and turn-rate limits to
//! whatever velocity avoidance settled on.  Everything is computed in the
//! agent's movement plane; the elevation of a velocity is dropped.

use glam::{Quat, Vec3};

use nav_core::plane::{move_towards_angle, wrap_angle};
use nav_core::MovementPlane;
use nav_path::CornerBoundary;

use crate::{Destination, MovementSettings};

/// Corners closer than this to the agent are treated as already reached.
const CORNER_EPSILON: f32 = 1e-3;

/// Below this speed the direction of travel does not steer the rotation.
const TURN_MIN_SPEED: f32 = 1e-3;

/// What the controller steers from.  `before_control` may edit it.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlInput {
    pub position:    Vec3,
    pub rotation:    Quat,
    pub velocity:    Vec3,
    /// Next corners of the path, nearest first.
    pub corners:     Vec<Vec3>,
    /// Why the corner list ends where it does.
    pub boundary:    CornerBoundary,
    pub destination: Option<Destination>,
    /// Brake to a stop in place.
    pub stopped:     bool,
}

impl Default for ControlInput {
    fn default() -> Self {
        Self {
            position:    Vec3::ZERO,
            rotation:    Quat::IDENTITY,
            velocity:    Vec3::ZERO,
            corners:     Vec::new(),
            boundary:    CornerBoundary::NoPath,
            destination: None,
            stopped:     false,
        }
    }
}

/// Desired motion before avoidance.  `after_control` may edit it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Steering {
    /// Corner the agent is heading for.
    pub target_point:     Vec3,
    /// Target speed after braking.
    pub speed:            f32,
    pub desired_velocity: Vec3,
    pub target_rotation:  Quat,
    /// Walking distance along the corners to where they end.  Infinite when
    /// the corner list was cut short, or there are no corners at all.
    pub distance_to_end:  f32,
}

impl Steering {
    /// Stand still, keep facing the same way.
    pub fn idle(position: Vec3, rotation: Quat) -> Self {
        Self {
            target_point:     position,
            speed:            0.0,
            desired_velocity: Vec3::ZERO,
            target_rotation:  rotation,
            distance_to_end:  0.0,
        }
    }
}

/// The controller's output for one step, applied by the integrator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResolvedMovement {
    pub target_point:    Vec3,
    pub speed:           f32,
    pub velocity:        Vec3,
    pub target_rotation: Quat,
}

/// Turn corners into a desired velocity and rotation for a step of `dt`.
pub fn steer(input: &ControlInput, settings: &MovementSettings, plane: &MovementPlane, dt: f32) -> Steering {
    let position = input.position;
    let Some(first) = input
        .corners
        .iter()
        .position(|c| plane.ground_distance(*c, position) > CORNER_EPSILON)
    else {
        // Standing on the last corner: only the facing may still change.
        // Without any corners there is no end to stop at; the agent coasts
        // to a halt under the acceleration limit.
        let mut idle = Steering::idle(position, input.rotation);
        if input.corners.is_empty() {
            idle.distance_to_end = f32::INFINITY;
        }
        if let Some(yaw) = arrival_facing(input, settings, plane, 0.0) {
            idle.target_rotation = plane.rotation_from_yaw(yaw);
        }
        return idle;
    };
    let corners = &input.corners[first..];
    let target  = corners[0];

    let mut distance_to_end = plane.ground_distance(position, target);
    for pair in corners.windows(2) {
        distance_to_end += plane.ground_distance(pair[0], pair[1]);
    }
    let truncated = input.boundary == CornerBoundary::Truncated;

    let at_end = input.boundary == CornerBoundary::EndOfPath;
    let mut speed = settings.speed;
    if input.stopped {
        speed = 0.0;
    } else if at_end {
        speed = if distance_to_end <= settings.stop_distance {
            0.0
        } else {
            speed * (distance_to_end / settings.slowdown_distance().max(1e-6)).min(1.0)
        };
    }
    if !truncated && dt > 0.0 {
        // Don't aim past the last corner within one step.
        speed = speed.min(distance_to_end / dt);
    }

    let direction = plane.flatten(target - position).normalize_or_zero();
    let desired   = direction * speed;

    let travel_yaw = (speed > TURN_MIN_SPEED)
        .then(|| plane.yaw_of_direction(direction))
        .flatten();
    let target_rotation = arrival_facing(input, settings, plane, distance_to_end)
        .or(travel_yaw)
        .map_or(input.rotation, |yaw| plane.rotation_from_yaw(yaw));

    Steering {
        target_point: target,
        speed,
        desired_velocity: desired,
        target_rotation,
        distance_to_end: if truncated { f32::INFINITY } else { distance_to_end },
    }
}

/// Requested facing, if it applies at this distance from the end.
fn arrival_facing(
    input:           &ControlInput,
    settings:        &MovementSettings,
    plane:           &MovementPlane,
    distance_to_end: f32,
) -> Option<f32> {
    let destination = input.destination.as_ref()?;
    let facing = destination.facing?;
    let near = (input.boundary == CornerBoundary::EndOfPath && distance_to_end <= settings.facing_lead_in)
        || plane.ground_distance(input.position, destination.point) <= settings.facing_lead_in;
    if near { plane.yaw_of_direction(facing) } else { None }
}

/// Smoothing and limit state carried between steps.
#[derive(Clone, Debug, Default)]
pub struct MovementController {
    pub(crate) input:    ControlInput,
    pub(crate) steering: Option<Steering>,
    visual_position:     Option<Vec3>,
}

impl MovementController {
    /// Last computed steering, if the agent steered this step.
    pub fn steering(&self) -> Option<&Steering> {
        self.steering.as_ref()
    }

    /// Smoothed position for presentation.
    pub fn visual_position(&self) -> Option<Vec3> {
        self.visual_position
    }

    /// Apply the acceleration and turn-rate limits to the velocity avoidance
    /// settled on.
    pub fn finalize(
        steering: &Steering,
        resolved: Vec3,
        velocity: Vec3,
        rotation: Quat,
        settings: &MovementSettings,
        plane:    &MovementPlane,
        dt:       f32,
    ) -> ResolvedMovement {
        let velocity = plane.flatten(velocity);
        let change   = (plane.flatten(resolved) - velocity).clamp_length_max(settings.acceleration * dt);
        let v        = velocity + change;

        let current = plane.yaw_of(rotation);
        let mut target = plane.yaw_of(steering.target_rotation);
        if settings.rotation_smoothing > 0.0 && dt > 0.0 {
            let blend = 1.0 - (-dt / settings.rotation_smoothing).exp();
            target = wrap_angle(current + wrap_angle(target - current) * blend);
        }
        let yaw = move_towards_angle(current, target, settings.max_rotation_speed * dt);

        ResolvedMovement {
            target_point:    steering.target_point,
            speed:           v.length(),
            velocity:        v,
            target_rotation: plane.rotation_from_yaw(yaw),
        }
    }

    /// Advance the visual position towards `position`.
    pub fn smooth_visual(&mut self, position: Vec3, settings: &MovementSettings, dt: f32) -> Vec3 {
        let smoothed = match self.visual_position {
            Some(prev) if settings.position_smoothing > 0.0 && dt > 0.0 => {
                prev.lerp(position, 1.0 - (-dt / settings.position_smoothing).exp())
            }
            _ => position,
        };
        self.visual_position = Some(smoothed);
        smoothed
    }

    /// Forget the visual position, e.g. after a teleport.
    pub fn snap_visual(&mut self, position: Vec3) {
        self.visual_position = Some(position);
    }
}
