//! Movement override hooks.

use nav_core::AgentHandle;

use crate::{ControlInput, ResolvedMovement, Steering};

/// Custom steering extensions.
///
/// Each hook is called once per agent per sub-step with mutable access to
/// the value being computed.  All methods default to doing nothing, so an
/// implementation only overrides the stage it cares about.
///
/// Hooks may run on several threads at once with the `parallel` feature,
/// hence `Send + Sync`.  Keep per-agent state out of the hook object.
///
/// # Example: cap speed inside a zone
///
/// ```rust,ignore
/// struct SlowZone { centre: Vec3, radius: f32, speed: f32 }
///
/// impl MovementHooks for SlowZone {
///     fn after_control(&self, _agent: AgentHandle, steering: &mut Steering) {
///         if steering.target_point.distance(self.centre) < self.radius {
///             steering.speed = steering.speed.min(self.speed);
///             steering.desired_velocity = steering.desired_velocity.clamp_length_max(self.speed);
///         }
///     }
/// }
/// ```
pub trait MovementHooks: Send + Sync + 'static {
    /// Before the controller reads its inputs.  Editing `corners` changes
    /// what the agent steers towards this step.
    fn before_control(&self, _agent: AgentHandle, _input: &mut ControlInput) {}

    /// After the desired motion is computed, before it is handed to
    /// avoidance.
    fn after_control(&self, _agent: AgentHandle, _steering: &mut Steering) {}

    /// After avoidance and limits, right before the integrator applies the
    /// movement.
    fn before_movement(&self, _agent: AgentHandle, _movement: &mut ResolvedMovement) {}
}

/// A [`MovementHooks`] that changes nothing.
pub struct NoopHooks;

impl MovementHooks for NoopHooks {}
