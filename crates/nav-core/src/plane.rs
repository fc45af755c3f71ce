//! The movement plane: which way is "up" for an agent.
//!
//! All steering math runs in plane space: a 2D coordinate on the ground plus
//! an elevation along the plane normal.  A top-down 2D game (Z up) and a 3D
//! world (Y up) share one code path.  Local axes are fixed: local Y is up,
//! local Z is forward, local X is right.  A plane is just the rotation that
//! takes local axes to world axes.

use std::f32::consts::{FRAC_1_SQRT_2, PI, TAU};

use glam::{Quat, Vec2, Vec3};

/// Orientation of the ground an agent moves across.  Pure value, no state.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementPlane {
    rotation: Quat,
    inverse:  Quat,
}

impl MovementPlane {
    /// Y-up worlds: the ground is the XZ plane.
    pub const XZ: MovementPlane = MovementPlane {
        rotation: Quat::IDENTITY,
        inverse:  Quat::IDENTITY,
    };

    /// Z-up worlds (2D games): the ground is the XY plane.
    /// A +90° turn about X maps local up (Y) onto world Z.
    pub const XY: MovementPlane = MovementPlane {
        rotation: Quat::from_xyzw(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2),
        inverse:  Quat::from_xyzw(-FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2),
    };

    /// Plane whose local axes are `rotation` applied to the canonical axes.
    pub fn from_rotation(rotation: Quat) -> Self {
        let rotation = rotation.normalize();
        Self { rotation, inverse: rotation.inverse() }
    }

    /// Plane with the given world-space normal.  Forward is picked
    /// arbitrarily but deterministically.
    pub fn from_up(up: Vec3) -> Self {
        Self::from_rotation(Quat::from_rotation_arc(Vec3::Y, up.normalize_or(Vec3::Y)))
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// World-space normal of the plane.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Ground coordinates of a world point.
    #[inline]
    pub fn to_plane(&self, world: Vec3) -> Vec2 {
        let local = self.inverse * world;
        Vec2::new(local.x, local.z)
    }

    /// Height of a world point above the plane through the origin.
    #[inline]
    pub fn elevation(&self, world: Vec3) -> f32 {
        (self.inverse * world).y
    }

    /// Inverse of [`to_plane`](Self::to_plane) + [`elevation`](Self::elevation).
    #[inline]
    pub fn to_world(&self, ground: Vec2, elevation: f32) -> Vec3 {
        self.rotation * Vec3::new(ground.x, elevation, ground.y)
    }

    /// `v` with its component along the plane normal removed.
    #[inline]
    pub fn flatten(&self, v: Vec3) -> Vec3 {
        let up = self.up();
        v - up * v.dot(up)
    }

    /// Distance between two points measured along the ground only.
    #[inline]
    pub fn ground_distance(&self, a: Vec3, b: Vec3) -> f32 {
        self.to_plane(a).distance(self.to_plane(b))
    }

    /// Yaw (radians) of a rotation's forward axis around the plane normal.
    /// Yaw 0 faces local +Z; positive yaw turns towards local +X.
    pub fn yaw_of(&self, rotation: Quat) -> f32 {
        let forward = self.inverse * (rotation * Vec3::Z);
        forward.x.atan2(forward.z)
    }

    /// Yaw of a world-space direction, or `None` if it is (nearly) parallel
    /// to the plane normal.
    pub fn yaw_of_direction(&self, direction: Vec3) -> Option<f32> {
        let d = self.to_plane(direction);
        if d.length_squared() < 1e-12 {
            None
        } else {
            Some(d.x.atan2(d.y))
        }
    }

    /// World rotation facing `yaw` while standing upright on the plane.
    #[inline]
    pub fn rotation_from_yaw(&self, yaw: f32) -> Quat {
        self.rotation * Quat::from_rotation_y(yaw)
    }
}

impl Default for MovementPlane {
    fn default() -> Self {
        Self::XZ
    }
}

/// Wrap an angle into `(-PI, PI]`.
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    let mut a = a % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Step `current` towards `target` along the shortest arc by at most
/// `max_delta` radians.
#[inline]
pub fn move_towards_angle(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = wrap_angle(target - current);
    if delta.abs() <= max_delta {
        target
    } else {
        wrap_angle(current + max_delta.copysign(delta))
    }
}
