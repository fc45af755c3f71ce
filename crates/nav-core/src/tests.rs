//! Unit tests for nav-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentHandle, LinkId, NodeId};

    #[test]
    fn index_roundtrip() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(LinkId::INVALID.0, u32::MAX);
        assert_eq!(NodeId::default(), NodeId::INVALID);
    }

    #[test]
    fn handles_differ_by_generation() {
        let a = AgentHandle::new(3, 0);
        let b = AgentHandle::new(3, 1);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
    }

    #[test]
    fn display() {
        assert_eq!(NodeId(7).to_string(), "NodeId(7)");
        assert_eq!(AgentHandle::new(2, 5).to_string(), "AgentHandle(2v5)");
    }
}

#[cfg(test)]
mod plane {
    use std::f32::consts::{FRAC_PI_2, PI};

    use glam::{Vec2, Vec3};

    use crate::MovementPlane;
    use crate::plane::{move_towards_angle, wrap_angle};

    #[test]
    fn xz_plane_is_identity() {
        let p = MovementPlane::XZ;
        assert_eq!(p.to_plane(Vec3::new(1.0, 5.0, 2.0)), Vec2::new(1.0, 2.0));
        assert_eq!(p.elevation(Vec3::new(1.0, 5.0, 2.0)), 5.0);
        assert_eq!(p.up(), Vec3::Y);
    }

    #[test]
    fn xy_plane_maps_z_to_elevation() {
        let p = MovementPlane::XY;
        assert!((p.up() - Vec3::Z).length() < 1e-5);
        let w = Vec3::new(3.0, 4.0, 7.0);
        assert!((p.elevation(w) - 7.0).abs() < 1e-5);
        // Round trip through plane space.
        let back = p.to_world(p.to_plane(w), p.elevation(w));
        assert!((back - w).length() < 1e-4);
        // Ground distance ignores height.
        let d = p.ground_distance(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 4.0, 100.0));
        assert!((d - 5.0).abs() < 1e-4);
    }

    #[test]
    fn yaw_roundtrip() {
        for plane in [MovementPlane::XZ, MovementPlane::XY] {
            for yaw in [0.0, 0.5, -1.2, 3.0] {
                let q = plane.rotation_from_yaw(yaw);
                assert!((wrap_angle(plane.yaw_of(q) - yaw)).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn yaw_of_direction_on_xz() {
        let p = MovementPlane::XZ;
        assert!((p.yaw_of_direction(Vec3::Z).unwrap()).abs() < 1e-6);
        assert!((p.yaw_of_direction(Vec3::X).unwrap() - FRAC_PI_2).abs() < 1e-6);
        assert!(p.yaw_of_direction(Vec3::Y).is_none());
    }

    #[test]
    fn angle_helpers() {
        assert!((wrap_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-5);
        assert!((wrap_angle(-2.5 * PI) + 0.5 * PI).abs() < 1e-5);
        assert!((move_towards_angle(0.0, 1.0, 0.25) - 0.25).abs() < 1e-6);
        assert_eq!(move_towards_angle(0.0, 0.1, 0.25), 0.1);
        // Shortest arc across the seam goes negative.
        let stepped = move_towards_angle(-3.0, 3.0, 0.1);
        assert!(stepped < -3.0);
    }
}

#[cfg(test)]
mod time {
    use crate::{SimClock, SubSteps};

    #[test]
    fn clock_accumulates() {
        let mut clock = SimClock::new();
        clock.advance_secs(0.5);
        clock.advance_secs(0.25);
        clock.finish_tick();
        assert_eq!(clock.tick, 1);
        assert!((clock.now_secs - 0.75).abs() < 1e-9);
    }

    #[test]
    fn unit_scale_is_one_step() {
        let s = SubSteps::plan(0.02, 1.0, 8);
        assert_eq!(s.count, 1);
        assert!((s.dt - 0.02).abs() < 1e-7);
    }

    #[test]
    fn scale_above_one_splits() {
        let s = SubSteps::plan(0.02, 3.0, 8);
        assert_eq!(s.count, 3);
        assert!((s.dt - 0.02).abs() < 1e-6);
        assert!((s.total() - 0.06).abs() < 1e-6);
    }

    #[test]
    fn substeps_capped() {
        let s = SubSteps::plan(0.02, 100.0, 4);
        assert_eq!(s.count, 4);
        assert!((s.total() - 2.0).abs() < 1e-5);
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentHandle, AgentRng};

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = AgentRng::new(12345, AgentHandle::new(0, 0));
        let mut r2 = AgentRng::new(12345, AgentHandle::new(0, 0));
        for _ in 0..100 {
            let a: f32 = r1.random();
            let b: f32 = r2.random();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn different_handles_differ() {
        let mut r0 = AgentRng::new(1, AgentHandle::new(0, 0));
        let mut r1 = AgentRng::new(1, AgentHandle::new(1, 0));
        let mut r2 = AgentRng::new(1, AgentHandle::new(0, 1));
        let a: u64 = r0.random();
        let b: u64 = r1.random();
        let c: u64 = r2.random();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
