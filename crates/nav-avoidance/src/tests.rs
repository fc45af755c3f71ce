//! Unit tests for nav-avoidance.

#[cfg(test)]
mod helpers {
    use glam::Vec3;

    use crate::AgentInput;

    pub fn walker(x: f32, z: f32, vx: f32, vz: f32) -> AgentInput {
        AgentInput {
            position:         Vec3::new(x, 0.0, z),
            radius:           0.5,
            desired_velocity: Vec3::new(vx, 0.0, vz),
            max_speed:        2.0,
            end_of_path:      Vec3::new(x + vx * 10.0, 0.0, z + vz * 10.0),
            active:           true,
        }
    }
}

// ── Slot registry ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod registry {
    use nav_core::{MovementPlane, NavError};

    use crate::{AvoidanceSettings, AvoidanceSimulation};

    #[test]
    fn register_and_unregister() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let a = sim.register(AvoidanceSettings::default());
        let b = sim.register(AvoidanceSettings::default());
        assert_eq!(sim.len(), 2);
        assert_ne!(a, b);

        sim.unregister(a).unwrap();
        assert_eq!(sim.len(), 1);
        assert!(!sim.is_registered(a));
        assert_eq!(sim.unregister(a), Err(NavError::InvalidSlot(a)));
    }

    #[test]
    fn reused_slot_rejects_old_handle() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let old = sim.register(AvoidanceSettings::default());
        sim.unregister(old).unwrap();
        let new = sim.register(AvoidanceSettings::default());
        assert_eq!(old.index, new.index);
        assert_ne!(old.generation, new.generation);
        assert!(sim.read(old).is_err());
        assert!(sim.read(new).is_ok());
    }

    #[test]
    fn settings_update() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let h = sim.register(AvoidanceSettings::default());
        let locked = AvoidanceSettings { locked: true, ..AvoidanceSettings::default() };
        sim.set_settings(h, locked.clone()).unwrap();
        assert_eq!(sim.settings(h).unwrap(), &locked);
    }
}

// ── Solve ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod solve {
    use glam::{Vec2, Vec3};
    use nav_core::MovementPlane;

    use super::helpers::walker;
    use crate::solver::time_to_collision;
    use crate::{AgentInput, AvoidanceSettings, AvoidanceSimulation};

    #[test]
    fn lone_agent_keeps_desired() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let h = sim.register(AvoidanceSettings::default());
        sim.submit(h, walker(0.0, 0.0, 1.0, 0.0)).unwrap();
        sim.solve();
        assert_eq!(sim.read(h).unwrap().velocity, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(sim.solve_count(), 1);
    }

    #[test]
    fn read_before_solve_is_previous_answer() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let h = sim.register(AvoidanceSettings::default());
        sim.submit(h, walker(0.0, 0.0, 1.0, 0.0)).unwrap();
        sim.solve();
        sim.submit(h, walker(0.0, 0.0, 0.0, 1.0)).unwrap();
        assert_eq!(sim.read(h).unwrap().velocity, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn head_on_pair_deflects() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let a = sim.register(AvoidanceSettings::default());
        let b = sim.register(AvoidanceSettings::default());
        sim.submit(a, walker(-2.0, 0.0, 1.0, 0.0)).unwrap();
        sim.submit(b, walker(2.0, 0.0, -1.0, 0.0)).unwrap();
        sim.solve();
        let va = sim.read(a).unwrap().velocity;
        let vb = sim.read(b).unwrap().velocity;
        assert_ne!(va, Vec3::new(1.0, 0.0, 0.0));
        assert_ne!(vb, Vec3::new(-1.0, 0.0, 0.0));

        let rel_pos = Vec2::new(4.0, 0.0);
        let rel_vel = Vec2::new(va.x - vb.x, va.z - vb.z);
        let t = time_to_collision(rel_pos, rel_vel, 1.0);
        assert!(t.is_none_or(|t| t > 1.0), "resolved velocities should not collide soon");
    }

    #[test]
    fn locked_agent_does_not_yield() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let a = sim.register(AvoidanceSettings { locked: true, ..AvoidanceSettings::default() });
        let b = sim.register(AvoidanceSettings::default());
        sim.submit(a, walker(-1.5, 0.0, 1.0, 0.0)).unwrap();
        sim.submit(b, walker(1.5, 0.0, -1.0, 0.0)).unwrap();
        sim.solve();
        assert_eq!(sim.read(a).unwrap().velocity, Vec3::new(1.0, 0.0, 0.0));
        assert_ne!(sim.read(b).unwrap().velocity, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn inactive_slot_is_invisible() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let a = sim.register(AvoidanceSettings::default());
        let b = sim.register(AvoidanceSettings::default());
        sim.submit(a, walker(-2.0, 0.0, 1.0, 0.0)).unwrap();
        sim.submit(b, AgentInput { active: false, ..walker(2.0, 0.0, -1.0, 0.0) }).unwrap();
        sim.solve();
        assert_eq!(sim.read(a).unwrap().velocity, Vec3::new(1.0, 0.0, 0.0));
        let out_b = sim.read(b).unwrap();
        assert_eq!(out_b.velocity, Vec3::new(-1.0, 0.0, 0.0));
        assert!(!out_b.reached_end);
    }

    #[test]
    fn reached_end_alone() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let h = sim.register(AvoidanceSettings::default());
        let end = Vec3::new(0.2, 0.0, 0.0);
        sim.submit(h, AgentInput { end_of_path: end, ..walker(0.0, 0.0, 0.0, 0.0) }).unwrap();
        sim.solve();
        let out = sim.read(h).unwrap();
        assert!(out.reached_end);
        assert_eq!(out.end_of_path, end);
    }

    #[test]
    fn crowded_end_flags_agent_behind_blocker() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let blocker = sim.register(AvoidanceSettings::default());
        let late    = sim.register(AvoidanceSettings::default());
        let end = Vec3::new(3.0, 0.0, 0.0);
        // The blocker already stands on the end point.
        sim.submit(blocker, AgentInput { end_of_path: end, ..walker(3.0, 0.0, 0.0, 0.0) }).unwrap();
        sim.submit(late, AgentInput { end_of_path: end, ..walker(2.0, 0.0, 0.0, 0.0) }).unwrap();
        sim.solve();
        assert!(sim.read(blocker).unwrap().reached_end);
        assert!(sim.read(late).unwrap().reached_end);
    }

    #[test]
    fn far_from_end_not_flagged() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let h = sim.register(AvoidanceSettings::default());
        sim.submit(h, AgentInput { end_of_path: Vec3::new(8.0, 0.0, 0.0), ..walker(0.0, 0.0, 1.0, 0.0) })
            .unwrap();
        sim.solve();
        assert!(!sim.read(h).unwrap().reached_end);
    }

    #[test]
    fn solve_is_deterministic() {
        let run = || {
            let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
            let hs: Vec<_> = (0..6).map(|_| sim.register(AvoidanceSettings::default())).collect();
            for (i, h) in hs.iter().enumerate() {
                let a = i as f32;
                sim.submit(*h, walker(a.cos() * 3.0, a.sin() * 3.0, -a.cos(), -a.sin())).unwrap();
            }
            sim.solve();
            hs.iter().map(|h| sim.read(*h).unwrap().velocity).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn collision_time_basics() {
        assert_eq!(time_to_collision(Vec2::new(3.0, 0.0), Vec2::new(1.0, 0.0), 1.0), Some(2.0));
        assert_eq!(time_to_collision(Vec2::new(3.0, 0.0), Vec2::new(-1.0, 0.0), 1.0), None);
        assert_eq!(time_to_collision(Vec2::new(0.5, 0.0), Vec2::new(1.0, 0.0), 1.0), Some(0.0));
    }
}
