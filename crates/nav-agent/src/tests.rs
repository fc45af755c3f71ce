//! Unit tests for nav-agent.

#[cfg(test)]
mod helpers {
    use glam::Vec3;
    use nav_avoidance::AvoidanceSimulation;
    use nav_core::{MovementPlane, RequestId};
    use nav_graph::{presets, AStarRouter, GraphResult, NavGraph, RoutedPath, Router};
    use nav_path::RepairLimits;

    use crate::{Agent, AgentBuilder, LinkHandlers, MovementHooks, NavEvent, NoopHooks, StepContext};

    pub const DT: f32 = 1.0 / 60.0;

    pub fn at(x: f32, z: f32) -> Vec3 {
        Vec3::new(x, 0.0, z)
    }

    /// 10 × 3 unit cells.
    pub fn field() -> NavGraph {
        presets::grid(MovementPlane::XZ, 10, 3, 1.0).build().unwrap()
    }

    /// Three cells in a row with the middle one missing, bridged by a link
    /// from (0.9, 0.5) to (2.1, 0.5).
    pub fn gap() -> NavGraph {
        let mut b = presets::grid_with(MovementPlane::XZ, 3, 1, 1.0, |c, _| c != 1);
        b.add_link(at(0.9, 0.5), at(2.1, 0.5), true);
        b.build().unwrap()
    }

    pub fn agent(builder: AgentBuilder) -> Agent {
        builder.build(nav_core::AgentHandle::new(0, 0), 42, RepairLimits::default())
    }

    /// Drives one agent the way the simulation does: plans are answered
    /// with A* and delivered at the start of the next step, movement is
    /// integrated without clamping.
    pub struct Driver {
        pub graph:     NavGraph,
        pub handlers:  LinkHandlers,
        pub hooks:     Box<dyn MovementHooks>,
        pub avoidance: AvoidanceSimulation,
        pub now:       f64,
        pub events:    Vec<NavEvent>,
        next_id:       u64,
        inflight:      Option<(RequestId, GraphResult<RoutedPath>)>,
    }

    impl Driver {
        pub fn new(graph: NavGraph) -> Self {
            Self {
                graph,
                handlers:  LinkHandlers::default(),
                hooks:     Box::new(NoopHooks),
                avoidance: AvoidanceSimulation::new(MovementPlane::XZ),
                now:       0.0,
                events:    Vec::new(),
                next_id:   0,
                inflight:  None,
            }
        }

        pub fn step(&mut self, agent: &mut Agent) {
            if let Some((id, result)) = self.inflight.take() {
                agent.deliver_plan(&self.graph, id, result, self.now);
            }
            let ctx = StepContext {
                graph:        &self.graph,
                handlers:     &self.handlers,
                hooks:        &*self.hooks,
                now:          self.now,
                dt:           DT,
                corner_count: 4,
            };
            let produced = agent.produce(&ctx);
            if let Some(req) = produced.request {
                let id = RequestId(self.next_id);
                self.next_id += 1;
                agent.on_plan_requested(id, req.end);
                let result = AStarRouter.route(&self.graph, req.start, req.end, &req.constraints);
                self.inflight = Some((id, result));
            }
            if let Some(movement) = agent.resolve(&ctx, &self.avoidance) {
                let position = agent.position() + movement.velocity * DT;
                agent.apply_movement(position, movement.target_rotation, movement);
            }
            agent.finish(&ctx);
            self.events.extend(agent.drain_events());
            self.now += DT as f64;
        }

        pub fn run(&mut self, agent: &mut Agent, steps: usize) {
            for _ in 0..steps {
                self.step(agent);
            }
        }

        /// Step until `cond` holds; `false` if it never did.
        pub fn run_until(&mut self, agent: &mut Agent, max_steps: usize, cond: impl Fn(&Agent) -> bool) -> bool {
            for _ in 0..max_steps {
                self.step(agent);
                if cond(agent) {
                    return true;
                }
            }
            false
        }
    }
}

// ── Destination ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod destination {
    use glam::Vec3;

    use crate::{Destination, DestinationController};

    #[test]
    fn equal_destination_is_no_change() {
        let mut d = DestinationController::default();
        assert!(d.set(Destination::new(Vec3::X, None)));
        assert!(!d.set(Destination::new(Vec3::X, None)));
        assert!(d.set(Destination::new(Vec3::X, Some(Vec3::Z))));
        assert_eq!(d.point(), Some(Vec3::X));
    }

    #[test]
    fn zero_facing_means_any() {
        let d = Destination::new(Vec3::ONE, Some(Vec3::ZERO));
        assert_eq!(d.facing, None);
    }

    #[test]
    fn deferred_flag_is_taken_once() {
        let mut d = DestinationController::default();
        assert!(!d.take_deferred());
        d.defer();
        assert!(d.take_deferred());
        assert!(!d.take_deferred());
    }
}

// ── Auto-repath ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod repath {
    use glam::Vec3;
    use nav_core::{AgentHandle, AgentRng, RequestId};
    use nav_path::RepairOutcome;

    use crate::{AutoRepathMode, AutoRepathPolicy, Backoff};

    fn rng() -> AgentRng {
        AgentRng::new(1, AgentHandle::new(0, 0))
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let b = Backoff::default();
        assert_eq!(b.delay(0), 0.0);
        assert_eq!(b.delay(1), 0.5);
        assert_eq!(b.delay(2), 1.0);
        assert_eq!(b.delay(3), 2.0);
        assert_eq!(b.delay(10), 8.0);
    }

    #[test]
    fn no_destination_never_requests() {
        let p = AutoRepathPolicy::new(AutoRepathMode::EveryNSeconds { period: 1.0 });
        assert!(!p.should_request(100.0, None, Vec3::ZERO, true));
        assert!(!p.should_request(100.0, Some(Vec3::NAN), Vec3::ZERO, true));
    }

    #[test]
    fn never_mode_ignores_failed_repairs() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::Never);
        p.notify_repair(RepairOutcome::Failed);
        assert!(!p.should_request(10.0, Some(Vec3::X), Vec3::ZERO, true));
    }

    #[test]
    fn periodic_mode_waits_for_period() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::EveryNSeconds { period: 1.0 });
        let dest = Some(Vec3::X);
        assert!(p.should_request(0.0, dest, Vec3::ZERO, true));
        p.on_requested(RequestId(0), Vec3::X);
        assert!(!p.should_request(5.0, dest, Vec3::ZERO, true), "pending request blocks");
        p.on_completed(1.0, true, &mut rng());
        assert!(p.last_recompute() <= 1.0 && p.last_recompute() >= 0.9);
        assert!(!p.should_request(1.5, dest, Vec3::ZERO, true));
        assert!(p.should_request(2.0, dest, Vec3::ZERO, true));
    }

    #[test]
    fn failed_repair_forces_a_plan() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::EveryNSeconds { period: 100.0 });
        p.on_requested(RequestId(0), Vec3::X);
        p.on_completed(0.0, true, &mut rng());
        assert!(!p.should_request(1.0, Some(Vec3::X), Vec3::ZERO, true));
        p.notify_repair(RepairOutcome::Slid);
        assert!(!p.should_request(1.0, Some(Vec3::X), Vec3::ZERO, true));
        p.notify_repair(RepairOutcome::Failed);
        assert!(p.should_request(1.0, Some(Vec3::X), Vec3::ZERO, true));
    }

    #[test]
    fn periodic_mode_needs_a_path() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::EveryNSeconds { period: 1.0 });
        let dest = Some(Vec3::X);
        assert!(!p.should_request(5.0, dest, Vec3::ZERO, false));
        assert!(p.should_request(5.0, dest, Vec3::ZERO, true));
        // A failed repair still asks, path or not.
        p.notify_repair(RepairOutcome::Failed);
        assert!(p.should_request(5.0, dest, Vec3::ZERO, false));
    }

    #[test]
    fn broken_path_forces_a_plan() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::OnDestinationChange);
        p.on_requested(RequestId(0), Vec3::X);
        p.on_completed(0.0, true, &mut rng());
        assert!(!p.should_request(1.0, Some(Vec3::X), Vec3::ZERO, true));
        p.notify_broken();
        assert!(p.should_request(1.0, Some(Vec3::X), Vec3::ZERO, true));
    }

    #[test]
    fn link_aborts_back_off_in_every_mode() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::Never);
        let dest = Some(Vec3::X);
        p.notify_link_aborted(10.0);
        assert!(p.is_recovering());
        assert!(!p.should_request(10.4, dest, Vec3::ZERO, true));
        assert!(p.should_request(10.5, dest, Vec3::ZERO, true));

        p.on_requested(RequestId(0), Vec3::X);
        p.on_completed(10.6, true, &mut rng());
        assert!(!p.is_recovering());

        // A successful plan does not reset the abort count; a crossing does.
        p.notify_link_aborted(11.0);
        assert_eq!(p.link_aborts(), 2);
        assert!(!p.should_request(11.9, dest, Vec3::ZERO, true));
        assert!(p.should_request(12.0, dest, Vec3::ZERO, true));
        p.notify_link_crossed();
        assert_eq!(p.link_aborts(), 0);
    }

    #[test]
    fn destination_change_mode() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::OnDestinationChange);
        let dest = Some(Vec3::X);
        assert!(!p.should_request(0.0, dest, Vec3::ZERO, true));
        p.notify_destination_changed();
        assert!(p.should_request(0.0, dest, Vec3::ZERO, true));
        p.on_requested(RequestId(3), Vec3::X);
        p.on_completed(0.1, true, &mut rng());
        assert!(!p.should_request(50.0, dest, Vec3::ZERO, true));
    }

    #[test]
    fn dynamic_mode_reacts_to_moving_target() {
        let mode = AutoRepathMode::Dynamic { sensitivity: 10.0, max_period: 2.0 };
        let mut p = AutoRepathPolicy::new(mode);
        p.on_requested(RequestId(0), Vec3::new(10.0, 0.0, 0.0));
        p.on_completed(0.0, true, &mut rng());

        // Target still: wait the full period.
        assert!(!p.should_request(1.0, Some(Vec3::new(10.0, 0.0, 0.0)), Vec3::ZERO, true));
        // Target moved by half its distance: the period drops below 0.4 s.
        assert!(p.should_request(1.0, Some(Vec3::new(10.0, 0.0, 5.0)), Vec3::ZERO, true));
    }

    #[test]
    fn failures_back_off() {
        let mut p = AutoRepathPolicy::new(AutoRepathMode::EveryNSeconds { period: 0.1 });
        let dest = Some(Vec3::X);
        let mut rng = rng();
        p.on_requested(RequestId(0), Vec3::X);
        p.on_completed(10.0, false, &mut rng);
        p.on_requested(RequestId(1), Vec3::X);
        p.on_completed(10.0, false, &mut rng);
        assert_eq!(p.failures(), 2);
        assert!(!p.should_request(10.9, dest, Vec3::ZERO, true));
        assert!(p.should_request(11.0, dest, Vec3::ZERO, true));

        p.on_requested(RequestId(2), Vec3::X);
        p.on_completed(11.0, true, &mut rng);
        assert_eq!(p.failures(), 0);
    }

    #[test]
    fn manual_cancel_clears_pending() {
        let mut p = AutoRepathPolicy::default();
        p.on_requested(RequestId(9), Vec3::X);
        assert_eq!(p.pending(), Some(RequestId(9)));
        p.cancel_pending();
        assert!(!p.is_pending());
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod controller {
    use std::f32::consts::FRAC_PI_2;

    use glam::{Quat, Vec3};
    use nav_core::MovementPlane;
    use nav_path::CornerBoundary;

    use super::helpers::at;
    use crate::controller::steer;
    use crate::{ControlInput, Destination, MovementController, MovementSettings, Steering};

    const PLANE: MovementPlane = MovementPlane::XZ;

    fn input(corners: &[Vec3], boundary: CornerBoundary) -> ControlInput {
        ControlInput { corners: corners.to_vec(), boundary, ..ControlInput::default() }
    }

    fn near(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn cruises_towards_first_corner() {
        let s = steer(&input(&[at(5.0, 0.0)], CornerBoundary::EndOfPath), &MovementSettings::default(), &PLANE, 1.0 / 60.0);
        assert!(near(s.speed, 5.0));
        assert!(s.desired_velocity.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-4));
        assert!(near(s.distance_to_end, 5.0));
        assert!(near(PLANE.yaw_of(s.target_rotation), FRAC_PI_2));
    }

    #[test]
    fn brakes_near_the_end() {
        let settings = MovementSettings::default();
        let s = steer(&input(&[at(1.0, 0.0)], CornerBoundary::EndOfPath), &settings, &PLANE, 1.0 / 60.0);
        assert!(near(s.speed, 2.0));

        let s = steer(&input(&[at(0.1, 0.0)], CornerBoundary::EndOfPath), &settings, &PLANE, 1.0 / 60.0);
        assert_eq!(s.speed, 0.0);
        assert_eq!(s.desired_velocity, Vec3::ZERO);
    }

    #[test]
    fn never_aims_past_last_corner() {
        let corner = at(0.0, 0.05);
        let settings = MovementSettings { stop_distance: 0.0, slowdown_time: 0.0, ..MovementSettings::default() };
        let s = steer(&input(&[corner], CornerBoundary::OffMeshLink(1)), &settings, &PLANE, 0.1);
        assert!(near(s.speed, 0.5));
    }

    #[test]
    fn truncated_corners_have_no_end() {
        let s = steer(
            &input(&[at(1.0, 0.0), at(2.0, 1.0)], CornerBoundary::Truncated),
            &MovementSettings::default(),
            &PLANE,
            1.0 / 60.0,
        );
        assert_eq!(s.distance_to_end, f32::INFINITY);
        assert!(near(s.speed, 5.0));
    }

    #[test]
    fn no_corners_idles() {
        let rot = Quat::from_rotation_y(0.3);
        let i = ControlInput { rotation: rot, ..ControlInput::default() };
        let s = steer(&i, &MovementSettings::default(), &PLANE, 1.0 / 60.0);
        assert_eq!(s.speed, 0.0);
        assert_eq!(s.target_rotation, rot);
        assert_eq!(s.distance_to_end, f32::INFINITY);
    }

    #[test]
    fn stopped_agent_wants_zero() {
        let mut i = input(&[at(5.0, 0.0)], CornerBoundary::EndOfPath);
        i.stopped = true;
        let s = steer(&i, &MovementSettings::default(), &PLANE, 1.0 / 60.0);
        assert_eq!(s.desired_velocity, Vec3::ZERO);
    }

    #[test]
    fn arrival_facing_overrides_travel_direction() {
        let mut i = input(&[at(0.5, 0.0)], CornerBoundary::EndOfPath);
        i.destination = Some(Destination::new(at(0.5, 0.0), Some(Vec3::Z)));
        let s = steer(&i, &MovementSettings::default(), &PLANE, 1.0 / 60.0);
        assert!(near(PLANE.yaw_of(s.target_rotation), 0.0));

        // Far away the direction of travel wins.
        let mut i = input(&[at(5.0, 0.0)], CornerBoundary::EndOfPath);
        i.destination = Some(Destination::new(at(5.0, 0.0), Some(Vec3::Z)));
        let s = steer(&i, &MovementSettings::default(), &PLANE, 1.0 / 60.0);
        assert!(near(PLANE.yaw_of(s.target_rotation), FRAC_PI_2));
    }

    #[test]
    fn finalize_limits_acceleration_and_turn_rate() {
        let steering = Steering {
            target_point:     at(5.0, 0.0),
            speed:            5.0,
            desired_velocity: Vec3::new(5.0, 0.0, 0.0),
            target_rotation:  PLANE.rotation_from_yaw(FRAC_PI_2),
            distance_to_end:  5.0,
        };
        let m = MovementController::finalize(
            &steering,
            steering.desired_velocity,
            Vec3::ZERO,
            Quat::IDENTITY,
            &MovementSettings::default(),
            &PLANE,
            0.1,
        );
        assert!(m.velocity.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4));
        assert!(near(m.speed, 2.0));
        assert!(near(PLANE.yaw_of(m.target_rotation), 1.0));
    }

    #[test]
    fn finalize_drops_vertical_velocity() {
        let steering = Steering::idle(Vec3::ZERO, Quat::IDENTITY);
        let m = MovementController::finalize(
            &steering,
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::ZERO,
            Quat::IDENTITY,
            &MovementSettings::default(),
            &PLANE,
            0.1,
        );
        assert_eq!(m.velocity, Vec3::ZERO);
    }

    #[test]
    fn visual_position_lags_with_smoothing() {
        let settings = MovementSettings { position_smoothing: 0.2, ..MovementSettings::default() };
        let mut c = MovementController::default();
        assert_eq!(c.smooth_visual(Vec3::ZERO, &settings, 0.1), Vec3::ZERO);
        let v = c.smooth_visual(at(1.0, 0.0), &settings, 0.1);
        assert!(v.x > 0.0 && v.x < 1.0);
        c.snap_visual(at(3.0, 0.0));
        assert_eq!(c.visual_position(), Some(at(3.0, 0.0)));
    }
}

// ── Link traversal state machine ──────────────────────────────────────────────

#[cfg(test)]
mod traversal {
    use nav_core::{LinkId, MovementPlane};

    use super::helpers::{at, gap};
    use crate::{
        AbortReason, LinkHandler, LinkHandlers, LinkPose, LinkStep, LinkTraversalContext, OffMeshLinkTraversal,
        TraversalPhase,
    };

    struct Refuse;

    impl LinkHandler for Refuse {
        fn step(&self, _link: &LinkTraversalContext, _pose: &mut LinkPose, _dt: f32) -> LinkStep {
            LinkStep::Aborted
        }
    }

    fn pose() -> LinkPose {
        LinkPose {
            position: at(0.85, 0.5),
            rotation: glam::Quat::IDENTITY,
            velocity: glam::Vec3::ZERO,
            speed:    5.0,
            plane:    MovementPlane::XZ,
        }
    }

    fn begun() -> OffMeshLinkTraversal {
        let mut t = OffMeshLinkTraversal::default();
        t.begin(LinkId(0), at(0.9, 0.5), at(2.1, 0.5), false, 1, at(0.85, 0.5));
        t
    }

    #[test]
    fn linear_crossing_runs_to_completion() {
        let graph = gap();
        let handlers = LinkHandlers::default();
        let mut t = begun();
        let mut p = pose();
        assert_eq!(t.phase(), TraversalPhase::Entering);

        assert_eq!(t.step(&graph, &handlers, &mut p, 0.1), Some((LinkStep::Continue, None)));
        assert_eq!(p.position, at(0.9, 0.5));
        assert_eq!(t.phase(), TraversalPhase::Traversing);

        assert_eq!(t.step(&graph, &handlers, &mut p, 0.1), Some((LinkStep::Continue, None)));
        assert_eq!(t.step(&graph, &handlers, &mut p, 0.1), Some((LinkStep::Continue, None)));
        assert_eq!(t.step(&graph, &handlers, &mut p, 0.1), Some((LinkStep::Done, None)));
        assert_eq!(t.phase(), TraversalPhase::Finished);
        assert_eq!(p.position, at(2.1, 0.5));

        let ctx = t.take().unwrap();
        assert_eq!(ctx.parts_to_pop, 2);
        assert!((ctx.elapsed - 0.3).abs() < 1e-5);
        assert!(!t.is_active());
        assert_eq!(t.phase(), TraversalPhase::NotTraversing);
    }

    #[test]
    fn destroyed_link_aborts() {
        let mut graph = gap();
        let handlers = LinkHandlers::default();
        let mut t = begun();
        let mut p = pose();
        t.step(&graph, &handlers, &mut p, 0.1);
        graph.destroy_link(LinkId(0)).unwrap();
        assert_eq!(
            t.step(&graph, &handlers, &mut p, 0.1),
            Some((LinkStep::Aborted, Some(AbortReason::LinkDestroyed)))
        );
        assert_eq!(t.phase(), TraversalPhase::Aborted);
    }

    #[test]
    fn custom_handler_per_link() {
        let graph = gap();
        let mut handlers = LinkHandlers::default();
        handlers.register(LinkId(0), Refuse);
        let mut t = begun();
        let mut p = pose();
        t.step(&graph, &handlers, &mut p, 0.1);
        assert_eq!(
            t.step(&graph, &handlers, &mut p, 0.1),
            Some((LinkStep::Aborted, Some(AbortReason::Handler)))
        );
        assert!(handlers.unregister(LinkId(0)));
        assert!(!handlers.unregister(LinkId(0)));
    }

    #[test]
    fn idle_machine_does_nothing() {
        let graph = gap();
        let mut t = OffMeshLinkTraversal::default();
        let mut p = pose();
        assert_eq!(t.step(&graph, &LinkHandlers::default(), &mut p, 0.1), None);
        assert!(t.abort().is_none());
    }
}

// ── Avoidance adapter ─────────────────────────────────────────────────────────

#[cfg(test)]
mod avoidance {
    use glam::Vec3;
    use nav_avoidance::{AgentOutput, AvoidanceSettings, AvoidanceSimulation};
    use nav_core::MovementPlane;

    use crate::avoidance::crowded_end;
    use crate::{CrowdedEndTolerance, LocalAvoidanceAdapter};

    #[test]
    fn enable_disable_round() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let mut a = LocalAvoidanceAdapter::new(AvoidanceSettings::default());
        assert!(!a.suspend(), "nothing to suspend without a slot");
        a.enable(&mut sim);
        let slot = a.slot().unwrap();
        a.enable(&mut sim);
        assert_eq!(a.slot(), Some(slot));
        assert_eq!(sim.len(), 1);
        a.disable(&mut sim).unwrap();
        assert!(!a.is_enabled());
        assert!(sim.is_empty());
        a.disable(&mut sim).unwrap();
    }

    #[test]
    fn suspended_slot_submits_inactive() {
        let mut sim = AvoidanceSimulation::new(MovementPlane::XZ);
        let mut a = LocalAvoidanceAdapter::new(AvoidanceSettings::default());
        a.enable(&mut sim);
        assert!(a.suspend());
        assert!(!a.suspend());
        let (_, input) = a.input(Vec3::ZERO, 0.5, Vec3::X, 5.0, Vec3::X).unwrap();
        assert!(!input.active);
        assert!(a.read(&sim).is_none());
        a.restore();
        let (_, input) = a.input(Vec3::ZERO, 0.5, Vec3::X, 5.0, Vec3::X).unwrap();
        assert!(input.active);
    }

    #[test]
    fn crowded_end_needs_matching_end_point() {
        let out = AgentOutput { velocity: Vec3::ZERO, reached_end: true, end_of_path: Vec3::new(5.0, 0.0, 0.0) };
        let tol = CrowdedEndTolerance::default();
        assert!(crowded_end(&out, Vec3::new(5.05, 0.0, 0.0), 0.5, &tol));
        assert!(!crowded_end(&out, Vec3::new(6.0, 0.0, 0.0), 0.5, &tol));
        assert!(!crowded_end(&out, Vec3::new(5.0, 0.0, 0.0), f32::INFINITY, &tol));
        let not_reached = AgentOutput { reached_end: false, ..out };
        assert!(!crowded_end(&not_reached, Vec3::new(5.0, 0.0, 0.0), 0.5, &tol));
    }
}

// ── Arena ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod arena {
    use nav_core::NavError;
    use nav_path::RepairLimits;

    use super::helpers::at;
    use crate::{AgentArena, AgentBuilder};

    fn spawn(arena: &mut AgentArena, x: f32) -> nav_core::AgentHandle {
        arena.insert(|h| AgentBuilder::new(at(x, 0.0)).build(h, 1, RepairLimits::default()))
    }

    #[test]
    fn reused_slot_rejects_old_handle() {
        let mut arena = AgentArena::new();
        let a = spawn(&mut arena, 0.0);
        let b = spawn(&mut arena, 1.0);
        assert_eq!(arena.len(), 2);

        arena.remove(a).unwrap();
        assert!(!arena.contains(a));
        assert_eq!(arena.remove(a).unwrap_err(), NavError::InvalidHandle(a));

        let c = spawn(&mut arena, 2.0);
        assert_eq!(c.index, a.index);
        assert_ne!(c.generation, a.generation);
        assert!(arena.get(a).is_err());
        assert_eq!(arena.get(c).unwrap().position(), at(2.0, 0.0));
        assert_eq!(arena.get(b).unwrap().handle(), b);
    }

    #[test]
    fn map_collect_in_slot_order() {
        let mut arena = AgentArena::new();
        for x in 0..5 {
            spawn(&mut arena, x as f32);
        }
        let xs = arena.map_collect(|a| a.position().x);
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}

// ── Agent pipeline ────────────────────────────────────────────────────────────

#[cfg(test)]
mod agent {
    use std::f32::consts::FRAC_PI_2;

    use glam::Vec3;
    use nav_core::{LinkId, RequestId};
    use nav_graph::{AStarRouter, Router, TraversalConstraints};

    use super::helpers::{agent, at, field, gap, Driver};
    use crate::{
        AbortReason, AgentBuilder, AutoRepathMode, MovementHooks, NavEvent, Steering, TraversalPhase,
    };

    fn count(events: &[NavEvent], f: impl Fn(&NavEvent) -> bool) -> usize {
        events.iter().filter(|e| f(e)).count()
    }

    #[test]
    fn walks_to_destination() {
        let mut d = Driver::new(field());
        let mut a = agent(AgentBuilder::new(at(0.5, 1.5)));
        assert!(a.set_destination(&d.graph, at(8.5, 1.5), None));
        d.run(&mut a, 300);

        assert!(a.reached_destination());
        assert!(a.reached_end_of_path());
        assert!(a.reached_crowded_end_of_path());
        assert!(a.position().distance(at(8.5, 1.5)) <= 0.2 + 1e-4);
        assert!(count(&d.events, |e| matches!(e, NavEvent::PathRequested { .. })) >= 1);
        assert_eq!(count(&d.events, |e| matches!(e, NavEvent::ReachedDestination { .. })), 1);
    }

    #[test]
    fn same_destination_twice_is_noop() {
        let d = Driver::new(field());
        let mut a = agent(AgentBuilder::new(at(0.5, 1.5)));
        assert!(a.set_destination(&d.graph, at(3.5, 1.5), None));
        let version = a.tracer().version();
        assert!(!a.set_destination(&d.graph, at(3.5, 1.5), None));
        assert_eq!(a.tracer().version(), version);
    }

    #[test]
    fn flags_refresh_on_destination_change() {
        let d = Driver::new(field());
        let mut a = agent(AgentBuilder::new(at(2.5, 1.5)));
        a.set_destination(&d.graph, at(2.6, 1.5), None);
        assert!(a.reached_destination());
        a.set_destination(&d.graph, at(2.5, 0.5), None);
        assert!(!a.reached_destination());
        assert!(a.remaining_distance() > 0.2);
    }

    #[test]
    fn facing_must_be_reached_too() {
        let mut d = Driver::new(field());
        let mut a = agent(AgentBuilder::new(at(2.5, 1.5)));
        a.set_destination(&d.graph, at(2.5, 1.5), Some(Vec3::X));
        assert!(a.reached_end_of_path());
        assert!(!a.reached_destination());

        assert!(d.run_until(&mut a, 60, |a| a.reached_destination()));
        let yaw = a.plane().yaw_of(a.rotation());
        assert!((yaw - FRAC_PI_2).abs() <= a.settings.facing_tolerance);
    }

    #[test]
    fn stopped_agent_holds_position() {
        let mut d = Driver::new(field());
        let mut a = agent(AgentBuilder::new(at(0.5, 1.5)));
        a.set_stopped(true);
        a.set_destination(&d.graph, at(8.5, 1.5), None);
        d.run(&mut a, 60);
        assert_eq!(a.position(), at(0.5, 1.5));
        assert!(a.is_stopped());
    }

    #[test]
    fn superseded_plan_is_dropped() {
        let d = Driver::new(field());
        let mut a = agent(AgentBuilder::new(at(0.5, 1.5)).repath(AutoRepathMode::Never));
        a.set_destination(&d.graph, at(8.5, 1.5), None);
        let path = AStarRouter
            .route(&d.graph, at(0.5, 1.5), at(8.5, 1.5), &TraversalConstraints::default())
            .unwrap();
        a.on_plan_requested(RequestId(1), at(8.5, 1.5));
        a.on_plan_requested(RequestId(2), at(8.5, 1.5));
        assert!(!a.deliver_plan(&d.graph, RequestId(1), Ok(path.clone()), 0.0));
        assert!(a.path_pending());
        assert!(a.deliver_plan(&d.graph, RequestId(2), Ok(path), 0.0));
        assert!(!a.path_pending());
        assert!(!a.is_stale());
    }

    #[test]
    fn hooks_can_override_steering() {
        struct Freeze;
        impl MovementHooks for Freeze {
            fn after_control(&self, _agent: nav_core::AgentHandle, steering: &mut Steering) {
                steering.speed = 0.0;
                steering.desired_velocity = Vec3::ZERO;
            }
        }

        let mut d = Driver::new(field());
        d.hooks = Box::new(Freeze);
        let mut a = agent(AgentBuilder::new(at(0.5, 1.5)));
        a.set_destination(&d.graph, at(8.5, 1.5), None);
        d.run(&mut a, 30);
        assert_eq!(a.position(), at(0.5, 1.5));
    }

    // ── Off-mesh links ────────────────────────────────────────────────────

    #[test]
    fn crosses_link_and_arrives() {
        let mut d = Driver::new(gap());
        let mut a = agent(AgentBuilder::new(at(0.2, 0.5)));
        a.set_destination(&d.graph, at(2.8, 0.5), None);

        assert!(d.run_until(&mut a, 120, |a| a.is_traversing_link()));
        assert!(!a.reached_destination());
        assert!(!a.reached_end_of_path());
        assert!(d.run_until(&mut a, 120, |a| !a.is_traversing_link()));
        assert_eq!(a.traversal_phase(), TraversalPhase::NotTraversing);
        d.run(&mut a, 180);

        assert!(a.reached_destination());
        let started = d.events.iter().position(|e| matches!(e, NavEvent::LinkTraversalStarted { .. }));
        let finished = d.events.iter().position(|e| matches!(e, NavEvent::LinkTraversalFinished { .. }));
        assert!(started.unwrap() < finished.unwrap());
    }

    #[test]
    fn teleport_cancels_crossing() {
        let mut d = Driver::new(gap());
        let mut a = agent(AgentBuilder::new(at(0.2, 0.5)));
        a.set_destination(&d.graph, at(2.8, 0.5), None);
        assert!(d.run_until(&mut a, 120, |a| a.is_traversing_link()));

        a.teleport(&d.graph, at(2.5, 0.5), true);
        d.events.extend(a.drain_events());
        assert!(!a.is_traversing_link());
        assert_eq!(a.position(), at(2.5, 0.5));
        assert_eq!(a.velocity(), Vec3::ZERO);
        assert!(!a.avoidance().is_suspended());
        assert!(d.events.contains(&NavEvent::LinkTraversalAborted {
            agent:  a.handle(),
            link:   LinkId(0),
            reason: AbortReason::Cancelled,
        }));
    }

    #[test]
    fn destroyed_link_returns_agent_to_entry() {
        let mut d = Driver::new(gap());
        let mut a = agent(AgentBuilder::new(at(0.2, 0.5)));
        a.set_destination(&d.graph, at(2.8, 0.5), None);
        assert!(d.run_until(&mut a, 120, |a| a.is_traversing_link()));
        let entry = a.link_context().unwrap().entry_position;

        d.graph.destroy_link(LinkId(0)).unwrap();
        d.step(&mut a);

        assert!(!a.is_traversing_link());
        assert_eq!(a.position(), entry);
        assert!(a.is_stale());
        assert!(a.path_pending());
        assert!(!a.reached_destination());
        assert_eq!(
            count(&d.events, |e| matches!(e, NavEvent::LinkTraversalAborted { reason: AbortReason::LinkDestroyed, .. })),
            1
        );
    }

    #[test]
    fn path_set_mid_crossing_waits_for_the_exit() {
        let mut d = Driver::new(gap());
        let mut a = agent(AgentBuilder::new(at(0.2, 0.5)).repath(AutoRepathMode::Never));
        a.set_destination(&d.graph, at(2.8, 0.5), None);
        a.request_path();
        assert!(d.run_until(&mut a, 120, |a| a.is_traversing_link()));

        let detour = AStarRouter
            .route(&d.graph, at(2.2, 0.5), at(2.5, 0.5), &TraversalConstraints::default())
            .unwrap();
        a.set_path(&d.graph, detour, false).unwrap();
        assert!(a.is_traversing_link());
        assert!(a.link_context().is_some());

        assert!(d.run_until(&mut a, 120, |a| !a.is_traversing_link()));
        assert!(a.tracer().end_point().distance(at(2.5, 0.5)) < 1e-3);
        assert_eq!(a.destination().map(|d| d.point), Some(at(2.8, 0.5)));
    }
}
