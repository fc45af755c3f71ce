//! The navigating agent and its per-step pipeline.
//!
//! # One sub-step, as seen by an agent
//!
//! ```text
//! deliver_plan ─▶ produce ─▶ (sim: requests out, avoidance solve) ─▶ resolve ─▶ apply_movement ─▶ finish
//!                 repair start                                      read back     integrator       repair start
//!                 re-plan?                                          limits        result           reached flags
//!                 corners / link step                               before_movement                events
//!                 steer + hooks
//! ```
//!
//! `produce`, `resolve` and `finish` touch nothing but the agent itself and
//! shared read-only state, so the simulation may run them for many agents
//! in parallel.  Everything else is called from `&mut NavSim` methods.

use glam::{Quat, Vec3};
use tracing::{debug, trace};

use nav_avoidance::{AgentInput, AgentOutput, AvoidanceSettings, AvoidanceSimulation, AvoidanceSolver};
use nav_core::plane::wrap_angle;
use nav_core::{AgentHandle, AgentRng, AgentShape, LinkId, MovementPlane, NavResult, RequestId, SlotHandle};
use nav_graph::{GraphResult, NavGraph, RoutedPath, TraversalConstraints};
use nav_path::{CornerBoundary, PathPart, PathResult, PathTracer, RepairLimits, RepairQuality};

use crate::avoidance::crowded_end;
use crate::controller::steer;
use crate::traversal::ParkedPath;
use crate::{
    AbortReason, AutoRepathMode, AutoRepathPolicy, Destination, DestinationController, LinkHandlers,
    LinkPose, LinkStep, LinkTraversalContext, LocalAvoidanceAdapter, MovementController, MovementHooks,
    MovementSettings, NavEvent, OffMeshLinkTraversal, ResolvedMovement, TraversalPhase,
};

// ── Step inputs and outputs ───────────────────────────────────────────────────

/// Shared, read-only state for one sub-step.
pub struct StepContext<'a> {
    pub graph:        &'a NavGraph,
    pub handlers:     &'a LinkHandlers,
    pub hooks:        &'a dyn MovementHooks,
    /// Simulated seconds at the start of the sub-step.
    pub now:          f64,
    pub dt:           f32,
    /// Corners computed per agent per sub-step.
    pub corner_count: usize,
}

/// A full re-plan the agent wants.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanRequest {
    pub start:       Vec3,
    pub end:         Vec3,
    pub constraints: TraversalConstraints,
}

/// What [`Agent::produce`] hands back to the simulation.
#[derive(Clone, Debug, Default)]
pub struct Produced {
    pub request:   Option<PlanRequest>,
    pub avoidance: Option<(SlotHandle, AgentInput)>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct Flags {
    reached_destination: bool,
    reached_end_of_path: bool,
    reached_crowded_end: bool,
}

// ── AgentBuilder ──────────────────────────────────────────────────────────────

/// Everything needed to spawn an agent.
///
/// # Example
///
/// ```rust,ignore
/// let handle = sim.spawn(
///     AgentBuilder::new(Vec3::new(1.0, 0.0, 1.0))
///         .shape(AgentShape::new(0.4, 1.8))
///         .repath(AutoRepathMode::EveryNSeconds { period: 1.0 })
///         .avoidance(AvoidanceSettings::default()),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct AgentBuilder {
    position:    Vec3,
    rotation:    Quat,
    shape:       AgentShape,
    plane:       MovementPlane,
    settings:    MovementSettings,
    repath:      AutoRepathMode,
    avoidance:   Option<AvoidanceSettings>,
    constraints: TraversalConstraints,
}

impl AgentBuilder {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation:    Quat::IDENTITY,
            shape:       AgentShape::default(),
            plane:       MovementPlane::default(),
            settings:    MovementSettings::default(),
            repath:      AutoRepathMode::default(),
            avoidance:   None,
            constraints: TraversalConstraints::default(),
        }
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn shape(mut self, shape: AgentShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn plane(mut self, plane: MovementPlane) -> Self {
        self.plane = plane;
        self
    }

    pub fn settings(mut self, settings: MovementSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn repath(mut self, mode: AutoRepathMode) -> Self {
        self.repath = mode;
        self
    }

    /// Take part in local avoidance with these settings.
    pub fn avoidance(mut self, settings: AvoidanceSettings) -> Self {
        self.avoidance = Some(settings);
        self
    }

    pub fn constraints(mut self, constraints: TraversalConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    #[inline]
    pub fn wants_avoidance(&self) -> bool {
        self.avoidance.is_some()
    }

    /// Build the agent for `handle`.  Registering with avoidance is left to
    /// the caller, which owns the simulation.
    pub fn build(self, handle: AgentHandle, seed: u64, limits: RepairLimits) -> Agent {
        Agent {
            handle,
            position:           self.position,
            rotation:           self.rotation,
            velocity:           Vec3::ZERO,
            shape:              self.shape,
            plane:              self.plane,
            settings:           self.settings,
            tracer:             PathTracer::new(self.constraints, limits),
            destination:        DestinationController::default(),
            repath:             AutoRepathPolicy::new(self.repath),
            traversal:          OffMeshLinkTraversal::default(),
            avoidance:          LocalAvoidanceAdapter::new(self.avoidance.unwrap_or_default()),
            controller:         MovementController::default(),
            rng:                AgentRng::new(seed, handle),
            stopped:            false,
            manual_request:     false,
            skip_link:          None,
            driven_by_link:     false,
            flags:              Flags::default(),
            arrival_reported:   false,
            remaining_distance: f32::INFINITY,
            last_avoidance:     None,
            last_movement:      None,
            scratch:            Vec::new(),
            outbox:             Vec::new(),
        }
    }
}

// ── Agent ─────────────────────────────────────────────────────────────────────

/// One navigating agent.  Owns its path, destination, re-plan policy, link
/// crossing and avoidance slot handle exclusively.
#[derive(Clone, Debug)]
pub struct Agent {
    handle:   AgentHandle,
    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
    pub shape:    AgentShape,
    plane:    MovementPlane,
    pub settings: MovementSettings,

    tracer:      PathTracer,
    destination: DestinationController,
    repath:      AutoRepathPolicy,
    traversal:   OffMeshLinkTraversal,
    avoidance:   LocalAvoidanceAdapter,
    controller:  MovementController,
    rng:         AgentRng,

    stopped:        bool,
    manual_request: bool,
    /// Link an aborted crossing left behind; not re-entered until a new path
    /// is installed.
    skip_link:      Option<LinkId>,
    /// A link handler moved the agent this step; nothing to integrate.
    driven_by_link: bool,

    flags:              Flags,
    /// `reached_destination` as last announced with an event.
    arrival_reported:   bool,
    remaining_distance: f32,
    last_avoidance:     Option<AgentOutput>,
    last_movement:      Option<ResolvedMovement>,
    scratch:            Vec<Vec3>,
    outbox:             Vec<NavEvent>,
}

impl Agent {
    // ── Read accessors ────────────────────────────────────────────────────

    #[inline]
    pub fn handle(&self) -> AgentHandle {
        self.handle
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn plane(&self) -> &MovementPlane {
        &self.plane
    }

    /// Walking distance to the end of the path, or infinity without a fresh
    /// path.
    #[inline]
    pub fn remaining_distance(&self) -> f32 {
        self.remaining_distance
    }

    #[inline]
    pub fn reached_destination(&self) -> bool {
        self.flags.reached_destination
    }

    #[inline]
    pub fn reached_end_of_path(&self) -> bool {
        self.flags.reached_end_of_path
    }

    /// At the end of the path, or stopped short of it by a crowd standing
    /// there.
    #[inline]
    pub fn reached_crowded_end_of_path(&self) -> bool {
        self.flags.reached_end_of_path || self.flags.reached_crowded_end
    }

    #[inline]
    pub fn has_path(&self) -> bool {
        self.tracer.has_path()
    }

    /// A full plan has been asked for and not yet delivered.
    #[inline]
    pub fn path_pending(&self) -> bool {
        self.repath.is_pending() || self.repath.is_recovering() || self.manual_request
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    #[inline]
    pub fn is_stale(&self) -> bool {
        self.tracer.is_stale()
    }

    #[inline]
    pub fn is_traversing_link(&self) -> bool {
        self.traversal.is_active()
    }

    pub fn traversal_phase(&self) -> TraversalPhase {
        self.traversal.phase()
    }

    pub fn link_context(&self) -> Option<&LinkTraversalContext> {
        self.traversal.context()
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.destination.get()
    }

    pub fn tracer(&self) -> &PathTracer {
        &self.tracer
    }

    pub fn repath(&self) -> &AutoRepathPolicy {
        &self.repath
    }

    pub fn repath_mut(&mut self) -> &mut AutoRepathPolicy {
        &mut self.repath
    }

    pub fn avoidance(&self) -> &LocalAvoidanceAdapter {
        &self.avoidance
    }

    /// The movement applied in the last step.
    pub fn last_movement(&self) -> Option<&ResolvedMovement> {
        self.last_movement.as_ref()
    }

    /// Smoothed position for presentation; the simulated position until the
    /// first step.
    pub fn visual_position(&self) -> Vec3 {
        self.controller.visual_position().unwrap_or(self.position)
    }

    /// Remaining route as a polyline, links included.  Returns whether the
    /// path is stale.
    pub fn remaining_path(
        &self,
        graph:  &NavGraph,
        points: &mut Vec<Vec3>,
        parts:  Option<&mut Vec<PathPart>>,
    ) -> bool {
        self.tracer.remaining_path(graph, points, parts)
    }

    /// Events queued since the last drain, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, NavEvent> {
        self.outbox.drain(..)
    }

    // ── Commands (synchronous, `&mut` access only) ────────────────────────

    /// Set the destination and repair the path end right away, so the
    /// reached flags describe the new target when this returns.  Returns
    /// `false` if nothing changed.
    pub fn set_destination(&mut self, graph: &NavGraph, point: Vec3, facing: Option<Vec3>) -> bool {
        let destination = Destination::new(point, facing);
        if !self.destination.set(destination) {
            return false;
        }
        self.repath.notify_destination_changed();
        if self.traversal.is_active() {
            self.destination.defer();
            trace!(agent = %self.handle, "destination change deferred until the link is crossed");
            return true;
        }
        self.apply_destination(graph, destination.point);
        self.refresh_flags(graph);
        true
    }

    /// Replace the path.  While crossing a link the path is parked and
    /// installed when the crossing ends.
    pub fn set_path(&mut self, graph: &NavGraph, path: RoutedPath, update_destination: bool) -> PathResult<()> {
        self.repath.cancel_pending();
        self.manual_request = false;
        let parked = ParkedPath { path, update_destination, align_end: false };
        if self.traversal.is_active() {
            self.traversal.defer_path(parked);
            return Ok(());
        }
        self.install(graph, &parked)
    }

    /// Move the agent instantly.  An ongoing link crossing is cancelled.
    /// With `clear_path` the path is rebuilt from the new position,
    /// otherwise its start is repaired onto it.
    pub fn teleport(&mut self, graph: &NavGraph, point: Vec3, clear_path: bool) {
        self.abort_link(graph, AbortReason::Cancelled);
        self.position = point;
        self.velocity = Vec3::ZERO;
        self.controller.snap_visual(point);

        if clear_path {
            self.tracer.clear();
            self.repath.cancel_pending();
            self.skip_link = None;
            self.try_seed(graph);
        } else if self.tracer.has_path() {
            let outcome = self.tracer.update_start(graph, point, RepairQuality::High);
            self.repath.notify_repair(outcome);
        } else {
            self.try_seed(graph);
        }
        self.refresh_flags(graph);
    }

    /// Ask for a full plan at the next opportunity, whatever the re-plan
    /// mode.
    pub fn request_path(&mut self) {
        self.manual_request = true;
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Abort the current link crossing.  Returns `false` if there was none.
    pub fn cancel_link_traversal(&mut self, graph: &NavGraph) -> bool {
        self.abort_link(graph, AbortReason::Cancelled)
    }

    pub fn enable_avoidance<S: AvoidanceSolver>(&mut self, sim: &mut AvoidanceSimulation<S>) {
        self.avoidance.enable(sim);
        if self.traversal.context().is_some_and(|c| c.avoidance_suspended) {
            self.avoidance.suspend();
        }
    }

    pub fn disable_avoidance<S: AvoidanceSolver>(&mut self, sim: &mut AvoidanceSimulation<S>) -> NavResult<()> {
        self.avoidance.restore();
        self.last_avoidance = None;
        self.avoidance.disable(sim)
    }

    pub fn set_avoidance_settings<S: AvoidanceSolver>(
        &mut self,
        sim:      &mut AvoidanceSimulation<S>,
        settings: AvoidanceSettings,
    ) -> NavResult<()> {
        self.avoidance.set_settings(sim, settings)
    }

    // ── Plans ─────────────────────────────────────────────────────────────

    /// The simulation sent this agent's request out as `id`.
    pub fn on_plan_requested(&mut self, id: RequestId, end: Vec3) {
        self.repath.on_requested(id, end);
        self.outbox.push(NavEvent::PathRequested { agent: self.handle, request: id });
        trace!(agent = %self.handle, %id, "plan requested");
    }

    /// A plan came back.  Results for anything but the pending request are
    /// dropped; returns whether this one was taken.
    pub fn deliver_plan(&mut self, graph: &NavGraph, id: RequestId, result: GraphResult<RoutedPath>, now: f64) -> bool {
        if self.repath.pending() != Some(id) {
            trace!(agent = %self.handle, %id, "dropping superseded plan");
            return false;
        }
        match result {
            Ok(path) => {
                self.repath.on_completed(now, true, &mut self.rng);
                let partial = path.partial;
                let parked = ParkedPath { path, update_destination: false, align_end: !partial };
                if self.traversal.is_active() {
                    self.traversal.defer_path(parked);
                } else if let Err(err) = self.install(graph, &parked) {
                    debug!(agent = %self.handle, %id, %err, "planned path rejected");
                }
                self.outbox.push(NavEvent::PathPlanned { agent: self.handle, request: id, partial });
            }
            Err(err) => {
                self.repath.on_completed(now, false, &mut self.rng);
                self.outbox.push(NavEvent::PathFailed { agent: self.handle, request: id });
                debug!(agent = %self.handle, %id, %err, "plan failed");
            }
        }
        true
    }

    fn install(&mut self, graph: &NavGraph, parked: &ParkedPath) -> PathResult<()> {
        let path = &parked.path;
        self.tracer.set_path(graph, path)?;
        self.skip_link = None;
        if parked.update_destination {
            self.destination.set(Destination::new(path.end_point, None));
        } else if parked.align_end {
            // The destination may have moved while the plan was in flight.
            if let Some(end) = self.destination.point() {
                let outcome = self.tracer.update_end(graph, end, RepairQuality::High);
                self.repath.notify_repair(outcome);
            }
        }
        if !self.traversal.is_active() {
            let outcome = self.tracer.update_start(graph, self.position, self.settings.repair_quality);
            self.repath.notify_repair(outcome);
        }
        self.refresh_flags(graph);
        Ok(())
    }

    fn apply_destination(&mut self, graph: &NavGraph, point: Vec3) {
        if self.tracer.has_path() {
            let outcome = self.tracer.update_end(graph, point, RepairQuality::High);
            self.repath.notify_repair(outcome);
        } else {
            self.try_seed(graph);
        }
    }

    /// Start a trivial path where the agent stands and stretch its end to
    /// the destination, if there is one.
    fn try_seed(&mut self, graph: &NavGraph) {
        if !self.tracer.seed(graph, self.position) {
            return;
        }
        if let Some(end) = self.destination.point() {
            let outcome = self.tracer.update_end(graph, end, RepairQuality::High);
            self.repath.notify_repair(outcome);
        }
    }

    fn plan_request(&mut self, now: f64) -> Option<PlanRequest> {
        let destination = self.destination.point();
        let manual = std::mem::take(&mut self.manual_request);
        if !manual && !self.repath.should_request(now, destination, self.position, self.tracer.has_path()) {
            return None;
        }
        let Some(end) = destination else {
            debug!(agent = %self.handle, "path requested without a destination");
            return None;
        };
        Some(PlanRequest {
            start:       self.position,
            end,
            constraints: self.tracer.constraints.clone(),
        })
    }

    // ── Produce ───────────────────────────────────────────────────────────

    /// Repair, decide on a re-plan, and steer (or step the link crossing).
    pub fn produce(&mut self, ctx: &StepContext<'_>) -> Produced {
        let graph = ctx.graph;
        self.driven_by_link = false;
        self.controller.steering = None;
        self.tracer.refresh(graph);
        if self.tracer.is_broken() && !self.repath.is_pending() {
            self.repath.notify_broken();
        }

        // No plans are requested mid-crossing: the agent stands nowhere on
        // the graph.  A manual request waits for the crossing to end.
        if self.traversal.is_active() {
            self.step_link(ctx);
            return Produced { request: None, avoidance: self.avoidance_input(self.velocity) };
        }

        if self.tracer.has_path() {
            let outcome = self.tracer.update_start(graph, self.position, self.settings.repair_quality);
            self.repath.notify_repair(outcome);
        } else {
            self.try_seed(graph);
        }

        let boundary = self.tracer.next_corners(graph, ctx.corner_count, &mut self.controller.input.corners);
        if let CornerBoundary::OffMeshLink(part) = boundary {
            let entry = self.controller.input.corners.last().copied();
            let close = entry.is_some_and(|e| self.plane.ground_distance(e, self.position) <= self.settings.link_lead_in);
            if close && self.begin_link(graph, part) {
                self.step_link(ctx);
                return Produced { request: None, avoidance: self.avoidance_input(self.velocity) };
            }
        }
        let request = self.plan_request(ctx.now);

        let input = &mut self.controller.input;
        input.position    = self.position;
        input.rotation    = self.rotation;
        input.velocity    = self.velocity;
        input.boundary    = boundary;
        input.destination = self.destination.get().copied();
        input.stopped     = self.stopped;
        ctx.hooks.before_control(self.handle, input);

        let mut steering = steer(input, &self.settings, &self.plane, ctx.dt);
        ctx.hooks.after_control(self.handle, &mut steering);
        self.controller.steering = Some(steering);

        Produced { request, avoidance: self.avoidance_input(steering.desired_velocity) }
    }

    fn avoidance_input(&self, desired: Vec3) -> Option<(SlotHandle, AgentInput)> {
        self.avoidance.input(
            self.position,
            self.shape.radius,
            desired,
            self.settings.speed,
            self.tracer.end_point(),
        )
    }

    // ── Link crossing ─────────────────────────────────────────────────────

    fn begin_link(&mut self, graph: &NavGraph, part: usize) -> bool {
        let Some(&PathPart::Link { link, start, end, reverse }) = self.tracer.part(part) else {
            return false;
        };
        if !graph.is_link_alive(link) || self.skip_link == Some(link) {
            return false;
        }
        let suspended = self.settings.suspend_avoidance_on_links && self.avoidance.suspend();
        let position = self.position;
        self.traversal.begin(link, start, end, reverse, part, position).avoidance_suspended = suspended;
        self.outbox.push(NavEvent::LinkTraversalStarted { agent: self.handle, link });
        true
    }

    fn step_link(&mut self, ctx: &StepContext<'_>) {
        let mut pose = LinkPose {
            position: self.position,
            rotation: self.rotation,
            velocity: self.velocity,
            speed:    self.settings.speed,
            plane:    self.plane,
        };
        let Some((step, reason)) = self.traversal.step(ctx.graph, ctx.handlers, &mut pose, ctx.dt) else {
            return;
        };
        self.driven_by_link = true;
        self.position = pose.position;
        self.rotation = pose.rotation;
        self.velocity = pose.velocity;
        self.last_movement = Some(ResolvedMovement {
            target_point:    self.traversal.context().map_or(pose.position, |c| c.end),
            speed:           pose.velocity.length(),
            velocity:        pose.velocity,
            target_rotation: pose.rotation,
        });

        match step {
            LinkStep::Continue => {}
            LinkStep::Done => {
                if let Some(link) = self.traversal.take() {
                    self.finish_link(ctx.graph, link);
                }
            }
            LinkStep::Aborted => {
                if let Some(link) = self.traversal.take() {
                    self.end_aborted(ctx.graph, link, reason.unwrap_or(AbortReason::Handler));
                    self.repath.notify_link_aborted(ctx.now);
                }
            }
        }
    }

    fn finish_link(&mut self, graph: &NavGraph, link: LinkTraversalContext) {
        if link.avoidance_suspended {
            self.avoidance.restore();
        }
        self.tracer.pop_parts(link.parts_to_pop);
        self.repath.notify_link_crossed();
        self.outbox.push(NavEvent::LinkTraversalFinished { agent: self.handle, link: link.link });
        trace!(agent = %self.handle, link = %link.link, elapsed = link.elapsed, "off-mesh link crossed");
        self.apply_parked(graph);
    }

    fn abort_link(&mut self, graph: &NavGraph, reason: AbortReason) -> bool {
        if self.traversal.abort().is_none() {
            return false;
        }
        match self.traversal.take() {
            Some(link) => {
                self.end_aborted(graph, link, reason);
                self.manual_request = true;
                true
            }
            None => false,
        }
    }

    /// Put the agent back where the crossing began, with avoidance restored.
    /// The caller decides when the re-plan goes out.
    fn end_aborted(&mut self, graph: &NavGraph, link: LinkTraversalContext, reason: AbortReason) {
        if link.avoidance_suspended {
            self.avoidance.restore();
        }
        self.position       = link.entry_position;
        self.skip_link = Some(link.link);
        self.tracer.invalidate();
        self.outbox.push(NavEvent::LinkTraversalAborted { agent: self.handle, link: link.link, reason });
        debug!(agent = %self.handle, link = %link.link, ?reason, "off-mesh link crossing aborted");
        self.apply_parked(graph);
        self.refresh_flags(graph);
    }

    /// Apply whatever arrived while the link was being crossed.
    fn apply_parked(&mut self, graph: &NavGraph) {
        if let Some(parked) = self.traversal.take_deferred_path() {
            if let Err(err) = self.install(graph, &parked) {
                debug!(agent = %self.handle, %err, "parked path rejected");
            }
        }
        if self.destination.take_deferred() {
            if let Some(end) = self.destination.point() {
                self.apply_destination(graph, end);
            }
        }
    }

    // ── Resolve ───────────────────────────────────────────────────────────

    /// Merge the avoidance answer and apply the limits.  `None` when a link
    /// handler already moved the agent or there was nothing to steer.
    pub fn resolve<S: AvoidanceSolver>(
        &mut self,
        ctx:       &StepContext<'_>,
        avoidance: &AvoidanceSimulation<S>,
    ) -> Option<ResolvedMovement> {
        self.last_avoidance = self.avoidance.read(avoidance);
        if self.driven_by_link {
            return None;
        }
        let steering = self.controller.steering?;
        let resolved = self.last_avoidance.map_or(steering.desired_velocity, |o| o.velocity);
        let mut movement = MovementController::finalize(
            &steering,
            resolved,
            self.velocity,
            self.rotation,
            &self.settings,
            &self.plane,
            ctx.dt,
        );
        ctx.hooks.before_movement(self.handle, &mut movement);
        Some(movement)
    }

    /// Take the integrator's result.
    pub fn apply_movement(&mut self, position: Vec3, rotation: Quat, movement: ResolvedMovement) {
        self.position      = position;
        self.rotation      = rotation;
        self.velocity      = movement.velocity;
        self.last_movement = Some(movement);
    }

    /// Re-attach the path to the new position and refresh the derived
    /// flags, all within the step that moved the agent.
    pub fn finish(&mut self, ctx: &StepContext<'_>) {
        let graph = ctx.graph;
        if !self.traversal.is_active() && self.tracer.has_path() {
            let outcome = self.tracer.update_start(graph, self.position, self.settings.repair_quality);
            self.repath.notify_repair(outcome);
        }
        self.refresh_flags(graph);
        if self.flags.reached_destination && !self.arrival_reported {
            self.outbox.push(NavEvent::ReachedDestination { agent: self.handle });
        }
        self.arrival_reported = self.flags.reached_destination;
        self.controller.smooth_visual(self.position, &self.settings, ctx.dt);
    }

    fn refresh_flags(&mut self, graph: &NavGraph) {
        self.remaining_distance = self.tracer.remaining_distance(graph, &mut self.scratch);
        let settled = !self.tracer.is_stale() && !self.traversal.is_active();
        let stop    = self.settings.stop_distance;

        let at_end = settled && self.remaining_distance <= stop;
        let at_destination = settled
            && self.destination.get().is_some_and(|d| {
                self.plane.ground_distance(self.position, d.point) <= stop && self.facing_reached(d)
            });
        let crowded = settled
            && self.last_avoidance.is_some_and(|out| {
                crowded_end(&out, self.tracer.end_point(), self.remaining_distance, &self.settings.crowded_end)
            });

        self.flags = Flags {
            reached_destination: at_destination,
            reached_end_of_path: at_end,
            reached_crowded_end: crowded,
        };
    }

    fn facing_reached(&self, destination: &Destination) -> bool {
        let Some(want) = destination.facing.and_then(|f| self.plane.yaw_of_direction(f)) else {
            return true;
        };
        let have = self.plane.yaw_of(self.rotation);
        wrap_angle(want - have).abs() <= self.settings.facing_tolerance
    }
}
