//! The `NavSim` struct and its tick loop.

use glam::Vec3;
use tracing::{trace, warn};

use nav_agent::{
    Agent, AgentArena, AgentBuilder, LinkHandler, LinkHandlers, MovementHooks, MovementSettings, Produced,
    StepContext,
};
use nav_avoidance::{AvoidanceSettings, AvoidanceSimulation, AvoidanceSolver, SamplingSolver};
use nav_core::{AgentHandle, LinkId, SimClock};
use nav_graph::{AStarRouter, NavGraph, RoutedPath, Router};
use nav_path::PathPart;

use crate::requests::{PathRequestQueue, PendingPlan};
use crate::{ClampingIntegrator, Integrator, NavConfig, NavObserver, SimResult};

// ── NavSim ────────────────────────────────────────────────────────────────────

/// Owns the graph, the agents, the avoidance simulation and the request
/// queue, and drives the sub-step loop:
///
/// 1. **Deliver** plans solved at the start of the tick (first sub-step
///    only).
/// 2. **Produce** (optionally parallel with the `parallel` feature): each
///    agent repairs its path, decides on a re-plan, and steers or steps its
///    link crossing.
/// 3. **Submit** (sequential, slot order): plan requests are queued and
///    avoidance inputs submitted; one avoidance solve.
/// 4. **Resolve** (optionally parallel): each agent reads its avoidance
///    answer, applies its limits, is integrated, and refreshes its flags.
/// 5. **Dispatch** (sequential, slot order): queued events go to the
///    observer.
///
/// Every synchronous command takes `&mut self`, so none can interleave with
/// a phase.  Create via [`NavSimBuilder`](crate::NavSimBuilder).
pub struct NavSim<R: Router = AStarRouter, I: Integrator = ClampingIntegrator, S: AvoidanceSolver = SamplingSolver> {
    pub config: NavConfig,
    pub clock:  SimClock,

    pub(crate) graph:      NavGraph,
    pub(crate) agents:     AgentArena,
    pub(crate) avoidance:  AvoidanceSimulation<S>,
    pub(crate) router:     R,
    pub(crate) integrator: I,
    pub(crate) hooks:      Box<dyn MovementHooks>,
    pub(crate) handlers:   LinkHandlers,
    pub(crate) requests:   PathRequestQueue,
}

impl<R: Router, I: Integrator, S: AvoidanceSolver> NavSim<R, I, S> {
    // ── Tick loop ─────────────────────────────────────────────────────────

    /// Advance by one tick of `config.fixed_dt` real seconds.
    pub fn step<O: NavObserver>(&mut self, observer: &mut O) {
        observer.on_tick_start(&self.clock);
        let plan = self.config.substeps();
        let mut ready = self.requests.resolve(&self.graph, &self.router);
        for _ in 0..plan.count {
            self.substep(plan.dt, std::mem::take(&mut ready), observer);
        }
        self.clock.finish_tick();
        observer.on_tick_end(&self.clock, &self.agents);
    }

    /// Run exactly `n` ticks.
    pub fn run_ticks<O: NavObserver>(&mut self, n: u64, observer: &mut O) {
        for _ in 0..n {
            self.step(observer);
        }
    }

    fn substep<O: NavObserver>(&mut self, dt: f32, ready: Vec<PendingPlan>, observer: &mut O) {
        let now = self.clock.now_secs;

        // ── ① Deliver ─────────────────────────────────────────────────────
        for plan in ready {
            match self.agents.get_mut(plan.agent) {
                Ok(agent) => {
                    agent.deliver_plan(&self.graph, plan.id, plan.result, now);
                }
                Err(_) => trace!(agent = %plan.agent, id = %plan.id, "plan for despawned agent dropped"),
            }
        }

        let ctx = StepContext {
            graph:        &self.graph,
            handlers:     &self.handlers,
            hooks:        &*self.hooks,
            now,
            dt,
            corner_count: self.config.corner_count,
        };

        // ── ② Produce ─────────────────────────────────────────────────────
        let produced: Vec<(AgentHandle, Produced)> = self.agents.map_collect(|a| (a.handle(), a.produce(&ctx)));

        // ── ③ Submit ──────────────────────────────────────────────────────
        for (handle, out) in produced {
            if let Some(request) = out.request {
                let end = request.end;
                let id = self.requests.push(handle, request);
                if let Ok(agent) = self.agents.get_mut(handle) {
                    agent.on_plan_requested(id, end);
                }
            }
            if let Some((slot, input)) = out.avoidance {
                if let Err(err) = self.avoidance.submit(slot, input) {
                    warn!(agent = %handle, %err, "avoidance input rejected");
                }
            }
        }
        self.avoidance.solve();

        // ── ④ Resolve ─────────────────────────────────────────────────────
        let avoidance  = &self.avoidance;
        let integrator = &self.integrator;
        let graph      = &self.graph;
        self.agents.map_collect(|a| {
            if let Some(movement) = a.resolve(&ctx, avoidance) {
                let (position, rotation) = integrator.integrate(graph, a, &movement, dt);
                a.apply_movement(position, rotation, movement);
            }
            a.finish(&ctx);
        });

        // ── ⑤ Dispatch ────────────────────────────────────────────────────
        for agent in self.agents.iter_mut() {
            for event in agent.drain_events() {
                observer.on_event(&event);
            }
        }
        self.clock.advance_secs(dt);
    }

    // ── Agents ────────────────────────────────────────────────────────────

    pub fn spawn(&mut self, builder: AgentBuilder) -> AgentHandle {
        let seed   = self.config.seed;
        let limits = self.config.repair_limits.clone();
        let wants_avoidance = builder.wants_avoidance();
        let handle = self.agents.insert(|h| builder.build(h, seed, limits));
        if wants_avoidance {
            if let Ok(agent) = self.agents.get_mut(handle) {
                agent.enable_avoidance(&mut self.avoidance);
            }
        }
        trace!(agent = %handle, "spawned");
        handle
    }

    /// Remove an agent and give up its avoidance slot.  Plans still in
    /// flight for it are dropped on delivery.
    pub fn despawn(&mut self, handle: AgentHandle) -> SimResult<Agent> {
        let mut agent = self.agents.remove(handle)?;
        agent.disable_avoidance(&mut self.avoidance)?;
        trace!(agent = %handle, "despawned");
        Ok(agent)
    }

    pub fn agent(&self, handle: AgentHandle) -> SimResult<&Agent> {
        Ok(self.agents.get(handle)?)
    }

    pub fn agents(&self) -> &AgentArena {
        &self.agents
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// See [`Agent::set_destination`].  Returns `false` if the destination
    /// was already set to this value.
    pub fn set_destination(&mut self, handle: AgentHandle, point: Vec3, facing: Option<Vec3>) -> SimResult<bool> {
        let agent = self.agents.get_mut(handle)?;
        Ok(agent.set_destination(&self.graph, point, facing))
    }

    /// Replace the agent's path with an externally computed one.  With
    /// `update_destination` the path's end becomes the destination.
    pub fn set_path(&mut self, handle: AgentHandle, path: RoutedPath, update_destination: bool) -> SimResult<()> {
        let agent = self.agents.get_mut(handle)?;
        agent.set_path(&self.graph, path, update_destination)?;
        Ok(())
    }

    pub fn teleport(&mut self, handle: AgentHandle, point: Vec3, clear_path: bool) -> SimResult<()> {
        let agent = self.agents.get_mut(handle)?;
        agent.teleport(&self.graph, point, clear_path);
        Ok(())
    }

    /// Ask for a full plan at the next sub-step, whatever the re-plan mode.
    pub fn request_path(&mut self, handle: AgentHandle) -> SimResult<()> {
        self.agents.get_mut(handle)?.request_path();
        Ok(())
    }

    /// Fill `points` with the remaining route and `parts` with the path
    /// parts.  Returns whether the path is stale.
    pub fn remaining_path(
        &self,
        handle: AgentHandle,
        points: &mut Vec<Vec3>,
        parts:  Option<&mut Vec<PathPart>>,
    ) -> SimResult<bool> {
        Ok(self.agents.get(handle)?.remaining_path(&self.graph, points, parts))
    }

    /// Returns `false` if the agent was not crossing a link.
    pub fn cancel_link_traversal(&mut self, handle: AgentHandle) -> SimResult<bool> {
        let agent = self.agents.get_mut(handle)?;
        Ok(agent.cancel_link_traversal(&self.graph))
    }

    pub fn set_avoidance_enabled(&mut self, handle: AgentHandle, enabled: bool) -> SimResult<()> {
        let agent = self.agents.get_mut(handle)?;
        if enabled {
            agent.enable_avoidance(&mut self.avoidance);
        } else {
            agent.disable_avoidance(&mut self.avoidance)?;
        }
        Ok(())
    }

    pub fn set_avoidance_settings(&mut self, handle: AgentHandle, settings: AvoidanceSettings) -> SimResult<()> {
        let agent = self.agents.get_mut(handle)?;
        agent.set_avoidance_settings(&mut self.avoidance, settings)?;
        Ok(())
    }

    pub fn set_movement_settings(&mut self, handle: AgentHandle, settings: MovementSettings) -> SimResult<()> {
        self.agents.get_mut(handle)?.settings = settings;
        Ok(())
    }

    pub fn set_stopped(&mut self, handle: AgentHandle, stopped: bool) -> SimResult<()> {
        self.agents.get_mut(handle)?.set_stopped(stopped);
        Ok(())
    }

    // ── World ─────────────────────────────────────────────────────────────

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    /// Mutable graph access.  Agents notice destroyed nodes and links
    /// through the graph revision on their next sub-step.
    pub fn graph_mut(&mut self) -> &mut NavGraph {
        &mut self.graph
    }

    pub fn avoidance(&self) -> &AvoidanceSimulation<S> {
        &self.avoidance
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Requests waiting for the next tick.
    pub fn queued_requests(&self) -> usize {
        self.requests.len()
    }

    /// Use `handler` for crossings of `link`.
    pub fn set_link_handler(&mut self, link: LinkId, handler: impl LinkHandler) {
        self.handlers.register(link, handler);
    }

    /// Use `handler` for every link without a handler of its own.
    pub fn set_default_link_handler(&mut self, handler: impl LinkHandler) {
        self.handlers.set_default(handler);
    }
}
