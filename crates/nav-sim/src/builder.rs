//! Fluent builder for constructing a [`NavSim`].

use nav_agent::{LinkHandlers, MovementHooks, NoopHooks};
use nav_avoidance::{AvoidanceSimulation, AvoidanceSolver, SamplingSolver};
use nav_core::SimClock;
use nav_graph::{AStarRouter, NavGraph, Router};

use crate::requests::PathRequestQueue;
use crate::{ClampingIntegrator, Integrator, NavConfig, NavSim, SimResult};

/// Fluent builder for [`NavSim<R, I, S>`].
///
/// # Optional inputs (have defaults)
///
/// | Method               | Default                          |
/// |----------------------|----------------------------------|
/// | `.router(r)`         | [`AStarRouter`]                  |
/// | `.integrator(i)`     | [`ClampingIntegrator`]           |
/// | `.solver(s)`         | [`SamplingSolver::default()`]    |
/// | `.hooks(h)`          | [`NoopHooks`]                    |
/// | `.link_handlers(h)`  | Linear crossing for every link   |
///
/// # Example
///
/// ```rust,ignore
/// let graph = presets::corridor(MovementPlane::XZ, 20, 1.0).build()?;
/// let mut sim = NavSimBuilder::new(NavConfig::default(), graph)
///     .integrator(FreeIntegrator)
///     .build()?;
/// let a = sim.spawn(AgentBuilder::new(Vec3::new(0.5, 0.0, 0.5)));
/// sim.set_destination(a, Vec3::new(19.5, 0.0, 0.5), None)?;
/// sim.run_ticks(600, &mut NoopObserver);
/// ```
pub struct NavSimBuilder<R: Router = AStarRouter, I: Integrator = ClampingIntegrator, S: AvoidanceSolver = SamplingSolver> {
    config:     NavConfig,
    graph:      NavGraph,
    router:     R,
    integrator: I,
    solver:     S,
    hooks:      Box<dyn MovementHooks>,
    handlers:   LinkHandlers,
}

impl NavSimBuilder {
    pub fn new(config: NavConfig, graph: NavGraph) -> Self {
        Self {
            config,
            graph,
            router:     AStarRouter,
            integrator: ClampingIntegrator,
            solver:     SamplingSolver::default(),
            hooks:      Box::new(NoopHooks),
            handlers:   LinkHandlers::default(),
        }
    }
}

impl<R: Router, I: Integrator, S: AvoidanceSolver> NavSimBuilder<R, I, S> {
    /// Swap the full-path router.
    pub fn router<R2: Router>(self, router: R2) -> NavSimBuilder<R2, I, S> {
        NavSimBuilder {
            config:     self.config,
            graph:      self.graph,
            router,
            integrator: self.integrator,
            solver:     self.solver,
            hooks:      self.hooks,
            handlers:   self.handlers,
        }
    }

    pub fn integrator<I2: Integrator>(self, integrator: I2) -> NavSimBuilder<R, I2, S> {
        NavSimBuilder {
            config:     self.config,
            graph:      self.graph,
            router:     self.router,
            integrator,
            solver:     self.solver,
            hooks:      self.hooks,
            handlers:   self.handlers,
        }
    }

    /// Swap the local avoidance solver.
    pub fn solver<S2: AvoidanceSolver>(self, solver: S2) -> NavSimBuilder<R, I, S2> {
        NavSimBuilder {
            config:     self.config,
            graph:      self.graph,
            router:     self.router,
            integrator: self.integrator,
            solver,
            hooks:      self.hooks,
            handlers:   self.handlers,
        }
    }

    /// Hooks called for every agent around steering and movement.
    pub fn hooks(mut self, hooks: impl MovementHooks) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn link_handlers(mut self, handlers: LinkHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Validate the configuration and return a simulation with no agents.
    pub fn build(self) -> SimResult<NavSim<R, I, S>> {
        self.config.validate()?;
        let avoidance = AvoidanceSimulation::with_solver(self.graph.plane, self.solver);
        Ok(NavSim {
            config:     self.config,
            clock:      SimClock::new(),
            graph:      self.graph,
            agents:     Default::default(),
            avoidance,
            router:     self.router,
            integrator: self.integrator,
            hooks:      self.hooks,
            handlers:   self.handlers,
            requests:   PathRequestQueue::new(),
        })
    }
}
