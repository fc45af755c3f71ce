//! Applying resolved movement to agent transforms.

use glam::{Quat, Vec3};

use nav_agent::{Agent, ResolvedMovement};
use nav_graph::NavGraph;

/// Turns a [`ResolvedMovement`] into the agent's next transform.
///
/// Called once per agent per sub-step from the resolve phase, possibly on
/// several threads at once.
pub trait Integrator: Send + Sync + 'static {
    fn integrate(&self, graph: &NavGraph, agent: &Agent, movement: &ResolvedMovement, dt: f32) -> (Vec3, Quat);
}

/// Moves by `velocity * dt` and puts the result back onto the nearest
/// walkable node.  Off the mesh entirely, the point is kept as is.
#[derive(Copy, Clone, Debug, Default)]
pub struct ClampingIntegrator;

impl Integrator for ClampingIntegrator {
    fn integrate(&self, graph: &NavGraph, agent: &Agent, movement: &ResolvedMovement, dt: f32) -> (Vec3, Quat) {
        let moved = agent.position() + movement.velocity * dt;
        let position = graph
            .nearest_node(moved, &agent.tracer().constraints)
            .map_or(moved, |hit| hit.point);
        (position, movement.target_rotation)
    }
}

/// Moves by `velocity * dt` with no clamping.
#[derive(Copy, Clone, Debug, Default)]
pub struct FreeIntegrator;

impl Integrator for FreeIntegrator {
    fn integrate(&self, _graph: &NavGraph, agent: &Agent, movement: &ResolvedMovement, dt: f32) -> (Vec3, Quat) {
        (agent.position() + movement.velocity * dt, movement.target_rotation)
    }
}
