//! The shared avoidance simulation: slots in, one batch solve, velocities out.

use glam::Vec2;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::trace;

use nav_core::{MovementPlane, NavError, NavResult, SlotHandle};

use crate::{AgentInput, AgentOutput, AvoidanceSettings, AvoidanceSolver, SamplingSolver, SolverAgent};

/// Extra gap, in metres, at which a neighbour still counts as touching.
const CONTACT_MARGIN: f32 = 0.1;

/// A neighbour moving slower than this fraction of our max speed is treated
/// as standing in the way.
const SLOW_FRACTION: f32 = 0.25;

type IndexPoint = GeomWithData<[f32; 2], usize>;

struct Slot {
    generation: u32,
    alive:      bool,
    settings:   AvoidanceSettings,
    input:      AgentInput,
    output:     AgentOutput,
}

/// Externally owned, batch-solved avoidance simulation.
///
/// Slots are addressed by [`SlotHandle`]; unregistering bumps the slot's
/// generation so a stale handle is rejected instead of reading someone
/// else's velocity.
pub struct AvoidanceSimulation<S: AvoidanceSolver = SamplingSolver> {
    plane:  MovementPlane,
    solver: S,
    slots:  Vec<Slot>,
    free:   Vec<u32>,
    solves: u64,
}

impl AvoidanceSimulation<SamplingSolver> {
    pub fn new(plane: MovementPlane) -> Self {
        Self::with_solver(plane, SamplingSolver::default())
    }
}

impl<S: AvoidanceSolver> AvoidanceSimulation<S> {
    pub fn with_solver(plane: MovementPlane, solver: S) -> Self {
        Self {
            plane,
            solver,
            slots:  Vec::new(),
            free:   Vec::new(),
            solves: 0,
        }
    }

    pub fn plane(&self) -> &MovementPlane {
        &self.plane
    }

    /// Number of completed solves.
    pub fn solve_count(&self) -> u64 {
        self.solves
    }

    /// Number of registered slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Registration ──────────────────────────────────────────────────────

    pub fn register(&mut self, settings: AvoidanceSettings) -> SlotHandle {
        let fresh = |generation| Slot {
            generation,
            alive:  true,
            settings,
            input:  AgentInput::default(),
            output: AgentOutput::default(),
        };
        match self.free.pop() {
            Some(index) => {
                let generation = self.slots[index as usize].generation;
                self.slots[index as usize] = fresh(generation);
                SlotHandle::new(index, generation)
            }
            None => {
                self.slots.push(fresh(0));
                SlotHandle::new((self.slots.len() - 1) as u32, 0)
            }
        }
    }

    pub fn unregister(&mut self, handle: SlotHandle) -> NavResult<()> {
        let slot = self.slot_mut(handle)?;
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Ok(())
    }

    #[inline]
    pub fn is_registered(&self, handle: SlotHandle) -> bool {
        self.slot(handle).is_ok()
    }

    pub fn settings(&self, handle: SlotHandle) -> NavResult<&AvoidanceSettings> {
        Ok(&self.slot(handle)?.settings)
    }

    pub fn set_settings(&mut self, handle: SlotHandle, settings: AvoidanceSettings) -> NavResult<()> {
        self.slot_mut(handle)?.settings = settings;
        Ok(())
    }

    fn slot(&self, handle: SlotHandle) -> NavResult<&Slot> {
        self.slots
            .get(handle.index())
            .filter(|s| s.alive && s.generation == handle.generation)
            .ok_or(NavError::InvalidSlot(handle))
    }

    fn slot_mut(&mut self, handle: SlotHandle) -> NavResult<&mut Slot> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.alive && s.generation == handle.generation)
            .ok_or(NavError::InvalidSlot(handle))
    }

    // ── Per-sub-step exchange ─────────────────────────────────────────────

    /// Record this sub-step's input.  Takes effect at the next solve.
    pub fn submit(&mut self, handle: SlotHandle, input: AgentInput) -> NavResult<()> {
        self.slot_mut(handle)?.input = input;
        Ok(())
    }

    /// The last solve's answer for this slot.
    pub fn read(&self, handle: SlotHandle) -> NavResult<AgentOutput> {
        Ok(self.slot(handle)?.output)
    }

    /// Solve every active slot at once.
    pub fn solve(&mut self) {
        let plane = self.plane;
        let active: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive && s.input.active)
            .map(|(i, _)| i)
            .collect();

        let agents: Vec<SolverAgent> = active
            .iter()
            .map(|&i| {
                let s = &self.slots[i];
                SolverAgent {
                    position:     plane.to_plane(s.input.position),
                    velocity:     plane.to_plane(s.output.velocity),
                    desired:      plane.to_plane(s.input.desired_velocity),
                    radius:       s.input.radius,
                    max_speed:    s.input.max_speed,
                    time_horizon: s.settings.time_horizon,
                    priority:     s.settings.priority,
                    locked:       s.settings.locked,
                }
            })
            .collect();

        let index: RTree<IndexPoint> = RTree::bulk_load(
            agents
                .iter()
                .enumerate()
                .map(|(k, a)| GeomWithData::new(a.position.to_array(), k))
                .collect(),
        );
        let max_radius = agents.iter().map(|a| a.radius).fold(0.0, f32::max);

        let neighbours: Vec<Vec<usize>> = agents
            .iter()
            .enumerate()
            .zip(active.iter())
            .map(|((k, a), &slot)| {
                let range = a.max_speed * a.time_horizon + a.radius + max_radius;
                index
                    .nearest_neighbor_iter_with_distance_2(&a.position.to_array())
                    .take_while(|(_, d2)| *d2 <= range * range)
                    .map(|(p, _)| p.data)
                    .filter(|&j| j != k)
                    .take(self.slots[slot].settings.max_neighbours)
                    .collect()
            })
            .collect();

        let mut velocities = vec![Vec2::ZERO; agents.len()];
        self.solver.solve(&agents, &neighbours, &mut velocities);

        let reached: Vec<bool> = (0..agents.len())
            .map(|k| {
                let end = plane.to_plane(self.slots[active[k]].input.end_of_path);
                reached_end(&agents, &neighbours[k], k, end)
            })
            .collect();

        for (k, &i) in active.iter().enumerate() {
            let slot = &mut self.slots[i];
            slot.output = AgentOutput {
                velocity:    plane.to_world(velocities[k], 0.0),
                reached_end: reached[k],
                end_of_path: slot.input.end_of_path,
            };
        }
        for slot in self.slots.iter_mut().filter(|s| s.alive && !s.input.active) {
            slot.output = AgentOutput {
                velocity:    slot.input.desired_velocity,
                reached_end: false,
                end_of_path: slot.input.end_of_path,
            };
        }

        self.solves += 1;
        trace!(active = agents.len(), solve = self.solves, "avoidance solved");
    }
}

/// At the end, or blocked short of it by slow neighbours that are closer
/// to it.  The more agents crowd the end, the farther out the agent may
/// stop.
fn reached_end(agents: &[SolverAgent], neighbours: &[usize], k: usize, end: Vec2) -> bool {
    let me = &agents[k];
    let d = me.position.distance(end);
    if d <= me.radius {
        return true;
    }

    let ahead: Vec<&SolverAgent> = neighbours
        .iter()
        .map(|&j| &agents[j])
        .filter(|o| o.position.distance(end) < d)
        .collect();

    let blocked = ahead.iter().any(|o| {
        o.position.distance(me.position) <= me.radius + o.radius + CONTACT_MARGIN
            && o.velocity.length() <= SLOW_FRACTION * me.max_speed.max(1e-3)
    });
    blocked && d <= 2.0 * me.radius * (ahead.len() + 1) as f32
}
