//! Avoidance solver trait and a reference velocity-sampling solver.
//!
//! # Pluggability
//!
//! [`AvoidanceSimulation`](crate::AvoidanceSimulation) owns the slots and
//! the neighbour search; the velocity math sits behind [`AvoidanceSolver`]
//! so an ORCA or force-based solver can replace [`SamplingSolver`] without
//! touching the agents.

use glam::Vec2;

/// One active agent as the solver sees it, in plane space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolverAgent {
    pub position:     Vec2,
    /// Velocity the agent is moving at now (the previous solve's answer).
    pub velocity:     Vec2,
    pub desired:      Vec2,
    pub radius:       f32,
    pub max_speed:    f32,
    pub time_horizon: f32,
    pub priority:     f32,
    pub locked:       bool,
}

/// Pluggable avoidance math.
///
/// `neighbours[i]` lists indices into `agents` near agent `i`, nearest
/// first.  Implementations write one velocity per agent into `out`, which
/// has the same length as `agents`.
pub trait AvoidanceSolver: Send + Sync {
    fn solve(&self, agents: &[SolverAgent], neighbours: &[Vec<usize>], out: &mut [Vec2]);
}

// ── SamplingSolver ────────────────────────────────────────────────────────────

/// Scores a fixed fan of candidate velocities around the desired one and
/// keeps the cheapest.
///
/// Cost = `preference_weight · |candidate − desired|`
///      + `collision_weight / time_to_collision` (within the time horizon).
///
/// Responsibility is shared reciprocally: against a neighbour of equal
/// priority each agent takes half of the avoidance, against a locked one it
/// takes all of it.  Candidate order is fixed, so the result is
/// deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingSolver {
    /// Speed rings between 0 and `max_speed`.
    pub rings:             u32,
    /// Directions per ring.
    pub samples_per_ring:  u32,
    pub preference_weight: f32,
    pub collision_weight:  f32,
}

impl Default for SamplingSolver {
    fn default() -> Self {
        Self {
            rings:             3,
            samples_per_ring:  16,
            preference_weight: 1.0,
            collision_weight:  2.0,
        }
    }
}

/// Lower bound on responsibility so the reciprocal test velocity stays finite.
const MIN_SHARE: f32 = 0.1;

impl SamplingSolver {
    fn candidates(&self, agent: &SolverAgent) -> impl Iterator<Item = Vec2> + '_ {
        let heading = if agent.desired.length_squared() > 1e-12 {
            agent.desired.y.atan2(agent.desired.x)
        } else {
            0.0
        };
        let rings   = self.rings.max(1);
        let per     = self.samples_per_ring.max(1);
        let speed   = agent.max_speed;
        let fan = (1..=rings).flat_map(move |ring| {
            let r = speed * ring as f32 / rings as f32;
            (0..per).map(move |k| {
                let a = heading + std::f32::consts::TAU * k as f32 / per as f32;
                Vec2::new(a.cos(), a.sin()) * r
            })
        });
        std::iter::once(agent.desired).chain(std::iter::once(Vec2::ZERO)).chain(fan)
    }

    fn cost(&self, agents: &[SolverAgent], i: usize, neighbours: &[usize], candidate: Vec2) -> f32 {
        let me = &agents[i];
        let mut cost = self.preference_weight * candidate.distance(me.desired);

        for &j in neighbours {
            let other = &agents[j];
            let share = if other.locked {
                1.0
            } else {
                let total = me.priority + other.priority;
                if total > 0.0 { other.priority / total } else { 0.5 }
            }
            .clamp(MIN_SHARE, 1.0);

            // Reciprocal test velocity: with share ½ this is 2·v' − v.
            let test = candidate + (candidate - me.velocity) * ((1.0 - share) / share);
            let rel_vel = test - other.velocity;
            let rel_pos = other.position - me.position;
            let reach   = me.radius + other.radius;

            if let Some(t) = time_to_collision(rel_pos, rel_vel, reach) {
                if t <= me.time_horizon {
                    cost += self.collision_weight / t.max(1e-3);
                }
            }
        }
        cost
    }
}

impl AvoidanceSolver for SamplingSolver {
    fn solve(&self, agents: &[SolverAgent], neighbours: &[Vec<usize>], out: &mut [Vec2]) {
        for (i, agent) in agents.iter().enumerate() {
            if agent.locked || neighbours[i].is_empty() {
                out[i] = agent.desired;
                continue;
            }
            let mut best      = agent.desired;
            let mut best_cost = f32::INFINITY;
            for candidate in self.candidates(agent) {
                let c = self.cost(agents, i, &neighbours[i], candidate);
                if c < best_cost {
                    best      = candidate;
                    best_cost = c;
                }
            }
            out[i] = best;
        }
    }
}

/// Earliest `t >= 0` at which a disc moving with `rel_vel` from the origin
/// comes within `reach` of `rel_pos`.  Already overlapping counts as `0`
/// unless the motion separates the two.
pub fn time_to_collision(rel_pos: Vec2, rel_vel: Vec2, reach: f32) -> Option<f32> {
    let c = rel_pos.length_squared() - reach * reach;
    if c < 0.0 {
        // Overlapping: only moving closer is a collision.
        return (rel_vel.dot(rel_pos) > 0.0).then_some(0.0);
    }
    let a = rel_vel.length_squared();
    if a < 1e-12 {
        return None;
    }
    let b = rel_vel.dot(rel_pos);
    let disc = b * b - a * c;
    if b <= 0.0 || disc < 0.0 {
        return None;
    }
    Some((b - disc.sqrt()) / a)
}
