//! Per-slot configuration and the values exchanged each sub-step.

use glam::Vec3;

/// How one agent takes part in avoidance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AvoidanceSettings {
    /// Seconds ahead that collisions are looked for.
    pub time_horizon: f32,

    /// Only this many nearest agents are considered.
    pub max_neighbours: usize,

    /// In `[0, 1]`.  Of two agents about to collide, the lower-priority one
    /// does more of the yielding.
    pub priority: f32,

    /// Locked agents keep their desired velocity; everyone else steers
    /// around them.
    pub locked: bool,
}

impl Default for AvoidanceSettings {
    fn default() -> Self {
        Self {
            time_horizon:   2.0,
            max_neighbours: 10,
            priority:       0.5,
            locked:         false,
        }
    }
}

/// What an agent submits before the solve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AgentInput {
    pub position:         Vec3,
    pub radius:           f32,
    pub desired_velocity: Vec3,
    pub max_speed:        f32,
    /// Where the agent's current path ends.
    pub end_of_path:      Vec3,
    /// Inactive slots are skipped by the solve and invisible to neighbours.
    pub active:           bool,
}

impl Default for AgentInput {
    fn default() -> Self {
        Self {
            position:         Vec3::ZERO,
            radius:           0.5,
            desired_velocity: Vec3::ZERO,
            max_speed:        0.0,
            end_of_path:      Vec3::ZERO,
            active:           false,
        }
    }
}

/// What an agent reads back after the solve.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AgentOutput {
    /// Velocity to use instead of the desired one.
    pub velocity: Vec3,

    /// The agent is at its end of path, or as close as the crowd around it
    /// allows.
    pub reached_end: bool,

    /// The end of path the flag above was computed against.
    pub end_of_path: Vec3,
}
