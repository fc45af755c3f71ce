//! `nav-avoidance` — the shared local-avoidance phase.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                        |
//! |----------------|-----------------------------------------------------------------|
//! | [`settings`]   | `AvoidanceSettings`, `AgentInput`, `AgentOutput`                |
//! | [`simulation`] | `AvoidanceSimulation` — slot registry, neighbour index, solve   |
//! | [`solver`]     | `AvoidanceSolver` trait, `SolverAgent`, `SamplingSolver`        |
//!
//! # Tick protocol
//!
//! The simulation is owned outside the agents and solved once per sub-step:
//!
//! 1. every participating agent calls [`AvoidanceSimulation::submit`];
//! 2. the scheduler calls [`AvoidanceSimulation::solve`] exactly once;
//! 3. every agent calls [`AvoidanceSimulation::read`].
//!
//! Reads between a submit and the next solve return the previous solve's
//! answer, never a half-updated one.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `AvoidanceSettings`.     |

pub mod settings;
pub mod simulation;
pub mod solver;

#[cfg(test)]
mod tests;

pub use settings::{AgentInput, AgentOutput, AvoidanceSettings};
pub use simulation::AvoidanceSimulation;
pub use solver::{AvoidanceSolver, SamplingSolver, SolverAgent};
