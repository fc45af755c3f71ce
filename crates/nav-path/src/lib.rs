//! `nav-path` — per-agent paths that survive small perturbations.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                          |
//! |------------|-------------------------------------------------------------------|
//! | [`part`]   | `PathPart`, `RepairQuality`, `RepairLimits`, `RepairOutcome`      |
//! | [`tracer`] | `PathTracer` — path state, local repair, corner extraction        |
//! | [`funnel`] | string pulling over a node corridor                               |
//! | [`error`]  | `PathError`, `PathResult<T>`                                      |
//!
//! # Repair model
//!
//! Agents drift and destinations move every tick.  Instead of re-planning,
//! the tracer first tries to *slide* the affected end within its current
//! part (free, no topology change), then runs a breadth-first search bounded
//! by [`RepairLimits`] to splice a short chain of nodes back onto the path.
//! If both fail the old topology is kept and the path is flagged stale, so
//! the owner can ask for a full re-plan.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on parts and limits.        |

pub mod error;
pub mod funnel;
pub mod part;
pub mod tracer;


pub use error::{PathError, PathResult};
pub use part::{CornerBoundary, PathPart, RepairLimits, RepairOutcome, RepairQuality};
pub use tracer::PathTracer;
