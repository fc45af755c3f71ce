//! `nav-core` — foundational types for the navigation core.
//!
//! This crate is a dependency of every other `nav-*` crate.  It intentionally
//! has no `nav-*` dependencies and minimal external ones (`glam`, `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`ids`]         | `AgentHandle`, `SlotHandle`, `NodeId`, `LinkId`, `RequestId` |
//! | [`plane`]       | `MovementPlane` — shared 2D/3D "up" math                  |
//! | [`shape`]       | `AgentShape` (radius, height)                             |
//! | [`time`]        | `SimClock`, sub-step planning                             |
//! | [`rng`]         | `AgentRng` (per-agent, deterministic)                     |
//! | [`error`]       | `NavError`, `NavResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod ids;
pub mod plane;
pub mod rng;
pub mod shape;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{NavError, NavResult};
pub use ids::{AgentHandle, LinkId, NodeId, RequestId, SlotHandle};
pub use plane::MovementPlane;
pub use rng::AgentRng;
pub use shape::AgentShape;
pub use time::{SimClock, SubSteps};

/// Re-exported so downstream crates name the same vector types.
pub use glam::{Quat, Vec2, Vec3};
