//! `nav-agent` — per-agent navigation state and the movement pipeline.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                        |
//! |-----------------|-----------------------------------------------------------------|
//! | [`settings`]    | `MovementSettings`, `CrowdedEndTolerance`                       |
//! | [`destination`] | `Destination`, `DestinationController`                          |
//! | [`repath`]      | `AutoRepathMode`, `Backoff`, `AutoRepathPolicy`                 |
//! | [`traversal`]   | `OffMeshLinkTraversal` state machine, `LinkHandler`, registry   |
//! | [`avoidance`]   | `LocalAvoidanceAdapter`, crowded-end check                      |
//! | [`controller`]  | `steer`, `MovementController`, control stage value types        |
//! | [`hooks`]       | `MovementHooks` override points, `NoopHooks`                    |
//! | [`event`]       | `NavEvent`                                                      |
//! | [`agent`]       | `Agent`, `AgentBuilder`, `StepContext`                          |
//! | [`arena`]       | `AgentArena` (generational handles)                             |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                        |
//! |------------|---------------------------------------------------------------|
//! | `parallel` | `AgentArena::map_collect` runs on Rayon's thread pool.        |
//! | `serde`    | Derives `Serialize`/`Deserialize` on settings and modes.      |

pub mod agent;
pub mod arena;
pub mod avoidance;
pub mod controller;
pub mod destination;
pub mod event;
pub mod hooks;
pub mod repath;
pub mod settings;
pub mod traversal;

#[cfg(test)]
mod tests;

pub use agent::{Agent, AgentBuilder, PlanRequest, Produced, StepContext};
pub use arena::AgentArena;
pub use avoidance::LocalAvoidanceAdapter;
pub use controller::{ControlInput, MovementController, ResolvedMovement, Steering};
pub use destination::{Destination, DestinationController};
pub use event::NavEvent;
pub use hooks::{MovementHooks, NoopHooks};
pub use repath::{AutoRepathMode, AutoRepathPolicy, Backoff};
pub use settings::{CrowdedEndTolerance, MovementSettings};
pub use traversal::{
    AbortReason, LinearLinkHandler, LinkHandler, LinkHandlers, LinkPose, LinkStep, LinkTraversalContext,
    OffMeshLinkTraversal, ParkedPath, TraversalPhase,
};
