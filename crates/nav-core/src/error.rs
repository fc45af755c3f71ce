//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `NavError` as one variant
//! where a call can fail for both local and framework reasons.

use thiserror::Error;

use crate::{AgentHandle, LinkId, NodeId, SlotHandle};

/// The top-level error type for `nav-core` and a common base for sub-crates.
///
/// Every variant signals a programming error on the caller's side (using a
/// handle after despawn, naming a node that was never built).  Runtime
/// degradation such as "no path" is reported through state, not errors.
#[derive(Debug, Error, PartialEq)]
pub enum NavError {
    #[error("agent handle {0} is not live (never spawned or already despawned)")]
    InvalidHandle(AgentHandle),

    #[error("avoidance slot {0} is not registered")]
    InvalidSlot(SlotHandle),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("off-mesh link {0} not found")]
    LinkNotFound(LinkId),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for all `nav-*` crates.
pub type NavResult<T> = Result<T, NavError>;
