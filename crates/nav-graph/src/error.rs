//! Graph-subsystem error type.

use glam::Vec3;
use thiserror::Error;

use nav_core::{LinkId, NavError, NodeId};

/// Errors produced by `nav-graph`.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("no walkable node within reach of {0}")]
    NoNearbyNode(Vec3),

    #[error("off-mesh link {0} endpoint is not on the mesh")]
    UnsnappedLink(LinkId),

    #[error("triangle references vertex {0} which was never added")]
    BadVertex(u32),

    #[error(transparent)]
    Nav(#[from] NavError),
}

pub type GraphResult<T> = Result<T, GraphError>;
