use nav_core::{LinkId, NodeId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    #[error("path has no nodes")]
    Empty,

    #[error("path must start and end on a node")]
    DanglingLink,

    #[error("off-mesh link {0} is not between its entry and exit nodes")]
    LinkOutOfPlace(LinkId),

    #[error("path uses destroyed node {0}")]
    DeadNode(NodeId),

    #[error("path uses destroyed off-mesh link {0}")]
    DeadLink(LinkId),
}

pub type PathResult<T> = Result<T, PathError>;
