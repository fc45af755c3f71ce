use thiserror::Error;

use nav_core::NavError;
use nav_graph::GraphError;
use nav_path::PathError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Nav(#[from] NavError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("path rejected: {0}")]
    Path(#[from] PathError),

    #[cfg(feature = "toml")]
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type SimResult<T> = Result<T, SimError>;
