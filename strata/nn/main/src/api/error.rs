//! Error types for layer construction and forward passes

use crate::api::capability::Capability;
use strata_graph::{GraphError, Shape};
use thiserror::Error;

/// Result type for layer operations
pub type LayerResult<T> = Result<T, LayerError>;

/// Errors that can occur while building, initializing or running a layer
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("{layer} expects a node as input: {source}")]
    MissingInput {
        layer: &'static str,
        #[source]
        source: GraphError,
    },

    #[error("{layer} expects a 4-D (batch, channel, height, width) input, got shape {shape}")]
    InvalidInput { layer: &'static str, shape: Shape },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{option} needs the {capability} capability, which {layer} does not support")]
    Unsupported {
        option: &'static str,
        capability: Capability,
        layer: &'static str,
    },

    #[error("{layer} {name:?} has not been initialized")]
    NotInitialized { layer: &'static str, name: String },

    #[error("{layer} {name:?} is already initialized")]
    AlreadyInitialized { layer: &'static str, name: String },

    #[error("{layer} {name:?}: initializing weights: {source}")]
    Init {
        layer: &'static str,
        name: String,
        #[source]
        source: GraphError,
    },

    #[error("{layer} {name:?}: initializing a previously uninitialized layer: {source}")]
    Initializing {
        layer: &'static str,
        name: String,
        #[source]
        source: Box<LayerError>,
    },

    #[error("{layer} {name:?}: {stage}: {source}")]
    Forward {
        layer: &'static str,
        name: String,
        stage: String,
        #[source]
        source: GraphError,
    },

    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
