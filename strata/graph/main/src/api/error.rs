//! Error types for graph construction and evaluation

use crate::api::types::{DType, Shape};
use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while adding nodes to a graph or computing their values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    #[error("Rank mismatch in {op}: expected {expected} dims, got shape {got}")]
    RankMismatch {
        op: &'static str,
        expected: usize,
        got: Shape,
    },

    #[error("DType mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("Nodes belong to different graphs")]
    GraphMismatch,

    #[error("Input does not carry a node")]
    MissingNode,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Node {0} has no value bound")]
    Unbound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot allocate {bytes} bytes for a {dtype} tensor of shape {shape}")]
    Allocation {
        shape: Shape,
        dtype: DType,
        bytes: usize,
    },
}
