//! Types for layer configuration

use serde::{Deserialize, Serialize};
use strata_graph::{DType, GraphResult, Node};

/// Maps one graph node to another, possibly failing.
pub type ActivationFunction = fn(&Node) -> GraphResult<Node>;

/// Activation selectable by name in layer descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Rectify,
    Sigmoid,
    Tanh,
    None,
}

impl Activation {
    pub fn function(&self) -> Option<ActivationFunction> {
        match self {
            Activation::Rectify => Some(strata_graph::rectify),
            Activation::Sigmoid => Some(strata_graph::sigmoid),
            Activation::Tanh => Some(strata_graph::tanh),
            Activation::None => None,
        }
    }
}

/// Element type selectable by name in layer descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    Float32,
    Float64,
}

impl From<Precision> for DType {
    fn from(p: Precision) -> Self {
        match p {
            Precision::Float32 => DType::F32,
            Precision::Float64 => DType::F64,
        }
    }
}
