//! Facade re-exports for strata-graph

pub use crate::api::error::*;
pub use crate::api::input::{check_one, Input};
pub use crate::api::types::*;
pub use crate::core::graph::{Graph, Node, NodeId, NodeSpec};
pub use crate::core::init::InitFn;
pub use crate::core::kernels::Conv2dParams;
pub use crate::core::ops::{conv2d, dropout, rectify, sigmoid, tanh};
pub use crate::core::tensor::{Storage, Tensor};
