//! # Strata Graph
//!
//! Expression graph underpinning strata layers.
//!
//! Nodes are appended to a shared [`Graph`] by primitive operations
//! (`conv2d`, `rectify`, `dropout`, ...) that check shapes and dtypes at
//! construction time. Values are computed on demand with [`Node::eval`] once
//! every placeholder the node depends on is bound.
//!
//! ## Example
//!
//! ```rust
//! use strata_graph::{conv2d, rectify, Conv2dParams, DType, Graph, InitFn, NodeSpec};
//!
//! let g = Graph::with_seed(0);
//! let x = g.placeholder(DType::F32, [1, 3, 8, 8], "x");
//! let w = g
//!     .new_tensor(DType::F32, 4, NodeSpec::new([4, 3, 3, 3]).with_init(InitFn::GlorotN(1.0)))
//!     .unwrap();
//! let params = Conv2dParams { kernel: (3, 3), pad: (1, 1), stride: (1, 1), dilation: (1, 1) };
//! let y = rectify(&conv2d(&x, &w, params).unwrap()).unwrap();
//! assert_eq!(y.shape().dims(), &[1, 4, 8, 8]);
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
