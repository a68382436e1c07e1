//! # Strata Neural Network
//!
//! Layers built on the strata expression graph.
//!
//! A layer is configured with a list of construction options, each of which
//! needs a capability the layer may or may not support. Parameters are
//! created lazily: the first forward pass binds the weights to the input's
//! graph and dtype, and every later pass reuses them.
//!
//! ## Example
//!
//! ```rust
//! use strata_graph::{DType, Graph};
//! use strata_nn::{with_kernel_shape, with_name, with_size, Conv, Layer};
//!
//! let g = Graph::with_seed(7);
//! let x = g.placeholder(DType::F32, [1, 3, 32, 32], "x");
//! let mut conv = Conv::new(vec![with_name("c1"), with_size(&[6, 3]), with_kernel_shape(5, 5)]).unwrap();
//! let y = conv.fwd(&x).unwrap();
//! assert_eq!(y.shape().dims(), &[1, 6, 30, 30]);
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
