//! Setter capabilities that construction options require of a layer.
//!
//! A layer advertises a capability by returning `Some(self)` from the matching
//! `Layer::as_*` accessor. Options that find `None` fail with
//! [`LayerError::Unsupported`](crate::LayerError::Unsupported).

use crate::api::error::LayerResult;
use crate::api::types::ActivationFunction;
use std::fmt;

/// Names a capability in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Name,
    Size,
    Activation,
    Dropout,
    ConvGeometry,
    Flops,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::Name => "name",
            Capability::Size => "size",
            Capability::Activation => "activation",
            Capability::Dropout => "dropout",
            Capability::ConvGeometry => "convolution geometry",
            Capability::Flops => "FLOPs counting",
        };
        write!(f, "{}", s)
    }
}

pub trait NameSetter {
    fn set_name(&mut self, name: &str) -> LayerResult<()>;
}

pub trait SizeSetter {
    fn set_size(&mut self, size: &[usize]) -> LayerResult<()>;
}

pub trait ActivationSetter {
    /// `None` removes the activation.
    fn set_activation(&mut self, act: Option<ActivationFunction>) -> LayerResult<()>;
}

pub trait DropoutConfiger {
    fn set_dropout(&mut self, prob: f64) -> LayerResult<()>;
}

/// Kernel, padding, stride and dilation as `(height, width)` pairs.
pub trait ConvConfiger {
    fn set_kernel_shape(&mut self, kernel: (usize, usize)) -> LayerResult<()>;
    fn set_pad(&mut self, pad: (usize, usize)) -> LayerResult<()>;
    fn set_stride(&mut self, stride: (usize, usize)) -> LayerResult<()>;
    fn set_dilation(&mut self, dilation: (usize, usize)) -> LayerResult<()>;
}

pub trait FlopsCounter {
    fn set_compute_flops(&mut self, enabled: bool) -> LayerResult<()>;

    /// Estimate from the most recent forward pass, 0 before one ran.
    fn flops(&self) -> usize;
}
