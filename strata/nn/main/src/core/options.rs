//! Construction options and the helpers that apply them.

use crate::api::capability::Capability;
use crate::api::error::{LayerError, LayerResult};
use crate::api::traits::{Layer, Term};
use crate::api::types::ActivationFunction;
use std::fmt;

type OptFn = dyn Fn(&mut dyn Layer) -> LayerResult<()>;

/// A construction option: one setting applied to a layer, failing when the
/// layer lacks the capability the setting needs.
pub struct ConsOpt {
    name: &'static str,
    apply: Box<OptFn>,
}

impl ConsOpt {
    pub fn new(name: &'static str, apply: impl Fn(&mut dyn Layer) -> LayerResult<()> + 'static) -> Self {
        Self {
            name,
            apply: Box::new(apply),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, layer: &mut dyn Layer) -> LayerResult<()> {
        (self.apply)(layer)
    }
}

impl fmt::Debug for ConsOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsOpt({})", self.name)
    }
}

fn unsupported(option: &'static str, capability: Capability, layer: &'static str) -> LayerError {
    LayerError::Unsupported {
        option,
        capability,
        layer,
    }
}

pub fn with_name(name: impl Into<String>) -> ConsOpt {
    let name = name.into();
    ConsOpt::new("with_name", move |l| {
        let kind = l.kind();
        l.as_name_setter()
            .ok_or_else(|| unsupported("with_name", Capability::Name, kind))?
            .set_name(&name)
    })
}

/// Sets the layer size. For a convolution: `(output channels, input channels)`.
pub fn with_size(size: &[usize]) -> ConsOpt {
    let size = size.to_vec();
    ConsOpt::new("with_size", move |l| {
        let kind = l.kind();
        l.as_size_setter()
            .ok_or_else(|| unsupported("with_size", Capability::Size, kind))?
            .set_size(&size)
    })
}

pub fn with_activation(act: ActivationFunction) -> ConsOpt {
    ConsOpt::new("with_activation", move |l| {
        let kind = l.kind();
        l.as_activation_setter()
            .ok_or_else(|| unsupported("with_activation", Capability::Activation, kind))?
            .set_activation(Some(act))
    })
}

/// Removes the activation so the layer output is the raw pre-activation.
pub fn without_activation() -> ConsOpt {
    ConsOpt::new("without_activation", |l| {
        let kind = l.kind();
        l.as_activation_setter()
            .ok_or_else(|| unsupported("without_activation", Capability::Activation, kind))?
            .set_activation(None)
    })
}

pub fn with_dropout(prob: f64) -> ConsOpt {
    ConsOpt::new("with_dropout", move |l| {
        let kind = l.kind();
        l.as_dropout_configer()
            .ok_or_else(|| unsupported("with_dropout", Capability::Dropout, kind))?
            .set_dropout(prob)
    })
}

pub fn with_kernel_shape(height: usize, width: usize) -> ConsOpt {
    ConsOpt::new("with_kernel_shape", move |l| {
        let kind = l.kind();
        l.as_conv_configer()
            .ok_or_else(|| unsupported("with_kernel_shape", Capability::ConvGeometry, kind))?
            .set_kernel_shape((height, width))
    })
}

pub fn with_pad(height: usize, width: usize) -> ConsOpt {
    ConsOpt::new("with_pad", move |l| {
        let kind = l.kind();
        l.as_conv_configer()
            .ok_or_else(|| unsupported("with_pad", Capability::ConvGeometry, kind))?
            .set_pad((height, width))
    })
}

pub fn with_stride(height: usize, width: usize) -> ConsOpt {
    ConsOpt::new("with_stride", move |l| {
        let kind = l.kind();
        l.as_conv_configer()
            .ok_or_else(|| unsupported("with_stride", Capability::ConvGeometry, kind))?
            .set_stride((height, width))
    })
}

pub fn with_dilation(height: usize, width: usize) -> ConsOpt {
    ConsOpt::new("with_dilation", move |l| {
        let kind = l.kind();
        l.as_conv_configer()
            .ok_or_else(|| unsupported("with_dilation", Capability::ConvGeometry, kind))?
            .set_dilation((height, width))
    })
}

/// Makes every forward pass record a FLOPs estimate.
pub fn with_flops() -> ConsOpt {
    ConsOpt::new("with_flops", |l| {
        let kind = l.kind();
        l.as_flops_counter()
            .ok_or_else(|| unsupported("with_flops", Capability::Flops, kind))?
            .set_compute_flops(true)
    })
}

/// Applies `opts` to an existing layer in order.
///
/// Stops at the first failing option and returns its error; the options
/// before it stay applied.
pub fn redefine(layer: &mut dyn Layer, opts: impl IntoIterator<Item = ConsOpt>) -> LayerResult<()> {
    for opt in opts {
        opt.apply(layer)?;
    }
    Ok(())
}

/// Applies one term to another.
pub fn apply(_a: &dyn Term, _b: &dyn Term) -> LayerResult<Box<dyn Term>> {
    Err(LayerError::Unimplemented("apply"))
}
