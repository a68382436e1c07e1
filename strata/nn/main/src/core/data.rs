//! Serializable convolution description.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::error::{LayerError, LayerResult};
use crate::api::traits::{Data, Layer};
use crate::api::types::{Activation, Precision};
use crate::core::conv::Conv;
use crate::core::options::*;
use strata_graph::Graph;

/// Everything needed to rebuild a [`Conv`] layer.
///
/// Missing fields take the same defaults as [`Conv::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvData {
    /// `(output channels, input channels)`. Empty leaves the layer to be
    /// sized by whoever builds it.
    pub size: Vec<usize>,
    pub kernel_shape: (usize, usize),
    pub pad: (usize, usize),
    pub stride: (usize, usize),
    pub dilation: (usize, usize),
    pub dropout: Option<f64>,
    pub activation: Activation,
    pub precision: Precision,
    pub compute_flops: bool,
}

impl Default for ConvData {
    fn default() -> Self {
        Self {
            size: Vec::new(),
            kernel_shape: (5, 5),
            pad: (1, 1),
            stride: (1, 1),
            dilation: (1, 1),
            dropout: None,
            activation: Activation::Rectify,
            precision: Precision::Float32,
            compute_flops: false,
        }
    }
}

impl ConvData {
    pub fn from_json_str(s: &str) -> LayerResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> LayerResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json(&self) -> LayerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Construction options equivalent to this description.
    pub fn options(&self, name: &str) -> Vec<ConsOpt> {
        let mut opts = vec![
            with_name(name),
            with_kernel_shape(self.kernel_shape.0, self.kernel_shape.1),
            with_pad(self.pad.0, self.pad.1),
            with_stride(self.stride.0, self.stride.1),
            with_dilation(self.dilation.0, self.dilation.1),
        ];
        if !self.size.is_empty() {
            opts.push(with_size(&self.size));
        }
        opts.push(match self.activation.function() {
            Some(act) => with_activation(act),
            None => without_activation(),
        });
        if let Some(p) = self.dropout {
            opts.push(with_dropout(p));
        }
        if self.compute_flops {
            opts.push(with_flops());
        }
        opts
    }

    /// Builds the configured layer without binding it to a graph.
    pub fn build(&self, name: &str) -> LayerResult<Conv> {
        Conv::new(self.options(name))
    }
}

impl Data for ConvData {
    /// Builds the layer and, when the size is known, creates its weight on
    /// `g` with the described precision. Unsized layers initialize on their
    /// first forward pass instead.
    fn make(&self, g: &Graph, name: &str) -> LayerResult<Box<dyn Layer>> {
        if name.is_empty() {
            return Err(LayerError::InvalidConfig("layer name must not be empty".into()));
        }
        let mut l = self.build(name)?;
        if !self.size.is_empty() {
            l.init_on(g, self.precision.into())?;
        }
        Ok(Box::new(l))
    }
}
