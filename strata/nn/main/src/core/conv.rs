//! 2-D convolution layer with lazily created weights.

use crate::api::capability::{
    ActivationSetter, ConvConfiger, DropoutConfiger, FlopsCounter, NameSetter, SizeSetter,
};
use crate::api::error::{LayerError, LayerResult};
use crate::api::traits::{Grapher, Layer, Term};
use crate::api::types::ActivationFunction;
use crate::core::options::ConsOpt;
use strata_graph::{
    check_one, conv2d, dropout, Conv2dParams, DType, Graph, GraphError, InitFn, Input, Node,
    NodeSpec, Shape, Type,
};
use std::fmt;

const KIND: &str = "Conv";

/// Where a layer is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerState {
    /// Options applied, no parameters bound to a graph yet.
    Configured,
    /// Weight created on a graph; the layer is ready for forward passes.
    Initialized(Node),
}

/// A convolution layer.
///
/// The weight `(out_channels, in_channels, kh, kw)` is created on the first
/// forward pass (or an explicit [`Conv::init`]) on the graph and with the
/// dtype of that input, then reused by every later pass.
pub struct Conv {
    name: String,
    size: Vec<usize>,

    kernel_shape: (usize, usize),
    pad: (usize, usize),
    stride: (usize, usize),
    dilation: (usize, usize),

    // optional config
    dropout: Option<f64>,
    act: Option<ActivationFunction>,

    state: LayerState,
    compute_flops: bool,
    flops: usize,
}

impl Conv {
    /// Builds an uninitialized layer.
    ///
    /// Defaults: activation `rectify`, kernel (5,5), pad (1,1), stride (1,1),
    /// dilation (1,1), no dropout.
    pub fn new(opts: impl IntoIterator<Item = ConsOpt>) -> LayerResult<Self> {
        let mut l = Conv {
            name: String::new(),
            size: Vec::new(),
            kernel_shape: (5, 5),
            pad: (1, 1),
            stride: (1, 1),
            dilation: (1, 1),
            dropout: None,
            act: Some(strata_graph::rectify),
            state: LayerState::Configured,
            compute_flops: false,
            flops: 0,
        };
        for opt in opts {
            opt.apply(&mut l)?;
        }
        Ok(l)
    }

    /// Builds a layer and initializes it against `input`, which must be a
    /// 4-D `(batch, channel, height, width)` node.
    pub fn construct(input: &dyn Input, opts: impl IntoIterator<Item = ConsOpt>) -> LayerResult<Self> {
        let x = check_one(input).map_err(|source| LayerError::MissingInput { layer: KIND, source })?;
        let shape = x.shape();
        if shape.ndim() != 4 {
            return Err(LayerError::InvalidInput { layer: KIND, shape });
        }

        let mut l = Conv::new(opts)?;
        l.init(x)?;
        Ok(l)
    }

    /// Creates the weight on `x`'s graph with `x`'s dtype.
    pub fn init(&mut self, x: &Node) -> LayerResult<()> {
        self.init_on(&x.graph(), x.dtype())
    }

    /// Creates the weight on `g` with Glorot-normal values.
    pub fn init_on(&mut self, g: &Graph, dtype: DType) -> LayerResult<()> {
        if self.is_ready() {
            return Err(LayerError::AlreadyInitialized {
                layer: KIND,
                name: self.name.clone(),
            });
        }
        let (out_ch, in_ch) = match self.size.as_slice() {
            [out_ch, in_ch] => (*out_ch, *in_ch),
            other => {
                return Err(LayerError::InvalidConfig(format!(
                    "{} {:?} needs size (output channels, input channels), got {:?}",
                    KIND, self.name, other
                )))
            }
        };

        let spec = NodeSpec::new([out_ch, in_ch, self.kernel_shape.0, self.kernel_shape.1])
            .with_name(format!("{}_w", self.name))
            .with_init(InitFn::GlorotN(1.0));
        let w = g.new_tensor(dtype, 4, spec).map_err(|source| LayerError::Init {
            layer: KIND,
            name: self.name.clone(),
            source,
        })?;

        log::debug!("{} {}: initialized weight {} {}", KIND, self.name, w.dtype(), w.shape());
        self.state = LayerState::Initialized(w);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LayerState::Initialized(_))
    }

    pub fn state(&self) -> &LayerState {
        &self.state
    }

    pub fn weight(&self) -> LayerResult<&Node> {
        match &self.state {
            LayerState::Initialized(w) => Ok(w),
            LayerState::Configured => Err(LayerError::NotInitialized {
                layer: KIND,
                name: self.name.clone(),
            }),
        }
    }

    pub fn size(&self) -> &[usize] {
        &self.size
    }

    pub fn kernel_shape(&self) -> (usize, usize) {
        self.kernel_shape
    }

    pub fn pad(&self) -> (usize, usize) {
        self.pad
    }

    pub fn stride(&self) -> (usize, usize) {
        self.stride
    }

    pub fn dilation(&self) -> (usize, usize) {
        self.dilation
    }

    pub fn dropout(&self) -> Option<f64> {
        self.dropout
    }

    pub fn has_activation(&self) -> bool {
        self.act.is_some()
    }

    pub fn params(&self) -> Conv2dParams {
        Conv2dParams {
            kernel: self.kernel_shape,
            pad: self.pad,
            stride: self.stride,
            dilation: self.dilation,
        }
    }

    /// FLOPs estimate for `input` under the current configuration.
    pub fn estimate_flops(&self, input: &Shape) -> LayerResult<usize> {
        let w = self.weight()?;
        conv_flops(&w.shape(), input, self.pad, self.stride, self.act.is_some())
    }

    fn wrap(&self, stage: impl Into<String>, source: GraphError) -> LayerError {
        LayerError::Forward {
            layer: KIND,
            name: self.name.clone(),
            stage: stage.into(),
            source,
        }
    }
}

/// Rough floating point operation count of a convolution.
///
/// With weight `(F, C, Kh, Kw)` and input `(N, C, H, W)`: each output element
/// costs `C*Kh*Kw + 1` operations, there are
/// `((H - Kh + 2*pad_h) / stride_h + 1) * ((W - Kw + 2*pad_w) / stride_w + 1)`
/// elements per filter, and an activation adds one more per element.
pub fn conv_flops(
    weight: &Shape,
    input: &Shape,
    pad: (usize, usize),
    stride: (usize, usize),
    with_activation: bool,
) -> LayerResult<usize> {
    if weight.ndim() != 4 || input.ndim() != 4 {
        return Err(LayerError::InvalidConfig(format!(
            "FLOPs need a 4-D weight and input, got {} and {}",
            weight, input
        )));
    }
    let (filters, channels, kh, kw) = (weight[0], weight[1], weight[2], weight[3]);
    let overflow = || {
        LayerError::InvalidConfig(format!(
            "FLOPs of weight {} over input {} overflow usize",
            weight, input
        ))
    };

    let n = channels
        .checked_mul(kh)
        .and_then(|v| v.checked_mul(kw))
        .ok_or_else(overflow)?;
    let flops_per_instance = n.checked_add(1).ok_or_else(overflow)?;

    let rows = positions(input[2], kh, pad.0, stride.0).ok_or_else(|| bad_fit(weight, input, pad, stride))?;
    let cols = positions(input[3], kw, pad.1, stride.1).ok_or_else(|| bad_fit(weight, input, pad, stride))?;
    let instances_per_filter = rows.checked_mul(cols).ok_or_else(overflow)?;

    let flops_per_filter = instances_per_filter
        .checked_mul(flops_per_instance)
        .ok_or_else(overflow)?;
    let mut total = flops_per_filter.checked_mul(filters).ok_or_else(overflow)?;

    // one multiply and one add per output element
    if with_activation {
        total = filters
            .checked_mul(instances_per_filter)
            .and_then(|act| total.checked_add(act))
            .ok_or_else(overflow)?;
    }
    Ok(total)
}

fn bad_fit(weight: &Shape, input: &Shape, pad: (usize, usize), stride: (usize, usize)) -> LayerError {
    LayerError::InvalidConfig(format!(
        "kernel ({}, {}) with stride {:?} does not fit input {} padded by {:?}",
        weight[2], weight[3], stride, input, pad
    ))
}

/// Window positions along one axis, `None` when the kernel does not fit or
/// the padded size overflows.
fn positions(input: usize, kernel: usize, pad: usize, stride: usize) -> Option<usize> {
    let padded = pad.checked_mul(2)?.checked_add(input)?;
    if stride == 0 || padded < kernel {
        return None;
    }
    Some((padded - kernel) / stride + 1)
}

impl fmt::Debug for Conv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conv")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("kernel_shape", &self.kernel_shape)
            .field("pad", &self.pad)
            .field("stride", &self.stride)
            .field("dilation", &self.dilation)
            .field("dropout", &self.dropout)
            .field("activation", &self.act.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl Term for Conv {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Grapher for Conv {
    fn graph(&self) -> Option<Graph> {
        self.weight().ok().map(|w| w.graph())
    }
}

impl Layer for Conv {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn model(&self) -> Vec<Node> {
        match &self.state {
            LayerState::Initialized(w) => vec![w.clone()],
            LayerState::Configured => vec![],
        }
    }

    fn fwd(&mut self, x: &dyn Input) -> LayerResult<Node> {
        let x = check_one(x).map_err(|e| self.wrap("checking input", e))?.clone();

        if !self.is_ready() {
            log::debug!("{} {}: initializing on first forward pass", KIND, self.name);
            self.init(&x).map_err(|source| LayerError::Initializing {
                layer: KIND,
                name: self.name.clone(),
                source: Box::new(source),
            })?;
        }
        let w = self.weight()?.clone();

        let c = conv2d(&x, &w, self.params())
            .map_err(|e| self.wrap(format!("applying conv2d {} {}", x.shape(), w.shape()), e))?;

        let mut result = match self.act {
            Some(act) => act(&c).map_err(|e| self.wrap("applying activation function", e))?,
            None => c,
        };

        if let Some(prob) = self.dropout {
            result = dropout(&result, prob).map_err(|e| self.wrap("applying dropout", e))?;
        }

        if self.compute_flops {
            self.flops = self.estimate_flops(&x.shape())?;
        }

        log::debug!("{} shape {}: {}", KIND, self.name, result.shape());
        Ok(result)
    }

    fn ty(&self) -> Type {
        Type::fn_of(Type::var('a'), Type::var('b'))
    }

    fn shape(&self) -> LayerResult<Shape> {
        Ok(self.weight()?.shape())
    }

    fn describe(&self) -> LayerResult<()> {
        Err(LayerError::Unimplemented("Conv::describe"))
    }

    fn as_name_setter(&mut self) -> Option<&mut dyn NameSetter> {
        Some(self)
    }

    fn as_size_setter(&mut self) -> Option<&mut dyn SizeSetter> {
        Some(self)
    }

    fn as_activation_setter(&mut self) -> Option<&mut dyn ActivationSetter> {
        Some(self)
    }

    fn as_dropout_configer(&mut self) -> Option<&mut dyn DropoutConfiger> {
        Some(self)
    }

    fn as_conv_configer(&mut self) -> Option<&mut dyn ConvConfiger> {
        Some(self)
    }

    fn as_flops_counter(&mut self) -> Option<&mut dyn FlopsCounter> {
        Some(self)
    }
}

impl NameSetter for Conv {
    fn set_name(&mut self, name: &str) -> LayerResult<()> {
        self.name = name.to_string();
        Ok(())
    }
}

impl SizeSetter for Conv {
    fn set_size(&mut self, size: &[usize]) -> LayerResult<()> {
        if size.len() != 2 || size.contains(&0) {
            return Err(LayerError::InvalidConfig(format!(
                "{} size must be two non-zero channel counts, got {:?}",
                KIND, size
            )));
        }
        self.size = size.to_vec();
        Ok(())
    }
}

impl ActivationSetter for Conv {
    fn set_activation(&mut self, act: Option<ActivationFunction>) -> LayerResult<()> {
        self.act = act;
        Ok(())
    }
}

impl DropoutConfiger for Conv {
    fn set_dropout(&mut self, prob: f64) -> LayerResult<()> {
        if !(0.0..1.0).contains(&prob) {
            return Err(LayerError::InvalidConfig(format!(
                "dropout probability must be in [0, 1), got {}",
                prob
            )));
        }
        self.dropout = Some(prob);
        Ok(())
    }
}

fn non_zero(what: &str, pair: (usize, usize)) -> LayerResult<()> {
    if pair.0 == 0 || pair.1 == 0 {
        return Err(LayerError::InvalidConfig(format!(
            "{} {} must be non-zero, got {:?}",
            KIND, what, pair
        )));
    }
    Ok(())
}

impl ConvConfiger for Conv {
    fn set_kernel_shape(&mut self, kernel: (usize, usize)) -> LayerResult<()> {
        non_zero("kernel shape", kernel)?;
        self.kernel_shape = kernel;
        Ok(())
    }

    fn set_pad(&mut self, pad: (usize, usize)) -> LayerResult<()> {
        self.pad = pad;
        Ok(())
    }

    fn set_stride(&mut self, stride: (usize, usize)) -> LayerResult<()> {
        non_zero("stride", stride)?;
        self.stride = stride;
        Ok(())
    }

    fn set_dilation(&mut self, dilation: (usize, usize)) -> LayerResult<()> {
        non_zero("dilation", dilation)?;
        self.dilation = dilation;
        Ok(())
    }
}

impl FlopsCounter for Conv {
    fn set_compute_flops(&mut self, enabled: bool) -> LayerResult<()> {
        self.compute_flops = enabled;
        Ok(())
    }

    fn flops(&self) -> usize {
        self.flops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::*;

    #[test]
    fn test_defaults() {
        let l = Conv::new(Vec::new()).unwrap();
        assert_eq!(l.kernel_shape(), (5, 5));
        assert_eq!(l.pad(), (1, 1));
        assert_eq!(l.stride(), (1, 1));
        assert_eq!(l.dilation(), (1, 1));
        assert!(l.has_activation());
        assert_eq!(l.dropout(), None);
        assert_eq!(l.state(), &LayerState::Configured);
        assert!(l.model().is_empty());
    }

    #[test]
    fn test_options_applied() {
        let l = Conv::new(vec![
            with_name("c1"),
            with_size(&[8, 3]),
            with_kernel_shape(3, 3),
            with_pad(0, 0),
            with_stride(2, 2),
            with_dilation(1, 2),
            with_dropout(0.1),
            without_activation(),
        ])
        .unwrap();
        assert_eq!(l.name(), "c1");
        assert_eq!(l.size(), &[8, 3]);
        assert_eq!(l.kernel_shape(), (3, 3));
        assert_eq!(l.pad(), (0, 0));
        assert_eq!(l.stride(), (2, 2));
        assert_eq!(l.dilation(), (1, 2));
        assert_eq!(l.dropout(), Some(0.1));
        assert!(!l.has_activation());
    }

    #[test]
    fn test_invalid_option_values() {
        assert!(matches!(Conv::new(vec![with_dropout(1.5)]), Err(LayerError::InvalidConfig(_))));
        assert!(matches!(Conv::new(vec![with_stride(0, 1)]), Err(LayerError::InvalidConfig(_))));
        assert!(matches!(Conv::new(vec![with_size(&[3])]), Err(LayerError::InvalidConfig(_))));
        assert!(matches!(Conv::new(vec![with_kernel_shape(0, 3)]), Err(LayerError::InvalidConfig(_))));
    }

    #[test]
    fn test_flops_example() {
        let w = Shape::from([6, 3, 5, 5]);
        let x = Shape::from([1, 3, 32, 32]);
        assert_eq!(conv_flops(&w, &x, (1, 1), (1, 1), false).unwrap(), 410_400);
        assert_eq!(conv_flops(&w, &x, (1, 1), (1, 1), true).unwrap(), 415_800);
    }

    #[test]
    fn test_flops_strided() {
        // (16 - 4 + 0)/2 + 1 = 7 rows, (8 - 4)/2 + 1 = 3 cols
        let w = Shape::from([2, 1, 4, 4]);
        let x = Shape::from([1, 1, 16, 8]);
        let per_instance = 16 + 1;
        assert_eq!(conv_flops(&w, &x, (0, 0), (2, 2), false).unwrap(), 21 * per_instance * 2);
    }

    #[test]
    fn test_flops_rejects_bad_geometry() {
        let w = Shape::from([2, 1, 5, 5]);
        assert!(conv_flops(&w, &Shape::from([1, 1, 2, 2]), (0, 0), (1, 1), false).is_err());
        assert!(conv_flops(&w, &Shape::from([1, 1, 8, 8]), (0, 0), (0, 1), false).is_err());
        assert!(conv_flops(&w, &Shape::from([8, 8]), (0, 0), (1, 1), false).is_err());
    }

    #[test]
    fn test_flops_overflow_is_error() {
        let w = Shape::from([6, 3, 5, 5]);
        let x = Shape::from([1, 3, 32, 32]);
        let huge_pad = (usize::MAX / 2 + 1, 1);
        assert!(matches!(
            conv_flops(&w, &x, huge_pad, (1, 1), false),
            Err(LayerError::InvalidConfig(_))
        ));

        let wide = Shape::from([usize::MAX, 3, 5, 5]);
        assert!(matches!(
            conv_flops(&wide, &x, (1, 1), (1, 1), false),
            Err(LayerError::InvalidConfig(_))
        ));

        let deep = Shape::from([1, usize::MAX, 5, 5]);
        assert!(matches!(
            conv_flops(&deep, &x, (1, 1), (1, 1), true),
            Err(LayerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_shape_before_init_fails() {
        let l = Conv::new(vec![with_name("c")]).unwrap();
        assert!(matches!(l.shape(), Err(LayerError::NotInitialized { layer: "Conv", .. })));
        assert!(l.graph().is_none());
    }

    #[test]
    fn test_init_requires_size() {
        let g = Graph::new();
        let mut l = Conv::new(vec![with_name("c")]).unwrap();
        assert!(matches!(l.init_on(&g, DType::F32), Err(LayerError::InvalidConfig(_))));
        assert!(!l.is_ready());
    }

    #[test]
    fn test_oversized_init_leaves_layer_configured() {
        let g = Graph::new();
        let mut l = Conv::new(vec![with_name("c"), with_size(&[1 << 40, 1 << 40])]).unwrap();
        let err = l.init_on(&g, DType::F32).unwrap_err();
        assert!(
            matches!(err, LayerError::Init { source: GraphError::InvalidConfig(_), .. }),
            "{err}"
        );
        assert!(!l.is_ready());
        assert_eq!(l.state(), &LayerState::Configured);
        assert!(g.is_empty());
    }

    #[test]
    fn test_lazy_init_failure_names_stage() {
        let g = Graph::new();
        let x = g.placeholder(DType::F32, [1, 3, 8, 8], "x");
        let mut l = Conv::new(vec![with_name("c")]).unwrap();
        let err = l.fwd(&x).unwrap_err();
        match &err {
            LayerError::Initializing { layer, name, source } => {
                assert_eq!(*layer, "Conv");
                assert_eq!(name, "c");
                assert!(matches!(**source, LayerError::InvalidConfig(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("initializing a previously uninitialized layer"));
        assert!(!l.is_ready());
    }

    #[test]
    fn test_init_twice_rejected() {
        let g = Graph::new();
        let mut l = Conv::new(vec![with_name("c"), with_size(&[2, 1])]).unwrap();
        l.init_on(&g, DType::F64).unwrap();
        assert_eq!(l.shape().unwrap().dims(), &[2, 1, 5, 5]);
        assert_eq!(l.weight().unwrap().dtype(), DType::F64);
        assert_eq!(l.weight().unwrap().name(), "c_w");
        assert!(matches!(l.init_on(&g, DType::F64), Err(LayerError::AlreadyInitialized { .. })));
    }

    #[test]
    fn test_type_placeholder() {
        let l = Conv::new(Vec::new()).unwrap();
        assert_eq!(l.ty().to_string(), "a → b");
    }

    #[test]
    fn test_describe_unimplemented() {
        let l = Conv::new(Vec::new()).unwrap();
        assert!(matches!(l.describe(), Err(LayerError::Unimplemented(_))));
    }
}
