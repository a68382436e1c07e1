//! Layer traits

use crate::api::capability::{
    ActivationSetter, ConvConfiger, DropoutConfiger, FlopsCounter, NameSetter, SizeSetter,
};
use crate::api::error::LayerResult;
use strata_graph::{Graph, Input, Node, Shape, Type};

/// Anything with a name.
pub trait Term {
    fn name(&self) -> &str;
}

/// Looks up named members. Returns `None` when nothing carries the name.
pub trait ByNamer {
    fn by_name(&self, name: &str) -> Option<&dyn Layer>;
}

/// Anything that can hand back the graph it builds into.
pub trait Grapher {
    /// `None` until the value is bound to a graph.
    fn graph(&self) -> Option<Graph>;
}

/// A description able to rebuild a layer on a graph.
pub trait Data {
    fn make(&self, g: &Graph, name: &str) -> LayerResult<Box<dyn Layer>>;
}

/// A neural network layer.
pub trait Layer: Term {
    /// Concrete layer kind, used in errors and logs.
    fn kind(&self) -> &'static str;

    /// Learnable parameters. Empty before initialization.
    fn model(&self) -> Vec<Node>;

    /// Forward application of `x`, adding nodes to the input's graph.
    fn fwd(&mut self, x: &dyn Input) -> LayerResult<Node>;

    fn ty(&self) -> Type;

    fn shape(&self) -> LayerResult<Shape>;

    /// Interchange description of the layer. Not supported yet.
    fn describe(&self) -> LayerResult<()>;

    fn as_name_setter(&mut self) -> Option<&mut dyn NameSetter> {
        None
    }

    fn as_size_setter(&mut self) -> Option<&mut dyn SizeSetter> {
        None
    }

    fn as_activation_setter(&mut self) -> Option<&mut dyn ActivationSetter> {
        None
    }

    fn as_dropout_configer(&mut self) -> Option<&mut dyn DropoutConfiger> {
        None
    }

    fn as_conv_configer(&mut self) -> Option<&mut dyn ConvConfiger> {
        None
    }

    fn as_flops_counter(&mut self) -> Option<&mut dyn FlopsCounter> {
        None
    }

    fn as_by_namer(&self) -> Option<&dyn ByNamer> {
        None
    }
}
