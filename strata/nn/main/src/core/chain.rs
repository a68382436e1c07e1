//! Sequential container of layers.

use crate::api::capability::NameSetter;
use crate::api::error::{LayerError, LayerResult};
use crate::api::traits::{ByNamer, Grapher, Layer, Term};
use strata_graph::{check_one, Graph, Input, Node, Shape, Type};

const KIND: &str = "Chain";

/// Layers applied one after another, each fed the previous output.
pub struct Chain {
    name: String,
    layers: Vec<Box<dyn Layer>>,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
        }
    }

    /// Appends a layer and returns self (builder pattern).
    pub fn with(mut self, layer: impl Layer + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn push(&mut self, layer: Box<dyn Layer>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Term for Chain {
    fn name(&self) -> &str {
        &self.name
    }
}

impl NameSetter for Chain {
    fn set_name(&mut self, name: &str) -> LayerResult<()> {
        self.name = name.to_string();
        Ok(())
    }
}

impl Grapher for Chain {
    fn graph(&self) -> Option<Graph> {
        self.model().first().map(|n| n.graph())
    }
}

impl ByNamer for Chain {
    fn by_name(&self, name: &str) -> Option<&dyn Layer> {
        if self.name == name {
            return Some(self);
        }
        self.layers.iter().find_map(|l| {
            if l.name() == name {
                Some(l.as_ref())
            } else {
                l.as_by_namer().and_then(|b| b.by_name(name))
            }
        })
    }
}

impl Layer for Chain {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn model(&self) -> Vec<Node> {
        self.layers.iter().flat_map(|l| l.model()).collect()
    }

    fn fwd(&mut self, x: &dyn Input) -> LayerResult<Node> {
        let mut x = check_one(x)
            .map_err(|source| LayerError::MissingInput { layer: KIND, source })?
            .clone();
        for l in self.layers.iter_mut() {
            x = l.fwd(&x)?;
        }
        log::debug!("{} shape {}: {}", KIND, self.name, x.shape());
        Ok(x)
    }

    fn ty(&self) -> Type {
        Type::fn_of(Type::var('a'), Type::var('b'))
    }

    /// Shape of the last layer.
    fn shape(&self) -> LayerResult<Shape> {
        match self.layers.last() {
            Some(l) => l.shape(),
            None => Err(LayerError::NotInitialized {
                layer: KIND,
                name: self.name.clone(),
            }),
        }
    }

    fn describe(&self) -> LayerResult<()> {
        Err(LayerError::Unimplemented("Chain::describe"))
    }

    fn as_name_setter(&mut self) -> Option<&mut dyn NameSetter> {
        Some(self)
    }

    fn as_by_namer(&self) -> Option<&dyn ByNamer> {
        Some(self)
    }
}
