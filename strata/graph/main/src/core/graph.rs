//! Expression graph: an append-only arena of nodes shared by handle.

use crate::api::error::{GraphError, GraphResult};
use crate::api::types::{DType, Shape};
use crate::core::init::InitFn;
use crate::core::kernels::{self, Conv2dParams};
use crate::core::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Index of a node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Operation that produced a node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    Placeholder,
    Constant,
    Variable(InitFn),
    Conv2d(Conv2dParams),
    Rectify,
    Sigmoid,
    Tanh,
    Dropout(f64),
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Placeholder => "placeholder",
            Op::Constant => "constant",
            Op::Variable(_) => "variable",
            Op::Conv2d(_) => "conv2d",
            Op::Rectify => "rectify",
            Op::Sigmoid => "sigmoid",
            Op::Tanh => "tanh",
            Op::Dropout(_) => "dropout",
        }
    }
}

struct NodeData {
    name: Option<String>,
    op: Op,
    inputs: Vec<NodeId>,
    shape: Shape,
    dtype: DType,
    value: Option<Tensor>,
}

struct GraphInner {
    nodes: Vec<NodeData>,
    rng: StdRng,
}

/// Shared handle to a computation graph.
///
/// Cloning is cheap and yields another handle to the same graph. Layers hold
/// handles; no single holder owns the graph.
#[derive(Clone)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

/// Description of a new variable: shape, optional name and initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub shape: Shape,
    pub name: Option<String>,
    pub init: Option<InitFn>,
}

impl NodeSpec {
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            name: None,
            init: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Graph whose initializers and dropout masks are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner {
                nodes: Vec::new(),
                rng,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles refer to the same graph.
    pub fn same_as(&self, other: &Graph) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Symbolic input. Bind a value with [`Node::bind`] before evaluating.
    pub fn placeholder(&self, dtype: DType, shape: impl Into<Shape>, name: impl Into<String>) -> Node {
        self.push(Some(name.into()), Op::Placeholder, vec![], shape.into(), dtype, None)
    }

    /// Node holding a fixed value.
    pub fn constant(&self, value: Tensor, name: impl Into<String>) -> Node {
        let shape = value.shape().clone();
        let dtype = value.dtype();
        self.push(Some(name.into()), Op::Constant, vec![], shape, dtype, Some(value))
    }

    /// Trainable tensor of the given rank. With an initializer the value is
    /// drawn immediately; without one the node starts zeroed.
    pub fn new_tensor(&self, dtype: DType, rank: usize, spec: NodeSpec) -> GraphResult<Node> {
        if spec.shape.ndim() != rank {
            return Err(GraphError::RankMismatch {
                op: "new_tensor",
                expected: rank,
                got: spec.shape,
            });
        }
        let init = spec.init.unwrap_or(InitFn::Zeroes);
        let value = {
            let mut inner = self.inner.borrow_mut();
            init.sample(dtype, &spec.shape, &mut inner.rng)?
        };
        log::debug!(
            "new_tensor {}: {} {} ({})",
            spec.name.as_deref().unwrap_or("<unnamed>"),
            dtype,
            spec.shape,
            init.name()
        );
        Ok(self.push(spec.name, Op::Variable(init), vec![], spec.shape, dtype, Some(value)))
    }

    /// First node carrying `name`, if any.
    pub fn by_name(&self, name: &str) -> Option<Node> {
        let inner = self.inner.borrow();
        inner
            .nodes
            .iter()
            .position(|n| n.name.as_deref() == Some(name))
            .map(|i| self.handle(NodeId(i)))
    }

    /// Compute the value of `node` from its inputs.
    pub fn eval(&self, node: &Node) -> GraphResult<Tensor> {
        if !node.graph.same_as(self) {
            return Err(GraphError::GraphMismatch);
        }
        let mut memo = HashMap::new();
        self.eval_id(node.id, &mut memo)
    }

    fn eval_id(&self, id: NodeId, memo: &mut HashMap<NodeId, Tensor>) -> GraphResult<Tensor> {
        if let Some(t) = memo.get(&id) {
            return Ok(t.clone());
        }
        let (op, inputs, value, label) = {
            let inner = self.inner.borrow();
            let n = &inner.nodes[id.0];
            (n.op.clone(), n.inputs.clone(), n.value.clone(), label_of(n, id))
        };

        let out = match op {
            Op::Placeholder | Op::Constant | Op::Variable(_) => {
                value.ok_or_else(|| GraphError::Unbound(label))?
            }
            Op::Conv2d(params) => {
                let x = self.eval_id(inputs[0], memo)?;
                let w = self.eval_id(inputs[1], memo)?;
                kernels::conv2d(&x, &w, &params)?
            }
            Op::Rectify => self.eval_id(inputs[0], memo)?.map(|_, v| v.max(0.0)),
            Op::Sigmoid => self.eval_id(inputs[0], memo)?.map(|_, v| 1.0 / (1.0 + (-v).exp())),
            Op::Tanh => self.eval_id(inputs[0], memo)?.map(|_, v| v.tanh()),
            Op::Dropout(prob) => {
                let x = self.eval_id(inputs[0], memo)?;
                let mut inner = self.inner.borrow_mut();
                kernels::dropout(&x, prob, &mut inner.rng)
            }
        };
        memo.insert(id, out.clone());
        Ok(out)
    }

    pub(crate) fn push(
        &self,
        name: Option<String>,
        op: Op,
        inputs: Vec<NodeId>,
        shape: Shape,
        dtype: DType,
        value: Option<Tensor>,
    ) -> Node {
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.nodes.push(NodeData {
                name,
                op,
                inputs,
                shape,
                dtype,
                value,
            });
            NodeId(inner.nodes.len() - 1)
        };
        self.handle(id)
    }

    fn handle(&self, id: NodeId) -> Node {
        Node {
            graph: self.clone(),
            id,
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Graph({} nodes)", self.len())
    }
}

fn label_of(n: &NodeData, id: NodeId) -> String {
    match &n.name {
        Some(name) => name.clone(),
        None => format!("{}_{}", n.op.name(), id.0),
    }
}

/// Handle to one node of a graph.
#[derive(Clone)]
pub struct Node {
    pub(crate) graph: Graph,
    pub(crate) id: NodeId,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn graph(&self) -> Graph {
        self.graph.clone()
    }

    pub fn shape(&self) -> Shape {
        self.graph.inner.borrow().nodes[self.id.0].shape.clone()
    }

    pub fn dtype(&self) -> DType {
        self.graph.inner.borrow().nodes[self.id.0].dtype
    }

    /// Given name, or `<op>_<index>` for unnamed nodes.
    pub fn name(&self) -> String {
        label_of(&self.graph.inner.borrow().nodes[self.id.0], self.id)
    }

    pub fn op_name(&self) -> &'static str {
        self.graph.inner.borrow().nodes[self.id.0].op.name()
    }

    pub fn inputs(&self) -> Vec<Node> {
        let ids = self.graph.inner.borrow().nodes[self.id.0].inputs.clone();
        ids.into_iter().map(|id| self.graph.handle(id)).collect()
    }

    /// Stored value of a leaf. Computed nodes return `None`; use [`Node::eval`].
    pub fn value(&self) -> Option<Tensor> {
        self.graph.inner.borrow().nodes[self.id.0].value.clone()
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.graph.inner.borrow().nodes[self.id.0].op, Op::Variable(_))
    }

    pub fn eval(&self) -> GraphResult<Tensor> {
        self.graph.eval(self)
    }

    /// Bind a value to a placeholder. Shape and dtype must match.
    pub fn bind(&self, value: Tensor) -> GraphResult<()> {
        let mut inner = self.graph.inner.borrow_mut();
        let n = &mut inner.nodes[self.id.0];
        if n.op != Op::Placeholder {
            return Err(GraphError::InvalidConfig(format!(
                "cannot bind a value to {} node {}",
                n.op.name(),
                label_of(n, self.id)
            )));
        }
        if value.shape() != &n.shape {
            return Err(GraphError::ShapeMismatch {
                expected: n.shape.clone(),
                got: value.shape().clone(),
            });
        }
        if value.dtype() != n.dtype {
            return Err(GraphError::DTypeMismatch {
                expected: n.dtype,
                got: value.dtype(),
            });
        }
        n.value = Some(value);
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.graph.same_as(&other.graph)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {} {}", self.name(), self.dtype(), self.shape())
    }
}
