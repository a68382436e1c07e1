//! Anything that can feed a node into a layer.

use crate::api::error::{GraphError, GraphResult};
use crate::core::graph::Node;
use std::fmt::Display;

/// A value exposing a graph node handle.
pub trait Input {
    /// The carried node, if any.
    fn node(&self) -> Option<&Node>;

    /// Error carried in place of a node, if any.
    fn failure(&self) -> Option<String> {
        None
    }
}

impl Input for Node {
    fn node(&self) -> Option<&Node> {
        Some(self)
    }
}

impl Input for Option<Node> {
    fn node(&self) -> Option<&Node> {
        self.as_ref()
    }
}

impl<E: Display> Input for Result<Node, E> {
    fn node(&self) -> Option<&Node> {
        self.as_ref().ok()
    }

    fn failure(&self) -> Option<String> {
        self.as_ref().err().map(|e| e.to_string())
    }
}

impl<T: Input + ?Sized> Input for &T {
    fn node(&self) -> Option<&Node> {
        (**self).node()
    }

    fn failure(&self) -> Option<String> {
        (**self).failure()
    }
}

/// Validate a single input and return its node.
pub fn check_one<I: Input + ?Sized>(x: &I) -> GraphResult<&Node> {
    if let Some(msg) = x.failure() {
        return Err(GraphError::InvalidInput(msg));
    }
    x.node().ok_or(GraphError::MissingNode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DType, Graph};

    #[test]
    fn test_check_one_node() {
        let g = Graph::new();
        let x = g.placeholder(DType::F32, [1, 2], "x");
        assert_eq!(check_one(&x).unwrap(), &x);
        assert_eq!(check_one(&Some(x.clone())).unwrap(), &x);
    }

    #[test]
    fn test_check_one_missing() {
        let none: Option<Node> = None;
        assert_eq!(check_one(&none).unwrap_err(), GraphError::MissingNode);
    }

    #[test]
    fn test_check_one_failed_result() {
        let failed: Result<Node, String> = Err("upstream broke".to_string());
        assert_eq!(
            check_one(&failed).unwrap_err(),
            GraphError::InvalidInput("upstream broke".to_string())
        );
    }

    #[test]
    fn test_check_one_dyn() {
        let g = Graph::new();
        let x = g.placeholder(DType::F32, [1], "x");
        let dynamic: &dyn Input = &x;
        assert!(check_one(dynamic).is_ok());
    }
}
