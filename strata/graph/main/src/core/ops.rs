//! Primitive operations. Each adds one node to the graph of its inputs after
//! checking shapes and dtypes; values are only computed on evaluation.

use crate::api::error::{GraphError, GraphResult};
use crate::api::types::Shape;
use crate::core::graph::{Node, Op};
use crate::core::kernels::Conv2dParams;

/// 2-D convolution of an NCHW input with an `(F, C, Kh, Kw)` weight.
pub fn conv2d(x: &Node, w: &Node, params: Conv2dParams) -> GraphResult<Node> {
    if !x.graph.same_as(&w.graph) {
        return Err(GraphError::GraphMismatch);
    }
    let xs = x.shape();
    if xs.ndim() != 4 {
        return Err(GraphError::RankMismatch {
            op: "conv2d",
            expected: 4,
            got: xs,
        });
    }
    let ws = w.shape();
    if ws.ndim() != 4 {
        return Err(GraphError::RankMismatch {
            op: "conv2d",
            expected: 4,
            got: ws,
        });
    }
    if x.dtype() != w.dtype() {
        return Err(GraphError::DTypeMismatch {
            expected: x.dtype(),
            got: w.dtype(),
        });
    }
    let expected = Shape::from([ws[0], xs[1], params.kernel.0, params.kernel.1]);
    if ws != expected {
        return Err(GraphError::ShapeMismatch { expected, got: ws });
    }

    let (oh, ow) = params.output_hw(xs[2], xs[3])?;
    let out = Shape::from([xs[0], ws[0], oh, ow]);
    Ok(x.graph.push(None, Op::Conv2d(params), vec![x.id, w.id], out, x.dtype(), None))
}

/// Rectified linear unit, `max(x, 0)`.
pub fn rectify(x: &Node) -> GraphResult<Node> {
    Ok(unary(x, Op::Rectify))
}

pub fn sigmoid(x: &Node) -> GraphResult<Node> {
    Ok(unary(x, Op::Sigmoid))
}

pub fn tanh(x: &Node) -> GraphResult<Node> {
    Ok(unary(x, Op::Tanh))
}

/// Inverted dropout with drop probability `prob` in `[0, 1)`.
pub fn dropout(x: &Node, prob: f64) -> GraphResult<Node> {
    if !(0.0..1.0).contains(&prob) {
        return Err(GraphError::InvalidConfig(format!(
            "dropout probability must be in [0, 1), got {}",
            prob
        )));
    }
    Ok(unary(x, Op::Dropout(prob)))
}

fn unary(x: &Node, op: Op) -> Node {
    x.graph.push(None, op, vec![x.id], x.shape(), x.dtype(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DType, Graph, InitFn, NodeSpec, Tensor};

    fn params() -> Conv2dParams {
        Conv2dParams {
            kernel: (3, 3),
            pad: (1, 1),
            stride: (1, 1),
            dilation: (1, 1),
        }
    }

    fn weight(g: &Graph, shape: [usize; 4]) -> Node {
        g.new_tensor(DType::F32, 4, NodeSpec::new(shape).with_init(InitFn::Ones))
            .unwrap()
    }

    #[test]
    fn test_conv2d_output_shape() {
        let g = Graph::new();
        let x = g.placeholder(DType::F32, [2, 3, 8, 8], "x");
        let w = weight(&g, [4, 3, 3, 3]);
        let y = conv2d(&x, &w, params()).unwrap();
        assert_eq!(y.shape().dims(), &[2, 4, 8, 8]);
        assert_eq!(y.op_name(), "conv2d");
        assert_eq!(y.inputs(), vec![x, w]);
    }

    #[test]
    fn test_conv2d_channel_mismatch() {
        let g = Graph::new();
        let x = g.placeholder(DType::F32, [1, 2, 8, 8], "x");
        let w = weight(&g, [4, 3, 3, 3]);
        let err = conv2d(&x, &w, params()).unwrap_err();
        assert_eq!(
            err,
            GraphError::ShapeMismatch {
                expected: Shape::from([4, 2, 3, 3]),
                got: Shape::from([4, 3, 3, 3]),
            }
        );
    }

    #[test]
    fn test_conv2d_rank_and_dtype() {
        let g = Graph::new();
        let w = weight(&g, [4, 3, 3, 3]);
        let flat = g.placeholder(DType::F32, [3, 8, 8], "flat");
        assert!(matches!(conv2d(&flat, &w, params()), Err(GraphError::RankMismatch { .. })));
        let wide = g.placeholder(DType::F64, [1, 3, 8, 8], "wide");
        assert!(matches!(conv2d(&wide, &w, params()), Err(GraphError::DTypeMismatch { .. })));
    }

    #[test]
    fn test_conv2d_graph_mismatch() {
        let g1 = Graph::new();
        let g2 = Graph::new();
        let x = g1.placeholder(DType::F32, [1, 3, 8, 8], "x");
        let w = weight(&g2, [4, 3, 3, 3]);
        assert_eq!(conv2d(&x, &w, params()).unwrap_err(), GraphError::GraphMismatch);
    }

    #[test]
    fn test_rectify_eval() {
        let g = Graph::new();
        let x = g.constant(Tensor::from_vec(vec![-1.0, 0.5], [2]).unwrap(), "x");
        let y = rectify(&x).unwrap();
        assert_eq!(y.eval().unwrap().as_f32().unwrap(), &[0.0, 0.5]);
    }

    #[test]
    fn test_sigmoid_tanh_eval() {
        let g = Graph::new();
        let x = g.constant(Tensor::from_vec_f64(vec![0.0], [1]).unwrap(), "x");
        assert_eq!(sigmoid(&x).unwrap().eval().unwrap().to_f64_vec(), vec![0.5]);
        assert_eq!(tanh(&x).unwrap().eval().unwrap().to_f64_vec(), vec![0.0]);
    }

    #[test]
    fn test_dropout_probability_range() {
        let g = Graph::new();
        let x = g.placeholder(DType::F32, [4], "x");
        assert!(dropout(&x, 1.0).is_err());
        assert!(dropout(&x, -0.1).is_err());
        assert_eq!(dropout(&x, 0.3).unwrap().shape(), x.shape());
    }

    #[test]
    fn test_conv_pipeline_eval() {
        let g = Graph::new();
        let x = g.placeholder(DType::F32, [1, 1, 3, 3], "x");
        let w = g
            .new_tensor(DType::F32, 4, NodeSpec::new([1, 1, 2, 2]).with_init(InitFn::Ones))
            .unwrap();
        let p = Conv2dParams {
            kernel: (2, 2),
            pad: (0, 0),
            ..params()
        };
        let y = rectify(&conv2d(&x, &w, p).unwrap()).unwrap();
        x.bind(Tensor::from_vec(vec![1.0, -1.0, 1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0], [1, 1, 3, 3]).unwrap())
            .unwrap();
        // windows: [1,-1,-1,-1]=-2, [-1,1,-1,-1]=-2, [-1,-1,1,1]=0, [-1,-1,1,1]=0
        assert_eq!(y.eval().unwrap().as_f32().unwrap(), &[0.0, 0.0, 0.0, 0.0]);
    }
}
