//! Value kernels used when a graph is evaluated.

use crate::api::error::{GraphError, GraphResult};
use crate::api::types::Shape;
use crate::core::tensor::{Element, Storage, Tensor};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use std::time::Instant;

/// Geometry of a 2-D convolution. Pairs are `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dParams {
    pub kernel: (usize, usize),
    pub pad: (usize, usize),
    pub stride: (usize, usize),
    pub dilation: (usize, usize),
}

impl Conv2dParams {
    /// Output spatial size for an input of `(height, width)`.
    pub fn output_hw(&self, height: usize, width: usize) -> GraphResult<(usize, usize)> {
        let oh = out_dim(height, self.kernel.0, self.pad.0, self.stride.0, self.dilation.0);
        let ow = out_dim(width, self.kernel.1, self.pad.1, self.stride.1, self.dilation.1);
        match (oh, ow) {
            (Some(oh), Some(ow)) => Ok((oh, ow)),
            _ => Err(GraphError::InvalidConfig(format!(
                "kernel {:?} with dilation {:?} does not fit input ({}, {}) padded by {:?}",
                self.kernel, self.dilation, height, width, self.pad
            ))),
        }
    }
}

fn out_dim(input: usize, kernel: usize, pad: usize, stride: usize, dilation: usize) -> Option<usize> {
    if kernel == 0 || stride == 0 || dilation == 0 {
        return None;
    }
    let padded = pad.checked_mul(2)?.checked_add(input)?;
    let span = dilation.checked_mul(kernel - 1)?.checked_add(1)?;
    if padded < span {
        return None;
    }
    Some((padded - span) / stride + 1)
}

/// NCHW input convolved with an `(F, C, Kh, Kw)` weight.
pub(crate) fn conv2d(x: &Tensor, w: &Tensor, p: &Conv2dParams) -> GraphResult<Tensor> {
    let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };

    let xs = x.shape();
    let ws = w.shape();
    let (oh, ow) = p.output_hw(xs[2], xs[3])?;
    let out_shape = Shape::from([xs[0], ws[0], oh, ow]);

    let storage = match (x.storage(), w.storage()) {
        (Storage::F32(xd), Storage::F32(wd)) => Storage::F32(conv2d_typed(xd, xs, wd, ws, p, oh, ow)),
        (Storage::F64(xd), Storage::F64(wd)) => Storage::F64(conv2d_typed(xd, xs, wd, ws, p, oh, ow)),
        _ => {
            return Err(GraphError::DTypeMismatch {
                expected: x.dtype(),
                got: w.dtype(),
            })
        }
    };

    if let Some(t) = _t {
        log::trace!(
            "[perf] graph::conv2d {}x{}->{} {:.3}ms",
            xs,
            ws,
            out_shape,
            t.elapsed().as_secs_f64() * 1000.0
        );
    }
    Tensor::new(storage, out_shape)
}

fn conv2d_typed<T: Element>(
    x: &[T],
    xs: &Shape,
    w: &[T],
    ws: &Shape,
    p: &Conv2dParams,
    oh: usize,
    ow: usize,
) -> Vec<T> {
    let (channels, height, width) = (xs[1], xs[2], xs[3]);
    let (filters, kh, kw) = (ws[0], ws[2], ws[3]);
    let plane = oh * ow;
    let mut out = vec![T::default(); xs[0] * filters * plane];

    // One chunk per (batch, filter) output plane.
    out.par_chunks_mut(plane).enumerate().for_each(|(idx, dst)| {
        let b = idx / filters;
        let f = idx % filters;
        for oy in 0..oh {
            for ox in 0..ow {
                let mut sum = T::default();
                for c in 0..channels {
                    let x_base = (b * channels + c) * height * width;
                    let w_base = (f * channels + c) * kh * kw;
                    for ky in 0..kh {
                        let iy = (oy * p.stride.0 + ky * p.dilation.0) as isize - p.pad.0 as isize;
                        if iy < 0 || iy as usize >= height {
                            continue;
                        }
                        for kx in 0..kw {
                            let ix = (ox * p.stride.1 + kx * p.dilation.1) as isize - p.pad.1 as isize;
                            if ix < 0 || ix as usize >= width {
                                continue;
                            }
                            sum = sum + x[x_base + iy as usize * width + ix as usize] * w[w_base + ky * kw + kx];
                        }
                    }
                }
                dst[oy * ow + ox] = sum;
            }
        }
    });
    out
}

/// Inverted dropout: zero with probability `prob`, scale survivors by `1 / (1 - prob)`.
pub(crate) fn dropout(x: &Tensor, prob: f64, rng: &mut StdRng) -> Tensor {
    if prob == 0.0 {
        return x.clone();
    }
    let scale = 1.0 / (1.0 - prob);
    let mask: Vec<f64> = (0..x.numel())
        .map(|_| if rng.gen::<f64>() >= prob { scale } else { 0.0 })
        .collect();
    x.map(|i, v| v * mask[i])
}
