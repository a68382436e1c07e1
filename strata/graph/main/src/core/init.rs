//! Initialization policies for variable nodes.

use crate::api::error::{GraphError, GraphResult};
use crate::api::types::{DType, Shape};
use crate::core::tensor::Tensor;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// How a variable's value is filled when the node is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitFn {
    Zeroes,
    Ones,
    /// Normal distribution with the given mean and standard deviation
    Gaussian { mean: f64, std: f64 },
    /// Glorot/Xavier normal: `std = gain * sqrt(2 / (fan_in + fan_out))`
    GlorotN(f64),
    /// Glorot/Xavier uniform: `limit = gain * sqrt(6 / (fan_in + fan_out))`
    GlorotU(f64),
}

impl InitFn {
    pub fn name(&self) -> &'static str {
        match self {
            InitFn::Zeroes => "zeroes",
            InitFn::Ones => "ones",
            InitFn::Gaussian { .. } => "gaussian",
            InitFn::GlorotN(_) => "glorot_normal",
            InitFn::GlorotU(_) => "glorot_uniform",
        }
    }

    pub(crate) fn sample(&self, dtype: DType, shape: &Shape, rng: &mut StdRng) -> GraphResult<Tensor> {
        match *self {
            InitFn::Zeroes => Tensor::from_fn(dtype, shape.clone(), || 0.0),
            InitFn::Ones => Tensor::from_fn(dtype, shape.clone(), || 1.0),
            InitFn::Gaussian { mean, std } => {
                let dist = normal(mean, std)?;
                Tensor::from_fn(dtype, shape.clone(), || dist.sample(rng))
            }
            InitFn::GlorotN(gain) => {
                let (fan_in, fan_out) = fans(shape)?;
                let std = gain * (2.0 / (fan_in as f64 + fan_out as f64)).sqrt();
                let dist = normal(0.0, std)?;
                Tensor::from_fn(dtype, shape.clone(), || dist.sample(rng))
            }
            InitFn::GlorotU(gain) => {
                let (fan_in, fan_out) = fans(shape)?;
                let limit = gain * (6.0 / (fan_in as f64 + fan_out as f64)).sqrt();
                Tensor::from_fn(dtype, shape.clone(), || rng.gen_range(-limit..=limit))
            }
        }
    }
}

fn normal(mean: f64, std: f64) -> GraphResult<Normal<f64>> {
    Normal::new(mean, std)
        .map_err(|e| GraphError::InvalidConfig(format!("normal(mean={mean}, std={std}): {e}")))
}

/// Fan-in and fan-out of a weight shape.
///
/// Dims past the second form the receptive field: a conv weight
/// `(out, in, kh, kw)` has `fan_in = in*kh*kw` and `fan_out = out*kh*kw`.
pub(crate) fn fans(shape: &Shape) -> GraphResult<(usize, usize)> {
    let (fan_in, fan_out) = match shape.dims() {
        [] => (1, 1),
        [n] => (*n, *n),
        [out, inp, rest @ ..] => {
            let fans = rest
                .iter()
                .try_fold(1usize, |acc, &d| acc.checked_mul(d))
                .and_then(|receptive| Some((inp.checked_mul(receptive)?, out.checked_mul(receptive)?)));
            fans.ok_or_else(|| {
                GraphError::InvalidConfig(format!("fan-in/fan-out of shape {} overflow usize", shape))
            })?
        }
    };
    if fan_in == 0 && fan_out == 0 {
        return Err(GraphError::InvalidConfig(format!(
            "cannot compute Glorot scale for empty shape {}",
            shape
        )));
    }
    Ok((fan_in, fan_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_fans_conv_weight() {
        let shape = Shape::from([6, 3, 5, 5]);
        assert_eq!(fans(&shape).unwrap(), (75, 150));
    }

    #[test]
    fn test_fans_matrix() {
        assert_eq!(fans(&Shape::from([4, 8])).unwrap(), (8, 4));
    }

    #[test]
    fn test_glorot_normal_spread() {
        let mut rng = StdRng::seed_from_u64(7);
        let shape = Shape::from([64, 64, 3, 3]);
        let t = InitFn::GlorotN(1.0).sample(DType::F64, &shape, &mut rng).unwrap();
        let data = t.to_f64_vec();
        let mean = data.iter().sum::<f64>() / data.len() as f64;
        let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
        let expected = 2.0 / (64.0 * 9.0 * 2.0);
        assert!(mean.abs() < 0.01, "mean {mean}");
        assert!((var - expected).abs() / expected < 0.1, "var {var} vs {expected}");
    }

    #[test]
    fn test_glorot_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let shape = Shape::from([10, 10]);
        let limit = (6.0f64 / 20.0).sqrt();
        let t = InitFn::GlorotU(1.0).sample(DType::F32, &shape, &mut rng).unwrap();
        assert!(t.to_f64_vec().iter().all(|x| x.abs() <= limit + 1e-6));
    }

    #[test]
    fn test_fans_overflow() {
        let err = fans(&Shape::from([1 << 40, 1 << 40, 1 << 20, 1 << 20])).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfig(_)), "{err}");
    }

    #[test]
    fn test_sample_overflowing_shape_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let shape = Shape::from([1 << 40, 1 << 40, 5, 5]);
        for init in [InitFn::Zeroes, InitFn::Ones, InitFn::GlorotN(1.0)] {
            assert!(init.sample(DType::F32, &shape, &mut rng).is_err(), "{}", init.name());
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(InitFn::GlorotN(1.0).name(), "glorot_normal");
        assert_eq!(InitFn::Gaussian { mean: 0.0, std: 1.0 }.name(), "gaussian");
    }

    #[test]
    fn test_invalid_gaussian() {
        let mut rng = StdRng::seed_from_u64(1);
        let init = InitFn::Gaussian { mean: 0.0, std: -1.0 };
        assert!(init.sample(DType::F32, &Shape::from([2]), &mut rng).is_err());
    }
}
