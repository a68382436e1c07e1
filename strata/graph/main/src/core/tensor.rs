//! Dense, contiguous tensor values held by graph leaves and produced by evaluation.

use crate::api::error::{GraphError, GraphResult};
use crate::api::types::{DType, Shape};
use std::ops::{Add, Mul};

/// Scalar element types a tensor can hold.
pub(crate) trait Element:
    Copy + Default + Send + Sync + Add<Output = Self> + Mul<Output = Self> + 'static
{
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl Element for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// Typed backing buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Storage {
    fn len(&self) -> usize {
        match self {
            Storage::F32(v) => v.len(),
            Storage::F64(v) => v.len(),
        }
    }
}

/// A row-major tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
}

impl Tensor {
    pub fn new(storage: Storage, shape: impl Into<Shape>) -> GraphResult<Self> {
        let shape = shape.into();
        if storage.len() != shape.numel() {
            return Err(GraphError::InvalidConfig(format!(
                "{} elements cannot fill shape {}",
                storage.len(),
                shape
            )));
        }
        Ok(Self { storage, shape })
    }

    pub fn from_vec(data: Vec<f32>, shape: impl Into<Shape>) -> GraphResult<Self> {
        Self::new(Storage::F32(data), shape)
    }

    pub fn from_vec_f64(data: Vec<f64>, shape: impl Into<Shape>) -> GraphResult<Self> {
        Self::new(Storage::F64(data), shape)
    }

    pub fn full(dtype: DType, shape: impl Into<Shape>, value: f64) -> Self {
        let shape = shape.into();
        let n = shape.numel();
        let storage = match dtype {
            DType::F32 => Storage::F32(vec![value as f32; n]),
            DType::F64 => Storage::F64(vec![value; n]),
        };
        Self { storage, shape }
    }

    pub fn zeros(dtype: DType, shape: impl Into<Shape>) -> Self {
        Self::full(dtype, shape, 0.0)
    }

    /// Build a tensor of `dtype` from generated f64 samples.
    ///
    /// Fails instead of aborting when the shape's element count overflows or
    /// the buffer cannot be reserved.
    pub(crate) fn from_fn(dtype: DType, shape: Shape, f: impl FnMut() -> f64) -> GraphResult<Self> {
        let n = shape.try_numel().ok_or_else(|| {
            GraphError::InvalidConfig(format!("element count of shape {} overflows usize", shape))
        })?;
        let bytes = n.checked_mul(dtype.size()).ok_or_else(|| {
            GraphError::InvalidConfig(format!("byte size of {} tensor {} overflows usize", dtype, shape))
        })?;
        let storage = match dtype {
            DType::F32 => filled(n, f, |v| v as f32).map(Storage::F32),
            DType::F64 => filled(n, f, |v| v).map(Storage::F64),
        };
        let storage = storage.ok_or_else(|| GraphError::Allocation {
            shape: shape.clone(),
            dtype,
            bytes,
        })?;
        Ok(Self { storage, shape })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        match self.storage {
            Storage::F32(_) => DType::F32,
            Storage::F64(_) => DType::F64,
        }
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.storage {
            Storage::F32(v) => Some(v),
            Storage::F64(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.storage {
            Storage::F64(v) => Some(v),
            Storage::F32(_) => None,
        }
    }

    /// Copy of the elements widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.storage {
            Storage::F32(v) => v.iter().map(|&x| x as f64).collect(),
            Storage::F64(v) => v.clone(),
        }
    }

    /// Elementwise map through f64, preserving dtype and shape.
    pub(crate) fn map(&self, f: impl Fn(usize, f64) -> f64) -> Tensor {
        let storage = match &self.storage {
            Storage::F32(v) => Storage::F32(map_elems(v, f)),
            Storage::F64(v) => Storage::F64(map_elems(v, f)),
        };
        Tensor {
            storage,
            shape: self.shape.clone(),
        }
    }
}

fn filled<T>(n: usize, mut f: impl FnMut() -> f64, cast: impl Fn(f64) -> T) -> Option<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(n).ok()?;
    data.extend((0..n).map(|_| cast(f())));
    Some(data)
}

fn map_elems<T: Element>(data: &[T], f: impl Fn(usize, f64) -> f64) -> Vec<T> {
    data.iter()
        .enumerate()
        .map(|(i, &x)| T::from_f64(f(i, x.to_f64())))
        .collect()
}
