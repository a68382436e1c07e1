//! Core types shared by graph nodes and tensors

use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

/// Element type of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    #[default]
    F32,
    F64,
}

impl DType {
    /// Per-element byte size
    pub fn size(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "float32"),
            DType::F64 => write!(f, "float64"),
        }
    }
}

/// Dimensions of a node. Stack-allocated for up to four dims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(SmallVec<[usize; 4]>);

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Shape(SmallVec::from_slice(dims))
    }

    /// Shape of a rank-0 value.
    pub fn scalar() -> Self {
        Shape(SmallVec::new())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Number of elements. A scalar holds one.
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Number of elements, or `None` if the product overflows `usize`.
    pub fn try_numel(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(SmallVec::from_vec(v))
    }
}

impl From<&[usize]> for Shape {
    fn from(v: &[usize]) -> Self {
        Shape::new(v)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(v: [usize; N]) -> Self {
        Shape::new(&v)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, ")")
    }
}

/// A Hindley-Milner style type term describing what a layer maps from and to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Type variable such as `a`
    Var(char),
    /// Function type `arg → ret`
    Fn(Box<Type>, Box<Type>),
}

impl Type {
    pub fn var(name: char) -> Self {
        Type::Var(name)
    }

    pub fn fn_of(arg: Type, ret: Type) -> Self {
        Type::Fn(Box::new(arg), Box::new(ret))
    }

    pub fn is_fn(&self) -> bool {
        matches!(self, Type::Fn(..))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var(c) => write!(f, "{}", c),
            Type::Fn(a, b) if a.is_fn() => write!(f, "({}) → {}", a, b),
            Type::Fn(a, b) => write!(f, "{} → {}", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::from([6, 3, 5, 5]).to_string(), "(6, 3, 5, 5)");
        assert_eq!(Shape::scalar().to_string(), "()");
    }

    #[test]
    fn test_shape_numel() {
        assert_eq!(Shape::from([2, 3, 4]).numel(), 24);
        assert_eq!(Shape::scalar().numel(), 1);
        assert_eq!(Shape::from(vec![1, 3, 32, 32]).ndim(), 4);
    }

    #[test]
    fn test_shape_try_numel_overflow() {
        assert_eq!(Shape::from([2, 3, 4]).try_numel(), Some(24));
        assert_eq!(Shape::scalar().try_numel(), Some(1));
        assert_eq!(Shape::from([1 << 40, 1 << 40, 5, 5]).try_numel(), None);
    }

    #[test]
    fn test_fn_type_display() {
        let t = Type::fn_of(Type::var('a'), Type::var('b'));
        assert_eq!(t.to_string(), "a → b");
        let nested = Type::fn_of(t.clone(), Type::var('c'));
        assert_eq!(nested.to_string(), "(a → b) → c");
    }
}
