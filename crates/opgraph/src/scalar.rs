//! Scalar trait for tensor element types.

use faer_traits::ComplexField;
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Trait for element types a graph can compute with.
///
/// This wraps faer's `ComplexField` (so matmul can dispatch to faer) with
/// the real-valued arithmetic the built-in operation kinds need.
pub trait Scalar:
    ComplexField
    + Copy
    + Debug
    + Default
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;

    /// Lossy conversion from `f64`.
    fn from_f64(value: f64) -> Self;

    /// Natural exponential.
    fn exponential(self) -> Self;
}

impl Scalar for f64 {
    fn one() -> Self {
        1.0
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn exponential(self) -> Self {
        self.exp()
    }
}

impl Scalar for f32 {
    fn one() -> Self {
        1.0
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn exponential(self) -> Self {
        self.exp()
    }
}
