//! Initial values for variable tensors.
//!
//! A [`TensorFiller`] describes how a freshly allocated tensor is
//! initialized; layer builders use it to create weights.

use rand::Rng;
use rand::distr::StandardUniform;
use rand_distr::StandardNormal;

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// How to initialize a new tensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TensorFiller {
    /// Leave the tensor zeroed.
    #[default]
    None,
    /// Every element set to the value.
    Constant(f64),
    /// Ones on the main diagonal of a 2-D tensor, zeros elsewhere.
    Identity,
    /// Uniform samples in `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Normal samples with the given mean and standard deviation.
    Normal { mean: f64, std_dev: f64 },
    /// Glorot (Xavier) uniform, bounded by `sqrt(6 / (fan_in + fan_out))`.
    Glorot,
}

impl<ElT: Scalar> Tensor<ElT> {
    /// Create a tensor initialized by `filler` using the thread RNG.
    ///
    /// # Example
    ///
    /// ```
    /// use opgraph::{Tensor, TensorFiller};
    ///
    /// let t: Tensor<f64> = Tensor::filled(&[2, 3], TensorFiller::Constant(0.5)).unwrap();
    /// assert!(t.data().iter().all(|&x| x == 0.5));
    /// ```
    pub fn filled(shape: &[usize], filler: TensorFiller) -> Result<Self, TensorError> {
        Self::filled_with_rng(shape, filler, &mut rand::rng())
    }

    /// Create a tensor initialized by `filler` using a specific RNG.
    ///
    /// This is useful for reproducible results with a seeded RNG.
    ///
    /// # Errors
    ///
    /// `TensorFiller::Identity` requires a 2-D shape.
    pub fn filled_with_rng<R: Rng>(
        shape: &[usize],
        filler: TensorFiller,
        rng: &mut R,
    ) -> Result<Self, TensorError> {
        let mut t = Self::zeros(shape);
        match filler {
            TensorFiller::None => {}
            TensorFiller::Constant(value) => t.fill(ElT::from_f64(value)),
            TensorFiller::Identity => {
                if shape.len() != 2 {
                    return Err(TensorError::RankMismatch {
                        expected: 2,
                        actual: shape.len(),
                    });
                }
                for i in 0..shape[0].min(shape[1]) {
                    t.set(&[i, i], ElT::one())?;
                }
            }
            TensorFiller::Uniform { low, high } => {
                for x in t.data_mut() {
                    let u: f64 = rng.sample(StandardUniform);
                    *x = ElT::from_f64(low + (high - low) * u);
                }
            }
            TensorFiller::Normal { mean, std_dev } => {
                for x in t.data_mut() {
                    let n: f64 = rng.sample(StandardNormal);
                    *x = ElT::from_f64(mean + std_dev * n);
                }
            }
            TensorFiller::Glorot => {
                let fan_in = shape.first().copied().unwrap_or(1);
                let fan_out = shape.get(1).copied().unwrap_or(1);
                let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
                for x in t.data_mut() {
                    let u: f64 = rng.sample(StandardUniform);
                    *x = ElT::from_f64(bound * (2.0 * u - 1.0));
                }
            }
        }
        Ok(t)
    }
}
