//! Element-wise activation kinds.

use crate::backend::{map_into, zip};
use crate::error::GraphError;
use crate::op::{BackwardContext, Operation};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

use super::expect_arity;

fn unary_shape(op: &str, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
    expect_arity(op, inputs, 1)?;
    Ok(inputs[0].to_vec())
}

/// `max(x, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl<T: Scalar> Operation<T> for Relu {
    fn name(&self) -> &str {
        "relu"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        unary_shape("relu", inputs)
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        map_into(output, inputs[0], |x| if x > T::zero() { x } else { T::zero() })?;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, _input: usize) -> Result<Tensor<T>, GraphError> {
        Ok(zip(ctx.upstream, ctx.inputs[0], |g, x| {
            if x > T::zero() { g } else { T::zero() }
        })?)
    }
}

/// Logistic function `1 / (1 + exp(-x))`.
///
/// The local rule reuses the cached output: `s * (1 - s)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl<T: Scalar> Operation<T> for Sigmoid {
    fn name(&self) -> &str {
        "sigmoid"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        unary_shape("sigmoid", inputs)
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        map_into(output, inputs[0], |x| {
            T::one() / (T::one() + (-x).exponential())
        })?;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, _input: usize) -> Result<Tensor<T>, GraphError> {
        Ok(zip(ctx.upstream, ctx.output, |g, s| g * s * (T::one() - s))?)
    }
}
