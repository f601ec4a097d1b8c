//! Element-wise arithmetic kinds.
//!
//! Binary kinds require identical input shapes; there is no broadcasting.

use crate::backend::{map, map_into, scale, zip, zip_into};
use crate::error::GraphError;
use crate::op::{BackwardContext, Operation};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

use super::{expect_arity, same_shape};

/// `a + b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl<T: Scalar> Operation<T> for Add {
    fn name(&self) -> &str {
        "add"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        same_shape("add", inputs)
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        zip_into(output, inputs[0], inputs[1], |a, b| a + b)?;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, _input: usize) -> Result<Tensor<T>, GraphError> {
        Ok(ctx.upstream.clone())
    }

    fn format(&self, inputs: &[String]) -> String {
        format!("({} + {})", inputs[0], inputs[1])
    }
}

/// `a - b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subtract;

impl<T: Scalar> Operation<T> for Subtract {
    fn name(&self) -> &str {
        "subtract"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        same_shape("subtract", inputs)
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        zip_into(output, inputs[0], inputs[1], |a, b| a - b)?;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, input: usize) -> Result<Tensor<T>, GraphError> {
        if input == 0 {
            Ok(ctx.upstream.clone())
        } else {
            Ok(map(ctx.upstream, |g| -g))
        }
    }

    fn format(&self, inputs: &[String]) -> String {
        format!("({} - {})", inputs[0], inputs[1])
    }
}

/// Hadamard product `a * b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Product;

impl<T: Scalar> Operation<T> for Product {
    fn name(&self) -> &str {
        "product"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        same_shape("product", inputs)
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        zip_into(output, inputs[0], inputs[1], |a, b| a * b)?;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, input: usize) -> Result<Tensor<T>, GraphError> {
        let other = ctx.inputs[1 - input];
        Ok(zip(ctx.upstream, other, |g, v| g * v)?)
    }

    fn format(&self, inputs: &[String]) -> String {
        format!("({} * {})", inputs[0], inputs[1])
    }
}

/// `alpha * x` for a fixed scalar `alpha`.
#[derive(Debug, Clone, Copy)]
pub struct Scale<T: Scalar> {
    pub alpha: T,
}

impl<T: Scalar> Operation<T> for Scale<T> {
    fn name(&self) -> &str {
        "scale"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        expect_arity("scale", inputs, 1)?;
        Ok(inputs[0].to_vec())
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        let alpha = self.alpha;
        map_into(output, inputs[0], |x| alpha * x)?;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, _input: usize) -> Result<Tensor<T>, GraphError> {
        Ok(scale(ctx.upstream, self.alpha))
    }

    fn format(&self, inputs: &[String]) -> String {
        format!("({:?} * {})", self.alpha, inputs[0])
    }
}
