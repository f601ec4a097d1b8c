//! Shape-only kinds. The buffer is copied unchanged; only the shape differs.

use crate::error::GraphError;
use crate::op::{BackwardContext, Operation};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

use super::expect_arity;

/// View the input under a new shape with the same number of elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reshape {
    shape: Vec<usize>,
}

impl Reshape {
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
        }
    }

    /// Reshape to `[batch, rest]`, keeping the leading dimension.
    pub fn flatten(input_shape: &[usize]) -> Self {
        let batch = input_shape.first().copied().unwrap_or(1);
        let rest: usize = input_shape.iter().skip(1).product();
        Self::new(&[batch, rest])
    }
}

impl<T: Scalar> Operation<T> for Reshape {
    fn name(&self) -> &str {
        "reshape"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        expect_arity("reshape", inputs, 1)?;
        let from: usize = inputs[0].iter().product();
        let to: usize = self.shape.iter().product();
        if from != to {
            return Err(GraphError::shape_mismatch("reshape", inputs[0], &self.shape));
        }
        Ok(self.shape.clone())
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        output.data_mut().copy_from_slice(inputs[0].data());
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, _input: usize) -> Result<Tensor<T>, GraphError> {
        let x = ctx.inputs[0];
        let grad = ctx.upstream.clone().reshape(x.shape())?;
        Ok(grad)
    }

    fn format(&self, inputs: &[String]) -> String {
        format!("reshape({}, {:?})", inputs[0], self.shape)
    }
}
