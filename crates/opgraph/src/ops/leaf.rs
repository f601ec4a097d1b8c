//! Leaf kinds: nodes that hold a value instead of reading inputs.

use crate::error::GraphError;
use crate::location::MemoryLocation;
use crate::op::{BackwardContext, Operation};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

use super::expect_arity;

/// A leaf holding a tensor value.
///
/// Used for trainable variables, constants and input placeholders; they
/// differ only in whether the node requires gradients.
#[derive(Debug, Clone)]
pub struct Variable<T: Scalar> {
    value: Tensor<T>,
}

impl<T: Scalar> Variable<T> {
    pub fn new(value: Tensor<T>) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Tensor<T> {
        &self.value
    }
}

impl<T: Scalar> Operation<T> for Variable<T> {
    fn name(&self) -> &str {
        "variable"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        expect_arity(self.name(), inputs, 0)?;
        Ok(self.value.shape().to_vec())
    }

    fn leaf_location(&self) -> Option<MemoryLocation> {
        Some(self.value.location())
    }

    fn forward(&self, _inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        output.copy_from(&self.value)?;
        Ok(())
    }

    fn backward(
        &self,
        _ctx: &BackwardContext<'_, T>,
        _input: usize,
    ) -> Result<Tensor<T>, GraphError> {
        Err(GraphError::InvalidOperation(
            "variable has no inputs to differentiate".to_string(),
        ))
    }

    fn set_value(&mut self, value: Tensor<T>) -> Result<(), GraphError> {
        self.value = value;
        Ok(())
    }
}
