//! Matrix product kind.

use crate::backend::matmul_into;
use crate::error::{GraphError, TensorError};
use crate::op::{BackwardContext, Operation};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

use super::expect_arity;

/// `A @ B` for rank-2 `A: [m, k]` and `B: [k, n]`.
///
/// Gradients follow the usual rules: `dA = G Bᵀ` and `dB = Aᵀ G`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatMul;

impl<T: Scalar> Operation<T> for MatMul {
    fn name(&self) -> &str {
        "matmul"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        expect_arity("matmul", inputs, 2)?;
        for shape in inputs {
            if shape.len() != 2 {
                return Err(TensorError::RankMismatch {
                    expected: 2,
                    actual: shape.len(),
                }
                .into());
            }
        }
        let (a, b) = (inputs[0], inputs[1]);
        if a[1] != b[0] {
            return Err(GraphError::shape_mismatch("matmul", &[a[1], b[1]], b));
        }
        Ok(vec![a[0], b[1]])
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        matmul_into(output, inputs[0], false, inputs[1], false)?;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, input: usize) -> Result<Tensor<T>, GraphError> {
        let (a, b) = (ctx.inputs[0], ctx.inputs[1]);
        let target = ctx.inputs[input];
        let mut grad = Tensor::zeros(target.shape()).with_location(target.location());
        if input == 0 {
            matmul_into(&mut grad, ctx.upstream, false, b, true)?;
        } else {
            matmul_into(&mut grad, a, true, ctx.upstream, false)?;
        }
        Ok(grad)
    }

    fn format(&self, inputs: &[String]) -> String {
        format!("({} @ {})", inputs[0], inputs[1])
    }
}
