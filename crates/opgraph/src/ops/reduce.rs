//! Reduction kinds.

use crate::error::GraphError;
use crate::op::{BackwardContext, Operation};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

use super::expect_arity;

/// Sum of all elements, producing a one-element tensor of shape `[1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceSum;

impl<T: Scalar> Operation<T> for ReduceSum {
    fn name(&self) -> &str {
        "reduce_sum"
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        expect_arity("reduce_sum", inputs, 1)?;
        Ok(vec![1])
    }

    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError> {
        let sum = inputs[0]
            .data()
            .iter()
            .fold(T::zero(), |acc, &x| acc + x);
        output.data_mut()[0] = sum;
        Ok(())
    }

    fn backward(&self, ctx: &BackwardContext<'_, T>, _input: usize) -> Result<Tensor<T>, GraphError> {
        let x = ctx.inputs[0];
        Ok(Tensor::full(x.shape(), ctx.upstream.data()[0]).with_location(x.location()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn test_reduce_sum() {
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let mut out = Tensor::zeros(&[1]);
        ReduceSum.forward(&[&x], &mut out).unwrap();
        assert_eq!(out.data(), &[10.0]);

        let g = Tensor::full(&[1], 0.5);
        let ctx = BackwardContext {
            consumer: NodeId(0),
            inputs: &[&x],
            output: &out,
            upstream: &g,
        };
        let dx = ReduceSum.backward(&ctx, 0).unwrap();
        assert_eq!(dx.shape(), &[2, 2]);
        assert!(dx.data().iter().all(|&v| v == 0.5));
    }
}
