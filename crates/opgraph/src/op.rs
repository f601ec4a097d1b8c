//! The capability interface every node kind implements.

use std::fmt::Debug;

use crate::error::GraphError;
use crate::graph::NodeId;
use crate::location::MemoryLocation;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Values available to a local gradient rule.
#[derive(Debug, Clone, Copy)]
pub struct BackwardContext<'a, T: Scalar> {
    /// Downstream node the request is made for.
    pub consumer: NodeId,
    /// Forward values of this node's inputs, in input order.
    pub inputs: &'a [&'a Tensor<T>],
    /// This node's cached forward output.
    pub output: &'a Tensor<T>,
    /// Gradient of the loss with respect to this node's output.
    pub upstream: &'a Tensor<T>,
}

/// A kind of node in an operation graph.
///
/// The graph owns wiring, caching and context propagation; a kind only
/// knows how to infer its output shape, compute its output and compute the
/// local gradient towards one of its inputs.
///
/// Kinds must be `Send` so a whole graph can move to another thread.
pub trait Operation<T: Scalar>: Debug + Send {
    /// Short name of the kind, e.g. `"add"`.
    fn name(&self) -> &str;

    /// Infer the output shape from the input shapes.
    ///
    /// Returns `GraphError::ShapeMismatch` when the inputs violate the
    /// kind's shape rule. Called once, at construction.
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError>;

    /// Memory location of a node without inputs.
    fn leaf_location(&self) -> Option<MemoryLocation> {
        None
    }

    /// Whether the kind can evaluate in `location`.
    fn supports(&self, location: MemoryLocation) -> bool {
        location.is_host_accessible()
    }

    /// Write this node's value into `output`, which already has the
    /// declared output shape.
    fn forward(&self, inputs: &[&Tensor<T>], output: &mut Tensor<T>) -> Result<(), GraphError>;

    /// Contribution of this node to the gradient of `inputs[input]`.
    ///
    /// The result has the shape of that input.
    fn backward(&self, ctx: &BackwardContext<'_, T>, input: usize)
    -> Result<Tensor<T>, GraphError>;

    /// Replace the value held by a leaf kind.
    fn set_value(&mut self, _value: Tensor<T>) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{} does not hold a value",
            self.name()
        )))
    }

    /// Render the expression given the rendered inputs.
    fn format(&self, inputs: &[String]) -> String {
        format!("{}({})", self.name(), inputs.join(", "))
    }
}
