//! Built-in operation kinds and the builders that insert them.
//!
//! Every builder validates its inputs before inserting, so a failed call
//! leaves the graph unchanged.
//!
//! # Example
//!
//! ```
//! use opgraph::{Graph, Tensor, ops};
//!
//! let mut g = Graph::new();
//! let x = ops::variable(&mut g, "x", Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap()).unwrap();
//! let y = ops::variable(&mut g, "y", Tensor::from_vec(vec![3.0, 4.0], &[2]).unwrap()).unwrap();
//! let z = ops::add(&mut g, x, y, true).unwrap();
//! assert_eq!(g.evaluate(z, false).unwrap().data(), &[4.0, 6.0]);
//! ```

mod activation;
mod elementwise;
mod leaf;
mod matmul;
mod reduce;
mod reshape;

pub use activation::{Relu, Sigmoid};
pub use elementwise::{Add, Product, Scale, Subtract};
pub use leaf::Variable;
pub use matmul::MatMul;
pub use reduce::ReduceSum;
pub use reshape::Reshape;

use crate::error::GraphError;
use crate::fill::TensorFiller;
use crate::graph::{Graph, NodeId};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

pub(crate) fn expect_arity(op: &str, inputs: &[&[usize]], arity: usize) -> Result<(), GraphError> {
    if inputs.len() != arity {
        return Err(GraphError::InvalidOperation(format!(
            "{op} takes {arity} inputs, got {}",
            inputs.len()
        )));
    }
    Ok(())
}

pub(crate) fn same_shape(op: &str, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
    expect_arity(op, inputs, 2)?;
    if inputs[0] != inputs[1] {
        return Err(GraphError::shape_mismatch(op, inputs[0], inputs[1]));
    }
    Ok(inputs[0].to_vec())
}

/// A trainable leaf holding `value`.
pub fn variable<T: Scalar>(
    graph: &mut Graph<T>,
    name: &str,
    value: Tensor<T>,
) -> Result<NodeId, GraphError> {
    graph.insert(name, Box::new(Variable::new(value)), &[], true)
}

/// A leaf holding `value` that never receives gradients.
pub fn constant<T: Scalar>(
    graph: &mut Graph<T>,
    name: &str,
    value: Tensor<T>,
) -> Result<NodeId, GraphError> {
    graph.insert(name, Box::new(Variable::new(value)), &[], false)
}

/// An input leaf of `shape`, initialized by `filler` in the graph's
/// default memory location. Feed it with [`Graph::set_value`].
pub fn placeholder<T: Scalar>(
    graph: &mut Graph<T>,
    name: &str,
    shape: &[usize],
    filler: TensorFiller,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    let value =
        Tensor::filled(shape, filler)?.with_location(graph.config().default_location());
    graph.insert(name, Box::new(Variable::new(value)), &[], requires_grad)
}

pub fn add<T: Scalar>(
    graph: &mut Graph<T>,
    a: NodeId,
    b: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("add", Box::new(Add), &[a, b], requires_grad)
}

pub fn subtract<T: Scalar>(
    graph: &mut Graph<T>,
    a: NodeId,
    b: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("subtract", Box::new(Subtract), &[a, b], requires_grad)
}

/// Element-wise (Hadamard) product.
pub fn product<T: Scalar>(
    graph: &mut Graph<T>,
    a: NodeId,
    b: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("product", Box::new(Product), &[a, b], requires_grad)
}

pub fn scale<T: Scalar>(
    graph: &mut Graph<T>,
    x: NodeId,
    alpha: T,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("scale", Box::new(Scale { alpha }), &[x], requires_grad)
}

/// Matrix product of two rank-2 nodes.
pub fn matmul<T: Scalar>(
    graph: &mut Graph<T>,
    a: NodeId,
    b: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("matmul", Box::new(MatMul), &[a, b], requires_grad)
}

pub fn relu<T: Scalar>(
    graph: &mut Graph<T>,
    x: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("relu", Box::new(Relu), &[x], requires_grad)
}

pub fn sigmoid<T: Scalar>(
    graph: &mut Graph<T>,
    x: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("sigmoid", Box::new(Sigmoid), &[x], requires_grad)
}

/// Sum of all elements, shape `[1]`.
pub fn reduce_sum<T: Scalar>(
    graph: &mut Graph<T>,
    x: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("reduce_sum", Box::new(ReduceSum), &[x], requires_grad)
}

pub fn reshape<T: Scalar>(
    graph: &mut Graph<T>,
    x: NodeId,
    shape: &[usize],
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    graph.insert("reshape", Box::new(Reshape::new(shape)), &[x], requires_grad)
}

/// Collapse every dimension after the first: `[n, a, b, ..] -> [n, a*b*..]`.
pub fn flatten<T: Scalar>(
    graph: &mut Graph<T>,
    x: NodeId,
    requires_grad: bool,
) -> Result<NodeId, GraphError> {
    let kind = Reshape::flatten(graph.output_shape(x)?);
    graph.insert("flatten", Box::new(kind), &[x], requires_grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::location::MemoryLocation;

    #[test]
    fn test_failed_builder_leaves_graph_unchanged() {
        let mut g: Graph<f64> = Graph::new();
        let a = variable(&mut g, "a", Tensor::zeros(&[2, 3])).unwrap();
        let b = variable(&mut g, "b", Tensor::zeros(&[3, 2])).unwrap();
        assert!(matches!(
            add(&mut g, a, b, true),
            Err(GraphError::ShapeMismatch { .. })
        ));
        assert_eq!(g.len(), 2);
        assert!(g.consumers(a).unwrap().is_empty());
        assert_eq!(g.owner(a).unwrap(), None);
    }

    #[test]
    fn test_placeholder_uses_default_location() {
        let mut g: Graph<f64> =
            Graph::with_config(GraphConfig::new().with_default_location(MemoryLocation::Managed));
        let x = placeholder(&mut g, "x", &[2, 2], TensorFiller::Constant(1.0), false).unwrap();
        assert_eq!(g.memory_location(x).unwrap(), MemoryLocation::Managed);
        assert!(!g.requires_grad(x).unwrap());
        assert_eq!(g.evaluate(x, false).unwrap().data(), &[1.0; 4]);
    }

    #[test]
    fn test_flatten_builder() {
        let mut g: Graph<f64> = Graph::new();
        let x = variable(&mut g, "x", Tensor::ones(&[2, 3, 4])).unwrap();
        let f = flatten(&mut g, x, true).unwrap();
        assert_eq!(g.output_shape(f).unwrap(), &[2, 12]);
        assert_eq!(g.output_size(f).unwrap(), 24);
        assert_eq!(g.display_name(f).unwrap(), "flatten");
        assert_eq!(g.kind_name(f).unwrap(), "reshape");
    }

    #[test]
    fn test_unknown_input() {
        let mut g: Graph<f64> = Graph::new();
        let a = variable(&mut g, "a", Tensor::ones(&[1])).unwrap();
        g.destroy(a).unwrap();
        let b = variable(&mut g, "b", Tensor::ones(&[1])).unwrap();
        assert!(matches!(
            add(&mut g, a, b, true),
            Err(GraphError::NodeNotFound(id)) if id == a
        ));
    }
}
