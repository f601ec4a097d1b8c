//! Error types for opgraph.

use thiserror::Error;

use crate::graph::NodeId;
use crate::location::MemoryLocation;

/// Errors raised by the dense tensor layer.
#[derive(Debug, Error)]
pub enum TensorError {
    /// Shape mismatch between data length and expected size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Two tensors that must agree in shape do not.
    #[error("incompatible shapes {lhs:?} and {rhs:?}")]
    IncompatibleShapes { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: usize, dim_size: usize },

    /// Wrong number of indices provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Operation requires specific tensor rank.
    #[error("expected tensor of rank {expected}, got rank {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// Shape contains a zero-sized dimension.
    #[error("shape {shape:?} has a zero-sized dimension")]
    ZeroDimension { shape: Vec<usize> },
}

/// Errors raised while building, evaluating or differentiating a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Input shapes are incompatible with the operation's shape rule.
    ///
    /// Raised at construction time; no node is inserted.
    #[error("{op}: shape mismatch, expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        op: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A gradient was requested for a variable the node never registered.
    #[error("node {node} has no gradient slot for variable {variable}")]
    GradientTargetNotFound { node: NodeId, variable: NodeId },

    /// The operation cannot run on the node's memory location.
    #[error("{op} cannot be evaluated in {location:?} memory")]
    UnsupportedMemoryLocation {
        op: String,
        location: MemoryLocation,
    },

    /// Inputs of one operation live in different memory locations.
    #[error("{op}: inputs live in {expected:?} and {actual:?} memory")]
    LocationMismatch {
        op: String,
        expected: MemoryLocation,
        actual: MemoryLocation,
    },

    /// The id does not name a live node of this graph.
    #[error("node {0} does not exist in this graph")]
    NodeNotFound(NodeId),

    /// Only root nodes may be destroyed; owned nodes go with their owner.
    #[error("node {node} is owned by node {owner}")]
    NodeOwned { node: NodeId, owner: NodeId },

    /// Destroying the subgraph would leave a live node with a dangling input.
    #[error("node {node} still feeds live node {user}")]
    SharedInput { node: NodeId, user: NodeId },

    /// The requested operation does not apply to this node.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Error from the tensor layer.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl GraphError {
    pub(crate) fn shape_mismatch(op: &str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            op: op.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
