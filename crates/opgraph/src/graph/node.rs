//! Node records stored in the graph arena.

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

use crate::context::ExecutionContext;
use crate::location::MemoryLocation;
use crate::op::Operation;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Unique identifier for a node in a [`Graph`](super::Graph).
///
/// Ids are never reused within a graph, so an id held after its node has
/// been destroyed resolves to `NodeNotFound` rather than to a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in creation order.
    pub fn index(self) -> usize {
        self.0
    }

    /// Rebuild an id from [`NodeId::index`], e.g. after crossing an FFI
    /// boundary. An index the graph never issued resolves to `NodeNotFound`.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cache flags of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeState {
    /// The cached output is valid.
    pub computed: bool,
    /// At least one gradient slot holds a cached value.
    pub gradient_computed: bool,
}

pub(crate) type Inputs = SmallVec<[NodeId; 2]>;

pub(crate) struct Node<T: Scalar> {
    pub(crate) name: String,
    pub(crate) kind: Box<dyn Operation<T>>,
    pub(crate) inputs: Inputs,
    pub(crate) consumers: Vec<NodeId>,
    pub(crate) owner: Option<NodeId>,
    pub(crate) shape: Vec<usize>,
    pub(crate) location: MemoryLocation,
    pub(crate) context: ExecutionContext,
    pub(crate) requires_grad: bool,
    pub(crate) output: Option<Tensor<T>>,
    pub(crate) state: NodeState,
    // One slot per registered input variable; `None` until computed.
    pub(crate) grad_cache: HashMap<NodeId, Option<Tensor<T>>>,
}

impl<T: Scalar> Node<T> {
    pub(crate) fn output_size(&self) -> usize {
        self.shape.iter().product()
    }

    pub(crate) fn clear_gradients(&mut self) {
        for slot in self.grad_cache.values_mut() {
            *slot = None;
        }
        self.state.gradient_computed = false;
    }
}

impl<T: Scalar> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind.name())
            .field("inputs", &self.inputs)
            .field("consumers", &self.consumers)
            .field("owner", &self.owner)
            .field("shape", &self.shape)
            .field("location", &self.location)
            .field("state", &self.state)
            .finish()
    }
}
