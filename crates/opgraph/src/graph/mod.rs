//! Operation graph arena.
//!
//! A [`Graph`] owns every node it creates. Nodes refer to their inputs and
//! consumers by [`NodeId`]; consumer links are non-owning and are pruned when
//! a consumer is destroyed. Ownership of a node passes to the first node
//! built on top of it, and [`Graph::destroy`] frees a root together with
//! everything it transitively owns.
//!
//! Evaluation, gradients and context propagation live in the `eval`, `grad`
//! and `propagate` submodules.

mod eval;
mod grad;
mod node;
mod propagate;

pub use node::{NodeId, NodeState};

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::GraphConfig;
use crate::context::ExecutionContext;
use crate::error::{GraphError, TensorError};
use crate::location::MemoryLocation;
use crate::op::Operation;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

use node::{Inputs, Node};

/// A graph of lazily evaluated tensor operations.
pub struct Graph<T: Scalar> {
    nodes: Vec<Option<Node<T>>>,
    live: usize,
    config: GraphConfig,
}

impl<T: Scalar> Graph<T> {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph with explicit defaults.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: Vec::new(),
            live: 0,
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    /// Ids of all live nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|_| NodeId(i)))
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node<T>, GraphError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<T>, GraphError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Insert a node of kind `kind` reading from `inputs`.
    ///
    /// The output shape is inferred once, here. Inputs that have no owner
    /// yet become owned by the new node. When both the new node and an input
    /// require gradients, the new node is registered as a consumer of that
    /// input and gets an empty gradient slot for it.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if an input is not a live node
    /// - `ShapeMismatch` if the kind rejects the input shapes
    /// - `LocationMismatch` if inputs live in different memory locations
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        kind: Box<dyn Operation<T>>,
        inputs: &[NodeId],
        requires_grad: bool,
    ) -> Result<NodeId, GraphError> {
        let (shape, location) = {
            let mut input_shapes: SmallVec<[&[usize]; 2]> = SmallVec::new();
            let mut location: Option<MemoryLocation> = None;
            for &input in inputs {
                let node = self.node(input)?;
                input_shapes.push(&node.shape);
                match location {
                    None => location = Some(node.location),
                    Some(expected) if expected != node.location => {
                        return Err(GraphError::LocationMismatch {
                            op: kind.name().to_string(),
                            expected,
                            actual: node.location,
                        });
                    }
                    Some(_) => {}
                }
            }
            (kind.output_shape(&input_shapes)?, location)
        };
        if shape.iter().any(|&d| d == 0) {
            return Err(TensorError::ZeroDimension { shape }.into());
        }
        let location = location
            .or_else(|| kind.leaf_location())
            .unwrap_or(self.config.default_location());

        let id = NodeId(self.nodes.len());
        let mut grad_cache = HashMap::new();
        for &input in inputs {
            let node = self.node_mut(input)?;
            if node.owner.is_none() {
                node.owner = Some(id);
            }
            if requires_grad && node.requires_grad {
                if !node.consumers.contains(&id) {
                    node.consumers.push(id);
                }
                grad_cache.insert(input, None);
            }
        }

        let name = name.into();
        debug!(node = %id, kind = kind.name(), name = %name, ?shape, "insert node");
        self.nodes.push(Some(Node {
            name,
            kind,
            inputs: inputs.iter().copied().collect::<Inputs>(),
            consumers: Vec::new(),
            owner: None,
            shape,
            location,
            context: self.config.default_context(),
            requires_grad,
            output: None,
            state: NodeState::default(),
            grad_cache,
        }));
        self.live += 1;
        Ok(id)
    }

    /// Register `consumer` as a consumer of `node`.
    ///
    /// `consumer` must read `node` and both must require gradients. The call
    /// is idempotent. Construction already performs this registration; the
    /// method exists for kinds wired up by hand.
    pub fn add_consumer(&mut self, node: NodeId, consumer: NodeId) -> Result<(), GraphError> {
        let node_requires_grad = self.node(node)?.requires_grad;
        let c = self.node_mut(consumer)?;
        if !c.inputs.contains(&node) {
            return Err(GraphError::InvalidOperation(format!(
                "node {consumer} does not read node {node}"
            )));
        }
        if !(c.requires_grad && node_requires_grad) {
            return Err(GraphError::InvalidOperation(format!(
                "consumer link {node} -> {consumer} needs both nodes to require gradients"
            )));
        }
        c.grad_cache.entry(node).or_insert(None);
        let n = self.node_mut(node)?;
        if !n.consumers.contains(&consumer) {
            n.consumers.push(consumer);
        }
        Ok(())
    }

    /// Destroy `root` and every node it transitively owns.
    ///
    /// Returns the number of nodes freed. Consumer links from surviving
    /// inputs to freed nodes are removed.
    ///
    /// # Errors
    ///
    /// - `NodeOwned` if `root` has an owner; destroy the owner instead
    /// - `SharedInput` if a node in the owned set still feeds a live node
    ///   outside it; nothing is freed in that case
    pub fn destroy(&mut self, root: NodeId) -> Result<usize, GraphError> {
        if let Some(owner) = self.node(root)?.owner {
            return Err(GraphError::NodeOwned { node: root, owner });
        }

        let mut doomed: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !doomed.insert(id) {
                continue;
            }
            let node = self.node(id)?;
            for &input in &node.inputs {
                if self.node(input)?.owner == Some(id) {
                    stack.push(input);
                }
            }
        }

        for user in self.node_ids() {
            if doomed.contains(&user) {
                continue;
            }
            let node = self.node(user)?;
            if let Some(&shared) = node.inputs.iter().find(|i| doomed.contains(i)) {
                return Err(GraphError::SharedInput { node: shared, user });
            }
        }

        for &id in &doomed {
            let inputs = self.node(id)?.inputs.clone();
            for input in inputs {
                if doomed.contains(&input) {
                    continue;
                }
                self.node_mut(input)?.consumers.retain(|c| *c != id);
            }
        }

        for &id in &doomed {
            trace!(node = %id, "free node");
            self.nodes[id.0] = None;
        }
        self.live -= doomed.len();
        debug!(root = %root, freed = doomed.len(), "destroy subgraph");
        Ok(doomed.len())
    }

    /// Human-readable name given at construction.
    pub fn display_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(&self.node(id)?.name)
    }

    /// Name of the node's kind, e.g. `"add"`.
    pub fn kind_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.node(id)?.kind.name())
    }

    /// Output shape inferred at construction.
    pub fn output_shape(&self, id: NodeId) -> Result<&[usize], GraphError> {
        Ok(&self.node(id)?.shape)
    }

    /// Number of elements of the output.
    pub fn output_size(&self, id: NodeId) -> Result<usize, GraphError> {
        Ok(self.node(id)?.output_size())
    }

    pub fn memory_location(&self, id: NodeId) -> Result<MemoryLocation, GraphError> {
        Ok(self.node(id)?.location)
    }

    pub fn execution_context(&self, id: NodeId) -> Result<ExecutionContext, GraphError> {
        Ok(self.node(id)?.context)
    }

    pub fn requires_grad(&self, id: NodeId) -> Result<bool, GraphError> {
        Ok(self.node(id)?.requires_grad)
    }

    pub fn state(&self, id: NodeId) -> Result<NodeState, GraphError> {
        Ok(self.node(id)?.state)
    }

    pub fn inputs(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        Ok(&self.node(id)?.inputs)
    }

    /// Downstream nodes registered for gradient flow.
    pub fn consumers(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        Ok(&self.node(id)?.consumers)
    }

    /// The node responsible for destroying `id`, if any.
    pub fn owner(&self, id: NodeId) -> Result<Option<NodeId>, GraphError> {
        Ok(self.node(id)?.owner)
    }

    /// Cached output, without evaluating.
    pub fn output(&self, id: NodeId) -> Result<Option<&Tensor<T>>, GraphError> {
        Ok(self.node(id)?.output.as_ref())
    }

    /// Render the expression rooted at `id`, e.g. `(x * y) + x`.
    pub fn to_expression(&self, id: NodeId) -> Result<String, GraphError> {
        let node = self.node(id)?;
        if node.inputs.is_empty() {
            return Ok(node.name.clone());
        }
        let rendered = node
            .inputs
            .iter()
            .map(|&input| self.to_expression(input))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(node.kind.format(&rendered))
    }
}

impl<T: Scalar> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Debug for Graph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("num_nodes", &self.live)
            .field("next_id", &self.nodes.len())
            .field("config", &self.config)
            .finish()
    }
}
