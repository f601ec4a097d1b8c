//! Memoized forward evaluation.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::{Graph, NodeId};
use crate::error::GraphError;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

impl<T: Scalar> Graph<T> {
    /// Produce the output of `id`, computing it if needed.
    ///
    /// With `recompute == false` a valid cached output is returned without
    /// touching the inputs. Otherwise the inputs are evaluated with the same
    /// flag, the kind's forward rule is run into the node's output buffer and
    /// the node is marked computed. The buffer is allocated on first use and
    /// reused afterwards.
    ///
    /// A forced recompute runs every node of the subgraph exactly once per
    /// call, however many paths lead to it.
    ///
    /// # Errors
    ///
    /// - `UnsupportedMemoryLocation` if the kind cannot run where the node lives
    /// - any error raised by an input or by the forward rule; the node is
    ///   left not computed in that case
    pub fn evaluate(&mut self, id: NodeId, recompute: bool) -> Result<&Tensor<T>, GraphError> {
        let mut refreshed = HashSet::new();
        self.refresh(id, recompute, &mut refreshed)?;
        self.cached_output(id)
    }

    fn refresh(
        &mut self,
        id: NodeId,
        recompute: bool,
        refreshed: &mut HashSet<NodeId>,
    ) -> Result<(), GraphError> {
        let node = self.node(id)?;
        let cached = node.state.computed && node.output.is_some();
        if cached && (!recompute || refreshed.contains(&id)) {
            trace!(node = %id, "evaluate: cache hit");
            return Ok(());
        }
        if !node.kind.supports(node.location) {
            return Err(GraphError::UnsupportedMemoryLocation {
                op: node.kind.name().to_string(),
                location: node.location,
            });
        }

        let inputs = node.inputs.clone();
        for &input in &inputs {
            self.refresh(input, recompute, refreshed)?;
        }

        let node = self.node_mut(id)?;
        node.state.computed = true;
        let mut out = match node.output.take() {
            Some(buffer) if buffer.shape() == node.shape.as_slice() => buffer,
            _ => Tensor::zeros(&node.shape).with_location(node.location),
        };
        out.set_context(node.context);

        let result = self
            .input_values(&inputs)
            .and_then(|values| self.node(id)?.kind.forward(&values, &mut out));

        let node = self.node_mut(id)?;
        node.output = Some(out);
        if let Err(err) = result {
            node.state.computed = false;
            return Err(err);
        }
        refreshed.insert(id);
        debug!(node = %id, kind = node.kind.name(), "evaluated");
        Ok(())
    }

    /// Invalidate the cached output and every cached gradient of `id`.
    ///
    /// The output buffer is kept for reuse by the next evaluation; its
    /// contents are stale until then. Consumers are not reset.
    pub fn reset(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.state.computed = false;
        node.clear_gradients();
        trace!(node = %id, "reset");
        Ok(())
    }

    /// Reset `id` and everything it reads from, transitively.
    pub fn reset_subgraph(&mut self, id: NodeId) -> Result<(), GraphError> {
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            self.reset(current)?;
            stack.extend(self.node(current)?.inputs.iter().copied());
        }
        Ok(())
    }

    /// Replace the value held by a leaf node.
    ///
    /// The new value must keep the node's shape and location. The leaf is
    /// reset; nodes that read it keep their caches until they are reset or
    /// evaluated with `recompute`.
    pub fn set_value(&mut self, id: NodeId, value: Tensor<T>) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        if value.shape() != node.shape.as_slice() {
            return Err(GraphError::shape_mismatch(
                node.kind.name(),
                &node.shape,
                value.shape(),
            ));
        }
        if value.location() != node.location {
            return Err(GraphError::LocationMismatch {
                op: node.kind.name().to_string(),
                expected: node.location,
                actual: value.location(),
            });
        }
        node.kind.set_value(value)?;
        self.reset(id)
    }

    pub(crate) fn cached_output(&self, id: NodeId) -> Result<&Tensor<T>, GraphError> {
        self.node(id)?.output.as_ref().ok_or_else(|| {
            GraphError::InvalidOperation(format!("node {id} has no cached output"))
        })
    }

    pub(crate) fn input_values(&self, inputs: &[NodeId]) -> Result<Vec<&Tensor<T>>, GraphError> {
        inputs.iter().map(|&i| self.cached_output(i)).collect()
    }
}
