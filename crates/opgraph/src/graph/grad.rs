//! Per-node gradient computation and caching.

use tracing::{debug, trace};

use super::{Graph, NodeId};
use crate::backend::add_assign;
use crate::error::GraphError;
use crate::op::BackwardContext;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

impl<T: Scalar> Graph<T> {
    /// Gradient contribution of `node` towards its input `variable`.
    ///
    /// `upstream` is the gradient of the loss with respect to this node's
    /// output and must have the node's output shape. `consumer` names the
    /// downstream node on whose behalf the request is made: a registered
    /// consumer of `node`, or `node` itself when `upstream` is already the
    /// total over all consumers. When `variable` appears at several input
    /// positions the local rules are summed.
    ///
    /// With `recompute == false` a cached result for `variable` is returned
    /// as is. The node's forward output is evaluated first if it is missing.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if `node` or `consumer` is not a live node
    /// - `InvalidOperation` if `consumer` is neither `node` nor one of its
    ///   registered consumers
    /// - `GradientTargetNotFound` if `variable` has no gradient slot here
    /// - `ShapeMismatch` if `upstream` does not match the output shape
    pub fn gradient(
        &mut self,
        node: NodeId,
        consumer: NodeId,
        variable: NodeId,
        upstream: &Tensor<T>,
        recompute: bool,
    ) -> Result<&Tensor<T>, GraphError> {
        let n = self.node(node)?;
        if consumer != node {
            self.node(consumer)?;
            if !n.consumers.contains(&consumer) {
                return Err(GraphError::InvalidOperation(format!(
                    "node {consumer} is not a consumer of node {node}"
                )));
            }
        }
        let Some(slot) = n.grad_cache.get(&variable) else {
            return Err(GraphError::GradientTargetNotFound { node, variable });
        };
        if !recompute && slot.is_some() {
            trace!(node = %node, variable = %variable, "gradient: cache hit");
            return self.cached_gradient_ref(node, variable);
        }
        if upstream.shape() != n.shape.as_slice() {
            return Err(GraphError::shape_mismatch(
                n.kind.name(),
                &n.shape,
                upstream.shape(),
            ));
        }

        self.evaluate(node, false)?;

        let n = self.node(node)?;
        let inputs = self.input_values(&n.inputs)?;
        let ctx = BackwardContext {
            consumer,
            inputs: &inputs,
            output: self.cached_output(node)?,
            upstream,
        };
        let mut total: Option<Tensor<T>> = None;
        for (position, _) in n.inputs.iter().enumerate().filter(|(_, i)| **i == variable) {
            let local = n.kind.backward(&ctx, position)?;
            if local.shape() != inputs[position].shape() {
                return Err(GraphError::shape_mismatch(
                    n.kind.name(),
                    inputs[position].shape(),
                    local.shape(),
                ));
            }
            total = Some(match total.take() {
                Some(mut acc) => {
                    add_assign(&mut acc, &local)?;
                    acc
                }
                None => local,
            });
        }
        let Some(total) = total else {
            return Err(GraphError::GradientTargetNotFound { node, variable });
        };

        let n = self.node_mut(node)?;
        n.grad_cache.insert(variable, Some(total));
        n.state.gradient_computed = true;
        debug!(node = %node, variable = %variable, kind = n.kind.name(), "gradient computed");
        self.cached_gradient_ref(node, variable)
    }

    /// Cached gradient of `node` towards `variable`, if computed.
    pub fn cached_gradient(
        &self,
        node: NodeId,
        variable: NodeId,
    ) -> Result<Option<&Tensor<T>>, GraphError> {
        match self.node(node)?.grad_cache.get(&variable) {
            Some(slot) => Ok(slot.as_ref()),
            None => Err(GraphError::GradientTargetNotFound { node, variable }),
        }
    }

    fn cached_gradient_ref(&self, node: NodeId, variable: NodeId) -> Result<&Tensor<T>, GraphError> {
        self.cached_gradient(node, variable)?
            .ok_or(GraphError::GradientTargetNotFound { node, variable })
    }
}
