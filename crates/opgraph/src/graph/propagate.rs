//! Execution-context propagation.
//!
//! Every setter walks from the given node towards the leaves, visiting each
//! node once, and updates both the node's context and the context of its
//! cached output. Consumers are never touched.

use std::collections::HashSet;

use tracing::debug;

use super::{Graph, NodeId};
use crate::context::{BlasHandle, DnnHandle, ExecutionContext, StreamHandle};
use crate::error::GraphError;
use crate::scalar::Scalar;

impl<T: Scalar> Graph<T> {
    /// Apply a full execution context to `id` and its transitive inputs.
    pub fn apply_execution_context(
        &mut self,
        id: NodeId,
        context: ExecutionContext,
    ) -> Result<(), GraphError> {
        self.broadcast(id, "context", |ctx| *ctx = context)
    }

    pub fn set_stream(&mut self, id: NodeId, stream: StreamHandle) -> Result<(), GraphError> {
        self.broadcast(id, "stream", |ctx| ctx.set_stream(stream))
    }

    pub fn set_blas_handle(&mut self, id: NodeId, handle: BlasHandle) -> Result<(), GraphError> {
        self.broadcast(id, "blas_handle", |ctx| ctx.set_blas_handle(handle))
    }

    pub fn set_dnn_handle(&mut self, id: NodeId, handle: DnnHandle) -> Result<(), GraphError> {
        self.broadcast(id, "dnn_handle", |ctx| ctx.set_dnn_handle(handle))
    }

    pub fn set_async(&mut self, id: NodeId, asynchronous: bool) -> Result<(), GraphError> {
        self.broadcast(id, "async", |ctx| ctx.set_async(asynchronous))
    }

    fn broadcast<F>(&mut self, root: NodeId, field: &str, update: F) -> Result<(), GraphError>
    where
        F: Fn(&mut ExecutionContext),
    {
        self.node(root)?;
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = self.node_mut(id)?;
            update(&mut node.context);
            if let Some(output) = node.output.as_mut() {
                output.set_context(node.context);
            }
            stack.extend(node.inputs.iter().copied());
        }
        debug!(root = %root, field, visited = visited.len(), "propagate execution context");
        Ok(())
    }
}
