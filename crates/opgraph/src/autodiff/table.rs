//! Gradient table returned by a backward pass.

use std::collections::HashMap;

use crate::backend::add_assign;
use crate::error::TensorError;
use crate::graph::NodeId;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Gradients of one terminal node, keyed by the node they belong to.
///
/// Contributions arriving over several consumer paths are summed in place.
#[derive(Debug, Clone)]
pub struct Gradients<T: Scalar> {
    grads: HashMap<NodeId, Tensor<T>>,
}

impl<T: Scalar> Gradients<T> {
    pub fn new() -> Self {
        Self {
            grads: HashMap::new(),
        }
    }

    /// Add `grad` to the entry of `id`, creating it if absent.
    pub fn accumulate(&mut self, id: NodeId, grad: Tensor<T>) -> Result<(), TensorError> {
        match self.grads.get_mut(&id) {
            Some(existing) => add_assign(existing, &grad),
            None => {
                self.grads.insert(id, grad);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Tensor<T>> {
        self.grads.get(&id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Tensor<T>> {
        self.grads.remove(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.grads.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Tensor<T>)> {
        self.grads.iter()
    }
}

impl<T: Scalar> Default for Gradients<T> {
    fn default() -> Self {
        Self::new()
    }
}
