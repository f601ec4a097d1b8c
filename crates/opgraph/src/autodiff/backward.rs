//! Backward pass execution.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use super::table::Gradients;
use crate::error::GraphError;
use crate::graph::{Graph, NodeId};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Nodes `terminal` depends on, itself included.
fn ancestors<T: Scalar>(graph: &Graph<T>, terminal: NodeId) -> Result<HashSet<NodeId>, GraphError> {
    let mut seen = HashSet::new();
    let mut stack = vec![terminal];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            stack.extend_from_slice(graph.inputs(id)?);
        }
    }
    Ok(seen)
}

/// Nodes reachable from `vars` over consumer links, restricted to `within`.
fn descendants<T: Scalar>(
    graph: &Graph<T>,
    vars: &[NodeId],
    within: &HashSet<NodeId>,
) -> Result<HashSet<NodeId>, GraphError> {
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = vars.iter().copied().filter(|v| within.contains(v)).collect();
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            for &c in graph.consumers(id)? {
                if within.contains(&c) {
                    stack.push(c);
                }
            }
        }
    }
    Ok(seen)
}

/// Compute the gradients of `terminal` with respect to each of `vars`.
///
/// The terminal's forward value is evaluated if needed and its gradient is
/// seeded with ones of its output shape. Every node between the variables
/// and the terminal then receives the sum of the contributions of its
/// consumers, each obtained through [`Graph::gradient`] with `recompute`
/// set, so every contribution is counted exactly once per call. The
/// returned table holds an entry for every visited node.
///
/// # Errors
///
/// - `GradientTargetNotFound` if a variable does not reach `terminal`
///   through nodes that require gradients
/// - any error raised by evaluation or by a local rule
pub fn gradients<T: Scalar>(
    graph: &mut Graph<T>,
    terminal: NodeId,
    vars: &[NodeId],
) -> Result<Gradients<T>, GraphError> {
    graph.evaluate(terminal, false)?;

    let upstream_of_terminal = ancestors(graph, terminal)?;
    let relevant = descendants(graph, vars, &upstream_of_terminal)?;

    let mut dag: DiGraph<NodeId, ()> = DiGraph::new();
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
    for &id in &relevant {
        index.insert(id, dag.add_node(id));
    }
    for &id in &relevant {
        for &c in graph.consumers(id)? {
            if let Some(&to) = index.get(&c) {
                dag.add_edge(index[&id], to, ());
            }
        }
    }
    let order = toposort(&dag, None).map_err(|cycle| {
        GraphError::InvalidOperation(format!(
            "consumer links form a cycle through node {}",
            dag[cycle.node_id()]
        ))
    })?;

    let mut grads = Gradients::new();
    grads.accumulate(terminal, Tensor::ones(graph.output_shape(terminal)?))?;

    for &ix in order.iter().rev() {
        let id = dag[ix];
        if id == terminal {
            continue;
        }
        let consumers: Vec<NodeId> = graph
            .consumers(id)?
            .iter()
            .copied()
            .filter(|c| relevant.contains(c))
            .collect();
        for consumer in consumers {
            let Some(upstream) = grads.get(consumer).cloned() else {
                continue;
            };
            // upstream already sums over every consumer of `consumer`
            let contribution = graph.gradient(consumer, consumer, id, &upstream, true)?.clone();
            grads.accumulate(id, contribution)?;
        }
    }

    for &var in vars {
        if !grads.contains(var) {
            return Err(GraphError::GradientTargetNotFound {
                node: terminal,
                variable: var,
            });
        }
    }
    debug!(terminal = %terminal, nodes = grads.len(), "backward pass");
    Ok(grads)
}
