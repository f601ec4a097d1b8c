//! Integration tests for graph construction, memoized evaluation, per-node
//! gradients and destruction.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use opgraph::ops::{self, Add, Product, Scale, Variable};
use opgraph::{
    BackwardContext, Graph, GraphError, MemoryLocation, NodeId, Operation, Tensor,
};

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    dropped: AtomicUsize,
    forwards: AtomicUsize,
    backwards: AtomicUsize,
}

impl Counters {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Wraps a built-in kind and counts what the graph does with it.
#[derive(Debug)]
struct Counted {
    inner: Box<dyn Operation<f64>>,
    counters: Arc<Counters>,
}

impl Counted {
    fn boxed(inner: Box<dyn Operation<f64>>, counters: &Arc<Counters>) -> Box<Self> {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Box::new(Self {
            inner,
            counters: Arc::clone(counters),
        })
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl Operation<f64> for Counted {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        self.inner.output_shape(inputs)
    }

    fn leaf_location(&self) -> Option<MemoryLocation> {
        self.inner.leaf_location()
    }

    fn forward(&self, inputs: &[&Tensor<f64>], output: &mut Tensor<f64>) -> Result<(), GraphError> {
        self.counters.forwards.fetch_add(1, Ordering::SeqCst);
        self.inner.forward(inputs, output)
    }

    fn backward(
        &self,
        ctx: &BackwardContext<'_, f64>,
        input: usize,
    ) -> Result<Tensor<f64>, GraphError> {
        self.counters.backwards.fetch_add(1, Ordering::SeqCst);
        self.inner.backward(ctx, input)
    }

    fn set_value(&mut self, value: Tensor<f64>) -> Result<(), GraphError> {
        self.inner.set_value(value)
    }

    fn format(&self, inputs: &[String]) -> String {
        self.inner.format(inputs)
    }
}

fn matrix(rows: &[[f64; 2]; 2]) -> Tensor<f64> {
    // column-major
    Tensor::from_vec(
        vec![rows[0][0], rows[1][0], rows[0][1], rows[1][1]],
        &[2, 2],
    )
    .unwrap()
}

fn assert_matrix(t: &Tensor<f64>, rows: &[[f64; 2]; 2]) {
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            assert_eq!(*t.get(&[i, j]).unwrap(), v, "element ({i}, {j})");
        }
    }
}

/// `z = add(product(x, y), x)` with every node counted.
struct Expression {
    graph: Graph<f64>,
    counters: Arc<Counters>,
    x: NodeId,
    y: NodeId,
    m: NodeId,
    z: NodeId,
}

fn expression() -> Expression {
    let counters = Arc::new(Counters::default());
    let mut graph = Graph::new();
    let x = graph
        .insert(
            "x",
            Counted::boxed(Box::new(Variable::new(matrix(&[[1.0, 2.0], [3.0, 4.0]]))), &counters),
            &[],
            true,
        )
        .unwrap();
    let y = graph
        .insert(
            "y",
            Counted::boxed(Box::new(Variable::new(matrix(&[[5.0, 6.0], [7.0, 8.0]]))), &counters),
            &[],
            true,
        )
        .unwrap();
    let m = graph
        .insert("m", Counted::boxed(Box::new(Product), &counters), &[x, y], true)
        .unwrap();
    let z = graph
        .insert("z", Counted::boxed(Box::new(Add), &counters), &[m, x], true)
        .unwrap();
    Expression {
        graph,
        counters,
        x,
        y,
        m,
        z,
    }
}

#[test]
fn test_scenario_elementwise_expression() {
    let mut g = Graph::new();
    let x = ops::variable(&mut g, "x", matrix(&[[1.0, 2.0], [3.0, 4.0]])).unwrap();
    let y = ops::variable(&mut g, "y", matrix(&[[5.0, 6.0], [7.0, 8.0]])).unwrap();
    let m = ops::product(&mut g, x, y, true).unwrap();
    let z = ops::add(&mut g, m, x, true).unwrap();

    let out = g.evaluate(z, false).unwrap();
    assert_eq!(out.shape(), &[2, 2]);
    assert_matrix(out, &[[6.0, 14.0], [24.0, 36.0]]);
}

#[test]
fn test_scenario_reset_intermediate() {
    let mut e = expression();
    let fresh = e.graph.evaluate(e.z, false).unwrap().clone();
    assert_eq!(Counters::get(&e.counters.forwards), 4);

    e.graph.reset(e.m).unwrap();
    assert!(!e.graph.state(e.m).unwrap().computed);

    // the terminal's own cache is still valid
    assert_eq!(e.graph.evaluate(e.z, false).unwrap(), &fresh);
    assert_eq!(Counters::get(&e.counters.forwards), 4);

    // the reset node recomputes when asked directly
    e.graph.evaluate(e.m, false).unwrap();
    assert_eq!(Counters::get(&e.counters.forwards), 5);

    // forcing through the whole expression matches a from-scratch run
    e.graph.reset_subgraph(e.z).unwrap();
    let again = e.graph.evaluate(e.z, false).unwrap().clone();
    assert_eq!(again, fresh);
    assert_matrix(&again, &[[6.0, 14.0], [24.0, 36.0]]);
    assert_eq!(Counters::get(&e.counters.forwards), 9);
}

#[test]
fn test_scenario_unwired_variable() {
    let mut e = expression();
    let w = ops::variable(&mut e.graph, "w", Tensor::ones(&[2, 2])).unwrap();
    let upstream = Tensor::ones(&[2, 2]);
    let err = e.graph.gradient(e.z, e.z, w, &upstream, false).unwrap_err();
    assert!(matches!(
        err,
        GraphError::GradientTargetNotFound { node, variable } if node == e.z && variable == w
    ));
    assert!(err.to_string().contains("no gradient slot"));
}

#[test]
fn test_scenario_destroy_linear_chain() {
    let counters = Arc::new(Counters::default());
    let mut g: Graph<f64> = Graph::new();

    let mut tip = g
        .insert(
            "x",
            Counted::boxed(Box::new(Variable::new(Tensor::ones(&[3]))), &counters),
            &[],
            true,
        )
        .unwrap();
    for i in 0..4 {
        tip = g
            .insert(
                format!("s{i}"),
                Counted::boxed(Box::new(Scale { alpha: 2.0 }), &counters),
                &[tip],
                true,
            )
            .unwrap();
    }
    // an unrelated pair that must survive
    let other = ops::variable(&mut g, "other", Tensor::ones(&[3])).unwrap();
    let other_relu = ops::relu(&mut g, other, true).unwrap();

    assert_eq!(Counters::get(&counters.created), 5);
    assert_eq!(g.len(), 7);
    assert_eq!(g.evaluate(tip, false).unwrap().data(), &[16.0, 16.0, 16.0]);

    assert_eq!(g.destroy(tip).unwrap(), 5);
    assert_eq!(Counters::get(&counters.dropped), 5);
    assert_eq!(g.len(), 2);
    assert!(g.contains(other) && g.contains(other_relu));
    assert!(matches!(
        g.evaluate(tip, false),
        Err(GraphError::NodeNotFound(id)) if id == tip
    ));
}

#[test]
fn test_dropping_graph_frees_every_node() {
    let e = expression();
    let counters = Arc::clone(&e.counters);
    drop(e.graph);
    assert_eq!(Counters::get(&counters.created), 4);
    assert_eq!(Counters::get(&counters.dropped), 4);
}

#[test]
fn test_cache_identity() {
    let mut e = expression();
    let first = e.graph.evaluate(e.z, false).unwrap().data().as_ptr();
    let second = e.graph.evaluate(e.z, false).unwrap().data().as_ptr();
    assert_eq!(first, second);
    assert_eq!(Counters::get(&e.counters.forwards), 4);
}

#[test]
fn test_forced_recompute_counts() {
    let mut e = expression();
    e.graph.evaluate(e.z, false).unwrap();
    e.graph.evaluate(e.z, true).unwrap();
    // x feeds both m and z but runs once
    assert_eq!(Counters::get(&e.counters.forwards), 4 + 4);
    assert!(e.graph.state(e.z).unwrap().computed);
}

#[test]
fn test_forced_recompute_on_shared_chain_is_linear() {
    let counters = Arc::new(Counters::default());
    let mut g = Graph::new();
    let leaf = Variable::new(Tensor::from_vec(vec![1.0], &[1]).unwrap());
    let mut top = g
        .insert("x0", Counted::boxed(Box::new(leaf), &counters), &[], true)
        .unwrap();
    // x_{i+1} = x_i + x_i
    for i in 1..=20 {
        top = g
            .insert(format!("x{i}"), Counted::boxed(Box::new(Add), &counters), &[top, top], true)
            .unwrap();
    }

    assert_eq!(g.evaluate(top, false).unwrap().data(), &[1_048_576.0]);
    assert_eq!(Counters::get(&counters.forwards), 21);
    assert_eq!(g.evaluate(top, true).unwrap().data(), &[1_048_576.0]);
    assert_eq!(Counters::get(&counters.forwards), 42);
}

#[test]
fn test_gradient_cache_counter() {
    let mut e = expression();
    let upstream = Tensor::ones(&[2, 2]);

    let dx = e.graph.gradient(e.m, e.z, e.x, &upstream, false).unwrap().clone();
    assert_matrix(&dx, &[[5.0, 6.0], [7.0, 8.0]]);
    assert_eq!(Counters::get(&e.counters.backwards), 1);

    e.graph.gradient(e.m, e.z, e.x, &upstream, false).unwrap();
    assert_eq!(Counters::get(&e.counters.backwards), 1);

    e.graph.gradient(e.m, e.z, e.x, &upstream, true).unwrap();
    assert_eq!(Counters::get(&e.counters.backwards), 2);

    e.graph.reset(e.m).unwrap();
    assert!(e.graph.cached_gradient(e.m, e.x).unwrap().is_none());
    e.graph.gradient(e.m, e.z, e.x, &upstream, false).unwrap();
    assert_eq!(Counters::get(&e.counters.backwards), 3);
}

#[test]
fn test_gradient_evaluates_forward_first() {
    let mut e = expression();
    let upstream = Tensor::ones(&[2, 2]);
    let dy = e.graph.gradient(e.m, e.z, e.y, &upstream, false).unwrap();
    assert_matrix(dy, &[[1.0, 2.0], [3.0, 4.0]]);
    assert!(e.graph.state(e.m).unwrap().computed);
    assert!(e.graph.state(e.m).unwrap().gradient_computed);
}

#[test]
fn test_consumer_registration() {
    let e = expression();
    let g = &e.graph;
    assert_eq!(g.consumers(e.x).unwrap(), &[e.m, e.z]);
    assert_eq!(g.consumers(e.y).unwrap(), &[e.m]);
    assert_eq!(g.consumers(e.m).unwrap(), &[e.z]);
    assert!(g.consumers(e.z).unwrap().is_empty());
    assert_eq!(g.inputs(e.z).unwrap(), &[e.m, e.x]);
    assert!(g.cached_gradient(e.z, e.m).unwrap().is_none());
    assert!(g.cached_gradient(e.z, e.x).unwrap().is_none());
    assert!(g.cached_gradient(e.z, e.y).is_err());
}

#[test]
fn test_non_differentiable_node_not_registered() {
    let mut g = Graph::new();
    let x = ops::variable(&mut g, "x", Tensor::<f64>::ones(&[2])).unwrap();
    let frozen = ops::scale(&mut g, x, 3.0, false).unwrap();
    assert!(g.consumers(x).unwrap().is_empty());
    assert!(matches!(
        g.gradient(frozen, frozen, x, &Tensor::ones(&[2]), false),
        Err(GraphError::GradientTargetNotFound { .. })
    ));
}

#[test]
fn test_shape_mismatch_at_construction() {
    let mut g = Graph::new();
    let a = ops::variable(&mut g, "a", Tensor::<f64>::ones(&[2, 3])).unwrap();
    let b = ops::variable(&mut g, "b", Tensor::<f64>::ones(&[2, 3])).unwrap();
    let err = ops::matmul(&mut g, a, b, true).unwrap_err();
    assert!(matches!(err, GraphError::ShapeMismatch { .. }));
    assert_eq!(g.len(), 2);
}

#[test]
fn test_display_and_expression() {
    let e = expression();
    assert_eq!(e.graph.display_name(e.m).unwrap(), "m");
    assert_eq!(e.graph.to_expression(e.z).unwrap(), "((x * y) + x)");
    assert_eq!(e.graph.output_size(e.z).unwrap(), 4);
    assert_eq!(e.graph.memory_location(e.z).unwrap(), MemoryLocation::Host);
}

#[test]
fn test_graph_moves_across_threads() {
    let mut g = Graph::new();
    let x = ops::variable(&mut g, "x", Tensor::from_vec(vec![1.0, -2.0], &[2]).unwrap()).unwrap();
    let r = ops::relu(&mut g, x, true).unwrap();
    let out = std::thread::spawn(move || g.evaluate(r, false).unwrap().clone())
        .join()
        .unwrap();
    assert_eq!(out.data(), &[1.0, 0.0]);
}
