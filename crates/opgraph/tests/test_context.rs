//! Integration tests for execution-context propagation and injected defaults.

use opgraph::ops;
use opgraph::{
    BlasHandle, DnnHandle, ExecutionContext, Graph, GraphConfig, HostQueue, NodeId, StreamHandle,
    StreamSynchronizer, Tensor,
};

fn context(base: usize, asynchronous: bool) -> ExecutionContext {
    ExecutionContext::new()
        .with_stream(StreamHandle::from_raw(base + 1))
        .with_blas_handle(BlasHandle::from_raw(base + 2))
        .with_dnn_handle(DnnHandle::from_raw(base + 3))
        .with_async(asynchronous)
}

/// `loss = reduce_sum(relu(w @ x + b))`, returning every node id.
fn network(g: &mut Graph<f64>) -> Vec<NodeId> {
    let w = ops::variable(g, "w", Tensor::ones(&[3, 2])).unwrap();
    let x = ops::constant(g, "x", Tensor::ones(&[2, 1])).unwrap();
    let b = ops::variable(g, "b", Tensor::ones(&[3, 1])).unwrap();
    let wx = ops::matmul(g, w, x, true).unwrap();
    let h = ops::add(g, wx, b, true).unwrap();
    let r = ops::relu(g, h, true).unwrap();
    let loss = ops::reduce_sum(g, r, true).unwrap();
    vec![w, x, b, wx, h, r, loss]
}

#[test]
fn test_apply_context_reaches_every_input() {
    let mut g = Graph::new();
    let ids = network(&mut g);
    let loss = *ids.last().unwrap();

    let ctx = context(10, true);
    g.apply_execution_context(loss, ctx).unwrap();
    for &id in &ids {
        assert_eq!(g.execution_context(id).unwrap(), ctx, "node {id}");
    }
}

#[test]
fn test_second_context_replaces_first_everywhere() {
    let mut g = Graph::new();
    let ids = network(&mut g);
    let loss = *ids.last().unwrap();
    g.evaluate(loss, false).unwrap();

    let first = context(10, false);
    let second = context(20, true);
    g.apply_execution_context(loss, first).unwrap();
    g.apply_execution_context(loss, second).unwrap();

    for &id in &ids {
        assert_eq!(g.execution_context(id).unwrap(), second, "node {id}");
        let out = g.output(id).unwrap().unwrap();
        assert_eq!(*out.context(), second, "cached output of {id}");
    }
}

#[test]
fn test_single_field_setters() {
    let mut g = Graph::new();
    let ids = network(&mut g);
    let loss = *ids.last().unwrap();

    g.apply_execution_context(loss, context(10, false)).unwrap();
    g.set_stream(loss, StreamHandle::from_raw(99)).unwrap();
    g.set_dnn_handle(loss, DnnHandle::from_raw(98)).unwrap();
    g.set_async(loss, true).unwrap();

    let expected = context(10, true)
        .with_stream(StreamHandle::from_raw(99))
        .with_dnn_handle(DnnHandle::from_raw(98));
    for &id in &ids {
        assert_eq!(g.execution_context(id).unwrap(), expected, "node {id}");
    }
}

#[test]
fn test_propagation_from_inner_node_stops_at_consumers() {
    let mut g = Graph::new();
    let ids = network(&mut g);
    let (w, x, wx, h) = (ids[0], ids[1], ids[3], ids[4]);

    g.set_blas_handle(wx, BlasHandle::from_raw(5)).unwrap();
    for id in [w, x, wx] {
        assert_eq!(g.execution_context(id).unwrap().blas_handle().as_raw(), 5);
    }
    assert!(g.execution_context(h).unwrap().blas_handle().is_null());
}

#[test]
fn test_propagation_does_not_evaluate() {
    let mut g = Graph::new();
    let ids = network(&mut g);
    let loss = *ids.last().unwrap();
    g.apply_execution_context(loss, context(1, false)).unwrap();
    for &id in &ids {
        assert!(g.output(id).unwrap().is_none());
        assert!(!g.state(id).unwrap().computed);
    }
}

#[test]
fn test_new_nodes_start_with_configured_context() {
    let ctx = context(40, true);
    let mut g = Graph::with_config(GraphConfig::new().with_default_context(ctx));
    let ids = network(&mut g);
    for &id in &ids {
        assert_eq!(g.execution_context(id).unwrap(), ctx);
    }
    let loss = *ids.last().unwrap();
    let out = g.evaluate(loss, false).unwrap();
    assert_eq!(*out.context(), ctx);
    assert_eq!(out.data(), &[9.0]);
}

#[test]
fn test_host_queue_synchronize() {
    let queue = HostQueue;
    assert!(queue.synchronize(StreamHandle::NULL).is_ok());
    assert!(queue.synchronize_context(&context(1, true)).is_ok());
}
