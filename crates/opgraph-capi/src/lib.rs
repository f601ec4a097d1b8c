//! C API for opgraph
//!
//! This crate exposes `f64` operation graphs to C and other languages.
//! Graphs are opaque handles; nodes are identified by the `size_t` index of
//! their [`NodeId`]. Tensors cross the boundary as column-major buffers.
//!
//! All extern "C" functions are inherently unsafe as they work with raw pointers
//! from foreign code. The `#[unsafe(no_mangle)]` attribute marks the entire
//! function signature as unsafe at the FFI boundary.

#![allow(clippy::not_unsafe_ptr_arg_deref)]

use libc::{c_char, c_double, c_int, size_t};
use opgraph::{Graph, GraphError, NodeId, Tensor, autodiff, ops};
use std::ffi::CStr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

// Status codes
pub type StatusCode = c_int;

pub const OPG_SUCCESS: StatusCode = 0;
pub const OPG_INVALID_ARGUMENT: StatusCode = -1;
pub const OPG_SHAPE_MISMATCH: StatusCode = -2;
pub const OPG_NODE_NOT_FOUND: StatusCode = -3;
pub const OPG_GRADIENT_TARGET_NOT_FOUND: StatusCode = -4;
pub const OPG_UNSUPPORTED_LOCATION: StatusCode = -5;
pub const OPG_OWNERSHIP: StatusCode = -6;
pub const OPG_INTERNAL_ERROR: StatusCode = -7;

fn status_of(err: &GraphError) -> StatusCode {
    match err {
        GraphError::ShapeMismatch { .. } | GraphError::Tensor(_) => OPG_SHAPE_MISMATCH,
        GraphError::NodeNotFound(_) => OPG_NODE_NOT_FOUND,
        GraphError::GradientTargetNotFound { .. } => OPG_GRADIENT_TARGET_NOT_FOUND,
        GraphError::UnsupportedMemoryLocation { .. } | GraphError::LocationMismatch { .. } => {
            OPG_UNSUPPORTED_LOCATION
        }
        GraphError::NodeOwned { .. } | GraphError::SharedInput { .. } => OPG_OWNERSHIP,
        GraphError::InvalidOperation(_) => OPG_INVALID_ARGUMENT,
    }
}

/// Run `f`, mapping graph errors and panics to status codes.
fn run<F>(f: F) -> StatusCode
where
    F: FnOnce() -> Result<(), GraphError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => OPG_SUCCESS,
        Ok(Err(err)) => status_of(&err),
        Err(_) => OPG_INTERNAL_ERROR,
    }
}

/// Opaque graph type for f64
#[repr(C)]
pub struct opg_graph_f64 {
    _private: *mut std::ffi::c_void,
}

impl opg_graph_f64 {
    fn from_graph(graph: Graph<f64>) -> Self {
        let boxed = Box::new(graph);
        Self {
            _private: Box::into_raw(boxed) as *mut std::ffi::c_void,
        }
    }

    fn inner(&self) -> &Graph<f64> {
        unsafe { &*(self._private as *const Graph<f64>) }
    }

    fn inner_mut(&mut self) -> &mut Graph<f64> {
        unsafe { &mut *(self._private as *mut Graph<f64>) }
    }
}

impl Drop for opg_graph_f64 {
    fn drop(&mut self) {
        if !self._private.is_null() {
            unsafe {
                let _ = Box::from_raw(self._private as *mut Graph<f64>);
            }
        }
    }
}

fn copy_out(src: &[f64], out: *mut c_double, out_len: size_t) -> Result<(), GraphError> {
    if out_len < src.len() {
        return Err(GraphError::InvalidOperation(format!(
            "output buffer holds {out_len} elements, {} needed",
            src.len()
        )));
    }
    unsafe { ptr::copy_nonoverlapping(src.as_ptr(), out, src.len()) };
    Ok(())
}

// ============================================================================
// Graph lifecycle functions
// ============================================================================

/// Create an empty graph.
///
/// # Returns
/// Pointer to new graph, or null on error
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_new() -> *mut opg_graph_f64 {
    catch_unwind(|| Box::into_raw(Box::new(opg_graph_f64::from_graph(Graph::new()))))
        .unwrap_or(ptr::null_mut())
}

/// Release (free) a graph and every node it holds.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_release(graph: *mut opg_graph_f64) {
    if !graph.is_null() {
        unsafe {
            let _ = Box::from_raw(graph);
        }
    }
}

/// Number of live nodes.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_len(graph: *const opg_graph_f64) -> size_t {
    if graph.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { (*graph).inner().len() })).unwrap_or(0)
}

// ============================================================================
// Node construction functions
// ============================================================================

/// Create a leaf node from column-major data.
///
/// # Arguments
/// * `graph` - Graph pointer
/// * `name` - NUL-terminated UTF-8 display name, or null
/// * `data` - Pointer to data array (column-major order)
/// * `len` - Length of data array
/// * `shape` - Pointer to array of dimensions
/// * `ndim` - Number of dimensions
/// * `requires_grad` - Nonzero for a trainable variable, zero for a constant
/// * `out_node` - Receives the new node index
///
/// # Returns
/// Status code
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_variable(
    graph: *mut opg_graph_f64,
    name: *const c_char,
    data: *const c_double,
    len: size_t,
    shape: *const size_t,
    ndim: size_t,
    requires_grad: c_int,
    out_node: *mut size_t,
) -> StatusCode {
    if graph.is_null() || data.is_null() || out_node.is_null() || (shape.is_null() && ndim > 0) {
        return OPG_INVALID_ARGUMENT;
    }

    run(|| unsafe {
        let name = if name.is_null() {
            "variable"
        } else {
            CStr::from_ptr(name)
                .to_str()
                .map_err(|_| GraphError::InvalidOperation("name is not UTF-8".to_string()))?
        };
        let data_slice = std::slice::from_raw_parts(data, len);
        let shape_slice = if ndim == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(shape, ndim)
        };
        let value = Tensor::<f64>::from_vec(data_slice.to_vec(), shape_slice)?;
        let g = (*graph).inner_mut();
        let id = if requires_grad != 0 {
            ops::variable(g, name, value)?
        } else {
            ops::constant(g, name, value)?
        };
        *out_node = id.index();
        Ok(())
    })
}

type Binary = fn(&mut Graph<f64>, NodeId, NodeId, bool) -> Result<NodeId, GraphError>;

fn binary(
    graph: *mut opg_graph_f64,
    a: size_t,
    b: size_t,
    requires_grad: c_int,
    out_node: *mut size_t,
    build: Binary,
) -> StatusCode {
    if graph.is_null() || out_node.is_null() {
        return OPG_INVALID_ARGUMENT;
    }
    run(|| unsafe {
        let g = (*graph).inner_mut();
        let id = build(
            g,
            NodeId::from_index(a),
            NodeId::from_index(b),
            requires_grad != 0,
        )?;
        *out_node = id.index();
        Ok(())
    })
}

/// Element-wise sum of two nodes of equal shape.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_add(
    graph: *mut opg_graph_f64,
    a: size_t,
    b: size_t,
    requires_grad: c_int,
    out_node: *mut size_t,
) -> StatusCode {
    binary(graph, a, b, requires_grad, out_node, ops::add)
}

/// Element-wise difference `a - b`.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_subtract(
    graph: *mut opg_graph_f64,
    a: size_t,
    b: size_t,
    requires_grad: c_int,
    out_node: *mut size_t,
) -> StatusCode {
    binary(graph, a, b, requires_grad, out_node, ops::subtract)
}

/// Element-wise (Hadamard) product.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_product(
    graph: *mut opg_graph_f64,
    a: size_t,
    b: size_t,
    requires_grad: c_int,
    out_node: *mut size_t,
) -> StatusCode {
    binary(graph, a, b, requires_grad, out_node, ops::product)
}

/// Matrix product of two rank-2 nodes.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_matmul(
    graph: *mut opg_graph_f64,
    a: size_t,
    b: size_t,
    requires_grad: c_int,
    out_node: *mut size_t,
) -> StatusCode {
    binary(graph, a, b, requires_grad, out_node, ops::matmul)
}

// ============================================================================
// Query functions
// ============================================================================

/// Number of elements of a node's output, or 0 for an unknown node.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_output_size(graph: *const opg_graph_f64, node: size_t) -> size_t {
    if graph.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe {
        (*graph)
            .inner()
            .output_size(NodeId::from_index(node))
            .unwrap_or(0)
    }))
    .unwrap_or(0)
}

/// Get a node's output shape.
///
/// # Arguments
/// * `out` - Output array for shape
/// * `out_len` - Capacity of `out`
/// * `ndim` - Receives the number of dimensions
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_output_shape(
    graph: *const opg_graph_f64,
    node: size_t,
    out: *mut size_t,
    out_len: size_t,
    ndim: *mut size_t,
) -> StatusCode {
    if graph.is_null() || out.is_null() || ndim.is_null() {
        return OPG_INVALID_ARGUMENT;
    }
    run(|| unsafe {
        let shape = (*graph).inner().output_shape(NodeId::from_index(node))?;
        if out_len < shape.len() {
            return Err(GraphError::InvalidOperation(
                "shape buffer too small".to_string(),
            ));
        }
        for (i, &dim) in shape.iter().enumerate() {
            *out.add(i) = dim;
        }
        *ndim = shape.len();
        Ok(())
    })
}

// ============================================================================
// Evaluation and differentiation
// ============================================================================

/// Evaluate a node and copy its output into `out`.
///
/// # Arguments
/// * `recompute` - Nonzero to recompute even when a cached value exists
/// * `out` - Output buffer (column-major)
/// * `out_len` - Capacity of `out`, at least the node's output size
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_evaluate(
    graph: *mut opg_graph_f64,
    node: size_t,
    recompute: c_int,
    out: *mut c_double,
    out_len: size_t,
) -> StatusCode {
    if graph.is_null() || out.is_null() {
        return OPG_INVALID_ARGUMENT;
    }
    run(|| unsafe {
        let g = (*graph).inner_mut();
        let value = g.evaluate(NodeId::from_index(node), recompute != 0)?;
        copy_out(value.data(), out, out_len)
    })
}

/// Gradient of `terminal` with respect to `variable`, seeded with ones.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_gradient(
    graph: *mut opg_graph_f64,
    terminal: size_t,
    variable: size_t,
    out: *mut c_double,
    out_len: size_t,
) -> StatusCode {
    if graph.is_null() || out.is_null() {
        return OPG_INVALID_ARGUMENT;
    }
    run(|| unsafe {
        let g = (*graph).inner_mut();
        let var = NodeId::from_index(variable);
        let grads = autodiff::gradients(g, NodeId::from_index(terminal), &[var])?;
        let grad = grads
            .get(var)
            .ok_or(GraphError::GradientTargetNotFound {
                node: NodeId::from_index(terminal),
                variable: var,
            })?;
        copy_out(grad.data(), out, out_len)
    })
}

/// Invalidate a node's cached output and gradients.
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_reset(graph: *mut opg_graph_f64, node: size_t) -> StatusCode {
    if graph.is_null() {
        return OPG_INVALID_ARGUMENT;
    }
    run(|| unsafe { (*graph).inner_mut().reset(NodeId::from_index(node)) })
}

/// Destroy a root node and everything it owns.
///
/// # Arguments
/// * `freed` - Receives the number of nodes freed; may be null
#[unsafe(no_mangle)]
pub extern "C" fn opg_graph_f64_destroy(
    graph: *mut opg_graph_f64,
    node: size_t,
    freed: *mut size_t,
) -> StatusCode {
    if graph.is_null() {
        return OPG_INVALID_ARGUMENT;
    }
    run(|| unsafe {
        let n = (*graph).inner_mut().destroy(NodeId::from_index(node))?;
        if !freed.is_null() {
            *freed = n;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(graph: *mut opg_graph_f64, name: &CStr, data: &[f64], shape: &[usize]) -> size_t {
        let mut node: size_t = usize::MAX;
        let status = opg_graph_f64_variable(
            graph,
            name.as_ptr(),
            data.as_ptr(),
            data.len(),
            shape.as_ptr(),
            shape.len(),
            1,
            &mut node,
        );
        assert_eq!(status, OPG_SUCCESS);
        node
    }

    #[test]
    fn test_evaluate_expression() {
        let g = opg_graph_f64_new();
        assert!(!g.is_null());
        let x = variable(g, c"x", &[1.0, 3.0, 2.0, 4.0], &[2, 2]);
        let y = variable(g, c"y", &[5.0, 7.0, 6.0, 8.0], &[2, 2]);

        let mut m = 0;
        assert_eq!(opg_graph_f64_product(g, x, y, 1, &mut m), OPG_SUCCESS);
        let mut z = 0;
        assert_eq!(opg_graph_f64_add(g, m, x, 1, &mut z), OPG_SUCCESS);
        assert_eq!(opg_graph_f64_len(g), 4);
        assert_eq!(opg_graph_f64_output_size(g, z), 4);

        let mut out = [0.0f64; 4];
        assert_eq!(
            opg_graph_f64_evaluate(g, z, 0, out.as_mut_ptr(), out.len()),
            OPG_SUCCESS
        );
        assert_eq!(out, [6.0, 24.0, 14.0, 36.0]);

        let mut small = [0.0f64; 2];
        assert_eq!(
            opg_graph_f64_evaluate(g, z, 0, small.as_mut_ptr(), small.len()),
            OPG_INVALID_ARGUMENT
        );

        opg_graph_f64_release(g);
    }

    #[test]
    fn test_gradient_and_unwired_variable() {
        let g = opg_graph_f64_new();
        let x = variable(g, c"x", &[2.0], &[1]);
        let y = variable(g, c"y", &[3.0], &[1]);
        let w = variable(g, c"w", &[1.0], &[1]);
        let mut p = 0;
        assert_eq!(opg_graph_f64_product(g, x, y, 1, &mut p), OPG_SUCCESS);

        let mut grad = [0.0f64; 1];
        assert_eq!(
            opg_graph_f64_gradient(g, p, x, grad.as_mut_ptr(), 1),
            OPG_SUCCESS
        );
        assert_eq!(grad, [3.0]);
        assert_eq!(
            opg_graph_f64_gradient(g, p, w, grad.as_mut_ptr(), 1),
            OPG_GRADIENT_TARGET_NOT_FOUND
        );
        opg_graph_f64_release(g);
    }

    #[test]
    fn test_shape_errors() {
        let g = opg_graph_f64_new();
        let a = variable(g, c"a", &[1.0; 6], &[2, 3]);
        let b = variable(g, c"b", &[1.0; 6], &[2, 3]);
        let mut node = 0;
        assert_eq!(opg_graph_f64_matmul(g, a, b, 1, &mut node), OPG_SHAPE_MISMATCH);

        let mut shape = [0usize; 4];
        let mut ndim = 0;
        assert_eq!(
            opg_graph_f64_output_shape(g, a, shape.as_mut_ptr(), shape.len(), &mut ndim),
            OPG_SUCCESS
        );
        assert_eq!(&shape[..ndim], &[2, 3]);
        opg_graph_f64_release(g);
    }

    #[test]
    fn test_destroy() {
        let g = opg_graph_f64_new();
        let x = variable(g, c"x", &[1.0], &[1]);
        let y = variable(g, c"y", &[1.0], &[1]);
        let mut s = 0;
        assert_eq!(opg_graph_f64_subtract(g, x, y, 1, &mut s), OPG_SUCCESS);

        assert_eq!(opg_graph_f64_destroy(g, x, ptr::null_mut()), OPG_OWNERSHIP);
        let mut freed = 0;
        assert_eq!(opg_graph_f64_destroy(g, s, &mut freed), OPG_SUCCESS);
        assert_eq!(freed, 3);
        assert_eq!(opg_graph_f64_len(g), 0);
        assert_eq!(opg_graph_f64_reset(g, s), OPG_NODE_NOT_FOUND);
        opg_graph_f64_release(g);
    }

    #[test]
    fn test_null_arguments() {
        assert_eq!(opg_graph_f64_len(ptr::null()), 0);
        assert_eq!(opg_graph_f64_reset(ptr::null_mut(), 0), OPG_INVALID_ARGUMENT);
        opg_graph_f64_release(ptr::null_mut());
    }
}
