//! opgraph - lazily evaluated tensor operation graphs
//!
//! A [`Graph`] holds operation nodes that produce tensors on demand. Each
//! node caches its forward output and the gradients it has computed for its
//! input variables; callers decide when caches are reused and when they are
//! recomputed.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Orchestration (autodiff module)
//!     → gradients: full reverse pass over consumer links
//!
//! Level 2: Graph (graph module)
//!     → insert / destroy, evaluate, gradient, reset
//!     → execution-context propagation
//!
//! Level 3: Node kinds (ops module, Operation trait)
//!     → shape rule, forward rule, local gradient rule
//!
//! Level 4: Host kernels (backend module)
//!     → element-wise loops, faer matmul
//! ```
//!
//! # Example
//!
//! ```
//! use opgraph::{Graph, Tensor, ops};
//!
//! let mut g = Graph::new();
//! let x = ops::variable(&mut g, "x", Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap()).unwrap();
//! let y = ops::variable(&mut g, "y", Tensor::from_vec(vec![4.0, 5.0, 6.0], &[3]).unwrap()).unwrap();
//! let xy = ops::product(&mut g, x, y, true).unwrap();
//! let z = ops::add(&mut g, xy, x, true).unwrap();
//!
//! assert_eq!(g.evaluate(z, false).unwrap().data(), &[5.0, 12.0, 21.0]);
//! assert_eq!(g.to_expression(z).unwrap(), "((x * y) + x)");
//! ```

#[cfg(feature = "autodiff")]
pub mod autodiff;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod fill;
pub mod graph;
pub mod location;
pub mod op;
pub mod ops;
pub mod scalar;
pub mod storage;
pub mod tensor;

pub use config::GraphConfig;
pub use context::{
    BlasHandle, DnnHandle, ExecutionContext, HostQueue, StreamHandle, StreamSynchronizer,
};
pub use error::{GraphError, TensorError};
pub use fill::TensorFiller;
pub use graph::{Graph, NodeId, NodeState};
pub use location::MemoryLocation;
pub use op::{BackwardContext, Operation};
pub use scalar::Scalar;
pub use storage::Dense;
pub use tensor::Tensor;
