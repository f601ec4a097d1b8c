//! Host kernels used by the built-in operation kinds.
//!
//! Every kernel works on host-addressable tensors and does not inspect the
//! memory location. [`Graph::evaluate`](crate::Graph::evaluate) refuses to
//! run a kind whose [`Operation::supports`](crate::Operation::supports)
//! rejects the node's location, so device tensors never reach these loops.
//!
//! # faer Integration
//!
//! The `faer_interop` module provides zero-copy views of 2-D tensors as
//! faer matrices, used by [`matmul_into`].

mod elementwise;
mod faer_interop;
mod matmul;

pub use elementwise::{add_assign, map, map_into, scale, zip, zip_into};
pub use faer_interop::AsFaerMat;
pub use matmul::matmul_into;
