//! Reverse-mode differentiation over a whole graph.
//!
//! [`Graph::gradient`](crate::Graph::gradient) answers for a single node.
//! [`gradients`] drives it across the graph: it seeds the terminal with
//! ones, visits nodes in reverse topological order and sums, for every
//! node, the contribution of each of its consumers.
//!
//! # Example
//!
//! ```
//! use opgraph::{Graph, Tensor, ops, autodiff};
//!
//! let mut g = Graph::new();
//! let x = ops::variable(&mut g, "x", Tensor::from_vec(vec![3.0], &[1]).unwrap()).unwrap();
//! let y = ops::variable(&mut g, "y", Tensor::from_vec(vec![4.0], &[1]).unwrap()).unwrap();
//! let xy = ops::product(&mut g, x, y, true).unwrap();
//! let z = ops::add(&mut g, xy, x, true).unwrap();
//!
//! let grads = autodiff::gradients(&mut g, z, &[x, y]).unwrap();
//! assert_eq!(grads.get(x).unwrap().data(), &[5.0]); // y + 1
//! assert_eq!(grads.get(y).unwrap().data(), &[3.0]); // x
//! ```

mod backward;
mod table;

pub use backward::gradients;
pub use table::Gradients;
