//! # Reverse-mode automatic differentiation
//!
//! - [`graph`]: the node arena, topological traversal and the backward pass.
//! - [`op`]: the operation tags recorded on nodes.
//! - [`backward_op`]: the backward rule of each tag.
//! - [`grad_check`]: finite-difference verification of those rules.

pub mod backward_op;
pub mod grad_check;
pub mod graph;
pub mod op;

pub use backward_op::BackwardOp;
pub use graph::{ComputationGraph, Dag, Node, NodeId, NodeRef};
pub use op::Op;
