//! Dense `f64` matrices with reference and parallel multiplication kernels, and a
//! reverse-mode autograd graph over them.

pub mod autograd;
pub mod error;
pub mod matrix;
pub mod ops;
pub mod utils;

pub use autograd::{ComputationGraph, Dag, NodeId, NodeRef, Op};
pub use error::MatGradError;
pub use matrix::Matrix;
pub use ops::activation::Activation;
pub use ops::linalg::MatmulOptions;
