//! # Matrix Operations Module (`ops`)
//!
//! Forward operations on [`Matrix`](crate::matrix::Matrix), grouped by family.
//!
//! ## Structure:
//!
//! - Every operation is a free function writing into a caller-supplied output matrix
//!   and returning `Result<(), MatGradError>`. Shapes are validated before anything
//!   is written.
//! - Differentiable operations (add, sub, scalar multiply, both multiplies, the
//!   activations) attach a node of the operands' [`ComputationGraph`] to the output
//!   when at least one operand is tracked. Untracked inputs give an untracked output.
//! - Transpose, broadcast and the dot product are not recorded.
//!
//! ## Key Submodules:
//!
//! - [`arithmetic`]: element-wise add/sub, scalar multiply, dot product.
//! - [`linalg`]: reference and optimized multiply, transpose, broadcast.
//! - [`activation`]: sigmoid, relu, tanh.
//!
//! [`ComputationGraph`]: crate::autograd::graph::ComputationGraph

use crate::error::MatGradError;
use crate::matrix::Matrix;

pub mod activation;
pub mod arithmetic;
pub mod linalg;

pub use activation::{activation, activation_derivative, relu, sigmoid, tanh, Activation};
pub use arithmetic::{add, dot, scalar_mul, sub};
pub use linalg::{broadcast, matmul, matmul_opt, matmul_opt_with, transpose, MatmulOptions};

/// Fails with `ShapeMismatch` unless `actual` has the `expected` shape.
pub(crate) fn check_same_shape(
    expected: &Matrix,
    actual: &Matrix,
    operation: &str,
) -> Result<(), MatGradError> {
    if expected.shape() != actual.shape() {
        return Err(MatGradError::shape_mismatch(
            &expected.shape(),
            &actual.shape(),
            operation,
        ));
    }
    Ok(())
}
