use crate::error::MatGradError;
use crate::matrix::Matrix;
use std::fmt::Debug;

/// Forward-pass context handed to a backward rule.
///
/// All matrices are untracked copies owned by the graph: the node's own forward
/// value, the values of its parents (absent slots are `None`) and, for scalar
/// multiplication, the scalar operand.
#[derive(Debug, Clone, Copy)]
pub struct BackwardInputs<'a> {
    pub output: &'a Matrix,
    pub parents: [Option<&'a Matrix>; 2],
    pub scalar: Option<f64>,
}

/// Gradient contributions for parent slot 0 and slot 1.
pub type ParentGrads = [Option<Matrix>; 2];

/// Defines the backward pass of one operation kind.
///
/// Given `dL/dOutput` (`grad_output`, same shape as the node's value) an implementation
/// returns `dL/dParent_i` for every present parent slot. It never writes into the
/// parents: the graph adds the returned contributions to the parents' accumulators,
/// so a parent shared by several children sums all of them.
pub trait BackwardOp: Debug + Sync {
    fn backward(
        &self,
        inputs: &BackwardInputs<'_>,
        grad_output: &Matrix,
    ) -> Result<ParentGrads, MatGradError>;
}

fn require_parent<'a>(
    inputs: &BackwardInputs<'a>,
    slot: usize,
    operation: &str,
) -> Result<&'a Matrix, MatGradError> {
    inputs.parents[slot].ok_or_else(|| MatGradError::NullArgument {
        operation: operation.to_string(),
        argument: format!("parent {}", slot),
    })
}

/// Elementwise `grad_output[i] * f(output[i])`.
fn scale_by_local_derivative<F>(
    inputs: &BackwardInputs<'_>,
    grad_output: &Matrix,
    operation: &str,
    local: F,
) -> Result<Matrix, MatGradError>
where
    F: Fn(f64) -> f64,
{
    let y = inputs.output;
    if y.shape() != grad_output.shape() {
        return Err(MatGradError::shape_mismatch(
            &y.shape(),
            &grad_output.shape(),
            operation,
        ));
    }
    let data = y
        .as_slice()
        .iter()
        .zip(grad_output.as_slice())
        .map(|(&y, &g)| g * local(y))
        .collect();
    Matrix::from_vec(y.rows(), y.cols(), data)
}

fn negated(m: &Matrix) -> Result<Matrix, MatGradError> {
    Matrix::from_vec(m.rows(), m.cols(), m.as_slice().iter().map(|x| -x).collect())
}

/// `d(a + b)`: the gradient flows unchanged into both operands.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddBackward;

impl BackwardOp for AddBackward {
    fn backward(
        &self,
        inputs: &BackwardInputs<'_>,
        grad_output: &Matrix,
    ) -> Result<ParentGrads, MatGradError> {
        Ok([
            inputs.parents[0].map(|_| grad_output.detached()),
            inputs.parents[1].map(|_| grad_output.detached()),
        ])
    }
}

/// `d(a - b)`: unchanged into `a`, negated into `b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubBackward;

impl BackwardOp for SubBackward {
    fn backward(
        &self,
        inputs: &BackwardInputs<'_>,
        grad_output: &Matrix,
    ) -> Result<ParentGrads, MatGradError> {
        let grad_b = match inputs.parents[1] {
            Some(_) => Some(negated(grad_output)?),
            None => None,
        };
        Ok([inputs.parents[0].map(|_| grad_output.detached()), grad_b])
    }
}

/// Backward rule for `Mul` nodes.
///
/// * scalar form `R = s * A`: `dA = s * dR`.
/// * product form `R = A . B`: `dA = dR . B^T` and `dB = A^T . dR`. For 1x1
///   operands this reduces to `dA = b * dR`, `dB = a * dR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulBackward;

impl BackwardOp for MulBackward {
    fn backward(
        &self,
        inputs: &BackwardInputs<'_>,
        grad_output: &Matrix,
    ) -> Result<ParentGrads, MatGradError> {
        if let Some(scalar) = inputs.scalar {
            let a = require_parent(inputs, 0, "mul backward")?;
            if a.shape() != grad_output.shape() {
                return Err(MatGradError::shape_mismatch(
                    &a.shape(),
                    &grad_output.shape(),
                    "mul backward (scalar)",
                ));
            }
            return Ok([Some(grad_output.scale(scalar)?), None]);
        }

        let a = require_parent(inputs, 0, "mul backward")?;
        let b = require_parent(inputs, 1, "mul backward")?;
        let grad_a = grad_output.matmul_opt(&b.transpose()?)?;
        let grad_b = a.transpose()?.matmul_opt(grad_output)?;
        Ok([Some(grad_a), Some(grad_b)])
    }
}

/// `sigma'(x) = y (1 - y)` with `y = sigma(x)` the node's own value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigmoidBackward;

impl BackwardOp for SigmoidBackward {
    fn backward(
        &self,
        inputs: &BackwardInputs<'_>,
        grad_output: &Matrix,
    ) -> Result<ParentGrads, MatGradError> {
        require_parent(inputs, 0, "sigmoid backward")?;
        let grad = scale_by_local_derivative(inputs, grad_output, "sigmoid backward", |y| {
            y * (1.0 - y)
        })?;
        Ok([Some(grad), None])
    }
}

/// Passes the gradient where the output is positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReluBackward;

impl BackwardOp for ReluBackward {
    fn backward(
        &self,
        inputs: &BackwardInputs<'_>,
        grad_output: &Matrix,
    ) -> Result<ParentGrads, MatGradError> {
        require_parent(inputs, 0, "relu backward")?;
        let grad = scale_by_local_derivative(inputs, grad_output, "relu backward", |y| {
            if y > 0.0 {
                1.0
            } else {
                0.0
            }
        })?;
        Ok([Some(grad), None])
    }
}

/// `tanh'(x) = 1 - y^2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TanhBackward;

impl BackwardOp for TanhBackward {
    fn backward(
        &self,
        inputs: &BackwardInputs<'_>,
        grad_output: &Matrix,
    ) -> Result<ParentGrads, MatGradError> {
        require_parent(inputs, 0, "tanh backward")?;
        let grad = scale_by_local_derivative(inputs, grad_output, "tanh backward", |y| 1.0 - y * y)?;
        Ok([Some(grad), None])
    }
}

#[cfg(test)]
#[path = "backward_op_test.rs"]
mod tests;
