use crate::autograd::graph::ComputationGraph;
use crate::error::MatGradError;
use crate::matrix::Matrix;
use log::debug;
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input {input_index}, element {element_index}: analytical grad {analytical_grad:?} != numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(MatGradError),
    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(MatGradError),
    #[error("Function output is not tracked although its inputs are.")]
    OutputNotTracked,
    #[error("Numerical gradient is NaN or infinite for input {input_index}, element {element_index}. Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNotFinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Matrix error during intermediate calculation: {0}")]
    MatrixError(MatGradError),
}

impl From<MatGradError> for GradCheckError {
    fn from(err: MatGradError) -> Self {
        GradCheckError::MatrixError(err)
    }
}

/// Checks the gradients computed by the graph against central finite differences.
///
/// The scalar loss is `sum(func(inputs) * output_grad)`, so the analytical gradient
/// is obtained by seeding the output node with `output_grad`. Every input is
/// tracked as a leaf of a fresh graph; the caller's matrices are not modified.
pub fn check_grad<F>(
    func: F,
    inputs: &[Matrix],
    output_grad: &Matrix,
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Matrix]) -> Result<Matrix, MatGradError>,
{
    // --- 1. Analytical gradients ---
    let graph = ComputationGraph::new();
    let mut tracked: Vec<Matrix> = inputs.iter().map(Matrix::detached).collect();
    let mut ids = Vec::with_capacity(tracked.len());
    for input in tracked.iter_mut() {
        ids.push(graph.track(input)?);
    }

    let output = func(&tracked).map_err(GradCheckError::ForwardPassError)?;
    let root = output.node().ok_or(GradCheckError::OutputNotTracked)?.id();
    graph
        .seed(root, output_grad)
        .and_then(|_| graph.backward(root))
        .map_err(GradCheckError::BackwardPassError)?;

    // --- 2. Numerical gradients, one element at a time ---
    let untracked: Vec<Matrix> = inputs.iter().map(Matrix::detached).collect();
    for (i, id) in ids.into_iter().enumerate() {
        let analytical = graph.grad(id)?;
        for elem_idx in 0..untracked[i].len() {
            let loss_plus = perturbed_loss(&func, &untracked, i, elem_idx, epsilon, output_grad)?;
            let loss_minus = perturbed_loss(&func, &untracked, i, elem_idx, -epsilon, output_grad)?;
            let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon);
            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNotFinite {
                    input_index: i,
                    element_index: elem_idx,
                    loss_plus,
                    loss_minus,
                });
            }

            let analytical_grad = analytical.as_slice()[elem_idx];
            if !approx::relative_eq!(
                analytical_grad,
                numerical_grad,
                epsilon = tolerance,
                max_relative = tolerance
            ) {
                return Err(GradCheckError::GradientMismatch {
                    input_index: i,
                    element_index: elem_idx,
                    analytical_grad,
                    numerical_grad,
                    difference: (analytical_grad - numerical_grad).abs(),
                });
            }
        }
    }
    debug!("check_grad: {} input(s) within tolerance {}", inputs.len(), tolerance);
    Ok(())
}

/// `sum(func(inputs') * output_grad)` where `inputs'` has element `elem_idx` of input
/// `input_index` shifted by `delta`.
fn perturbed_loss<F>(
    func: &F,
    inputs: &[Matrix],
    input_index: usize,
    elem_idx: usize,
    delta: f64,
    output_grad: &Matrix,
) -> Result<f64, GradCheckError>
where
    F: Fn(&[Matrix]) -> Result<Matrix, MatGradError>,
{
    let mut shifted = inputs.to_vec();
    shifted[input_index].as_mut_slice()[elem_idx] += delta;
    let output = func(&shifted).map_err(GradCheckError::ForwardPassError)?;
    if output.shape() != output_grad.shape() {
        return Err(MatGradError::shape_mismatch(
            &output.shape(),
            &output_grad.shape(),
            "check_grad loss",
        )
        .into());
    }
    Ok(output
        .as_slice()
        .iter()
        .zip(output_grad.as_slice())
        .map(|(y, g)| y * g)
        .sum())
}
