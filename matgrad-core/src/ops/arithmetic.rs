use crate::autograd::graph::{record, resolve_graph};
use crate::autograd::op::Op;
use crate::error::MatGradError;
use crate::matrix::Matrix;
use crate::ops::check_same_shape;

fn elementwise<F>(
    a: &Matrix,
    b: &Matrix,
    out: &mut Matrix,
    op: Op,
    f: F,
) -> Result<(), MatGradError>
where
    F: Fn(f64, f64) -> f64,
{
    let operation = op.name();
    check_same_shape(a, b, operation)?;
    check_same_shape(a, out, operation)?;
    let graph = resolve_graph(&[a, b], operation)?;

    for ((o, &x), &y) in out.data.iter_mut().zip(&a.data).zip(&b.data) {
        *o = f(x, y);
    }
    record(graph, out, op, &[a, b], None)
}

/// `out = a + b`, element-wise. Attaches an `Add` node with parents `{a, b}`.
///
/// # Errors
/// `ShapeMismatch` unless `a`, `b` and `out` share a shape; `GraphMismatch` if
/// `a` and `b` are tracked by different graphs.
pub fn add(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    elementwise(a, b, out, Op::Add, |x, y| x + y)
}

/// `out = a - b`, element-wise. Attaches a `Sub` node with parents `{a, b}`.
pub fn sub(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    elementwise(a, b, out, Op::Sub, |x, y| x - y)
}

/// `out = scalar * a`.
///
/// Attaches a `Mul` node with the single parent `a`; the scalar is stored on the
/// node as a constant and receives no gradient.
pub fn scalar_mul(a: &Matrix, scalar: f64, out: &mut Matrix) -> Result<(), MatGradError> {
    check_same_shape(a, out, "scalar_mul")?;
    let graph = resolve_graph(&[a], "scalar_mul")?;

    for (o, &x) in out.data.iter_mut().zip(&a.data) {
        *o = scalar * x;
    }
    record(graph, out, Op::Mul, &[a], Some(scalar))
}

/// Sum of element-wise products of two column vectors of equal length.
///
/// # Errors
/// `ShapeMismatch` if either operand has more than one column or their lengths
/// differ.
pub fn dot(a: &Matrix, b: &Matrix) -> Result<f64, MatGradError> {
    for m in [a, b] {
        if m.cols != 1 {
            return Err(MatGradError::shape_mismatch(&[m.rows, 1], &m.shape(), "dot"));
        }
    }
    if a.rows != b.rows {
        return Err(MatGradError::shape_mismatch(&a.shape(), &b.shape(), "dot"));
    }
    Ok(a.data.iter().zip(&b.data).map(|(x, y)| x * y).sum())
}

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod tests;
