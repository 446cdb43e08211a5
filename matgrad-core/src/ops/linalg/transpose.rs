use crate::error::MatGradError;
use crate::matrix::Matrix;

/// Writes the transpose of the row-major `rows x cols` buffer `src` into `dst`
/// (which becomes `cols x rows`).
pub(crate) fn transpose_into(src: &[f64], rows: usize, cols: usize, dst: &mut [f64]) {
    debug_assert_eq!(src.len(), rows * cols);
    debug_assert_eq!(dst.len(), rows * cols);
    for (i, src_row) in src.chunks_exact(cols).enumerate() {
        for (j, &value) in src_row.iter().enumerate() {
            dst[j * rows + i] = value;
        }
    }
}

/// `out = a^T`.
///
/// Not recorded in the computation graph: `out` comes back untracked.
///
/// # Errors
/// `ShapeMismatch` unless `out` is `a.cols x a.rows`.
pub fn transpose(a: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    if out.rows != a.cols || out.cols != a.rows {
        return Err(MatGradError::shape_mismatch(
            &[a.cols, a.rows],
            &out.shape(),
            "transpose",
        ));
    }
    transpose_into(&a.data, a.rows, a.cols, &mut out.data);
    out.set_node(None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_transpose_non_square() {
        let a = Matrix::from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
        let mut out = Matrix::zeros(3, 2).unwrap();
        transpose(&a, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_shape_mismatch() {
        let a = Matrix::zeros(2, 3).unwrap();
        let mut out = Matrix::zeros(2, 3).unwrap();
        let err = transpose(&a, &mut out).unwrap_err();
        assert_eq!(
            err,
            MatGradError::ShapeMismatch {
                expected: vec![3, 2],
                actual: vec![2, 3],
                operation: "transpose".to_string(),
            }
        );
    }

    #[test]
    fn test_transpose_twice_is_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        for (rows, cols) in [(1, 1), (1, 7), (5, 3), (16, 16)] {
            let a = Matrix::random_uniform(rows, cols, -1.0, 1.0, &mut rng).unwrap();
            let back = a.transpose().unwrap().transpose().unwrap();
            assert_eq!(back, a);
        }
    }

    #[test]
    fn test_transpose_output_is_untracked() {
        let graph = crate::autograd::graph::ComputationGraph::new();
        let mut a = Matrix::ones(2, 1).unwrap();
        graph.track(&mut a).unwrap();
        let mut out = Matrix::zeros(1, 2).unwrap();
        graph.track(&mut out).unwrap();
        transpose(&a, &mut out).unwrap();
        assert!(!out.is_tracked());
        assert_eq!(graph.len(), 2);
    }
}
