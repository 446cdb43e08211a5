use crate::matrix::Matrix;

/// Checks that a matrix has the expected shape and that every element lies within
/// `tolerance` of the expected row-major data.
/// Panics with the first offending index otherwise.
pub fn check_matrix_near(
    actual: &Matrix,
    expected_shape: &[usize],
    expected_data: &[f64],
    tolerance: f64,
) {
    assert_eq!(actual.shape().as_slice(), expected_shape, "Shape mismatch");
    assert_eq!(
        actual.len(),
        expected_data.len(),
        "Data length mismatch"
    );

    for (i, (a, e)) in actual.as_slice().iter().zip(expected_data).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}

/// Builds a matrix from row-major data, panicking on a bad shape.
pub fn create_test_matrix(rows: usize, cols: usize, data: Vec<f64>) -> Matrix {
    Matrix::from_vec(rows, cols, data).expect("Failed to create test matrix")
}
