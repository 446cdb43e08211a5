use matgrad_core::ops::{broadcast, matmul, matmul_opt};
use matgrad_core::utils::testing::check_matrix_near;
use matgrad_core::{MatGradError, Matrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod common;
use common::{create_test_matrix, init_logger};

#[test]
fn test_multiply_two_by_two() {
    init_logger();
    let a = create_test_matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let b = create_test_matrix(2, 2, vec![5.0, 6.0, 7.0, 8.0]);
    let mut c = Matrix::zeros(2, 2).unwrap();
    matmul(&a, &b, &mut c).unwrap();
    check_matrix_near(&c, &[2, 2], &[19.0, 22.0, 43.0, 50.0], 1e-12);

    let mut c_opt = Matrix::zeros(2, 2).unwrap();
    matmul_opt(&a, &b, &mut c_opt).unwrap();
    check_matrix_near(&c_opt, &[2, 2], &[19.0, 22.0, 43.0, 50.0], 1e-12);
}

#[test]
fn test_broadcast_row_into_wider_matrix() {
    let src = create_test_matrix(1, 2, vec![1.0, 2.0]);
    let mut dest = Matrix::zeros(2, 4).unwrap();
    broadcast(&src, &mut dest).unwrap();
    check_matrix_near(
        &dest,
        &[2, 4],
        &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0],
        0.0,
    );
}

#[test]
fn test_dot_product_of_columns() {
    let a = Matrix::column(&[1.0, 2.0, 3.0]).unwrap();
    let b = Matrix::column(&[4.0, 5.0, 6.0]).unwrap();
    assert_eq!(a.dot(&b).unwrap(), 32.0);
}

#[test]
fn test_kernels_agree_on_larger_inputs() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(2024);
    for &(m, k, n) in &[(64, 67, 33), (17, 4, 129), (128, 128, 128)] {
        let a = Matrix::random_normal(m, k, 0.0, 1.0, &mut rng).unwrap();
        let b = Matrix::random_normal(k, n, 0.0, 1.0, &mut rng).unwrap();
        let reference = a.matmul(&b).unwrap();
        let optimized = a.matmul_opt(&b).unwrap();
        assert!(reference.approx_eq(&optimized, 1e-9 * k as f64));
    }
}

#[test]
fn test_transpose_is_an_involution() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let rows = rng.gen_range(1..20);
        let cols = rng.gen_range(1..20);
        let a = Matrix::random_uniform(rows, cols, -5.0, 5.0, &mut rng).unwrap();
        let t = a.transpose().unwrap();
        assert_eq!(t.shape(), [cols, rows]);
        assert_eq!(t.transpose().unwrap(), a);
    }
}

#[test]
fn test_add_then_sub_restores_operand() {
    let mut rng = StdRng::seed_from_u64(8);
    let a = Matrix::random_uniform(6, 9, -1.0, 1.0, &mut rng).unwrap();
    let b = Matrix::random_uniform(6, 9, -1.0, 1.0, &mut rng).unwrap();
    let back = a.add(&b).unwrap().sub(&b).unwrap();
    assert!(back.approx_eq(&a, 1e-12));
}

#[test]
fn test_identity_is_neutral_for_both_kernels() {
    let a = create_test_matrix(2, 3, vec![1.0, -2.0, 3.5, 0.0, 4.0, -1.0]);
    let left = matgrad_core::matrix::eye(2).unwrap();
    let right = Matrix::eye(3).unwrap();
    assert_eq!(left.matmul(&a).unwrap(), a);
    assert_eq!(a.matmul_opt(&right).unwrap(), a);
}

#[test]
fn test_invalid_shapes_are_reported() {
    assert_eq!(
        Matrix::zeros(0, 3).unwrap_err(),
        MatGradError::InvalidDimensions { rows: 0, cols: 3 }
    );
    assert!(matches!(
        Matrix::from_vec(2, 2, vec![1.0; 3]),
        Err(MatGradError::DataLengthMismatch { .. })
    ));
    let a = Matrix::ones(2, 3).unwrap();
    assert!(matches!(
        a.matmul(&a),
        Err(MatGradError::ShapeMismatch { .. })
    ));
}
