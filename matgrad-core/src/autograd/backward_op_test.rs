use super::*;
use approx::assert_relative_eq;

fn m(rows: usize, cols: usize, data: Vec<f64>) -> Matrix {
    Matrix::from_vec(rows, cols, data).expect("test matrix")
}

#[test]
fn test_add_backward_copies_grad_to_present_parents() {
    let a = m(1, 2, vec![1.0, 2.0]);
    let out = m(1, 2, vec![0.0, 0.0]);
    let grad = m(1, 2, vec![0.5, -1.0]);
    let inputs = BackwardInputs {
        output: &out,
        parents: [Some(&a), None],
        scalar: None,
    };
    let [g0, g1] = AddBackward.backward(&inputs, &grad).unwrap();
    assert_eq!(g0.unwrap(), grad);
    assert!(g1.is_none());
}

#[test]
fn test_sub_backward_negates_second_parent() {
    let a = m(1, 2, vec![1.0, 2.0]);
    let b = m(1, 2, vec![3.0, 4.0]);
    let out = m(1, 2, vec![-2.0, -2.0]);
    let grad = m(1, 2, vec![1.5, -2.0]);
    let inputs = BackwardInputs {
        output: &out,
        parents: [Some(&a), Some(&b)],
        scalar: None,
    };
    let [g0, g1] = SubBackward.backward(&inputs, &grad).unwrap();
    assert_eq!(g0.unwrap().as_slice(), &[1.5, -2.0]);
    assert_eq!(g1.unwrap().as_slice(), &[-1.5, 2.0]);
}

#[test]
fn test_mul_backward_scalar_operands() {
    let a = m(1, 1, vec![3.0]);
    let b = m(1, 1, vec![-4.0]);
    let out = m(1, 1, vec![-12.0]);
    let grad = m(1, 1, vec![2.0]);
    let inputs = BackwardInputs {
        output: &out,
        parents: [Some(&a), Some(&b)],
        scalar: None,
    };
    let [g0, g1] = MulBackward.backward(&inputs, &grad).unwrap();
    assert_relative_eq!(g0.unwrap().as_slice()[0], -8.0);
    assert_relative_eq!(g1.unwrap().as_slice()[0], 6.0);
}

#[test]
fn test_mul_backward_matrix_product() {
    // R = A . B with A 2x3, B 3x2 and dR all ones.
    let a = m(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let b = m(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
    let out = a.matmul(&b).unwrap();
    let grad = Matrix::ones(2, 2).unwrap();
    let inputs = BackwardInputs {
        output: &out,
        parents: [Some(&a), Some(&b)],
        scalar: None,
    };
    let [g0, g1] = MulBackward.backward(&inputs, &grad).unwrap();
    let g0 = g0.unwrap();
    let g1 = g1.unwrap();
    // dA = ones . B^T: every row holds the row sums of B.
    assert_eq!(g0.shape(), [2, 3]);
    assert_eq!(g0.as_slice(), &[15.0, 19.0, 23.0, 15.0, 19.0, 23.0]);
    // dB = A^T . ones: every column holds the column sums of A.
    assert_eq!(g1.shape(), [3, 2]);
    assert_eq!(g1.as_slice(), &[5.0, 5.0, 7.0, 7.0, 9.0, 9.0]);
}

#[test]
fn test_mul_backward_scalar_form() {
    let a = m(2, 1, vec![1.0, -1.0]);
    let out = m(2, 1, vec![3.0, -3.0]);
    let grad = m(2, 1, vec![1.0, 2.0]);
    let inputs = BackwardInputs {
        output: &out,
        parents: [Some(&a), None],
        scalar: Some(3.0),
    };
    let [g0, g1] = MulBackward.backward(&inputs, &grad).unwrap();
    assert_eq!(g0.unwrap().as_slice(), &[3.0, 6.0]);
    assert!(g1.is_none());
}

#[test]
fn test_mul_backward_requires_both_parents_without_scalar() {
    let a = m(1, 1, vec![1.0]);
    let grad = m(1, 1, vec![1.0]);
    let inputs = BackwardInputs {
        output: &a,
        parents: [Some(&a), None],
        scalar: None,
    };
    let err = MulBackward.backward(&inputs, &grad).unwrap_err();
    assert!(matches!(err, MatGradError::NullArgument { .. }));
}

#[test]
fn test_activation_backward_uses_output_value() {
    let x: f64 = 0.3;
    let s = 1.0 / (1.0 + (-x).exp());
    let t = x.tanh();
    let parent = m(1, 1, vec![x]);
    let grad = m(1, 1, vec![1.0]);

    let sig_out = m(1, 1, vec![s]);
    let inputs = BackwardInputs {
        output: &sig_out,
        parents: [Some(&parent), None],
        scalar: None,
    };
    let [g, _] = SigmoidBackward.backward(&inputs, &grad).unwrap();
    assert_relative_eq!(g.unwrap().as_slice()[0], s * (1.0 - s), epsilon = 1e-15);

    let tanh_out = m(1, 1, vec![t]);
    let inputs = BackwardInputs {
        output: &tanh_out,
        parents: [Some(&parent), None],
        scalar: None,
    };
    let [g, _] = TanhBackward.backward(&inputs, &grad).unwrap();
    assert_relative_eq!(g.unwrap().as_slice()[0], 1.0 - t * t, epsilon = 1e-15);
}

#[test]
fn test_relu_backward_masks_non_positive_outputs() {
    let parent = m(1, 4, vec![-1.0, 0.0, 2.0, 3.0]);
    let out = m(1, 4, vec![0.0, 0.0, 2.0, 3.0]);
    let grad = m(1, 4, vec![5.0, 5.0, 5.0, -5.0]);
    let inputs = BackwardInputs {
        output: &out,
        parents: [Some(&parent), None],
        scalar: None,
    };
    let [g, _] = ReluBackward.backward(&inputs, &grad).unwrap();
    assert_eq!(g.unwrap().as_slice(), &[0.0, 0.0, 5.0, -5.0]);
}

#[test]
fn test_unary_rule_without_parent_is_null_argument() {
    let out = m(1, 1, vec![0.5]);
    let grad = m(1, 1, vec![1.0]);
    let inputs = BackwardInputs {
        output: &out,
        parents: [None, None],
        scalar: None,
    };
    assert!(matches!(
        SigmoidBackward.backward(&inputs, &grad),
        Err(MatGradError::NullArgument { .. })
    ));
}
