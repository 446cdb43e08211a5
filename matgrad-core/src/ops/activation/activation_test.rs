use super::*;
use crate::autograd::graph::ComputationGraph;
use approx::assert_relative_eq;

#[test]
fn test_sigmoid_forward() {
    let x = Matrix::from_vec(1, 3, vec![0.0, 2.0, -2.0]).unwrap();
    let y = x.sigmoid().unwrap();
    assert_relative_eq!(y.as_slice()[0], 0.5);
    assert_relative_eq!(y.as_slice()[1], 1.0 / (1.0 + (-2.0f64).exp()), epsilon = 1e-15);
    assert_relative_eq!(y.as_slice()[1] + y.as_slice()[2], 1.0, epsilon = 1e-15);
}

#[test]
fn test_sigmoid_saturates_without_nan() {
    let x = Matrix::from_vec(1, 2, vec![-1000.0, 1000.0]).unwrap();
    let y = x.sigmoid().unwrap();
    assert_eq!(y.as_slice(), &[0.0, 1.0]);
}

#[test]
fn test_relu_forward() {
    let x = Matrix::from_vec(2, 2, vec![-1.0, 0.0, 0.5, 3.0]).unwrap();
    let mut y = Matrix::zeros(2, 2).unwrap();
    relu(&x, &mut y).unwrap();
    assert_eq!(y.as_slice(), &[0.0, 0.0, 0.5, 3.0]);
}

#[test]
fn test_tanh_forward() {
    let x = Matrix::from_vec(1, 2, vec![0.0, 1.0]).unwrap();
    let mut y = Matrix::zeros(1, 2).unwrap();
    tanh(&x, &mut y).unwrap();
    assert_relative_eq!(y.as_slice()[0], 0.0);
    assert_relative_eq!(y.as_slice()[1], 1.0f64.tanh());
}

#[test]
fn test_derivatives_match_output_form() {
    for kind in [Activation::Sigmoid, Activation::Relu, Activation::Tanh] {
        for &x in &[-3.0, -0.25, 0.7, 4.0] {
            assert_relative_eq!(
                kind.derivative(x),
                kind.derivative_from_output(kind.apply(x)),
                epsilon = 1e-12
            );
        }
    }
}

#[test]
fn test_activation_derivative_is_untracked() {
    let graph = ComputationGraph::new();
    let mut x = Matrix::from_vec(1, 3, vec![-1.0, 0.0, 2.0]).unwrap();
    graph.track(&mut x).unwrap();
    let mut d = Matrix::zeros(1, 3).unwrap();
    activation_derivative(&x, &mut d, Activation::Relu).unwrap();
    assert_eq!(d.as_slice(), &[0.0, 0.0, 1.0]);
    assert!(!d.is_tracked());

    activation_derivative(&x, &mut d, Activation::Sigmoid).unwrap();
    assert_relative_eq!(d.as_slice()[1], 0.25);
}

#[test]
fn test_activation_records_tag_and_single_parent() {
    let graph = ComputationGraph::new();
    let mut x = Matrix::ones(2, 1).unwrap();
    let id_x = graph.track(&mut x).unwrap();
    for kind in [Activation::Sigmoid, Activation::Relu, Activation::Tanh] {
        let y = x.activate(kind).unwrap();
        let id_y = y.node().unwrap().id();
        assert_eq!(graph.op(id_y).unwrap(), kind.op());
        assert_eq!(graph.parents(id_y).unwrap(), [Some(id_x), None]);
    }
}

#[test]
fn test_activation_shape_mismatch() {
    let x = Matrix::zeros(2, 2).unwrap();
    let mut out = Matrix::zeros(1, 4).unwrap();
    assert!(matches!(
        sigmoid(&x, &mut out),
        Err(MatGradError::ShapeMismatch { .. })
    ));
    assert!(activation_derivative(&x, &mut out, Activation::Tanh).is_err());
}

#[test]
fn test_parse_activation() {
    assert_eq!("ReLU".parse::<Activation>().unwrap(), Activation::Relu);
    assert_eq!("tanh".parse::<Activation>().unwrap(), Activation::Tanh);
    assert!(matches!(
        "add".parse::<Activation>(),
        Err(MatGradError::UnsupportedOperation(_))
    ));
    assert!("softmax".parse::<Activation>().is_err());
    assert_eq!(Activation::try_from(Op::Sigmoid).unwrap(), Activation::Sigmoid);
    assert_eq!(Activation::Sigmoid.to_string(), "sigmoid");
}
