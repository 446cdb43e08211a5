//! # Activation Functions
//!
//! Element-wise non-linearities applied to a whole matrix:
//!
//! - Sigmoid: `1 / (1 + e^-x)`, evaluated in a form that does not overflow for
//!   large negative inputs.
//! - ReLU: `max(0, x)`.
//! - Tanh.
//!
//! [`activation`] records a node tagged with the chosen function (one parent, the
//! input). [`activation_derivative`] evaluates `f'(x)` and is never recorded.

use crate::autograd::graph::{record, resolve_graph};
use crate::autograd::op::Op;
use crate::error::MatGradError;
use crate::matrix::Matrix;
use crate::ops::check_same_shape;
use std::fmt;
use std::str::FromStr;

/// The supported activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    Sigmoid,
    Relu,
    Tanh,
}

fn stable_sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl Activation {
    /// `f(x)`.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => stable_sigmoid(x),
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
        }
    }

    /// `f'(x)` in terms of the input.
    pub fn derivative(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => {
                let s = stable_sigmoid(x);
                s * (1.0 - s)
            }
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
        }
    }

    /// `f'(x)` in terms of the output `y = f(x)`.
    pub fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - y * y,
        }
    }

    /// Graph tag recorded for this function.
    pub fn op(self) -> Op {
        match self {
            Activation::Sigmoid => Op::Sigmoid,
            Activation::Relu => Op::Relu,
            Activation::Tanh => Op::Tanh,
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op().name())
    }
}

impl FromStr for Activation {
    type Err = MatGradError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op: Op = s.parse()?;
        Activation::try_from(op)
    }
}

impl TryFrom<Op> for Activation {
    type Error = MatGradError;

    fn try_from(op: Op) -> Result<Self, Self::Error> {
        match op {
            Op::Sigmoid => Ok(Activation::Sigmoid),
            Op::Relu => Ok(Activation::Relu),
            Op::Tanh => Ok(Activation::Tanh),
            other => Err(MatGradError::UnsupportedOperation(format!(
                "'{}' is not an activation",
                other
            ))),
        }
    }
}

/// `out[i] = f(input[i])`. Attaches a node tagged `kind.op()` with `input` as its
/// only parent when `input` is tracked.
///
/// # Errors
/// `ShapeMismatch` unless `out` has the shape of `input`.
pub fn activation(input: &Matrix, out: &mut Matrix, kind: Activation) -> Result<(), MatGradError> {
    let op = kind.op();
    check_same_shape(input, out, op.name())?;
    let graph = resolve_graph(&[input], op.name())?;
    for (o, &x) in out.data.iter_mut().zip(&input.data) {
        *o = kind.apply(x);
    }
    record(graph, out, op, &[input], None)
}

/// `out[i] = f'(input[i])`. The result is never tracked.
pub fn activation_derivative(
    input: &Matrix,
    out: &mut Matrix,
    kind: Activation,
) -> Result<(), MatGradError> {
    check_same_shape(input, out, "activation_derivative")?;
    for (o, &x) in out.data.iter_mut().zip(&input.data) {
        *o = kind.derivative(x);
    }
    out.set_node(None);
    Ok(())
}

pub fn sigmoid(input: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    activation(input, out, Activation::Sigmoid)
}

pub fn relu(input: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    activation(input, out, Activation::Relu)
}

pub fn tanh(input: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    activation(input, out, Activation::Tanh)
}

impl Matrix {
    /// Applies `kind` element-wise into a freshly allocated matrix.
    pub fn activate(&self, kind: Activation) -> Result<Matrix, MatGradError> {
        let mut out = Matrix::zeros(self.rows, self.cols)?;
        activation(self, &mut out, kind)?;
        Ok(out)
    }

    pub fn sigmoid(&self) -> Result<Matrix, MatGradError> {
        self.activate(Activation::Sigmoid)
    }

    pub fn relu(&self) -> Result<Matrix, MatGradError> {
        self.activate(Activation::Relu)
    }

    pub fn tanh(&self) -> Result<Matrix, MatGradError> {
        self.activate(Activation::Tanh)
    }
}

#[cfg(test)]
#[path = "activation_test.rs"]
mod tests;
