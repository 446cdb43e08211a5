use crate::autograd::backward_op::{
    AddBackward, BackwardOp, MulBackward, ReluBackward, SigmoidBackward, SubBackward, TanhBackward,
};
use crate::error::MatGradError;
use std::fmt;
use std::str::FromStr;

/// Operation tag recorded on every graph node.
///
/// The set is closed: `Leaf` marks an input value, every other variant names the
/// forward operation that produced the node's value and selects its backward rule.
/// `Mul` covers both the matrix product (two parents) and scalar multiplication
/// (one parent plus the scalar stored on the node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Leaf,
    Add,
    Sub,
    Mul,
    Sigmoid,
    Relu,
    Tanh,
}

impl Op {
    /// Lowercase name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Op::Leaf => "leaf",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Sigmoid => "sigmoid",
            Op::Relu => "relu",
            Op::Tanh => "tanh",
        }
    }

    /// Whether the tag is one of the unary activations.
    pub fn is_activation(self) -> bool {
        matches!(self, Op::Sigmoid | Op::Relu | Op::Tanh)
    }

    /// Backward rule for this tag. Leaves have none and act as gradient sinks.
    pub fn backward_op(self) -> Option<&'static dyn BackwardOp> {
        match self {
            Op::Leaf => None,
            Op::Add => Some(&AddBackward),
            Op::Sub => Some(&SubBackward),
            Op::Mul => Some(&MulBackward),
            Op::Sigmoid => Some(&SigmoidBackward),
            Op::Relu => Some(&ReluBackward),
            Op::Tanh => Some(&TanhBackward),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Op {
    type Err = MatGradError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leaf" => Ok(Op::Leaf),
            "add" => Ok(Op::Add),
            "sub" => Ok(Op::Sub),
            "mul" => Ok(Op::Mul),
            "sigmoid" => Ok(Op::Sigmoid),
            "relu" => Ok(Op::Relu),
            "tanh" => Ok(Op::Tanh),
            other => Err(MatGradError::UnsupportedOperation(format!(
                "unknown operation tag '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for op in [Op::Leaf, Op::Add, Op::Sub, Op::Mul, Op::Sigmoid, Op::Relu, Op::Tanh] {
            assert_eq!(op.name().parse::<Op>().unwrap(), op);
        }
        assert_eq!("ReLU".parse::<Op>().unwrap(), Op::Relu);
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = "softmax".parse::<Op>().unwrap_err();
        assert!(matches!(err, MatGradError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_only_leaf_has_no_backward_rule() {
        assert!(Op::Leaf.backward_op().is_none());
        assert!(Op::Tanh.backward_op().is_some());
        assert!(Op::Mul.backward_op().is_some());
        assert!(Op::Relu.is_activation());
        assert!(!Op::Sub.is_activation());
    }
}
