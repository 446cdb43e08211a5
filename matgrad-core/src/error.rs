use thiserror::Error;

/// Custom error type for the matgrad crate.
///
/// Every matrix and graph operation reports failure through this enum; nothing
/// in the library panics on a contract violation.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum MatGradError {
    #[error("Missing argument '{argument}' for operation {operation}")]
    NullArgument {
        operation: String,
        argument: String,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Allocation failure: could not obtain storage for a {rows}x{cols} matrix")]
    AllocationFailure { rows: usize, cols: usize },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid dimensions: a matrix needs at least one row and one column, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Matrix creation error: data length {data_len} does not match shape [{rows}, {cols}]")]
    DataLengthMismatch {
        data_len: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operands of {operation} are tracked by different computation graphs")]
    GraphMismatch { operation: String },
}

impl MatGradError {
    pub(crate) fn shape_mismatch(expected: &[usize], actual: &[usize], operation: &str) -> Self {
        MatGradError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            operation: operation.to_string(),
        }
    }
}
