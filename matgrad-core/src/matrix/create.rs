use crate::error::MatGradError;
use crate::matrix::{alloc_filled, Matrix};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

/// Zero-initialised `rows x cols` matrix.
pub fn zeros(rows: usize, cols: usize) -> Result<Matrix, MatGradError> {
    full(rows, cols, 0.0)
}

/// `rows x cols` matrix of ones.
pub fn ones(rows: usize, cols: usize) -> Result<Matrix, MatGradError> {
    full(rows, cols, 1.0)
}

/// `rows x cols` matrix with every element set to `value`.
pub fn full(rows: usize, cols: usize, value: f64) -> Result<Matrix, MatGradError> {
    let data = alloc_filled(rows, cols, value)?;
    Ok(Matrix {
        rows,
        cols,
        data,
        node: None,
    })
}

/// `n x n` identity matrix.
pub fn eye(n: usize) -> Result<Matrix, MatGradError> {
    let mut m = zeros(n, n)?;
    for i in 0..n {
        m.data[i * n + i] = 1.0;
    }
    Ok(m)
}

impl Matrix {
    /// Zero-initialised `rows x cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Matrix, MatGradError> {
        zeros(rows, cols)
    }

    /// `rows x cols` matrix of ones.
    pub fn ones(rows: usize, cols: usize) -> Result<Matrix, MatGradError> {
        ones(rows, cols)
    }

    /// `rows x cols` matrix filled with `value`.
    pub fn full(rows: usize, cols: usize, value: f64) -> Result<Matrix, MatGradError> {
        full(rows, cols, value)
    }

    /// Zero matrix with the same shape as `other`.
    pub fn zeros_like(other: &Matrix) -> Result<Matrix, MatGradError> {
        zeros(other.rows, other.cols)
    }

    /// Wraps a row-major buffer.
    ///
    /// # Errors
    /// `InvalidDimensions` for a zero dimension, `DataLengthMismatch` when
    /// `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix, MatGradError> {
        if rows == 0 || cols == 0 {
            return Err(MatGradError::InvalidDimensions { rows, cols });
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(MatGradError::DataLengthMismatch {
                data_len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Matrix {
            rows,
            cols,
            data,
            node: None,
        })
    }

    /// Builds a matrix from a slice of equally long rows.
    pub fn from_rows(rows: &[&[f64]]) -> Result<Matrix, MatGradError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.len());
        let mut m = zeros(n_rows, n_cols)?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(MatGradError::ShapeMismatch {
                    expected: vec![n_cols],
                    actual: vec![row.len()],
                    operation: "from_rows".to_string(),
                });
            }
            m.data[i * n_cols..(i + 1) * n_cols].copy_from_slice(row);
        }
        Ok(m)
    }

    /// Column vector (`n x 1`) holding `values`.
    pub fn column(values: &[f64]) -> Result<Matrix, MatGradError> {
        Matrix::from_vec(values.len(), 1, values.to_vec())
    }

    /// `n x n` identity matrix.
    pub fn eye(n: usize) -> Result<Matrix, MatGradError> {
        eye(n)
    }

    /// Matrix with elements drawn uniformly from `[low, high)` using the supplied
    /// generator.
    pub fn random_uniform<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        low: f64,
        high: f64,
        rng: &mut R,
    ) -> Result<Matrix, MatGradError> {
        let mut m = zeros(rows, cols)?;
        m.randomize_uniform(low, high, rng)?;
        Ok(m)
    }

    /// Matrix with elements drawn from `N(mean, std_dev^2)` using the supplied
    /// generator.
    pub fn random_normal<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        mean: f64,
        std_dev: f64,
        rng: &mut R,
    ) -> Result<Matrix, MatGradError> {
        let normal = Normal::new(mean, std_dev).map_err(|e| {
            MatGradError::InvalidArgument(format!("normal distribution N({}, {}): {}", mean, std_dev, e))
        })?;
        let mut m = zeros(rows, cols)?;
        for x in m.data.iter_mut() {
            *x = normal.sample(rng);
        }
        Ok(m)
    }

    /// Overwrites every element with a uniform sample from `[low, high)`.
    ///
    /// Follows the same graph rule as [`Matrix::fill`].
    ///
    /// # Errors
    /// `InvalidArgument` unless `low < high` and both bounds are finite.
    pub fn randomize_uniform<R: Rng + ?Sized>(
        &mut self,
        low: f64,
        high: f64,
        rng: &mut R,
    ) -> Result<(), MatGradError> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(MatGradError::InvalidArgument(format!(
                "uniform bounds must satisfy low < high, got [{}, {})",
                low, high
            )));
        }
        let dist = Uniform::new(low, high);
        for x in self.data.iter_mut() {
            *x = dist.sample(rng);
        }
        self.sync_node();
        Ok(())
    }
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
