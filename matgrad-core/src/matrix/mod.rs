//! # Dense Matrix (`matrix`)
//!
//! [`Matrix`] is a dense 2D array of `f64` stored contiguously in row-major order.
//! It owns its backing buffer and may carry a [`NodeRef`] naming the node of a
//! [`ComputationGraph`](crate::autograd::graph::ComputationGraph) that records how
//! its current value was derived.
//!
//! Constructors live in [`create`]; arithmetic lives in [`crate::ops`]. The
//! convenience methods defined here (`add`, `matmul`, ...) allocate the output and
//! forward to those free functions.

use crate::autograd::graph::NodeRef;
use crate::error::MatGradError;
use log::debug;
use std::fmt;
use std::ops::Index;

pub mod create;

pub use create::{eye, full, ones, zeros};

/// A dense, row-major matrix of `f64` values.
///
/// Invariant: `data.len() == rows * cols` and both dimensions are at least 1.
#[derive(Clone)]
pub struct Matrix {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) data: Vec<f64>,
    /// Graph node describing how this value was produced, if tracked.
    pub(crate) node: Option<NodeRef>,
}

/// Obtains a buffer of `rows * cols` copies of `value`, failing instead of aborting
/// when storage cannot be reserved.
pub(crate) fn alloc_filled(rows: usize, cols: usize, value: f64) -> Result<Vec<f64>, MatGradError> {
    if rows == 0 || cols == 0 {
        return Err(MatGradError::InvalidDimensions { rows, cols });
    }
    let len = rows
        .checked_mul(cols)
        .ok_or(MatGradError::AllocationFailure { rows, cols })?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| MatGradError::AllocationFailure { rows, cols })?;
    data.resize(len, value);
    Ok(data)
}

impl Matrix {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Total number of elements (`rows * cols`).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`: a matrix has at least one element.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` for `n x 1` matrices.
    pub fn is_column(&self) -> bool {
        self.cols == 1
    }

    /// The row-major backing buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable access to the row-major backing buffer.
    ///
    /// The graph cannot observe writes made through the returned slice, so a tracked
    /// matrix is detached first. Use [`update`](Self::update) to edit a tracked leaf
    /// in place and keep it tracked.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        if let Some(node) = self.node.take() {
            debug!("as_mut_slice: detaching node {}", node.id());
        }
        &mut self.data
    }

    /// Runs `f` over the row-major buffer, then brings the attached node in line
    /// with the new data (see [`fill`](Self::fill)).
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut [f64]),
    {
        f(&mut self.data);
        self.sync_node();
    }

    /// Called after every in-place write.
    ///
    /// A leaf node takes the new values, so gradients flowing into it are computed
    /// against what later operations actually read. Any other node recorded how the
    /// old value was derived; it is detached and the matrix becomes untracked.
    pub(crate) fn sync_node(&mut self) {
        let refreshed = match &self.node {
            Some(node) => node.graph().refresh_leaf(node.id(), &self.data),
            None => return,
        };
        if !refreshed {
            if let Some(node) = self.node.take() {
                debug!("in-place write: detaching derived node {}", node.id());
            }
        }
    }

    /// Consumes the matrix and returns its buffer.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Row `r` as a slice.
    pub fn row(&self, r: usize) -> Result<&[f64], MatGradError> {
        if r >= self.rows {
            return Err(MatGradError::IndexOutOfBounds {
                index: vec![r],
                shape: self.shape().to_vec(),
            });
        }
        Ok(&self.data[r * self.cols..(r + 1) * self.cols])
    }

    fn checked_offset(&self, r: usize, c: usize) -> Result<usize, MatGradError> {
        if r >= self.rows || c >= self.cols {
            return Err(MatGradError::IndexOutOfBounds {
                index: vec![r, c],
                shape: self.shape().to_vec(),
            });
        }
        Ok(r * self.cols + c)
    }

    /// Element at `(r, c)`.
    pub fn get(&self, r: usize, c: usize) -> Result<f64, MatGradError> {
        let offset = self.checked_offset(r, c)?;
        Ok(self.data[offset])
    }

    /// Overwrites the element at `(r, c)`.
    pub fn set(&mut self, r: usize, c: usize, value: f64) -> Result<(), MatGradError> {
        let offset = self.checked_offset(r, c)?;
        self.data[offset] = value;
        self.sync_node();
        Ok(())
    }

    /// Overwrites every element with `value`.
    ///
    /// On a tracked leaf the recorded value follows; a tracked derived matrix is
    /// detached from its graph.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
        self.sync_node();
    }

    /// The graph node attached to this matrix, if any.
    pub fn node(&self) -> Option<&NodeRef> {
        self.node.as_ref()
    }

    /// Whether the matrix is tracked by a computation graph.
    pub fn is_tracked(&self) -> bool {
        self.node.is_some()
    }

    /// Removes and returns the attached node reference. The node itself stays in
    /// its graph.
    pub fn detach(&mut self) -> Option<NodeRef> {
        self.node.take()
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeRef>) {
        self.node = node;
    }

    /// Copy of this matrix without a graph node.
    pub fn detached(&self) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.clone(),
            node: None,
        }
    }

    /// Same shape and every element within `tolerance` (absolute).
    pub fn approx_eq(&self, other: &Matrix, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Releases the matrix together with its reference to the graph.
    ///
    /// Equivalent to dropping it; the graph's nodes are freed once the last handle
    /// to the graph goes away.
    pub fn release(self) {
        drop(self);
    }

    /// Returns `self + other` in a freshly allocated matrix.
    pub fn add(&self, other: &Matrix) -> Result<Matrix, MatGradError> {
        let mut out = Matrix::zeros(self.rows, self.cols)?;
        crate::ops::arithmetic::add(self, other, &mut out)?;
        Ok(out)
    }

    /// Returns `self - other` in a freshly allocated matrix.
    pub fn sub(&self, other: &Matrix) -> Result<Matrix, MatGradError> {
        let mut out = Matrix::zeros(self.rows, self.cols)?;
        crate::ops::arithmetic::sub(self, other, &mut out)?;
        Ok(out)
    }

    /// Returns `scalar * self` in a freshly allocated matrix.
    pub fn scale(&self, scalar: f64) -> Result<Matrix, MatGradError> {
        let mut out = Matrix::zeros(self.rows, self.cols)?;
        crate::ops::arithmetic::scalar_mul(self, scalar, &mut out)?;
        Ok(out)
    }

    /// Matrix product using the reference kernel.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix, MatGradError> {
        let mut out = Matrix::zeros(self.rows, other.cols)?;
        crate::ops::linalg::matmul(self, other, &mut out)?;
        Ok(out)
    }

    /// Matrix product using the transposed, lane-accumulating parallel kernel.
    pub fn matmul_opt(&self, other: &Matrix) -> Result<Matrix, MatGradError> {
        let mut out = Matrix::zeros(self.rows, other.cols)?;
        crate::ops::linalg::matmul_opt(self, other, &mut out)?;
        Ok(out)
    }

    /// Transposed copy (untracked).
    pub fn transpose(&self) -> Result<Matrix, MatGradError> {
        let mut out = Matrix::zeros(self.cols, self.rows)?;
        crate::ops::linalg::transpose(self, &mut out)?;
        Ok(out)
    }

    /// Dot product of two column vectors.
    pub fn dot(&self, other: &Matrix) -> Result<f64, MatGradError> {
        crate::ops::arithmetic::dot(self, other)
    }
}

impl PartialEq for Matrix {
    /// Compares shape and data; graph attachment is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.data == other.data
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        assert!(r < self.rows && c < self.cols, "index ({}, {}) out of bounds for {}x{} matrix", r, c, self.rows, self.cols);
        &self.data[r * self.cols + c]
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Matrix(shape=[{}, {}], tracked={}, data={:?})",
            self.rows,
            self.cols,
            self.node.is_some(),
            self.data
        )
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix ({} by {}):", self.rows, self.cols)?;
        for row in self.data.chunks(self.cols) {
            for value in row {
                write!(f, "{:.6} ", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
