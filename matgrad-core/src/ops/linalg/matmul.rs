//! Matrix multiplication `C = A . B` for `A: m x k`, `B: k x n`.
//!
//! Two kernels compute the same product:
//!
//! - [`matmul`]: the reference i-j-k triple loop.
//! - [`matmul_opt`]: transposes `B` once so both operands are read row-contiguously,
//!   then fills output rows in parallel with `rayon`. Each cell is a dot product
//!   accumulated in four lanes, reduced, and finished with a scalar tail for the
//!   `k % 4` leftover columns. With the `simd` feature on an AVX2 x86_64 build the
//!   lanes are a single `__m256d` register.
//!
//! The two kernels sum in different orders, so results agree only up to rounding.
//! Both record a `Mul` node with parents `{A, B}`.

use crate::autograd::graph::{record, resolve_graph};
use crate::autograd::op::Op;
use crate::error::MatGradError;
use crate::matrix::{alloc_filled, Matrix};
use crate::ops::linalg::transpose::transpose_into;
use log::debug;
use rayon::prelude::*;

const LANES: usize = 4;

/// Tuning knobs for [`matmul_opt_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulOptions {
    /// Spread output rows over the rayon thread pool.
    pub parallel: bool,
    /// Outputs with fewer rows than this are computed on the calling thread.
    pub min_parallel_rows: usize,
}

impl Default for MatmulOptions {
    fn default() -> Self {
        MatmulOptions {
            parallel: true,
            min_parallel_rows: 16,
        }
    }
}

impl MatmulOptions {
    /// Options that keep all work on the calling thread.
    pub fn serial() -> Self {
        MatmulOptions {
            parallel: false,
            ..Self::default()
        }
    }
}

fn check_matmul_shapes(a: &Matrix, b: &Matrix, out: &Matrix, operation: &str) -> Result<(), MatGradError> {
    if a.cols != b.rows {
        return Err(MatGradError::shape_mismatch(
            &[a.cols, b.cols],
            &b.shape(),
            operation,
        ));
    }
    if out.rows != a.rows || out.cols != b.cols {
        return Err(MatGradError::shape_mismatch(
            &[a.rows, b.cols],
            &out.shape(),
            operation,
        ));
    }
    Ok(())
}

/// Reference product: `out[i][j] = sum_l a[i][l] * b[l][j]`.
///
/// # Errors
/// `ShapeMismatch` unless `a.cols == b.rows` and `out` is `a.rows x b.cols`.
pub fn matmul(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    check_matmul_shapes(a, b, out, "matmul")?;
    let graph = resolve_graph(&[a, b], "matmul")?;

    let (m, k, n) = (a.rows, a.cols, b.cols);
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for l in 0..k {
                sum += a.data[i * k + l] * b.data[l * n + j];
            }
            out.data[i * n + j] = sum;
        }
    }
    record(graph, out, Op::Mul, &[a, b], None)
}

/// Optimized product with the default [`MatmulOptions`].
pub fn matmul_opt(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<(), MatGradError> {
    matmul_opt_with(a, b, out, &MatmulOptions::default())
}

/// Optimized product: transposed right operand, four-lane accumulation, row-parallel.
pub fn matmul_opt_with(
    a: &Matrix,
    b: &Matrix,
    out: &mut Matrix,
    options: &MatmulOptions,
) -> Result<(), MatGradError> {
    check_matmul_shapes(a, b, out, "matmul_opt")?;
    let graph = resolve_graph(&[a, b], "matmul_opt")?;

    // Scratch copy of B^T, private to this call.
    let mut b_t = alloc_filled(b.cols, b.rows, 0.0)?;
    transpose_into(&b.data, b.rows, b.cols, &mut b_t);

    let (m, k, n) = (a.rows, a.cols, b.cols);
    let a_data = &a.data;
    let b_t_data = &b_t;
    let fill_row = |(i, row): (usize, &mut [f64])| {
        let a_row = &a_data[i * k..(i + 1) * k];
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = dot_lanes(a_row, &b_t_data[j * k..(j + 1) * k]);
        }
    };

    let parallel = options.parallel && m >= options.min_parallel_rows;
    debug!(
        "matmul_opt: [{}, {}] x [{}, {}] ({})",
        m,
        k,
        b.rows,
        n,
        if parallel { "parallel" } else { "serial" }
    );
    if parallel {
        out.data.par_chunks_mut(n).enumerate().for_each(fill_row);
    } else {
        out.data.chunks_mut(n).enumerate().for_each(fill_row);
    }
    drop(b_t);

    record(graph, out, Op::Mul, &[a, b], None)
}

/// Dot product of two equally long rows, accumulated in four lanes.
#[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
fn dot_lanes(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let main = a.len() - a.len() % LANES;
    let mut acc = [0.0f64; LANES];
    for (ca, cb) in a[..main]
        .chunks_exact(LANES)
        .zip(b[..main].chunks_exact(LANES))
    {
        for lane in 0..LANES {
            acc[lane] += ca[lane] * cb[lane];
        }
    }
    let mut sum = reduce_lanes(acc);
    for (x, y) in a[main..].iter().zip(&b[main..]) {
        sum += x * y;
    }
    sum
}

/// Dot product of two equally long rows, accumulated in one AVX register.
#[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
fn dot_lanes(a: &[f64], b: &[f64]) -> f64 {
    use std::arch::x86_64::{
        _mm256_add_pd, _mm256_loadu_pd, _mm256_mul_pd, _mm256_setzero_pd, _mm256_storeu_pd,
    };

    debug_assert_eq!(a.len(), b.len());
    let k = a.len();
    let mut idx = 0;
    let mut lanes = [0.0f64; LANES];
    // SAFETY: avx2 is enabled at compile time; every load reads idx..idx + 4 with
    // idx + 4 <= k, inside both slices, and the loads are unaligned.
    unsafe {
        let mut acc = _mm256_setzero_pd();
        while idx + LANES <= k {
            let va = _mm256_loadu_pd(a.as_ptr().add(idx));
            let vb = _mm256_loadu_pd(b.as_ptr().add(idx));
            acc = _mm256_add_pd(acc, _mm256_mul_pd(va, vb));
            idx += LANES;
        }
        _mm256_storeu_pd(lanes.as_mut_ptr(), acc);
    }
    let mut sum = reduce_lanes(lanes);
    for l in idx..k {
        sum += a[l] * b[l];
    }
    sum
}

/// Folds the high half onto the low half, then adds the two remaining lanes.
#[inline(always)]
fn reduce_lanes(acc: [f64; LANES]) -> f64 {
    (acc[0] + acc[2]) + (acc[1] + acc[3])
}

#[cfg(test)]
#[path = "matmul_test.rs"]
mod tests;
