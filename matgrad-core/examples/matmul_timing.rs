//! # Multiply Kernel Timing
//!
//! Multiplies two constant-filled 1024x1024 matrices ten times with each kernel and
//! reports the time taken by every run.
//!
//! ## Execution
//! `cargo run --release --example matmul_timing`
//!
//! Add `--features simd` on an AVX2 target (`RUSTFLAGS="-C target-cpu=native"`) to
//! time the intrinsics path. `RAYON_NUM_THREADS` bounds the parallel kernel.

use log::info;
use matgrad_core::ops::{matmul, matmul_opt};
use matgrad_core::{MatGradError, Matrix};
use std::time::{Duration, Instant};

const SIZE: usize = 1024;
const RUNS: usize = 10;

fn time_kernel<F>(name: &str, mut kernel: F) -> Result<Duration, MatGradError>
where
    F: FnMut() -> Result<(), MatGradError>,
{
    let mut total = Duration::ZERO;
    for run in 1..=RUNS {
        let start = Instant::now();
        kernel()?;
        let elapsed = start.elapsed();
        total += elapsed;
        println!("{:>10} run {:>2}: {:>10.3} ms", name, run, elapsed.as_secs_f64() * 1e3);
    }
    Ok(total / RUNS as u32)
}

fn main() -> Result<(), MatGradError> {
    env_logger::init();

    let a = Matrix::full(SIZE, SIZE, 8923.2131238123)?;
    let b = Matrix::full(SIZE, SIZE, 91283912.123123)?;
    let mut out = Matrix::zeros(SIZE, SIZE)?;
    info!("timing {} runs of a {}x{} multiply", RUNS, SIZE, SIZE);

    let reference = time_kernel("reference", || matmul(&a, &b, &mut out))?;
    let reference_out = out.clone();
    let optimized = time_kernel("optimized", || matmul_opt(&a, &b, &mut out))?;

    let max_diff = reference_out
        .as_slice()
        .iter()
        .zip(out.as_slice())
        .map(|(x, y)| ((x - y) / x).abs())
        .fold(0.0, f64::max);

    println!("reference mean: {:.3} ms", reference.as_secs_f64() * 1e3);
    println!("optimized mean: {:.3} ms", optimized.as_secs_f64() * 1e3);
    println!(
        "speedup: {:.2}x, max relative difference: {:e}",
        reference.as_secs_f64() / optimized.as_secs_f64(),
        max_diff
    );
    Ok(())
}
