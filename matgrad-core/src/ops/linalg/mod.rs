// src/ops/linalg/mod.rs

pub mod broadcast;
pub mod matmul;
pub mod transpose;

pub use broadcast::broadcast;
pub use matmul::{matmul, matmul_opt, matmul_opt_with, MatmulOptions};
pub use transpose::transpose;
