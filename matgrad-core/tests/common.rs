use matgrad_core::Matrix;

// Shared by several test crates; not every crate uses every helper.
#[allow(dead_code)]
pub(crate) fn create_test_matrix(rows: usize, cols: usize, data: Vec<f64>) -> Matrix {
    Matrix::from_vec(rows, cols, data).expect("Test matrix creation failed")
}

#[allow(dead_code)]
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
