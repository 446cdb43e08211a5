use crate::error::MatGradError;
use crate::matrix::Matrix;
use rayon::prelude::*;

/// Tiles `src` across `dest`: `dest[i][j] = src[i % src.rows][j % src.cols]`.
///
/// Only integer-multiple tiling is supported. Not recorded in the computation
/// graph; `dest` comes back untracked.
///
/// # Errors
/// `ShapeMismatch` unless `dest.rows % src.rows == 0` and
/// `dest.cols % src.cols == 0`.
pub fn broadcast(src: &Matrix, dest: &mut Matrix) -> Result<(), MatGradError> {
    if dest.rows % src.rows != 0 || dest.cols % src.cols != 0 {
        return Err(MatGradError::shape_mismatch(
            &src.shape(),
            &dest.shape(),
            "broadcast",
        ));
    }
    let (src_rows, src_cols) = (src.rows, src.cols);
    let src_data = &src.data;
    dest.data
        .par_chunks_mut(dest.cols)
        .enumerate()
        .for_each(|(i, row)| {
            let src_row = &src_data[(i % src_rows) * src_cols..(i % src_rows + 1) * src_cols];
            for tile in row.chunks_exact_mut(src_cols) {
                tile.copy_from_slice(src_row);
            }
        });
    dest.set_node(None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_row_vector() {
        let src = Matrix::from_vec(1, 2, vec![1.0, 2.0]).unwrap();
        let mut dest = Matrix::zeros(2, 4).unwrap();
        broadcast(&src, &mut dest).unwrap();
        for r in 0..2 {
            assert_eq!(dest.row(r).unwrap(), &[1.0, 2.0, 1.0, 2.0]);
        }
    }

    #[test]
    fn test_broadcast_column_bias() {
        let bias = Matrix::column(&[0.5, -0.5]).unwrap();
        let mut dest = Matrix::zeros(4, 3).unwrap();
        broadcast(&bias, &mut dest).unwrap();
        assert_eq!(
            dest.as_slice(),
            &[0.5, 0.5, 0.5, -0.5, -0.5, -0.5, 0.5, 0.5, 0.5, -0.5, -0.5, -0.5]
        );
    }

    #[test]
    fn test_broadcast_same_shape_copies() {
        let src = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let mut dest = Matrix::zeros(2, 2).unwrap();
        broadcast(&src, &mut dest).unwrap();
        assert_eq!(dest, src);
    }

    #[test]
    fn test_broadcast_requires_integer_multiple() {
        let src = Matrix::zeros(2, 2).unwrap();
        let mut dest = Matrix::zeros(3, 4).unwrap();
        assert!(matches!(
            broadcast(&src, &mut dest),
            Err(MatGradError::ShapeMismatch { .. })
        ));
        let mut smaller = Matrix::zeros(1, 2).unwrap();
        assert!(broadcast(&src, &mut smaller).is_err());
    }
}
