use tracing::debug;

use crate::error::MatrixError;
use crate::matrix::Matrix;

/// Pivot tolerance for Gauss-Jordan elimination.
pub const PIVOT_EPS: f32 = 1e-6;

impl Matrix {
    /// Invert a square matrix with Gauss-Jordan elimination on `[m | I]`.
    ///
    /// A pivot smaller than [`PIVOT_EPS`] is repaired by *adding* the first
    /// row below with a usable entry in that column; rows are never swapped.
    /// This can report a matrix as singular even though full pivoting would
    /// invert it (e.g. every entry of a column below the diagonal is under
    /// the tolerance while the matrix is well scaled elsewhere).
    ///
    /// Elimination runs in `f32` with no partial pivoting, so badly scaled
    /// systems (such as a perspective system built from pixel coordinates in
    /// the hundreds) lose a few significant digits.
    pub fn inverse(&self) -> Result<Matrix, MatrixError> {
        if !self.is_square() {
            debug!(rows = self.rows(), cols = self.cols(), "inverse of non-square matrix");
            return Err(MatrixError::NotSquare {
                rows: self.rows(),
                cols: self.cols(),
            });
        }

        let n = self.rows();
        let mut w = Matrix::zeros(n, 2 * n)?;
        for i in 0..n {
            w.row_mut(i)[..n].copy_from_slice(self.row(i));
            w[(i, n + i)] = 1.0;
        }

        // Forward elimination
        for i in 0..n {
            if w[(i, i)].abs() < PIVOT_EPS {
                let Some(j) = (i + 1..n).find(|&j| w[(j, i)].abs() > PIVOT_EPS) else {
                    debug!(column = i, "matrix is irreversible");
                    return Err(MatrixError::Singular { column: i });
                };
                w.add_row(i, j, i);
            }

            let pivot = w[(i, i)];
            w.div_row(i, pivot, i);

            for k in i + 1..n {
                let factor = -w[(k, i)];
                w.add_scaled_row(k, i, factor, i);
            }
        }

        // Back substitution
        for i in (1..n).rev() {
            for j in (0..i).rev() {
                let factor = -w[(j, i)];
                w.add_scaled_row(j, i, factor, i);
            }
        }

        let mut inv = Matrix::zeros(n, n)?;
        for i in 0..n {
            inv.row_mut(i).copy_from_slice(&w.row(i)[n..]);
        }
        Ok(inv)
    }
}
