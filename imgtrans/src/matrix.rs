use std::fmt;
use std::ops::{Index, IndexMut};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::MatrixError;

/// Dense row-major matrix of `f32`.
///
/// Rows are contiguous slices of the backing buffer, so whole-row operations
/// (add, scale, combine, swap) cost O(cols).
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Create a zero-filled `rows`×`cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self, MatrixError> {
        if rows == 0 || cols == 0 {
            return Err(MatrixError::InvalidShape { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        })
    }

    /// Create an `n`×`n` identity matrix.
    pub fn identity(n: usize) -> Result<Self, MatrixError> {
        let mut m = Self::zeros(n, n)?;
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        Ok(m)
    }

    /// Build a 2×3 affine matrix from its two rows.
    pub fn affine(rows: [[f32; 3]; 2]) -> Self {
        Self {
            rows: 2,
            cols: 3,
            data: rows.concat(),
        }
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, MatrixError> {
        let h = rows.len();
        let w = rows.first().map_or(0, |r| r.as_ref().len());
        let mut m = Self::zeros(h, w)?;
        for (i, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != w {
                return Err(MatrixError::ShapeMismatch {
                    expected: (h, w),
                    found: (i, r.len()),
                });
            }
            m.row_mut(i).copy_from_slice(r);
        }
        Ok(m)
    }

    /// Random matrix with entries `value % thresh`, seeded from the clock.
    ///
    /// The seed is the wall-clock time in nanoseconds. `std` exposes no
    /// absolute reading of the monotonic clock, and any changing value is
    /// good enough for a seed; use [`Matrix::random_with`] for reproducible
    /// output.
    pub fn random(rows: usize, cols: usize, thresh: u32) -> Result<Self, MatrixError> {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let mut rng = StdRng::seed_from_u64(seed);
        Self::random_with(&mut rng, rows, cols, thresh)
    }

    /// Random matrix with entries `value % thresh` drawn from `rng`.
    ///
    /// A `thresh` of 0 is treated as 1 (all zeros).
    pub fn random_with<G: Rng>(
        rng: &mut G,
        rows: usize,
        cols: usize,
        thresh: u32,
    ) -> Result<Self, MatrixError> {
        let thresh = thresh.max(1);
        let mut m = Self::zeros(rows, cols)?;
        for v in &mut m.data {
            *v = (rng.gen::<u32>() % thresh) as f32;
        }
        Ok(m)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f32 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, val: f32) {
        self.data[r * self.cols + c] = val;
    }

    #[inline]
    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, r: usize) -> &mut [f32] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Borrow row `dst` mutably and row `src` immutably. `dst != src`.
    fn row_pair(&mut self, dst: usize, src: usize) -> (&mut [f32], &[f32]) {
        debug_assert_ne!(dst, src);
        let w = self.cols;
        if dst < src {
            let (lo, hi) = self.data.split_at_mut(src * w);
            (&mut lo[dst * w..(dst + 1) * w], &hi[..w])
        } else {
            let (lo, hi) = self.data.split_at_mut(dst * w);
            (&mut hi[..w], &lo[src * w..(src + 1) * w])
        }
    }

    /// `row[dst][from..] += row[src][from..]`
    pub fn add_row(&mut self, dst: usize, src: usize, from: usize) {
        let (d, s) = self.row_pair(dst, src);
        for (a, b) in d[from..].iter_mut().zip(&s[from..]) {
            *a += *b;
        }
    }

    /// `row[dst][from..] += k * row[src][from..]`
    pub fn add_scaled_row(&mut self, dst: usize, src: usize, k: f32, from: usize) {
        let (d, s) = self.row_pair(dst, src);
        for (a, b) in d[from..].iter_mut().zip(&s[from..]) {
            *a += k * *b;
        }
    }

    /// `row[r][from..] /= k`
    pub fn div_row(&mut self, r: usize, k: f32, from: usize) {
        for v in &mut self.row_mut(r)[from..] {
            *v /= k;
        }
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        let w = self.cols;
        let (head, tail) = self.data.split_at_mut(hi * w);
        head[lo * w..(lo + 1) * w].swap_with_slice(&mut tail[..w]);
    }

    /// Matrix product `self * rhs`.
    pub fn mul(&self, rhs: &Matrix) -> Result<Matrix, MatrixError> {
        if self.cols != rhs.rows {
            return Err(MatrixError::ShapeMismatch {
                expected: (self.cols, rhs.cols),
                found: rhs.shape(),
            });
        }
        let mut out = Matrix::zeros(self.rows, rhs.cols)?;
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for (o, b) in out.row_mut(i).iter_mut().zip(rhs.row(k)) {
                    *o += a * *b;
                }
            }
        }
        Ok(out)
    }

    /// Largest absolute element-wise difference to `other`, if shapes agree.
    pub fn max_abs_diff(&self, other: &Matrix) -> Option<f32> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f32::max),
        )
    }

    pub(crate) fn expect_shape(&self, rows: usize, cols: usize) -> Result<(), MatrixError> {
        if self.shape() != (rows, cols) {
            return Err(MatrixError::ShapeMismatch {
                expected: (rows, cols),
                found: self.shape(),
            });
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &f32 {
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f32 {
        &mut self.data[r * self.cols + c]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix: {}x{}", self.rows, self.cols)?;
        for r in 0..self.rows {
            for v in self.row(r) {
                write!(f, "{v:.6} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_shape_and_zero_fill() {
        let m = Matrix::zeros(2, 3).unwrap();
        assert_eq!(m.shape(), (2, 3));
        for r in 0..2 {
            assert!(m.row(r).iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert_eq!(
            Matrix::zeros(0, 3),
            Err(MatrixError::InvalidShape { rows: 0, cols: 3 })
        );
        assert!(Matrix::zeros(3, 0).is_err());
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows: [&[f32]; 2] = [&[1.0, 2.0], &[3.0]];
        assert!(matches!(
            Matrix::from_rows(&rows),
            Err(MatrixError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn row_operations() {
        let mut m = Matrix::from_rows(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        m.add_row(0, 1, 0);
        assert_eq!(m.row(0), &[5.0, 7.0, 9.0]);

        m.add_scaled_row(1, 0, -1.0, 1);
        // Column 0 untouched because `from` = 1
        assert_eq!(m.row(1), &[4.0, -2.0, -3.0]);

        m.div_row(0, 5.0, 0);
        assert_eq!(m.row(0), &[1.0, 7.0 / 5.0, 9.0 / 5.0]);

        m.swap_rows(0, 1);
        assert_eq!(m.row(0), &[4.0, -2.0, -3.0]);
    }

    #[test]
    fn product_with_identity() {
        let a = Matrix::from_rows(&[[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let i = Matrix::identity(2).unwrap();
        assert_eq!(a.mul(&i).unwrap(), a);
        assert!(i.mul(&a).is_err());
    }

    #[test]
    fn random_respects_threshold() {
        let mut rng = StdRng::seed_from_u64(7);
        let m = Matrix::random_with(&mut rng, 4, 5, 10).unwrap();
        for r in 0..4 {
            for &v in m.row(r) {
                assert!((0.0..10.0).contains(&v) && v.fract() == 0.0, "v={v}");
            }
        }
        assert_eq!(Matrix::random(3, 3, 100).unwrap().shape(), (3, 3));
    }

    #[test]
    fn display_lists_every_row() {
        let m = Matrix::identity(2).unwrap();
        let s = m.to_string();
        assert!(s.starts_with("Matrix: 2x2\n"));
        assert_eq!(s.lines().count(), 3);
    }
}
