use tracing::debug;

use crate::error::TransformError;
use crate::matrix::Matrix;

/// Compute the 2×3 affine matrix `M` with `dst = M · [src; 1]` from 3 point pairs.
///
/// Solved in closed form through the cofactor inverse of the homogeneous
/// source matrix. Collinear or repeated source points give a determinant of
/// exactly zero and fail with [`TransformError::Degenerate`].
pub fn affine_transform(
    src: &[[f32; 2]; 3],
    dst: &[[f32; 2]; 3],
) -> Result<Matrix, TransformError> {
    let a = src;
    let det = (a[0][0] * a[1][1] + a[0][1] * a[2][0] + a[1][0] * a[2][1])
        - (a[2][0] * a[1][1] + a[1][0] * a[0][1] + a[0][0] * a[2][1]);
    if det == 0.0 {
        debug!(?src, "affine source points are linearly dependent");
        return Err(TransformError::Degenerate);
    }

    let inv = [
        [
            (a[1][1] - a[2][1]) / det,
            (a[2][1] - a[0][1]) / det,
            (a[0][1] - a[1][1]) / det,
        ],
        [
            (a[2][0] - a[1][0]) / det,
            (a[0][0] - a[2][0]) / det,
            (a[1][0] - a[0][0]) / det,
        ],
        [
            (a[1][0] * a[2][1] - a[2][0] * a[1][1]) / det,
            (a[2][0] * a[0][1] - a[0][0] * a[2][1]) / det,
            (a[0][0] * a[1][1] - a[0][1] * a[1][0]) / det,
        ],
    ];

    let mut m = Matrix::zeros(2, 3)?;
    for i in 0..3 {
        for axis in 0..2 {
            m[(axis, i)] =
                inv[i][0] * dst[0][axis] + inv[i][1] * dst[1][axis] + inv[i][2] * dst[2][axis];
        }
    }
    Ok(m)
}

/// Invert a 2×3 affine matrix.
///
/// Fails with [`TransformError::Degenerate`] when the 2×2 linear part has a
/// determinant of exactly zero.
pub fn invert_affine(m: &Matrix) -> Result<Matrix, TransformError> {
    m.expect_shape(2, 3)?;
    let det = m[(0, 0)] * m[(1, 1)] - m[(1, 0)] * m[(0, 1)];
    if det == 0.0 {
        debug!("affine linear part is singular");
        return Err(TransformError::Degenerate);
    }

    let mut inv = Matrix::zeros(2, 3)?;
    inv[(0, 0)] = m[(1, 1)] / det;
    inv[(0, 1)] = -(m[(0, 1)] / det);
    inv[(0, 2)] = (m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)]) / det;
    inv[(1, 0)] = -m[(1, 0)] / det;
    inv[(1, 1)] = m[(0, 0)] / det;
    inv[(1, 2)] = (m[(0, 2)] * m[(1, 0)] - m[(0, 0)] * m[(1, 2)]) / det;
    Ok(inv)
}

/// Compute the 3×3 perspective matrix mapping 4 source points onto 4 destination points.
///
/// The 8 unknowns are found by inverting the 8×8 system with
/// [`Matrix::inverse`]; `h[2][2]` is fixed to 1.
///
/// The system is solved in `f32` without row swaps, so accuracy drops with
/// coordinate magnitude: corners spread over a few hundred pixels land
/// within a few thousandths of a pixel rather than exactly. Normalize the
/// points first when tighter fits are needed.
pub fn perspective_transform(
    src: &[[f32; 2]; 4],
    dst: &[[f32; 2]; 4],
) -> Result<Matrix, TransformError> {
    let mut a = Matrix::zeros(8, 8)?;
    for i in 0..4 {
        let [sx, sy] = src[i];
        let [dx, dy] = dst[i];

        // x equations in rows 0..4
        a.row_mut(i)
            .copy_from_slice(&[sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy]);
        // y equations in rows 4..8
        a.row_mut(i + 4)
            .copy_from_slice(&[0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy]);
    }

    let a_inv = a.inverse().map_err(|err| {
        debug!(?src, ?dst, %err, "perspective system is not invertible");
        err
    })?;

    let rhs = [
        dst[0][0], dst[1][0], dst[2][0], dst[3][0], dst[0][1], dst[1][1], dst[2][1], dst[3][1],
    ];
    let mut m = Matrix::zeros(3, 3)?;
    for i in 0..8 {
        m[(i / 3, i % 3)] = a_inv.row(i).iter().zip(&rhs).map(|(c, b)| c * b).sum();
    }
    m[(2, 2)] = 1.0;
    Ok(m)
}

/// 2×3 affine matrix rotating by `angle` radians and scaling by `scale` about `center`.
///
/// Uses the same rotation sense as [`crate::resize::crop_rotate`]: a positive
/// angle turns the +x axis toward -y.
pub fn rotation_matrix(center: [f32; 2], angle: f32, scale: f32) -> Matrix {
    let (sin, cos) = angle.sin_cos();
    let a = scale * cos;
    let b = scale * sin;
    Matrix::affine([
        [a, b, (1.0 - a) * center[0] - b * center[1]],
        [-b, a, b * center[0] + (1.0 - a) * center[1]],
    ])
}

/// Map a point through a 2×3 affine matrix.
#[inline]
pub fn apply_affine(m: &Matrix, p: [f32; 2]) -> [f32; 2] {
    [
        m[(0, 0)] * p[0] + m[(0, 1)] * p[1] + m[(0, 2)],
        m[(1, 0)] * p[0] + m[(1, 1)] * p[1] + m[(1, 2)],
    ]
}

/// Map a point through a 3×3 perspective matrix.
///
/// Returns `None` when the point lands on the line at infinity.
#[inline]
pub fn apply_perspective(m: &Matrix, p: [f32; 2]) -> Option<[f32; 2]> {
    let x = m[(0, 0)] * p[0] + m[(0, 1)] * p[1] + m[(0, 2)];
    let y = m[(1, 0)] * p[0] + m[(1, 1)] * p[1] + m[(1, 2)];
    let w = m[(2, 0)] * p[0] + m[(2, 1)] * p[1] + m[(2, 2)];
    if w == 0.0 {
        return None;
    }
    Some([x / w, y / w])
}
