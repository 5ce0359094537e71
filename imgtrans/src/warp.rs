//! Whole-image warps driven by estimated transforms.
//!
//! Both warps take the forward (source → destination) matrix, invert it once,
//! and pull every destination pixel from the source with the same bilinear
//! sampler the resampler uses.

use tracing::debug;

use crate::error::{ImageError, MatrixError};
use crate::image::ImageU8;
use crate::matrix::Matrix;
use crate::transform::{apply_affine, apply_perspective, invert_affine};

/// Warp `src` into `dst` with a 2×3 source → destination affine matrix.
pub fn warp_affine(dst: &mut ImageU8, src: &ImageU8, m: &Matrix) -> Result<(), ImageError> {
    dst.check_same_channels(src)?;
    if src.width == 0 || src.height == 0 {
        return Err(ImageError::SizeMismatch("source image is empty".into()));
    }
    let inv = invert_affine(m)?;

    let c = dst.channels;
    let layout = dst.layout();
    let dw = dst.width;
    for y in 0..dst.height {
        let out = dst.row_mut(y);
        for x in 0..dw {
            let [sx, sy] = apply_affine(&inv, [x as f32, y as f32]);
            let taps = src.sample(sx, sy);
            src.blend_into(layout, &taps, &mut out[x * c..(x + 1) * c]);
        }
    }
    Ok(())
}

/// Warp `src` into `dst` with a 3×3 source → destination perspective matrix.
///
/// Destination pixels that map to infinity in the source are set to 0.
pub fn warp_perspective(dst: &mut ImageU8, src: &ImageU8, m: &Matrix) -> Result<(), ImageError> {
    dst.check_same_channels(src)?;
    if src.width == 0 || src.height == 0 {
        return Err(ImageError::SizeMismatch("source image is empty".into()));
    }
    if m.shape() != (3, 3) {
        return Err(MatrixError::ShapeMismatch {
            expected: (3, 3),
            found: m.shape(),
        }
        .into());
    }
    let inv = m.inverse()?;

    let c = dst.channels;
    let layout = dst.layout();
    let dw = dst.width;
    let mut skipped = 0usize;
    for y in 0..dst.height {
        let out = dst.row_mut(y);
        for x in 0..dw {
            let px = &mut out[x * c..(x + 1) * c];
            match apply_perspective(&inv, [x as f32, y as f32]) {
                Some([sx, sy]) => {
                    let taps = src.sample(sx, sy);
                    src.blend_into(layout, &taps, px);
                }
                None => {
                    px.fill(0);
                    skipped += 1;
                }
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, "pixels mapped to the line at infinity");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{affine_transform, perspective_transform};

    fn checker(w: usize, h: usize) -> ImageU8 {
        let mut img = ImageU8::new(w, h, 1);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, 0, if (x / 2 + y / 2) % 2 == 0 { 200 } else { 20 });
            }
        }
        img
    }

    #[test]
    fn affine_identity_copies() {
        let img = checker(8, 6);
        let m = Matrix::affine([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let mut out = ImageU8::new(8, 6, 1);
        warp_affine(&mut out, &img, &m).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn affine_translation_shifts() {
        let img = checker(8, 8);
        let src = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let dst = [[2.0, 1.0], [3.0, 1.0], [2.0, 2.0]];
        let m = affine_transform(&src, &dst).unwrap();
        let mut out = ImageU8::new(8, 8, 1);
        warp_affine(&mut out, &img, &m).unwrap();
        for y in 1..8 {
            for x in 2..8 {
                assert_eq!(out.get(x, y, 0), img.get(x - 2, y - 1, 0), "({x}, {y})");
            }
        }
    }

    #[test]
    fn affine_singular_matrix_fails() {
        let img = checker(4, 4);
        let m = Matrix::affine([[0.0, 0.0, 1.0], [0.0, 0.0, 1.0]]);
        let mut out = ImageU8::new(4, 4, 1);
        assert!(warp_affine(&mut out, &img, &m).is_err());
    }

    #[test]
    fn perspective_identity_copies() {
        let img = checker(6, 6);
        let corners = [[0.0, 0.0], [5.0, 0.0], [5.0, 5.0], [0.0, 5.0]];
        let m = perspective_transform(&corners, &corners).unwrap();
        let mut out = ImageU8::new(6, 6, 1);
        warp_perspective(&mut out, &img, &m).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn perspective_rejects_wrong_shape() {
        let img = checker(4, 4);
        let m = Matrix::affine([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let mut out = ImageU8::new(4, 4, 1);
        assert!(matches!(
            warp_perspective(&mut out, &img, &m),
            Err(ImageError::Transform(_))
        ));
    }
}
