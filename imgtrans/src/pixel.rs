use crate::error::ImageError;
use crate::image::{Channels, ImageU8};

/// How [`threshold`] maps samples above and below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum ThresholdMode {
    /// `value` above the threshold, 0 otherwise.
    #[default]
    Binary,
}

fn check_len(dst: usize, src: usize) -> Result<(), ImageError> {
    if dst != src {
        return Err(ImageError::SizeMismatch(format!(
            "buffers hold {dst} and {src} samples"
        )));
    }
    Ok(())
}

/// Per-sample absolute difference `|a - b|` over flat buffers.
pub fn abs_diff(dst: &mut [u8], a: &[u8], b: &[u8]) -> Result<(), ImageError> {
    check_len(dst.len(), a.len())?;
    check_len(dst.len(), b.len())?;
    for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
        *d = x.abs_diff(y);
    }
    Ok(())
}

/// Binarize a flat buffer: samples strictly above `thresh` become `value`.
pub fn threshold(
    dst: &mut [u8],
    src: &[u8],
    thresh: u8,
    value: u8,
    mode: ThresholdMode,
) -> Result<(), ImageError> {
    check_len(dst.len(), src.len())?;
    let (lo, hi) = match mode {
        ThresholdMode::Binary => (0, value),
    };
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = if s > thresh { hi } else { lo };
    }
    Ok(())
}

/// Per-channel minimum of the `w`×`h` window whose top-left pixel is `(x, y)`.
///
/// Only 1- and 3-channel images are supported.
pub fn kernel_min(
    out: &mut [u8],
    src: &ImageU8,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> Result<(), ImageError> {
    let c = src.channels;
    match src.layout() {
        Channels::Gray => {
            let mut lo = 255u8;
            for row in y..y + h {
                for &v in &src.row(row)[x..x + w] {
                    lo = lo.min(v);
                }
            }
            out[0] = lo;
        }
        Channels::Rgb => {
            let mut lo = [255u8; 3];
            for row in y..y + h {
                for px in src.row(row)[x * c..(x + w) * c].chunks_exact(3) {
                    lo[0] = lo[0].min(px[0]);
                    lo[1] = lo[1].min(px[1]);
                    lo[2] = lo[2].min(px[2]);
                }
            }
            out[..3].copy_from_slice(&lo);
        }
        Channels::Other(n) => return Err(ImageError::UnsupportedChannels(n)),
    }
    Ok(())
}

/// Erode with a 3×3 minimum filter.
///
/// Border pixels use the part of the window inside the image: 2×2 at the
/// corners, 3×2 or 2×3 along the edges. Only 1- and 3-channel images are
/// handled; other channel counts fail with
/// [`ImageError::UnsupportedChannels`] and leave `dst` untouched.
pub fn erode(dst: &mut ImageU8, src: &ImageU8) -> Result<(), ImageError> {
    dst.check_same_geometry(src)?;
    if let Channels::Other(n) = src.layout() {
        return Err(ImageError::UnsupportedChannels(n));
    }

    let c = src.channels;
    for y in 0..src.height {
        let y0 = y.saturating_sub(1);
        let y1 = (y + 1).min(src.height - 1);
        let out = dst.row_mut(y);
        for x in 0..src.width {
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(src.width - 1);
            kernel_min(
                &mut out[x * c..(x + 1) * c],
                src,
                x0,
                y0,
                x1 - x0 + 1,
                y1 - y0 + 1,
            )?;
        }
    }
    Ok(())
}
