use tracing::trace;

use crate::error::ImageError;
use crate::image::{Channels, ImageU8};

/// Scale factors within this distance of 2.0 take the [`zoom_in_twice`] path.
const HALF_SCALE_EPS: f32 = 1e-6;

/// Downscale by exactly 2, averaging each 2×2 block per channel.
///
/// The output size is taken from `dst`; `src` must be at least twice as
/// large in both directions and share its channel count. Each output sample
/// is the floor of the block mean (`sum >> 2`).
pub fn zoom_in_twice(dst: &mut ImageU8, src: &ImageU8) -> Result<(), ImageError> {
    dst.check_same_channels(src)?;
    if src.width < dst.width * 2 || src.height < dst.height * 2 {
        return Err(ImageError::SourceTooSmall {
            src_w: src.width,
            src_h: src.height,
            dst_w: dst.width,
            dst_h: dst.height,
        });
    }

    let c = dst.channels;
    let layout = dst.layout();
    let dw = dst.width;
    for dy in 0..dst.height {
        let s0 = src.row(dy * 2);
        let s1 = src.row(dy * 2 + 1);
        let out = dst.row_mut(dy);

        for dx in 0..dw {
            let d = dx * c;
            let i = dx * 2 * c;
            let avg = |k: usize| {
                ((s0[i + k] as u32 + s0[i + c + k] as u32 + s1[i + k] as u32 + s1[i + c + k] as u32)
                    >> 2) as u8
            };
            match layout {
                Channels::Gray => out[d] = avg(0),
                Channels::Rgb => {
                    out[d] = avg(0);
                    out[d + 1] = avg(1);
                    out[d + 2] = avg(2);
                }
                Channels::Other(n) => {
                    for k in 0..n {
                        out[d + k] = avg(k);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Resize `src` into `dst` with bilinear interpolation.
///
/// Destination pixel `x` maps to source coordinate `(x + 0.5) * scale - 0.5`.
/// When both scale factors are 2 the exact [`zoom_in_twice`] path is used.
pub fn resize_linear(dst: &mut ImageU8, src: &ImageU8) -> Result<(), ImageError> {
    dst.check_same_channels(src)?;
    if dst.width == 0 || dst.height == 0 {
        return Ok(());
    }
    if src.width == 0 || src.height == 0 {
        return Err(ImageError::SizeMismatch("source image is empty".into()));
    }

    let scale_x = src.width as f32 / dst.width as f32;
    let scale_y = src.height as f32 / dst.height as f32;

    if (scale_x - 2.0).abs() <= HALF_SCALE_EPS && (scale_y - 2.0).abs() <= HALF_SCALE_EPS {
        trace!(
            src_w = src.width,
            src_h = src.height,
            "exact half-size resize"
        );
        return zoom_in_twice(dst, src);
    }

    let c = dst.channels;
    let layout = dst.layout();
    let dw = dst.width;
    for y in 0..dst.height {
        let sy = (y as f32 + 0.5) * scale_y - 0.5;
        let out = dst.row_mut(y);
        for x in 0..dw {
            let sx = (x as f32 + 0.5) * scale_x - 0.5;
            let taps = src.sample(sx, sy);
            src.blend_into(layout, &taps, &mut out[x * c..(x + 1) * c]);
        }
    }
    Ok(())
}

/// Rotate, scale, and crop a region of `src` into `dst`.
///
/// Every destination pixel is offset from the destination center, scaled by
/// `ratio`, rotated by `angle` radians and placed relative to `center`
/// (source coordinates), then sampled bilinearly. Samples outside the source
/// take the nearest edge pixel.
pub fn crop_rotate(
    dst: &mut ImageU8,
    src: &ImageU8,
    angle: f32,
    ratio: f32,
    center: [f32; 2],
) -> Result<(), ImageError> {
    dst.check_same_channels(src)?;
    if src.width == 0 || src.height == 0 {
        return Err(ImageError::SizeMismatch("source image is empty".into()));
    }

    let x_start = 0.5 - dst.width as f32 / 2.0;
    let y_start = 0.5 - dst.height as f32 / 2.0;
    let (si, co) = angle.sin_cos();

    let c = dst.channels;
    let layout = dst.layout();
    let dw = dst.width;
    for y in 0..dst.height {
        let ys = ratio * (y_start + y as f32);
        let out = dst.row_mut(y);
        for x in 0..dw {
            let xs = ratio * (x_start + x as f32);
            let xr = xs * co + ys * si;
            let yr = -xs * si + ys * co;
            let taps = src.sample(center[0] + xr, center[1] + yr);
            src.blend_into(layout, &taps, &mut out[x * c..(x + 1) * c]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize, c: usize) -> ImageU8 {
        let mut img = ImageU8::new(w, h, c);
        for y in 0..h {
            for x in 0..w {
                for k in 0..c {
                    img.set(x, y, k, ((x * 7 + y * 13 + k * 29) % 256) as u8);
                }
            }
        }
        img
    }

    #[test]
    fn zoom_in_twice_averages_blocks() {
        let mut img = ImageU8::new(4, 4, 1);
        img.set(0, 0, 0, 100);
        img.set(1, 0, 0, 200);
        img.set(0, 1, 0, 0);
        img.set(1, 1, 0, 100);
        let mut out = ImageU8::new(2, 2, 1);
        zoom_in_twice(&mut out, &img).unwrap();
        // (100 + 200 + 0 + 100) / 4
        assert_eq!(out.get(0, 0, 0), 100);
        assert_eq!(out.get(1, 1, 0), 0);
    }

    #[test]
    fn zoom_in_twice_floors_the_mean() {
        let img = ImageU8::from_packed(2, 2, 1, vec![1, 1, 1, 2]).unwrap();
        let mut out = ImageU8::new(1, 1, 1);
        zoom_in_twice(&mut out, &img).unwrap();
        assert_eq!(out.get(0, 0, 0), 1);
    }

    #[test]
    fn zoom_in_twice_rgb_and_generic_channels_agree() {
        // Per-channel results must not depend on which path handled them
        let rgb = gradient(6, 4, 3);
        let mut out_rgb = ImageU8::new(3, 2, 3);
        zoom_in_twice(&mut out_rgb, &rgb).unwrap();

        let mut rgba = ImageU8::new(6, 4, 4);
        for y in 0..4 {
            for x in 0..6 {
                for k in 0..3 {
                    rgba.set(x, y, k, rgb.get(x, y, k));
                }
                rgba.set(x, y, 3, 255);
            }
        }
        let mut out_rgba = ImageU8::new(3, 2, 4);
        zoom_in_twice(&mut out_rgba, &rgba).unwrap();

        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(&out_rgba.pixel(x, y)[..3], out_rgb.pixel(x, y), "({x}, {y})");
                assert_eq!(out_rgba.get(x, y, 3), 255);
            }
        }
    }

    #[test]
    fn zoom_in_twice_rejects_small_source() {
        let img = ImageU8::new(3, 4, 1);
        let mut out = ImageU8::new(2, 2, 1);
        assert!(matches!(
            zoom_in_twice(&mut out, &img),
            Err(ImageError::SourceTooSmall { .. })
        ));
    }

    #[test]
    fn resize_same_size_is_identity() {
        let img = gradient(5, 4, 3);
        let mut out = ImageU8::new(5, 4, 3);
        resize_linear(&mut out, &img).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn resize_upscale_uniform_stays_uniform() {
        let img = ImageU8::filled(3, 3, 1, 77);
        let mut out = ImageU8::new(7, 5, 1);
        resize_linear(&mut out, &img).unwrap();
        assert!(out.buf.iter().all(|&v| v == 77));
    }

    #[test]
    fn resize_upscale_interpolates() {
        // 2x1 → 4x1: source coords -0.25, 0.25, 0.75, 1.25
        let img = ImageU8::from_packed(2, 2, 1, vec![0, 100, 0, 100]).unwrap();
        let mut out = ImageU8::new(4, 2, 1);
        resize_linear(&mut out, &img).unwrap();
        assert_eq!(out.row(0), &[0, 25, 75, 100]);
    }

    #[test]
    fn resize_channel_mismatch_fails() {
        let img = ImageU8::new(4, 4, 3);
        let mut out = ImageU8::new(2, 2, 1);
        assert!(matches!(
            resize_linear(&mut out, &img),
            Err(ImageError::SizeMismatch(_))
        ));
    }

    #[test]
    fn resize_respects_source_stride() {
        let buf = vec![10, 20, 0, 0, 30, 40, 0, 0];
        let img = ImageU8::from_buf(2, 2, 1, 4, buf).unwrap();
        let mut out = ImageU8::new(2, 2, 1);
        resize_linear(&mut out, &img).unwrap();
        assert_eq!(out.buf, vec![10, 20, 30, 40]);
    }

    #[test]
    fn crop_rotate_identity_copies_window() {
        let img = gradient(8, 8, 1);
        let mut out = ImageU8::new(4, 4, 1);
        // Center between pixels 3 and 4 puts the 4x4 window at [2, 6)
        crop_rotate(&mut out, &img, 0.0, 1.0, [3.5, 3.5]).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(out.get(x, y, 0), img.get(x + 2, y + 2, 0), "({x}, {y})");
            }
        }
    }

    #[test]
    fn crop_rotate_half_turn_flips() {
        let img = gradient(6, 6, 3);
        let mut out = ImageU8::new(6, 6, 3);
        crop_rotate(&mut out, &img, std::f32::consts::PI, 1.0, [2.5, 2.5]).unwrap();
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(out.pixel(x, y), img.pixel(5 - x, 5 - y), "({x}, {y})");
            }
        }
    }

    #[test]
    fn crop_rotate_zoom_out_clamps_to_edges() {
        let img = ImageU8::filled(4, 4, 1, 9);
        let mut out = ImageU8::new(5, 5, 1);
        crop_rotate(&mut out, &img, 0.3, 4.0, [1.5, 1.5]).unwrap();
        assert!(out.buf.iter().all(|&v| v == 9));
    }
}
