use crate::error::ImageError;

/// Channel layout, selected once per call so the hot loops can use fixed-size fast paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray,
    Rgb,
    Other(usize),
}

impl Channels {
    pub fn from_count(n: usize) -> Self {
        match n {
            1 => Channels::Gray,
            3 => Channels::Rgb,
            n => Channels::Other(n),
        }
    }

    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
            Channels::Other(n) => n,
        }
    }
}

/// Interleaved 8-bit image with row-major pixel data.
///
/// `stride` is the distance in bytes between the starts of consecutive rows
/// and may exceed `width * channels` for padded or cropped buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageU8 {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub stride: usize,
    pub buf: Vec<u8>,
}

impl ImageU8 {
    /// Create a new image filled with zeros.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        let stride = width * channels;
        let buf = vec![0u8; stride * height];
        Self {
            width,
            height,
            channels,
            stride,
            buf,
        }
    }

    /// Create an image from existing pixel data.
    ///
    /// `stride` must be >= `width * channels`, and `buf` must contain at least
    /// `stride * height` bytes.
    pub fn from_buf(
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
        buf: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if channels == 0 {
            return Err(ImageError::InvalidLayout("channel count is zero".into()));
        }
        if stride < width * channels {
            return Err(ImageError::InvalidLayout(format!(
                "stride {stride} is smaller than row size {}",
                width * channels
            )));
        }
        if buf.len() < stride * height {
            return Err(ImageError::InvalidLayout(format!(
                "buffer holds {} bytes, {} needed",
                buf.len(),
                stride * height
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            stride,
            buf,
        })
    }

    /// Create an image from tightly packed pixel data.
    pub fn from_packed(
        width: usize,
        height: usize,
        channels: usize,
        buf: Vec<u8>,
    ) -> Result<Self, ImageError> {
        Self::from_buf(width, height, channels, width * channels, buf)
    }

    /// Fill every sample with `val`.
    pub fn filled(width: usize, height: usize, channels: usize, val: u8) -> Self {
        let mut img = Self::new(width, height, channels);
        img.buf.fill(val);
        img
    }

    #[inline]
    pub fn layout(&self) -> Channels {
        Channels::from_count(self.channels)
    }

    /// Bytes of pixel data per row, excluding stride padding.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width * self.channels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.buf[start..start + self.row_bytes()]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        let len = self.row_bytes();
        &mut self.buf[start..start + len]
    }

    /// All samples of the pixel at (x, y).
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let i = y * self.stride + x * self.channels;
        &self.buf[i..i + self.channels]
    }

    /// Get channel `c` of the pixel at (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> u8 {
        self.buf[y * self.stride + x * self.channels + c]
    }

    /// Set channel `c` of the pixel at (x, y).
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, val: u8) {
        self.buf[y * self.stride + x * self.channels + c] = val;
    }

    /// Copy the pixel data into a tightly packed buffer.
    pub fn to_packed(&self) -> Vec<u8> {
        if self.stride == self.row_bytes() {
            return self.buf[..self.stride * self.height].to_vec();
        }
        let mut out = Vec::with_capacity(self.row_bytes() * self.height);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }

    pub(crate) fn check_channels(&self) -> Result<(), ImageError> {
        if self.channels == 0 {
            return Err(ImageError::InvalidLayout("channel count is zero".into()));
        }
        Ok(())
    }

    pub(crate) fn check_same_channels(&self, other: &ImageU8) -> Result<(), ImageError> {
        self.check_channels()?;
        if self.channels != other.channels {
            return Err(ImageError::SizeMismatch(format!(
                "channel count {} does not match {}",
                self.channels, other.channels
            )));
        }
        Ok(())
    }

    pub(crate) fn check_same_geometry(&self, other: &ImageU8) -> Result<(), ImageError> {
        self.check_same_channels(other)?;
        if (self.width, self.height) != (other.width, other.height) {
            return Err(ImageError::SizeMismatch(format!(
                "{}x{} does not match {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        Ok(())
    }

    /// Bilinear sample at source coordinates `(sx, sy)`, one value per channel.
    ///
    /// `(sx, sy)` addresses pixel centers at integer positions. The base pixel
    /// is clamped to `[0, dim - 2]` and the fractional weight to `[0, 1]`, so
    /// coordinates outside the image take the nearest edge pixel and the 2×2
    /// neighborhood never leaves the buffer.
    #[inline]
    pub fn sample(&self, sx: f32, sy: f32) -> Taps {
        let (x0, x1, fx) = axis_taps(sx, self.width);
        let (y0, y1, fy) = axis_taps(sy, self.height);
        let c = self.channels;
        Taps {
            offsets: [
                y0 * self.stride + x0 * c,
                y0 * self.stride + x1 * c,
                y1 * self.stride + x0 * c,
                y1 * self.stride + x1 * c,
            ],
            weights: [
                (1.0 - fx) * (1.0 - fy),
                fx * (1.0 - fy),
                (1.0 - fx) * fy,
                fx * fy,
            ],
        }
    }

    /// Blend channel `c` of the four sampled neighbors.
    #[inline]
    pub fn blend(&self, taps: &Taps, c: usize) -> u8 {
        let b = &self.buf;
        let o = &taps.offsets;
        let w = &taps.weights;
        let v = b[o[0] + c] as f32 * w[0]
            + b[o[1] + c] as f32 * w[1]
            + b[o[2] + c] as f32 * w[2]
            + b[o[3] + c] as f32 * w[3];
        v.round().clamp(0.0, 255.0) as u8
    }

    /// Write all channels of a bilinear sample into `out`.
    #[inline]
    pub(crate) fn blend_into(&self, layout: Channels, taps: &Taps, out: &mut [u8]) {
        match layout {
            Channels::Gray => out[0] = self.blend(taps, 0),
            Channels::Rgb => {
                out[0] = self.blend(taps, 0);
                out[1] = self.blend(taps, 1);
                out[2] = self.blend(taps, 2);
            }
            Channels::Other(n) => {
                for (c, o) in out.iter_mut().enumerate().take(n) {
                    *o = self.blend(taps, c);
                }
            }
        }
    }
}

/// Buffer offsets and weights of a 2×2 bilinear neighborhood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Taps {
    pub offsets: [usize; 4],
    pub weights: [f32; 4],
}

#[inline]
fn axis_taps(coord: f32, dim: usize) -> (usize, usize, f32) {
    let last = dim.saturating_sub(1);
    let base = coord.floor().clamp(0.0, dim.saturating_sub(2) as f32);
    let frac = (coord - base).clamp(0.0, 1.0);
    let i0 = base as usize;
    (i0, (i0 + 1).min(last), frac)
}
