pub mod error;
pub mod matrix;
pub mod solve;
#[allow(clippy::needless_range_loop)]
pub mod transform;
pub mod image;
pub mod resize;
pub mod pixel;
pub mod warp;
pub mod pipeline;

pub use error::{ImageError, MatrixError, PipelineError, TransformError};
pub use image::{Channels, ImageU8};
pub use matrix::Matrix;
pub use pipeline::{Pipeline, Step};
pub use pixel::ThresholdMode;
