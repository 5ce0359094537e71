//! Declarative chains of resampling, warping, and pixel operations.
//!
//! A [`Pipeline`] mirrors the usual flow for classifier input: normalize the
//! geometry first, optionally warp by landmark correspondences, then
//! post-process pixels. Each step allocates its own output buffer.

use tracing::{debug, instrument};

use crate::error::{ImageError, PipelineError};
use crate::image::ImageU8;
use crate::pixel::{self, ThresholdMode};
use crate::resize;
use crate::transform;
use crate::warp;

/// One stage of a [`Pipeline`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Step {
    /// Bilinear resize to `width`×`height`.
    Resize { width: usize, height: usize },
    /// Rotate/scale crop around `center` in source coordinates.
    Crop {
        width: usize,
        height: usize,
        /// Rotation in radians.
        #[cfg_attr(feature = "serde", serde(default))]
        angle: f32,
        #[cfg_attr(feature = "serde", serde(default = "default_ratio"))]
        ratio: f32,
        center: [f32; 2],
    },
    /// Affine warp estimated from 3 correspondences.
    WarpAffine {
        width: usize,
        height: usize,
        src: [[f32; 2]; 3],
        dst: [[f32; 2]; 3],
    },
    /// Perspective warp estimated from 4 correspondences.
    WarpPerspective {
        width: usize,
        height: usize,
        src: [[f32; 2]; 4],
        dst: [[f32; 2]; 4],
    },
    Threshold {
        threshold: u8,
        #[cfg_attr(feature = "serde", serde(default = "default_value"))]
        value: u8,
        #[cfg_attr(feature = "serde", serde(default))]
        mode: ThresholdMode,
    },
    Erode,
    /// Absolute difference against the pipeline input.
    DiffWithSource,
}

#[cfg(feature = "serde")]
fn default_ratio() -> f32 {
    1.0
}

#[cfg(feature = "serde")]
fn default_value() -> u8 {
    255
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Resize { .. } => "resize",
            Step::Crop { .. } => "crop",
            Step::WarpAffine { .. } => "warp_affine",
            Step::WarpPerspective { .. } => "warp_perspective",
            Step::Threshold { .. } => "threshold",
            Step::Erode => "erode",
            Step::DiffWithSource => "diff_with_source",
        }
    }

    /// Apply this step to `cur`. `input` is the image the pipeline started from.
    pub fn apply(&self, cur: &ImageU8, input: &ImageU8) -> Result<ImageU8, ImageError> {
        let c = cur.channels;
        match *self {
            Step::Resize { width, height } => {
                let mut out = ImageU8::new(width, height, c);
                resize::resize_linear(&mut out, cur)?;
                Ok(out)
            }
            Step::Crop {
                width,
                height,
                angle,
                ratio,
                center,
            } => {
                let mut out = ImageU8::new(width, height, c);
                resize::crop_rotate(&mut out, cur, angle, ratio, center)?;
                Ok(out)
            }
            Step::WarpAffine {
                width,
                height,
                ref src,
                ref dst,
            } => {
                let m = transform::affine_transform(src, dst)?;
                let mut out = ImageU8::new(width, height, c);
                warp::warp_affine(&mut out, cur, &m)?;
                Ok(out)
            }
            Step::WarpPerspective {
                width,
                height,
                ref src,
                ref dst,
            } => {
                let m = transform::perspective_transform(src, dst)?;
                let mut out = ImageU8::new(width, height, c);
                warp::warp_perspective(&mut out, cur, &m)?;
                Ok(out)
            }
            Step::Threshold {
                threshold,
                value,
                mode,
            } => {
                let mut out = ImageU8::new(cur.width, cur.height, c);
                let packed = cur.to_packed();
                pixel::threshold(&mut out.buf, &packed, threshold, value, mode)?;
                Ok(out)
            }
            Step::Erode => {
                let mut out = ImageU8::new(cur.width, cur.height, c);
                pixel::erode(&mut out, cur)?;
                Ok(out)
            }
            Step::DiffWithSource => {
                input.check_same_geometry(cur)?;
                let mut out = ImageU8::new(cur.width, cur.height, c);
                pixel::abs_diff(&mut out.buf, &cur.to_packed(), &input.to_packed())?;
                Ok(out)
            }
        }
    }
}

/// An ordered list of [`Step`]s.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pipeline {
    #[cfg_attr(feature = "serde", serde(default))]
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Parse a pipeline from TOML (`[[steps]]` tables with a `type` key).
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        toml::from_str(toml_str).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Run every step in order, starting from a copy of `input`.
    #[instrument(skip_all, fields(steps = self.steps.len(), width = input.width, height = input.height))]
    pub fn run(&self, input: &ImageU8) -> Result<ImageU8, PipelineError> {
        let mut cur = input.clone();
        for (index, step) in self.steps.iter().enumerate() {
            cur = step.apply(&cur, input).map_err(|source| PipelineError::Step {
                index,
                step: step.name(),
                source,
            })?;
            debug!(
                index,
                step = step.name(),
                width = cur.width,
                height = cur.height,
                "step done"
            );
        }
        Ok(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pipeline_returns_input() {
        let img = ImageU8::filled(3, 2, 1, 40);
        let out = Pipeline::default().run(&img).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn resize_then_threshold() {
        let img = ImageU8::from_packed(
            4,
            4,
            1,
            vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150],
        )
        .unwrap();
        let pipeline = Pipeline::new(vec![
            Step::Resize {
                width: 2,
                height: 2,
            },
            Step::Threshold {
                threshold: 50,
                value: 1,
                mode: ThresholdMode::Binary,
            },
        ]);
        let out = pipeline.run(&img).unwrap();
        assert_eq!(out.buf, vec![0, 0, 1, 1]);
    }

    #[test]
    fn diff_with_source_after_erode() {
        let mut img = ImageU8::filled(3, 3, 1, 60);
        img.set(0, 0, 0, 20);
        let pipeline = Pipeline::new(vec![Step::Erode, Step::DiffWithSource]);
        let out = pipeline.run(&img).unwrap();
        // Erosion spreads the dark corner into its 2x2 neighborhood
        assert_eq!(out.get(0, 0, 0), 0);
        assert_eq!(out.get(1, 1, 0), 40);
        assert_eq!(out.get(2, 2, 0), 0);
    }

    #[test]
    fn failing_step_reports_index() {
        let img = ImageU8::filled(4, 4, 1, 0);
        let pipeline = Pipeline::new(vec![
            Step::Erode,
            Step::WarpAffine {
                width: 4,
                height: 4,
                src: [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
                dst: [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            },
        ]);
        let err = pipeline.run(&img).unwrap_err();
        assert!(
            matches!(err, PipelineError::Step { index: 1, step: "warp_affine", .. }),
            "{err}"
        );
    }

    #[test]
    fn diff_after_resize_is_a_size_mismatch() {
        let img = ImageU8::filled(4, 4, 1, 0);
        let pipeline = Pipeline::new(vec![
            Step::Resize {
                width: 2,
                height: 2,
            },
            Step::DiffWithSource,
        ]);
        assert!(matches!(
            pipeline.run(&img),
            Err(PipelineError::Step {
                source: ImageError::SizeMismatch(_),
                ..
            })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn parse_toml_pipeline() {
        let toml_str = r#"
            [[steps]]
            type = "crop"
            width = 32
            height = 32
            angle = 0.5
            center = [40.0, 30.0]

            [[steps]]
            type = "threshold"
            threshold = 128

            [[steps]]
            type = "erode"
        "#;
        let pipeline = Pipeline::from_toml(toml_str).unwrap();
        assert_eq!(
            pipeline.steps,
            vec![
                Step::Crop {
                    width: 32,
                    height: 32,
                    angle: 0.5,
                    ratio: 1.0,
                    center: [40.0, 30.0],
                },
                Step::Threshold {
                    threshold: 128,
                    value: 255,
                    mode: ThresholdMode::Binary,
                },
                Step::Erode,
            ]
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn parse_toml_rejects_unknown_step() {
        let err = Pipeline::from_toml("[[steps]]\ntype = \"blur\"\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
