use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use imgtrans::pipeline::{Pipeline, Step};
use imgtrans::pixel::ThresholdMode;
use imgtrans::ImageU8;

/// Resize, crop, warp, and filter images (PNG or JPEG in, PNG out)
#[derive(Parser)]
#[command(name = "imgtrans", version)]
struct Args {
    /// Input image file
    input: PathBuf,

    /// Output PNG file
    #[arg(short, long)]
    output: PathBuf,

    /// Convert the input to single-channel grayscale before processing
    #[arg(long)]
    gray: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Suppress the JSON report
    #[arg(short, long)]
    quiet: bool,

    /// Log each step (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bilinear resize (exact 2x downscale uses block averaging)
    Resize {
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
    },
    /// Rotate and scale a window around a center point
    Crop {
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        /// Rotation angle in degrees
        #[arg(long, default_value = "0.0")]
        angle: f32,
        /// Source pixels per output pixel
        #[arg(long, default_value = "1.0")]
        ratio: f32,
        /// Rotation center x (defaults to the image center)
        #[arg(long)]
        cx: Option<f32>,
        /// Rotation center y (defaults to the image center)
        #[arg(long)]
        cy: Option<f32>,
    },
    /// Warp by point correspondences: 3 pairs for affine, 4 for perspective
    Warp {
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        /// Source points as "x,y;x,y;..."
        #[arg(long, value_parser = parse_points)]
        src: Points,
        /// Destination points as "x,y;x,y;..."
        #[arg(long, value_parser = parse_points)]
        dst: Points,
    },
    /// Binarize: samples above the threshold become `value`, others 0
    Threshold {
        #[arg(long)]
        threshold: u8,
        #[arg(long, default_value = "255")]
        value: u8,
    },
    /// 3x3 minimum filter
    Erode,
    /// Absolute difference against a second image of the same size
    Diff { other: PathBuf },
    /// Run a TOML pipeline of steps
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Serialize)]
struct Report {
    input: String,
    output: String,
    input_size: [usize; 3],
    output_size: [usize; 3],
    steps: Vec<&'static str>,
}

#[derive(Debug, Clone)]
struct Points(Vec<[f32; 2]>);

/// Parse `"x,y;x,y;..."` into a list of points.
fn parse_points(s: &str) -> Result<Points, String> {
    s.split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let (x, y) = p
                .split_once(',')
                .ok_or_else(|| format!("point '{p}' is not 'x,y'"))?;
            let x = x.trim().parse::<f32>().map_err(|e| format!("{p}: {e}"))?;
            let y = y.trim().parse::<f32>().map_err(|e| format!("{p}: {e}"))?;
            Ok([x, y])
        })
        .collect::<Result<_, _>>()
        .map(Points)
}

fn load_image(path: &PathBuf, gray: bool) -> Result<ImageU8> {
    let img = image::open(path).with_context(|| format!("failed to open image: {}", path.display()))?;
    let (width, height, channels, pixels) = if gray {
        let img = img.into_luma8();
        (img.width(), img.height(), 1, img.into_raw())
    } else {
        let img = img.into_rgb8();
        (img.width(), img.height(), 3, img.into_raw())
    };
    Ok(ImageU8::from_packed(
        width as usize,
        height as usize,
        channels,
        pixels,
    )?)
}

fn save_image(path: &PathBuf, img: &ImageU8) -> Result<()> {
    let color = match img.channels {
        1 => image::ColorType::L8,
        3 => image::ColorType::Rgb8,
        n => bail!("cannot save a {n}-channel image"),
    };
    image::save_buffer(
        path,
        &img.to_packed(),
        img.width as u32,
        img.height as u32,
        color,
    )
    .with_context(|| format!("failed to write image: {}", path.display()))
}

/// Center of the image in sampling coordinates, where pixel centers sit on integers.
fn image_center(img: &ImageU8) -> [f32; 2] {
    [
        (img.width as f32 - 1.0) / 2.0,
        (img.height as f32 - 1.0) / 2.0,
    ]
}

fn build_pipeline(command: Command, input: &ImageU8) -> Result<Pipeline> {
    let step = match command {
        Command::Resize { width, height } => Step::Resize { width, height },
        Command::Crop {
            width,
            height,
            angle,
            ratio,
            cx,
            cy,
        } => Step::Crop {
            width,
            height,
            angle: angle.to_radians(),
            ratio,
            center: {
                let [mx, my] = image_center(input);
                [cx.unwrap_or(mx), cy.unwrap_or(my)]
            },
        },
        Command::Warp {
            width,
            height,
            src: Points(src),
            dst: Points(dst),
        } => match (src.len(), dst.len()) {
            (3, 3) => Step::WarpAffine {
                width,
                height,
                src: [src[0], src[1], src[2]],
                dst: [dst[0], dst[1], dst[2]],
            },
            (4, 4) => Step::WarpPerspective {
                width,
                height,
                src: [src[0], src[1], src[2], src[3]],
                dst: [dst[0], dst[1], dst[2], dst[3]],
            },
            (s, d) => bail!("need 3 or 4 point pairs, got {s} source and {d} destination points"),
        },
        Command::Threshold { threshold, value } => Step::Threshold {
            threshold,
            value,
            mode: ThresholdMode::Binary,
        },
        Command::Erode => Step::Erode,
        Command::Diff { .. } => bail!("diff compares two inputs and has no pipeline form"),
        Command::Run { config } => {
            let text = std::fs::read_to_string(&config)
                .with_context(|| format!("failed to read config: {}", config.display()))?;
            return Pipeline::from_toml(&text)
                .with_context(|| format!("invalid pipeline config: {}", config.display()));
        }
    };
    Ok(Pipeline::new(vec![step]))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let img = load_image(&args.input, args.gray)?;
    info!(
        path = %args.input.display(),
        width = img.width,
        height = img.height,
        channels = img.channels,
        "image loaded"
    );

    let (result, steps) = match args.command {
        Command::Diff { other } => {
            let other = load_image(&other, args.gray)?;
            let step = Step::DiffWithSource;
            let out = step.apply(&img, &other).context("diff failed")?;
            (out, vec![step.name()])
        }
        command => {
            let pipeline = build_pipeline(command, &img)?;
            let out = pipeline.run(&img).context("pipeline failed")?;
            (out, pipeline.steps.iter().map(Step::name).collect())
        }
    };
    debug!(width = result.width, height = result.height, "processing done");

    save_image(&args.output, &result)?;

    if !args.quiet {
        let report = Report {
            input: args.input.display().to_string(),
            output: args.output.display().to_string(),
            input_size: [img.width, img.height, img.channels],
            output_size: [result.width, result.height, result.channels],
            steps,
        };
        let json = if args.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{json}");
    }

    Ok(())
}
