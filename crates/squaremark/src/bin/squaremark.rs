//! squaremark CLI: detect square fiducial markers in a sequence of frames.

use clap::{Args, Parser};
use log::LevelFilter;
use squaremark::detect::{detect_markers_with, load_gray_image};
use squaremark::io::{DetectConfig, DetectReport, FrameReport, MarkerReport};
use squaremark::{CameraIntrinsics, FrameDebug, FramePipeline, FrameStage};
use std::path::{Path, PathBuf};

#[cfg(not(feature = "tracing"))]
use log::{info, warn};
#[cfg(feature = "tracing")]
use tracing::{info, warn};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "squaremark")]
#[command(about = "Detect and decode square fiducial markers (6x6 cells, 16-bit codes)")]
#[command(version)]
struct Cli {
    /// Input frames, processed in order by one detector. Overrides the
    /// config's `image_paths` when given.
    images: Vec<PathBuf>,

    /// JSON config file (see `DetectConfig`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path of the JSON report.
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Emit JSON log lines (only with the `tracing` feature).
    #[arg(long)]
    json_logs: bool,

    /// Record per-candidate traces in the report.
    #[arg(long)]
    debug: bool,

    /// Keep edge stripes of every marker in the report.
    #[arg(long)]
    stripes: bool,

    #[command(flatten)]
    detector: CliDetectorArgs,

    #[command(flatten)]
    camera: CliCameraArgs,
}

#[derive(Debug, Clone, Args, Default)]
struct CliDetectorArgs {
    /// Global binarization threshold (pixels above it are white).
    #[arg(long, conflicts_with = "adaptive_radius")]
    threshold: Option<u8>,

    /// Use a local-mean threshold with this window radius instead.
    #[arg(long)]
    adaptive_radius: Option<u32>,

    /// Offset subtracted from the local mean.
    #[arg(long, default_value_t = 5)]
    adaptive_offset: i32,

    /// Cells at or below this intensity read as black.
    #[arg(long)]
    bit_threshold: Option<u8>,

    /// Minimal candidate side in pixels.
    #[arg(long)]
    min_side: Option<u32>,

    /// Physical side length of the black marker square.
    #[arg(long)]
    marker_size: Option<f32>,
}

impl CliDetectorArgs {
    fn apply(&self, cfg: &mut DetectConfig) {
        let params = &mut cfg.detector;
        if let Some(threshold) = self.threshold {
            params.preprocess = FramePipeline::new(vec![FrameStage::Threshold { threshold }]);
        }
        if let Some(block_radius) = self.adaptive_radius {
            params.preprocess = FramePipeline::new(vec![FrameStage::AdaptiveThreshold {
                block_radius,
                offset: self.adaptive_offset,
            }]);
        }
        if let Some(bit_threshold) = self.bit_threshold {
            params.decode.bit_threshold = bit_threshold;
        }
        if let Some(min_side) = self.min_side {
            params.candidate.min_side_px = min_side;
        }
        if let Some(size) = self.marker_size {
            params.marker_side_length = size;
        }
    }
}

#[derive(Debug, Clone, Args, Default)]
struct CliCameraArgs {
    /// Camera intrinsic fx (pixels). If set, fy/cx/cy are required too.
    #[arg(long)]
    cam_fx: Option<f64>,
    /// Camera intrinsic fy (pixels). If set, fx/cx/cy are required too.
    #[arg(long)]
    cam_fy: Option<f64>,
    /// Camera principal point cx (pixels). If set, fx/fy/cy are required too.
    #[arg(long)]
    cam_cx: Option<f64>,
    /// Camera principal point cy (pixels). If set, fx/fy/cx are required too.
    #[arg(long)]
    cam_cy: Option<f64>,
}

impl CliCameraArgs {
    fn to_intrinsics(&self) -> CliResult<Option<CameraIntrinsics>> {
        match (self.cam_fx, self.cam_fy, self.cam_cx, self.cam_cy) {
            (None, None, None, None) => Ok(None),
            (Some(fx), Some(fy), Some(cx), Some(cy)) => {
                Ok(Some(CameraIntrinsics { fx, fy, cx, cy }))
            }
            _ => Err(
                "camera intrinsics are partial; provide all of --cam-fx --cam-fy --cam-cx --cam-cy"
                    .into(),
            ),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli) {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> CliResult<()> {
    squaremark::init_with_level(cli.log_level)?;
    if cli.json_logs {
        warn!("--json-logs needs the `tracing` feature; using plain logs");
    }
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> CliResult<()> {
    squaremark::init_tracing(cli.json_logs);
    tracing::debug!(requested = %cli.log_level, "log filter follows RUST_LOG");
    Ok(())
}

fn build_config(cli: &Cli) -> CliResult<DetectConfig> {
    let mut cfg = match &cli.config {
        Some(path) => DetectConfig::load_json(path)?,
        None => DetectConfig::default(),
    };
    if !cli.images.is_empty() {
        cfg.image_paths = cli
            .images
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }
    if let Some(out) = &cli.out {
        cfg.output_path = Some(out.to_string_lossy().into_owned());
    }
    if let Some(camera) = cli.camera.to_intrinsics()? {
        cfg.camera = Some(camera);
    }
    cfg.debug |= cli.debug;
    cfg.report_stripes |= cli.stripes;
    cli.detector.apply(&mut cfg);
    Ok(cfg)
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(cli)))]
fn run(cli: Cli) -> CliResult<()> {
    let cfg = build_config(&cli)?;
    if cfg.image_paths.is_empty() {
        return Err("no input images; pass paths or set `image_paths` in --config".into());
    }

    let mut detector = cfg.build_detector();
    let mut report = DetectReport {
        config_path: cli
            .config
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        frames: Vec::with_capacity(cfg.image_paths.len()),
    };

    for path in &cfg.image_paths {
        let frame = process_frame(&mut detector, Path::new(path), &cfg);
        match &frame.error {
            Some(err) => warn!("{path}: {err}"),
            None => info!("{path}: {} markers", frame.markers.len()),
        }
        report.frames.push(frame);
    }

    let out = cfg.output_path();
    report.write_json(&out)?;
    info!(
        "{} markers in {} frames, report written to {}",
        report.marker_count(),
        report.frames.len(),
        out.display()
    );
    Ok(())
}

fn process_frame(
    detector: &mut squaremark::MarkerDetector,
    path: &Path,
    cfg: &DetectConfig,
) -> FrameReport {
    let mut frame = FrameReport {
        image_path: path.to_string_lossy().into_owned(),
        width: 0,
        height: 0,
        markers: Vec::new(),
        error: None,
        debug: None,
    };

    let img = match load_gray_image(path) {
        Ok(img) => img,
        Err(err) => {
            frame.error = Some(err.to_string());
            return frame;
        }
    };
    frame.width = img.width() as usize;
    frame.height = img.height() as usize;

    let mut debug = cfg.debug.then(FrameDebug::default);
    match detect_markers_with(detector, &img, debug.as_mut()) {
        Ok(markers) => {
            frame.markers = markers
                .iter()
                .map(|m| MarkerReport::from_marker(m, cfg.report_stripes))
                .collect();
            frame.debug = debug;
        }
        Err(err) => frame.error = Some(err.to_string()),
    }
    frame
}
