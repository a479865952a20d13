//! High-level facade crate for the `squaremark-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the core and detector crates
//! - JSON configuration and report types used by the `squaremark` CLI
//! - (feature-gated) helpers that run the detector on `image::GrayImage`s
//!   or raw 8-bit buffers.
//!
//! ## Quickstart
//!
//! ```no_run
//! use squaremark::detect;
//! use squaremark::DetectorParams;
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("frame.png")?.decode()?.to_luma8();
//! let markers = detect::detect_markers(&img, DetectorParams::default())?;
//! for m in &markers {
//!     println!("marker {:#06x} at {:?}", m.id, m.refined_corners);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `squaremark::core`: grayscale images, homographies, line fitting, logging.
//! - `squaremark::detector`: candidates, stripes, decoding, pose, the frame
//!   pipeline and [`MarkerDetector`].
//! - `squaremark::io`: JSON config and report files.
//! - `squaremark::detect` (feature `image`): end-to-end helpers from `image::GrayImage`.

pub use squaremark_core as core;
pub use squaremark_detect as detector;

pub use squaremark_core::{init_with_level, GrayImage, GrayImageView};
pub use squaremark_detect::{
    CameraIntrinsics, DetectorParams, FrameDebug, FramePipeline, FrameStage, Marker,
    MarkerDetector, PlanarPoseEstimator, Pose, PoseEstimator,
};

#[cfg(feature = "tracing")]
pub use squaremark_core::init_tracing;

pub mod io;

#[cfg(feature = "image")]
pub mod detect;
