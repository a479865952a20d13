use crate::stage::{FramePipeline, FrameStage};
use serde::{Deserialize, Serialize};

/// Contour-to-quadrilateral filtering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    /// Minimal bounding-box width and height of a contour, in pixels.
    ///
    /// Must leave room for the 6×6 cell grid plus the stripe margins.
    pub min_side_px: u32,
    /// Contours wider than `frame_width - frame_margin_px` are dropped
    /// (they usually trace the frame border itself).
    pub frame_margin_px: u32,
    /// Polygon approximation tolerance relative to the contour perimeter.
    pub approx_epsilon_rel: f64,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            min_side_px: 35,
            frame_margin_px: 10,
            approx_epsilon_rel: 0.02,
        }
    }
}

/// Geometry of the edge-sampling stripes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeParams {
    /// Half stripe width as a fraction of the spacing between stripes.
    pub half_width_rel: f64,
    /// Lower bound for the half stripe width, in pixels.
    pub min_half_width_px: f64,
}

impl Default for StripeParams {
    fn default() -> Self {
        Self {
            half_width_rel: 0.4,
            min_half_width_px: 2.5,
        }
    }
}

/// Cell-grid binarization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeParams {
    /// Cells whose warped intensity is `<= bit_threshold` read as black.
    pub bit_threshold: u8,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self { bit_threshold: 100 }
    }
}

/// Full detector configuration. Read-only while a frame is processed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Binarization applied before contour extraction.
    pub preprocess: FramePipeline,
    pub candidate: CandidateParams,
    pub stripe: StripeParams,
    pub decode: DecodeParams,
    /// Physical side length of the black marker square (pose units).
    pub marker_side_length: f32,
    /// Ask the configured pose estimator for a pose of every accepted marker.
    pub estimate_pose: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            preprocess: FramePipeline::new(vec![FrameStage::Threshold { threshold: 104 }]),
            candidate: CandidateParams::default(),
            stripe: StripeParams::default(),
            decode: DecodeParams::default(),
            marker_side_length: 1.0,
            estimate_pose: true,
        }
    }
}
