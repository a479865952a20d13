//! Per-frame diagnostics.

use crate::candidate::Quad;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// What happened to one quadrilateral candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Accepted { id: u16, rotation: u8 },
    /// Too few edge crossings, or edge lines that do not intersect.
    RefineFailed,
    /// Refined corners admit no perspective warp.
    Unwarpable,
    /// Some cell of the outer ring is not black.
    BorderRejected,
    /// Inner grid all white or all black.
    DegenerateCode { code: u16 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrace {
    /// Coarse corners, screen-clockwise.
    pub corners: Quad,
    pub refined_corners: Option<[Point2<f32>; 4]>,
    pub outcome: CandidateOutcome,
    /// Binarized 6×6 cell grid (row-major, `0` = black), when a warp happened.
    pub patch: Option<Vec<u8>>,
}

/// Diagnostics collected by [`crate::MarkerDetector::detect_with_debug`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameDebug {
    /// Raw contours found in the binarized frame.
    pub contours: usize,
    /// One entry per quadrilateral candidate, in processing order.
    pub candidates: Vec<CandidateTrace>,
}

impl FrameDebug {
    pub fn clear(&mut self) {
        self.contours = 0;
        self.candidates.clear();
    }

    pub fn accepted(&self) -> impl Iterator<Item = &CandidateTrace> {
        self.candidates
            .iter()
            .filter(|c| matches!(c.outcome, CandidateOutcome::Accepted { .. }))
    }
}
