//! Per-frame marker detection pipeline.

use crate::candidate::{filter_candidates, ContourExtractor, ImageprocContours, Quad};
use crate::debug::{CandidateOutcome, CandidateTrace, FrameDebug};
use crate::decode::{decode_cell_grid, sample_cell_grid, DecodeRejection};
use crate::error::DetectError;
use crate::marker::Marker;
use crate::params::DetectorParams;
use crate::pose::PoseEstimator;
use crate::refine::refine_corners;
use crate::scratch::FrameScratch;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use squaremark_core::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Where the detector is in its per-frame cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FrameState {
    /// Nothing processed yet, or the last frame was rejected.
    #[default]
    Idle,
    /// Candidates of the current frame have been filtered.
    CandidatesFound { count: usize },
    /// The last frame has been fully processed.
    FrameComplete { accepted: usize },
}

/// Square marker detector.
///
/// Holds the configuration, the contour and pose collaborators and the
/// buffers reused between frames. The first processed frame fixes the
/// expected frame size until [`MarkerDetector::reset`].
pub struct MarkerDetector {
    params: DetectorParams,
    contours: Box<dyn ContourExtractor>,
    pose: Option<Box<dyn PoseEstimator>>,
    scratch: FrameScratch,
    frame_size: Option<(usize, usize)>,
    state: FrameState,
}

impl MarkerDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self {
            params,
            contours: Box::new(ImageprocContours::new()),
            pose: None,
            scratch: FrameScratch::default(),
            frame_size: None,
            state: FrameState::Idle,
        }
    }

    pub fn with_pose_estimator(mut self, estimator: impl PoseEstimator + 'static) -> Self {
        self.pose = Some(Box::new(estimator));
        self
    }

    pub fn with_contour_extractor(mut self, extractor: impl ContourExtractor + 'static) -> Self {
        self.contours = Box::new(extractor);
        self
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frame size locked in by the first processed frame.
    pub fn frame_size(&self) -> Option<(usize, usize)> {
        self.frame_size
    }

    /// Back to [`FrameState::Idle`], accepting any frame size again.
    pub fn reset(&mut self) {
        self.frame_size = None;
        self.state = FrameState::Idle;
        self.scratch.reset();
    }

    /// Detect markers in a tightly packed 8-bit buffer.
    pub fn detect_raw(
        &mut self,
        width: usize,
        height: usize,
        data: &[u8],
    ) -> Result<Vec<Marker>, DetectError> {
        let frame = GrayImageView::new(width, height, data).inspect_err(|err| {
            warn!("rejecting frame: {err}");
        })?;
        self.detect(&frame)
    }

    pub fn detect(&mut self, frame: &GrayImageView<'_>) -> Result<Vec<Marker>, DetectError> {
        self.detect_with_debug(frame, None)
    }

    /// Detect markers, optionally recording every candidate in `debug`.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, frame, debug),
            fields(width = frame.width, height = frame.height)
        )
    )]
    pub fn detect_with_debug(
        &mut self,
        frame: &GrayImageView<'_>,
        mut debug: Option<&mut FrameDebug>,
    ) -> Result<Vec<Marker>, DetectError> {
        if let Some(d) = debug.as_deref_mut() {
            d.clear();
        }
        let got = (frame.width, frame.height);
        match self.frame_size {
            Some(expected) if expected != got => {
                let err = DetectError::FrameSizeMismatch { expected, got };
                warn!("{err}");
                self.state = FrameState::Idle;
                return Err(err);
            }
            Some(_) => {}
            None => self.frame_size = Some(got),
        }

        self.scratch.reset();
        let FrameScratch {
            binary,
            tmp,
            contours,
            candidates,
            derivative,
        } = &mut self.scratch;

        self.params.preprocess.run(frame, binary, tmp);
        self.contours.extract(&binary.view(), contours);
        filter_candidates(contours, frame.width, &self.params.candidate, candidates);
        self.state = FrameState::CandidatesFound {
            count: candidates.len(),
        };
        debug!(
            "{} contours, {} quadrilateral candidates",
            contours.len(),
            candidates.len()
        );

        let keep_patch = debug.is_some();
        let mut markers = Vec::new();
        for quad in candidates.iter() {
            let (trace, marker) =
                examine_candidate(frame, quad, &self.params, derivative, keep_patch);
            if let Some(mut marker) = marker {
                if self.params.estimate_pose {
                    if let Some(estimator) = &self.pose {
                        marker.pose = estimator
                            .estimate(&marker.refined_corners, self.params.marker_side_length);
                        if marker.pose.is_none() {
                            debug!("marker {:#06x}: pose estimation failed", marker.id);
                        }
                    }
                }
                markers.push(marker);
            }
            if let Some(d) = debug.as_deref_mut() {
                d.candidates.push(trace);
            }
        }
        if let Some(d) = debug {
            d.contours = contours.len();
        }

        self.state = FrameState::FrameComplete {
            accepted: markers.len(),
        };
        Ok(markers)
    }
}

impl std::fmt::Debug for MarkerDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerDetector")
            .field("params", &self.params)
            .field("has_pose_estimator", &self.pose.is_some())
            .field("frame_size", &self.frame_size)
            .field("state", &self.state)
            .finish()
    }
}

/// Refine, unwarp and decode one candidate.
fn examine_candidate(
    frame: &GrayImageView<'_>,
    quad: &Quad,
    params: &DetectorParams,
    derivative: &mut Vec<i32>,
    keep_patch: bool,
) -> (CandidateTrace, Option<Marker>) {
    let mut trace = CandidateTrace {
        corners: *quad,
        refined_corners: None,
        outcome: CandidateOutcome::RefineFailed,
        patch: None,
    };

    let refined = match refine_corners(frame, quad, &params.stripe, derivative) {
        Ok(refined) => refined,
        Err(err) => {
            debug!("candidate {quad:?}: {err}");
            return (trace, None);
        }
    };
    trace.refined_corners = Some(refined.corners);

    let Some(grid) = sample_cell_grid(frame, &refined.corners, params.decode.bit_threshold) else {
        debug!("candidate {quad:?}: refined corners cannot be unwarped");
        trace.outcome = CandidateOutcome::Unwarpable;
        return (trace, None);
    };
    if keep_patch {
        trace.patch = Some(grid.to_vec());
    }

    match decode_cell_grid(&grid) {
        Ok(code) => {
            debug!(
                "candidate {quad:?}: marker {:#06x} at rotation {}",
                code.id, code.rotation
            );
            trace.outcome = CandidateOutcome::Accepted {
                id: code.id,
                rotation: code.rotation,
            };
            let mut marker = Marker {
                id: code.id,
                rotation: 0,
                corners: *quad,
                refined_corners: refined.corners,
                stripes: refined.stripes,
                pose: None,
            };
            marker.apply_rotation(code.rotation);
            (trace, Some(marker))
        }
        Err(rejection) => {
            debug!("candidate {quad:?}: {rejection}");
            trace.outcome = match rejection {
                DecodeRejection::BorderNotBlack => CandidateOutcome::BorderRejected,
                DecodeRejection::DegenerateCode { code } => CandidateOutcome::DegenerateCode { code },
            };
            (trace, None)
        }
    }
}
