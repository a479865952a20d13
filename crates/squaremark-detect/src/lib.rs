//! Square fiducial marker detection.
//!
//! A frame goes through these steps:
//!
//! 1. a [`FramePipeline`] binarizes the greyscale frame;
//! 2. a [`ContourExtractor`] traces closed contours, which
//!    [`filter_candidates`] reduces to screen-clockwise quadrilaterals;
//! 3. [`refine_corners`] samples 6 stripes across each edge, locates the
//!    edge crossing in each with sub-pixel precision, fits one line per edge
//!    and intersects neighbouring lines;
//! 4. the refined quadrilateral is unwarped into a 6×6 cell grid and
//!    decoded into the minimal 16-bit code over its four rotations;
//! 5. an optional [`PoseEstimator`] turns the canonical corners into a pose.
//!
//! [`MarkerDetector`] drives all of it and reuses its buffers between
//! frames.
//!
//! ```no_run
//! use squaremark_core::GrayImage;
//! use squaremark_detect::{DetectorParams, MarkerDetector};
//!
//! let frame = GrayImage::filled(640, 480, 255);
//! let mut detector = MarkerDetector::new(DetectorParams::default());
//! for marker in detector.detect(&frame.view())? {
//!     println!("{:#06x} at {:?}", marker.id, marker.refined_corners[0]);
//! }
//! # Ok::<(), squaremark_detect::DetectError>(())
//! ```

mod candidate;
mod debug;
mod decode;
mod detector;
mod edge;
mod error;
mod marker;
mod params;
mod pose;
mod refine;
mod scratch;
mod stage;
mod stripe;

pub use candidate::{
    filter_candidates, quad_from_contour, Contour, ContourExtractor, ImageprocContours, Quad,
};
pub use debug::{CandidateOutcome, CandidateTrace, FrameDebug};
pub use decode::{
    border_is_black, decode_cell_grid, rotation_codes, sample_cell_grid, CellGrid, DecodeRejection,
    DecodedCode, GRID_CELLS,
};
pub use detector::{FrameState, MarkerDetector};
pub use edge::{locate_edge, parabola_vertex, stripe_derivative, EdgeLocation};
pub use error::DetectError;
pub use marker::Marker;
pub use params::{CandidateParams, DecodeParams, DetectorParams, StripeParams};
pub use pose::{marker_object_corners, CameraIntrinsics, PlanarPoseEstimator, Pose, PoseEstimator};
pub use refine::{build_edge_stripes, refine_corners, RefineError, RefinedQuad, STRIPES_PER_EDGE};
pub use scratch::FrameScratch;
pub use stage::{FramePipeline, FrameStage};
pub use stripe::{sample_fixed_point, Stripe, BORDER_SENTINEL, STRIPE_HEIGHT};
