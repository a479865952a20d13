use crate::pose::Pose;
use crate::refine::STRIPES_PER_EDGE;
use crate::stripe::Stripe;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A decoded marker.
///
/// All corner arrays and the stripe list are in canonical order: corner 0
/// is the corner from which the cell grid reads as the minimal code, and
/// stripes `6k..6k+6` sample the edge from corner `k` to corner `k+1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Minimal 16-bit code over the four rotations.
    pub id: u16,
    /// Quarter turns applied to reach the canonical order (0..=3).
    pub rotation: u8,
    /// Coarse corners from the contour approximation.
    pub corners: [Point2<i32>; 4],
    /// Sub-pixel corners from the edge-line intersections.
    pub refined_corners: [Point2<f32>; 4],
    /// The 24 edge stripes, with their buffers and sub-pixel centres.
    pub stripes: Vec<Stripe>,
    pub pose: Option<Pose>,
}

impl Marker {
    /// Rotate corners and stripes left by `rotation` quarter turns.
    pub(crate) fn apply_rotation(&mut self, rotation: u8) {
        let r = rotation as usize % 4;
        self.rotation = r as u8;
        if r == 0 {
            return;
        }
        self.corners.rotate_left(r);
        self.refined_corners.rotate_left(r);
        if self.stripes.len() == 4 * STRIPES_PER_EDGE {
            self.stripes.rotate_left(r * STRIPES_PER_EDGE);
        }
    }

    /// Centre of the refined quadrilateral.
    pub fn center(&self) -> Point2<f32> {
        let sum = self
            .refined_corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 4.0)
    }
}
