//! Marker pose from four refined corners.

use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};
use squaremark_core::homography_from_4pt;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Rigid marker-to-camera transform as a row-major 4×4 matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub matrix: [f32; 16],
}

impl Pose {
    /// Assemble `[R | t; 0 0 0 1]`.
    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut matrix = [0.0f32; 16];
        for r in 0..3 {
            for c in 0..3 {
                matrix[r * 4 + c] = rotation[(r, c)] as f32;
            }
            matrix[r * 4 + 3] = translation[r] as f32;
        }
        matrix[15] = 1.0;
        Self { matrix }
    }

    pub fn rotation(&self) -> Matrix3<f32> {
        let m = &self.matrix;
        Matrix3::new(m[0], m[1], m[2], m[4], m[5], m[6], m[8], m[9], m[10])
    }

    pub fn translation(&self) -> Vector3<f32> {
        Vector3::new(self.matrix[3], self.matrix[7], self.matrix[11])
    }
}

/// Solver turning refined corners into a [`Pose`].
///
/// Corners arrive in canonical order; `side_length` is the physical side of
/// the black square. Returning `None` keeps the marker without a pose.
pub trait PoseEstimator: Send {
    fn estimate(&self, corners: &[Point2<f32>; 4], side_length: f32) -> Option<Pose>;
}

/// Pinhole camera intrinsics, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// `K⁻¹`, or `None` for a zero focal length.
    pub fn inverse(&self) -> Option<Matrix3<f64>> {
        if self.fx == 0.0 || self.fy == 0.0 {
            return None;
        }
        Some(Matrix3::new(
            1.0 / self.fx,
            0.0,
            -self.cx / self.fx,
            0.0,
            1.0 / self.fy,
            -self.cy / self.fy,
            0.0,
            0.0,
            1.0,
        ))
    }
}

/// Marker-plane corners for a square of side `s`, centred on the origin.
///
/// x points right and y points down, matching the canonical corner order.
pub fn marker_object_corners(side_length: f32) -> [Point2<f32>; 4] {
    let h = 0.5 * side_length;
    [
        Point2::new(-h, -h),
        Point2::new(h, -h),
        Point2::new(h, h),
        Point2::new(-h, h),
    ]
}

/// Homography decomposition `H ~ K [r1 r2 t]` for a planar square.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoseEstimator {
    pub intrinsics: CameraIntrinsics,
}

impl PlanarPoseEstimator {
    pub fn new(intrinsics: CameraIntrinsics) -> Self {
        Self { intrinsics }
    }
}

impl PoseEstimator for PlanarPoseEstimator {
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, corners)))]
    fn estimate(&self, corners: &[Point2<f32>; 4], side_length: f32) -> Option<Pose> {
        if !(side_length.is_finite() && side_length > 0.0) {
            return None;
        }
        let h = homography_from_4pt(&marker_object_corners(side_length), corners)?;
        let m = self.intrinsics.inverse()? * h.h;

        let m1: Vector3<f64> = m.column(0).into_owned();
        let m2: Vector3<f64> = m.column(1).into_owned();
        let m3: Vector3<f64> = m.column(2).into_owned();
        let norm = 0.5 * (m1.norm() + m2.norm());
        if !(norm.is_finite() && norm > 1e-12) {
            return None;
        }

        // the marker must lie in front of the camera
        let scale = if m3.z < 0.0 { -1.0 / norm } else { 1.0 / norm };
        let r1 = m1 * scale;
        let r2 = m2 * scale;
        let t = m3 * scale;
        let approx = Matrix3::from_columns(&[r1, r2, r1.cross(&r2)]);

        let svd = approx.svd(true, true);
        let (mut u, v_t) = (svd.u?, svd.v_t?);
        if (u * v_t).determinant() < 0.0 {
            let flipped = -u.column(2).into_owned();
            u.set_column(2, &flipped);
        }
        let rotation = u * v_t;
        if !rotation.iter().chain(t.iter()).all(|v| v.is_finite()) {
            return None;
        }
        Some(Pose::from_parts(&rotation, &t))
    }
}
