//! Core image and geometry primitives for square fiducial marker detection.
//!
//! This crate is intentionally small and purely numeric. It knows nothing
//! about markers, contours or any concrete image library: frames come in
//! as borrowed [`GrayImageView`]s and geometry is expressed with
//! `nalgebra` points and vectors.

mod geometry;
mod homography;
mod image;
mod logger;

pub use geometry::{
    approx_polygon_dp, bounding_box, fit_line, intersect_lines, length, normalize, signed_area2,
    BoundingBox, Line2,
};
pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, ImageError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
