//! Thin image strips sampled across a marker edge.

use crate::edge::{locate_edge, stripe_derivative};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use squaremark_core::GrayImageView;

/// Rows per stripe: the edge-crossing row plus one row on either side.
pub const STRIPE_HEIGHT: usize = 3;

/// Value returned for samples that touch the image border.
pub const BORDER_SENTINEL: u8 = 127;

/// Bilinear sample with 8-bit fixed-point weights.
///
/// Points whose 2×2 neighbourhood is not fully inside the image read as
/// [`BORDER_SENTINEL`].
pub fn sample_fixed_point(image: &GrayImageView<'_>, p: Point2<f64>) -> u8 {
    let fx = p.x.floor();
    let fy = p.y.floor();
    if !(fx >= 0.0 && fy >= 0.0)
        || fx >= (image.width as f64 - 1.0)
        || fy >= (image.height as f64 - 1.0)
    {
        return BORDER_SENTINEL;
    }
    let (x, y) = (fx as usize, fy as usize);
    let dx = (256.0 * (p.x - fx)) as i32;
    let dy = (256.0 * (p.y - fy)) as i32;

    let top = image.row(y);
    let bottom = image.row(y + 1);
    let (p00, p10) = (top[x] as i32, top[x + 1] as i32);
    let (p01, p11) = (bottom[x] as i32, bottom[x + 1] as i32);

    let a = p00 + ((dx * (p10 - p00)) >> 8);
    let b = p01 + ((dx * (p11 - p01)) >> 8);
    (a + ((dy * (b - a)) >> 8)) as u8
}

/// A `width × 3` sampling rectangle centred on one point of a marker edge.
///
/// Columns run across the edge (outside to inside), rows run along it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stripe {
    /// Nominal point on the coarse edge.
    pub center: Point2<f64>,
    /// Rectangle corners; `corners[0]` is the origin of the sampling grid.
    pub corners: [Point2<f64>; 4],
    /// Step between consecutive columns (unit length, across the edge).
    pub step_x: Vector2<f64>,
    /// Step between consecutive rows (unit length, along the edge).
    pub step_y: Vector2<f64>,
    pub width: usize,
    pub height: usize,
    buffer: Option<Vec<u8>>,
    subpixel_center: Option<Point2<f64>>,
}

impl Stripe {
    /// Build a stripe at `center` for an edge running along `direction`
    /// whose outward normal is `normal`.
    pub fn new(
        center: Point2<f64>,
        direction: Vector2<f64>,
        normal: Vector2<f64>,
        half_width: f64,
    ) -> Self {
        let side = normal * half_width;
        let corners = [
            center + direction + side,
            center + direction - side,
            center - direction - side,
            center - direction + side,
        ];
        let width = if half_width.is_finite() && half_width > 0.0 {
            (2.0 * half_width) as usize
        } else {
            0
        };
        Self {
            center,
            corners,
            step_x: -normal,
            step_y: -direction,
            width,
            height: STRIPE_HEIGHT,
            buffer: None,
            subpixel_center: None,
        }
    }

    /// Row-major intensities, once sampled.
    pub fn buffer(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    /// Sub-pixel edge crossing, once located.
    pub fn subpixel_center(&self) -> Option<Point2<f64>> {
        self.subpixel_center
    }

    /// Image-space position of grid cell `(col, row)`.
    #[inline]
    pub fn grid_point(&self, col: f64, row: f64) -> Point2<f64> {
        self.corners[0] + self.step_x * col + self.step_y * row
    }

    /// Fill the intensity buffer from `image`.
    ///
    /// A stripe is sampled at most once; later calls leave the buffer as is.
    pub fn sample(&mut self, image: &GrayImageView<'_>) {
        if self.width == 0 || self.height == 0 || self.buffer.is_some() {
            return;
        }
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in 0..self.height {
            let mut it = self.grid_point(0.0, row as f64);
            for _ in 0..self.width {
                data.push(sample_fixed_point(image, it));
                it += self.step_x;
            }
        }
        self.buffer = Some(data);
    }

    /// Locate the edge crossing inside the sampled buffer.
    ///
    /// `derivative` is scratch space reused across stripes. Leaves the
    /// sub-pixel centre unset when the buffer is missing or no column
    /// qualifies as a minimum.
    pub fn locate_subpixel_center(&mut self, derivative: &mut Vec<i32>) -> Option<Point2<f64>> {
        let buffer = self.buffer.as_deref()?;
        if self.height < STRIPE_HEIGHT {
            return None;
        }
        stripe_derivative(buffer, self.width, derivative)?;
        let edge = locate_edge(derivative)?;
        let p = self.grid_point(edge.index as f64 + edge.offset, 1.0);
        self.subpixel_center = Some(p);
        Some(p)
    }
}
