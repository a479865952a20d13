//! Sub-pixel corner refinement from edge stripes.
//!
//! Each edge of a coarse quadrilateral gets [`STRIPES_PER_EDGE`] stripes at
//! evenly spaced interior points. The located edge crossings are fitted
//! with a least-squares line per edge, and adjacent lines are intersected.

use crate::candidate::Quad;
use crate::params::StripeParams;
use crate::stripe::Stripe;
use nalgebra::{Point2, Vector2};
use squaremark_core::{fit_line, intersect_lines, length, normalize, GrayImageView, Line2};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Interior sample points per edge, at `k / 7` of the edge for `k = 1..=6`.
pub const STRIPES_PER_EDGE: usize = 6;

/// Stripes and sub-pixel corners of one candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct RefinedQuad {
    /// `4 * STRIPES_PER_EDGE` stripes, edge by edge.
    pub stripes: Vec<Stripe>,
    pub corners: [Point2<f32>; 4],
}

/// Why a candidate could not be refined.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineError {
    #[error("edge {edge} has {found} located stripe centres, need at least 2")]
    TooFewEdgePoints { edge: usize, found: usize },
    #[error("edge {edge} points are degenerate")]
    DegenerateEdge { edge: usize },
    #[error("edges meeting at corner {corner} do not intersect")]
    ParallelEdges { corner: usize },
}

/// Place the stripes of all four edges of `quad`, edge `i` running from
/// corner `i` to corner `i + 1`.
pub fn build_edge_stripes(quad: &Quad, params: &StripeParams, out: &mut Vec<Stripe>) {
    out.clear();
    let divisions = (STRIPES_PER_EDGE + 1) as f64;
    for i in 0..4 {
        let current = to_f64(quad[i]);
        let next = to_f64(quad[(i + 1) % 4]);
        let line = next - current;
        let increment = line / divisions;

        let half_width = (params.half_width_rel * length(increment)).max(params.min_half_width_px);
        let direction = normalize(line);
        let normal = normalize(Vector2::new(line.y, -line.x));

        for k in 1..=STRIPES_PER_EDGE {
            let center = current + increment * k as f64;
            out.push(Stripe::new(center, direction, normal, half_width));
        }
    }
}

/// Refine the corners of `quad` against the greyscale `image`.
///
/// `derivative` is scratch space. Stripes whose edge cannot be located are
/// left out of the line fit; an edge needs at least two located points.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "trace", skip(image, params, derivative), fields(quad = ?quad))
)]
pub fn refine_corners(
    image: &GrayImageView<'_>,
    quad: &Quad,
    params: &StripeParams,
    derivative: &mut Vec<i32>,
) -> Result<RefinedQuad, RefineError> {
    let mut stripes = Vec::with_capacity(4 * STRIPES_PER_EDGE);
    build_edge_stripes(quad, params, &mut stripes);

    let mut lines = [None::<Line2>; 4];
    let mut points = Vec::with_capacity(STRIPES_PER_EDGE);
    for (edge, chunk) in stripes.chunks_mut(STRIPES_PER_EDGE).enumerate() {
        points.clear();
        for (k, stripe) in chunk.iter_mut().enumerate() {
            stripe.sample(image);
            match stripe.locate_subpixel_center(derivative) {
                Some(p) => points.push(p),
                None => log::trace!("edge {edge} stripe {k}: no edge crossing"),
            }
        }
        if points.len() < 2 {
            return Err(RefineError::TooFewEdgePoints {
                edge,
                found: points.len(),
            });
        }
        lines[edge] = Some(fit_line(&points).ok_or(RefineError::DegenerateEdge { edge })?);
    }

    let mut corners = [Point2::origin(); 4];
    for (i, corner) in corners.iter_mut().enumerate() {
        let (Some(a), Some(b)) = (&lines[i], &lines[(i + 3) % 4]) else {
            return Err(RefineError::DegenerateEdge { edge: i });
        };
        let p = intersect_lines(a, b)
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .ok_or(RefineError::ParallelEdges { corner: i })?;
        *corner = Point2::new(p.x as f32, p.y as f32);
    }

    Ok(RefinedQuad { stripes, corners })
}

fn to_f64(p: Point2<i32>) -> Point2<f64> {
    Point2::new(p.x as f64, p.y as f64)
}
