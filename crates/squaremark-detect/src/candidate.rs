//! Contour extraction and quadrilateral candidate filtering.

use crate::params::CandidateParams;
use nalgebra::Point2;
use imageproc::geometry::arc_length;
use imageproc::point::Point;
use squaremark_core::{approx_polygon_dp, bounding_box, signed_area2, GrayImageView};

/// Closed pixel contour, without the closing vertex repeated.
pub type Contour = Vec<Point2<i32>>;

/// Integer quadrilateral in screen-clockwise order.
pub type Quad = [Point2<i32>; 4];

/// Source of closed contours for a binarized frame.
///
/// Foreground is any non-zero pixel. Both outer borders and hole borders
/// must be reported; dark markers on a bright background show up as holes.
pub trait ContourExtractor: Send {
    /// Replace the contents of `out` with the contours of `binary`.
    fn extract(&mut self, binary: &GrayImageView<'_>, out: &mut Vec<Contour>);
}

/// [`ContourExtractor`] backed by `imageproc`'s border-following tracer.
#[derive(Debug, Default)]
pub struct ImageprocContours {
    buffer: Vec<u8>,
}

impl ImageprocContours {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContourExtractor for ImageprocContours {
    fn extract(&mut self, binary: &GrayImageView<'_>, out: &mut Vec<Contour>) {
        out.clear();
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        for y in 0..binary.height {
            buffer.extend_from_slice(binary.row(y));
        }

        let Some(img) = image::GrayImage::from_raw(binary.width as u32, binary.height as u32, buffer)
        else {
            log::warn!(
                "contour buffer does not match a {}x{} frame",
                binary.width,
                binary.height
            );
            return;
        };

        let contours = imageproc::contours::find_contours::<i32>(&img);
        out.extend(
            contours
                .into_iter()
                .filter(|c| !c.points.is_empty())
                .map(|c| c.points.into_iter().map(|p| Point2::new(p.x, p.y)).collect()),
        );
        self.buffer = img.into_raw();
    }
}

/// Reduce one contour to a clockwise quadrilateral, if it qualifies.
///
/// The bounding box must be at least `min_side_px` in both directions and
/// no wider than `frame_width - frame_margin_px`. The polygon
/// approximation must have exactly four vertices and a non-zero area.
pub fn quad_from_contour(
    contour: &[Point2<i32>],
    frame_width: usize,
    params: &CandidateParams,
) -> Option<Quad> {
    let bbox = bounding_box(contour)?;
    let min_side = params.min_side_px as i32;
    let max_width = frame_width as i64 - params.frame_margin_px as i64;
    if bbox.width < min_side || bbox.height < min_side || bbox.width as i64 > max_width {
        return None;
    }

    let epsilon = perimeter(contour) * params.approx_epsilon_rel;
    let poly = approx_polygon_dp(contour, epsilon);
    let mut quad: Quad = poly.as_slice().try_into().ok()?;

    match signed_area2(&quad) {
        0 => return None,
        a if a < 0 => quad[1..].reverse(),
        _ => {}
    }
    Some(quad)
}

/// Closed perimeter of a contour.
fn perimeter(contour: &[Point2<i32>]) -> f64 {
    let points: Vec<Point<i32>> = contour.iter().map(|p| Point::new(p.x, p.y)).collect();
    arc_length(&points, true)
}

/// Append every qualifying quadrilateral of `contours` to `out`.
pub fn filter_candidates(
    contours: &[Contour],
    frame_width: usize,
    params: &CandidateParams,
    out: &mut Vec<Quad>,
) {
    out.extend(
        contours
            .iter()
            .filter_map(|c| quad_from_contour(c, frame_width, params)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use squaremark_core::GrayImage;

    /// Perimeter pixels of an axis-aligned rectangle, clockwise on screen.
    fn rect_contour(x0: i32, y0: i32, w: i32, h: i32) -> Contour {
        let (x1, y1) = (x0 + w - 1, y0 + h - 1);
        let mut pts = Vec::new();
        pts.extend((x0..x1).map(|x| Point2::new(x, y0)));
        pts.extend((y0..y1).map(|y| Point2::new(x1, y)));
        pts.extend((x0 + 1..=x1).rev().map(|x| Point2::new(x, y1)));
        pts.extend((y0 + 1..=y1).rev().map(|y| Point2::new(x0, y)));
        pts
    }

    #[test]
    fn minimal_side_is_inclusive() {
        let params = CandidateParams::default();
        assert!(quad_from_contour(&rect_contour(10, 10, 35, 35), 200, &params).is_some());
        assert!(quad_from_contour(&rect_contour(10, 10, 34, 35), 200, &params).is_none());
        assert!(quad_from_contour(&rect_contour(10, 10, 35, 34), 200, &params).is_none());
    }

    #[test]
    fn frame_wide_contours_are_dropped() {
        let params = CandidateParams::default();
        assert!(quad_from_contour(&rect_contour(0, 0, 90, 40), 100, &params).is_some());
        assert!(quad_from_contour(&rect_contour(0, 0, 91, 40), 100, &params).is_none());
    }

    #[test]
    fn counter_clockwise_input_is_reordered_keeping_the_first_vertex() {
        let params = CandidateParams::default();
        let mut ccw = rect_contour(20, 20, 50, 50);
        ccw[1..].reverse();
        assert!(signed_area2(&ccw) < 0);

        let quad = quad_from_contour(&ccw, 200, &params).expect("quad");
        assert!(signed_area2(&quad) > 0);
        assert!(quad.contains(&Point2::new(20, 20)));
        assert!(quad.contains(&Point2::new(69, 69)));
    }

    #[test]
    fn perimeter_closes_the_contour() {
        assert_eq!(perimeter(&rect_contour(0, 0, 11, 6)), 30.0);
        let tri = [Point2::new(0, 0), Point2::new(3, 0), Point2::new(3, 4)];
        assert_eq!(perimeter(&tri), 12.0);
    }

    #[test]
    fn triangles_are_not_candidates() {
        let mut tri = Vec::new();
        for i in 0..60 {
            tri.push(Point2::new(i, 0));
        }
        for i in 0..60 {
            tri.push(Point2::new(60 - i / 2, i));
        }
        for i in 0..60 {
            tri.push(Point2::new(30 - i / 2, 60 - i));
        }
        assert!(quad_from_contour(&tri, 200, &CandidateParams::default()).is_none());
    }

    #[test]
    fn dark_square_is_found_as_a_hole() {
        let mut img = GrayImage::filled(120, 120, 255);
        for y in 40..80 {
            for x in 40..80 {
                img.set(x, y, 0);
            }
        }
        let mut contours = Vec::new();
        ImageprocContours::new().extract(&img.view(), &mut contours);

        let mut quads = Vec::new();
        filter_candidates(&contours, img.width, &CandidateParams::default(), &mut quads);
        assert_eq!(quads.len(), 1);
        for p in quads[0] {
            assert!((38..=81).contains(&p.x) && (38..=81).contains(&p.y), "{p:?}");
        }
        assert!(signed_area2(&quads[0]) > 0);
    }
}
