//! Small 2D geometry helpers used by the marker pipeline.

use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Euclidean length of a vector.
#[inline]
pub fn length(v: Vector2<f64>) -> f64 {
    (v.x * v.x + v.y * v.y).sqrt()
}

/// Unit vector along `v`. A zero vector yields non-finite components.
#[inline]
pub fn normalize(v: Vector2<f64>) -> Vector2<f64> {
    v * (1.0 / length(v))
}

/// Infinite 2D line as `point + s * direction`, `|direction| == 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line2 {
    pub direction: Vector2<f64>,
    pub point: Point2<f64>,
}

/// Least-squares (L2) line through `points`.
///
/// The direction is the principal axis of the point scatter and the line
/// passes through the centroid. Needs at least two distinct points.
pub fn fit_line(points: &[Point2<f64>]) -> Option<Line2> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx + syy <= f64::EPSILON {
        return None;
    }

    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some(Line2 {
        direction: Vector2::new(theta.cos(), theta.sin()),
        point: Point2::new(cx, cy),
    })
}

/// Intersection of two lines via a 2×2 solve; `None` when (near) parallel.
pub fn intersect_lines(a: &Line2, b: &Line2) -> Option<Point2<f64>> {
    // a.p + s a.d = b.p + t b.d
    let m = Matrix2::new(a.direction.x, -b.direction.x, a.direction.y, -b.direction.y);
    if m.determinant().abs() < 1e-9 {
        return None;
    }
    let rhs = b.point - a.point;
    let st = m.lu().solve(&rhs)?;
    Some(a.point + a.direction * st[0])
}

/// Axis-aligned bounding box in pixel units (`width = max - min + 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

pub fn bounding_box(points: &[Point2<i32>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some(BoundingBox {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    })
}

/// Twice the signed area of a closed polygon.
///
/// Positive when the vertices run clockwise on screen (y axis pointing down).
pub fn signed_area2(points: &[Point2<i32>]) -> i64 {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum()
}

fn dist_sq(a: Point2<i32>, b: Point2<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

fn dist_to_segment(p: Point2<i32>, a: Point2<i32>, b: Point2<i32>) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len = dx.hypot(dy);
    if len < f64::EPSILON {
        return (px - ax).hypot(py - ay);
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / len
}

/// Douglas–Peucker over the open chain `chain`, pushing kept vertices
/// (without the final endpoint) into `out`.
fn simplify_chain(chain: &[Point2<i32>], epsilon: f64, out: &mut Vec<Point2<i32>>) {
    let n = chain.len();
    if n < 2 {
        out.extend_from_slice(chain);
        return;
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let mut best = lo;
        let mut best_d = -1.0;
        for i in lo + 1..hi {
            let d = dist_to_segment(chain[i], chain[lo], chain[hi]);
            if d > best_d {
                best_d = d;
                best = i;
            }
        }
        if best_d > epsilon {
            keep[best] = true;
            stack.push((lo, best));
            stack.push((best, hi));
        }
    }

    out.extend(
        chain[..n - 1]
            .iter()
            .zip(&keep[..n - 1])
            .filter_map(|(p, &k)| k.then_some(*p)),
    );
}

/// Approximate a closed contour by a polygon with Douglas–Peucker.
///
/// The contour is split at two mutually distant vertices and each half is
/// simplified independently, so the result does not depend on where the
/// contour tracer started. The closing vertex is not repeated.
pub fn approx_polygon_dp(contour: &[Point2<i32>], epsilon: f64) -> Vec<Point2<i32>> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }

    let farthest_from = |origin: Point2<i32>| {
        contour
            .iter()
            .enumerate()
            .max_by_key(|(_, p)| dist_sq(origin, **p))
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let a = farthest_from(contour[0]);
    let b = farthest_from(contour[a]);
    if a == b {
        return vec![contour[a]];
    }

    let cyclic = |from: usize, to: usize| -> Vec<Point2<i32>> {
        let len = (to + n - from) % n + 1;
        (0..len).map(|k| contour[(from + k) % n]).collect()
    };

    let mut out = Vec::new();
    simplify_chain(&cyclic(a, b), epsilon, &mut out);
    simplify_chain(&cyclic(b, a), epsilon, &mut out);
    out.dedup();
    out
}
