//! Sub-pixel edge localization inside a 3-row stripe.
//!
//! A vertical Sobel-like kernel turns the stripe into a 1D derivative
//! profile. The strongest bright-to-dark transition is the most negative
//! derivative; a parabola through it and its two neighbours gives the
//! fractional column.

/// Located edge: integer column plus fractional offset from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeLocation {
    pub index: usize,
    pub offset: f64,
}

/// Fill `out` with the per-column derivative of a 3-row `buffer`.
///
/// Interior column `a` gets `-1,-2,-1` applied to column `a-1` and
/// `+1,+2,+1` to column `a+1`; the two border columns copy their inner
/// neighbour. Returns `None` for buffers narrower than 3 columns.
pub fn stripe_derivative(buffer: &[u8], width: usize, out: &mut Vec<i32>) -> Option<()> {
    if width < 3 || buffer.len() < 3 * width {
        return None;
    }
    let (r0, rest) = buffer.split_at(width);
    let (r1, r2) = rest.split_at(width);

    out.clear();
    out.resize(width, 0);
    for a in 1..width - 1 {
        let left = r0[a - 1] as i32 + 2 * r1[a - 1] as i32 + r2[a - 1] as i32;
        let right = r0[a + 1] as i32 + 2 * r1[a + 1] as i32 + r2[a + 1] as i32;
        out[a] = right - left;
    }
    out[0] = out[1];
    out[width - 1] = out[width - 2];
    Some(())
}

/// Find the dominant edge in a derivative profile.
///
/// Scans interior columns; a column is taken when its value does not
/// exceed the running minimum and its 3-tap neighbourhood sum is strictly
/// below the best sum so far. The search starts at `min = 255`,
/// `sum = 3 * 255`, so a profile without any qualifying column yields
/// `None`.
pub fn locate_edge(derivative: &[i32]) -> Option<EdgeLocation> {
    let n = derivative.len();
    if n < 3 {
        return None;
    }

    let mut min = 255;
    let mut min_sum = 3 * 255;
    let mut best = None;
    for a in 1..n - 1 {
        let value = derivative[a];
        if value > min {
            continue;
        }
        let sum = derivative[a - 1] + value + derivative[a + 1];
        if sum < min_sum {
            min = value;
            min_sum = sum;
            best = Some(a);
        }
    }

    let index = best?;
    Some(EdgeLocation {
        index,
        offset: parabola_vertex(
            derivative[index - 1] as f64,
            derivative[index] as f64,
            derivative[index + 1] as f64,
        ),
    })
}

/// Vertex of the parabola through `(-1, left)`, `(0, center)`, `(1, right)`.
///
/// Zero when the curvature vanishes.
pub fn parabola_vertex(left: f64, center: f64, right: f64) -> f64 {
    let curvature = left - 2.0 * center + right;
    if curvature == 0.0 {
        return 0.0;
    }
    0.5 * (left - right) / curvature
}
