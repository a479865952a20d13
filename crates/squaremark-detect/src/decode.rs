//! 6×6 cell-grid sampling and 16-bit code extraction.
//!
//! The marker is a black square divided into 6×6 cells: a solid black
//! border ring and an inner 4×4 grid carrying one bit per cell (black = 1).
//! The code is read in raster order, most significant bit first, for each
//! of the four quarter turns; the smallest code wins.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use squaremark_core::{homography_from_4pt, warp_perspective_gray, GrayImageView};

/// Cells per side of the marker, border included.
pub const GRID_CELLS: usize = 6;

/// Binarized cell grid, row-major: `0` for black cells, `255` for white.
pub type CellGrid = [u8; GRID_CELLS * GRID_CELLS];

/// A successfully decoded code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedCode {
    /// Minimal code over the four rotations.
    pub id: u16,
    /// Rotation index (0..=3) that produced `id`.
    pub rotation: u8,
}

/// Why a cell grid does not carry a valid code.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRejection {
    #[error("border ring is not solid black")]
    BorderNotBlack,
    #[error("degenerate code {code:#06x}")]
    DegenerateCode { code: u16 },
}

/// Unwarp the quadrilateral `corners` into a binarized 6×6 grid.
///
/// Each cell is sampled at its centre; values `<= bit_threshold` read as
/// black. `None` when the corners admit no homography.
pub fn sample_cell_grid(
    image: &GrayImageView<'_>,
    corners: &[Point2<f32>; 4],
    bit_threshold: u8,
) -> Option<CellGrid> {
    let n = GRID_CELLS as f32;
    let square = [
        Point2::new(0.0, 0.0),
        Point2::new(n, 0.0),
        Point2::new(n, n),
        Point2::new(0.0, n),
    ];
    let h = homography_from_4pt(&square, corners)?;
    let patch = warp_perspective_gray(image, &h, GRID_CELLS, GRID_CELLS);

    let mut grid = [0u8; GRID_CELLS * GRID_CELLS];
    for (cell, &v) in grid.iter_mut().zip(&patch.data) {
        *cell = if v > bit_threshold { 255 } else { 0 };
    }
    Some(grid)
}

/// `true` when every cell of the outer ring is black.
pub fn border_is_black(grid: &CellGrid) -> bool {
    let last = GRID_CELLS - 1;
    (0..GRID_CELLS).all(|i| {
        grid[i] == 0
            && grid[last * GRID_CELLS + i] == 0
            && grid[i * GRID_CELLS] == 0
            && grid[i * GRID_CELLS + last] == 0
    })
}

/// Codes of the inner 4×4 grid for the four quarter turns.
///
/// Scanning inner cell `(r, c)` contributes to rotation 0 through `(r, c)`,
/// rotation 1 through `(c, 3 - r)`, rotation 2 through `(3 - r, 3 - c)`
/// and rotation 3 through `(3 - c, r)`.
pub fn rotation_codes(grid: &CellGrid) -> [u16; 4] {
    let black = |r: usize, c: usize| u16::from(grid[(r + 1) * GRID_CELLS + c + 1] == 0);
    let mut codes = [0u16; 4];
    for r in 0..4 {
        for c in 0..4 {
            let bits = [
                black(r, c),
                black(c, 3 - r),
                black(3 - r, 3 - c),
                black(3 - c, r),
            ];
            for (code, bit) in codes.iter_mut().zip(bits) {
                *code = (*code << 1) | bit;
            }
        }
    }
    codes
}

/// Validate the border and pick the canonical rotation.
///
/// Ties resolve to the lowest rotation index. All-white and all-black
/// inner grids are rejected.
pub fn decode_cell_grid(grid: &CellGrid) -> Result<DecodedCode, DecodeRejection> {
    if !border_is_black(grid) {
        return Err(DecodeRejection::BorderNotBlack);
    }
    let codes = rotation_codes(grid);
    let (rotation, id) = codes
        .iter()
        .copied()
        .enumerate()
        .min_by_key(|&(_, code)| code)
        .unwrap_or((0, codes[0]));
    if id == 0 || id == u16::MAX {
        return Err(DecodeRejection::DegenerateCode { code: id });
    }
    Ok(DecodedCode {
        id,
        rotation: rotation as u8,
    })
}
