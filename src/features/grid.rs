//! Bird's-eye-view grid geometry and point-to-cell indexing.

use serde::{Deserialize, Serialize};

use crate::config::BevGridConfig;

/// Grid coordinates (integer cell indices).
///
/// Signed so that offset arithmetic can land outside the grid; validity is
/// checked against a [`BevGrid`], not encoded in the type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellCoord {
    /// Row index (derived from x).
    pub row: i32,
    /// Column index (derived from y).
    pub col: i32,
}

impl CellCoord {
    /// Create a new cell coordinate.
    #[inline]
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// BEV grid: pure, deterministic mapping between planar world coordinates
/// and grid cells.
///
/// The grid covers `[-range, range)` on both axes. A point maps to
/// `row = floor((x + range) / cell_size_x)`, `col = floor((y + range) /
/// cell_size_y)`; anything outside the covered square maps to nothing.
/// Identical input always yields identical output — there is no accumulated
/// floating-point state.
#[derive(Clone, Copy, Debug)]
pub struct BevGrid {
    width: usize,
    height: usize,
    range: f32,
    cell_size_x: f32,
    cell_size_y: f32,
}

impl BevGrid {
    /// Create a grid from configuration.
    pub fn new(config: &BevGridConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            range: config.range,
            cell_size_x: config.cell_size_x(),
            cell_size_y: config.cell_size_y(),
        }
    }

    /// Grid width in cells (columns).
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells (rows).
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Half-extent in meters.
    #[inline]
    pub fn range(&self) -> f32 {
        self.range
    }

    /// Cell extent along x (row direction) in meters.
    #[inline]
    pub fn cell_size_x(&self) -> f32 {
        self.cell_size_x
    }

    /// Cell extent along y (column direction) in meters.
    #[inline]
    pub fn cell_size_y(&self) -> f32 {
        self.cell_size_y
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Map planar coordinates to a cell, or `None` outside `[-range, range)`.
    #[inline]
    pub fn locate(&self, x: f32, y: f32) -> Option<CellCoord> {
        if x < -self.range || x >= self.range || y < -self.range || y >= self.range {
            return None;
        }
        let row = ((x + self.range) / self.cell_size_x).floor() as i32;
        let col = ((y + self.range) / self.cell_size_y).floor() as i32;
        // Guard the top edge: x just below range can round up to height
        // after the division at extreme cell counts.
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return None;
        }
        Some(CellCoord::new(row, col))
    }

    /// Map planar coordinates directly to a flat cell index.
    #[inline]
    pub fn locate_flat(&self, x: f32, y: f32) -> Option<usize> {
        self.locate(x, y).map(|c| self.flat_unchecked(c))
    }

    /// Check if a coordinate lies within the grid.
    #[inline]
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row >= 0
            && coord.col >= 0
            && (coord.row as usize) < self.height
            && (coord.col as usize) < self.width
    }

    /// Convert a valid coordinate to its flat `row * width + col` index.
    #[inline]
    pub fn flat(&self, coord: CellCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(self.flat_unchecked(coord))
        } else {
            None
        }
    }

    #[inline]
    fn flat_unchecked(&self, coord: CellCoord) -> usize {
        coord.row as usize * self.width + coord.col as usize
    }

    /// Convert a flat index back to grid coordinates.
    #[inline]
    pub fn coord(&self, index: usize) -> CellCoord {
        CellCoord::new((index / self.width) as i32, (index % self.width) as i32)
    }

    /// World coordinates of a cell's center.
    #[inline]
    pub fn cell_center(&self, coord: CellCoord) -> (f32, f32) {
        (
            -self.range + (coord.row as f32 + 0.5) * self.cell_size_x,
            -self.range + (coord.col as f32 + 0.5) * self.cell_size_y,
        )
    }
}
