//! Mesh geometry: where the grid sits on the bed and how its cells map to millimeters.

use serde::Serialize;

use super::{GridIndex, XyPos};
use crate::error::{Error, Result};

/// Largest supported point count per axis.
pub const MAX_POINTS_PER_AXIS: usize = 255;

/// Placement and resolution of the leveling mesh.
///
/// ```text
///   max_y ┌───┬───┬───┐   j = points_y - 1
///         │   │   │   │
///         ├───┼───┼───┤
///         │   │   │   │
///   min_y └───┴───┴───┘   j = 0
///       min_x       max_x
/// ```
///
/// Mesh intersections sit exactly on `min + i * spacing`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MeshGeometry {
    min: XyPos,
    max: XyPos,
    points_x: usize,
    points_y: usize,
}

impl MeshGeometry {
    /// Create a geometry, rejecting grids that cannot be interpolated.
    pub fn new(min: XyPos, max: XyPos, points_x: usize, points_y: usize) -> Result<Self> {
        if !(2..=MAX_POINTS_PER_AXIS).contains(&points_x)
            || !(2..=MAX_POINTS_PER_AXIS).contains(&points_y)
        {
            return Err(Error::Geometry(format!(
                "point counts must be within 2..={}, got {}x{}",
                MAX_POINTS_PER_AXIS, points_x, points_y
            )));
        }
        if !min.is_finite() || !max.is_finite() || max.x <= min.x || max.y <= min.y {
            return Err(Error::Geometry(format!(
                "mesh bounds {} .. {} are empty",
                min, max
            )));
        }
        Ok(Self {
            min,
            max,
            points_x,
            points_y,
        })
    }

    /// Number of columns (W)
    #[inline]
    pub fn width(&self) -> usize {
        self.points_x
    }

    /// Number of rows (H)
    #[inline]
    pub fn height(&self) -> usize {
        self.points_y
    }

    /// Total cell count (W * H)
    #[inline]
    pub fn len(&self) -> usize {
        self.points_x * self.points_y
    }

    /// Always false; a geometry has at least 2x2 cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Lower-left mesh corner
    #[inline]
    pub fn min(&self) -> XyPos {
        self.min
    }

    /// Upper-right mesh corner
    #[inline]
    pub fn max(&self) -> XyPos {
        self.max
    }

    /// Distance between adjacent columns in mm
    #[inline]
    pub fn spacing_x(&self) -> f32 {
        (self.max.x - self.min.x) / (self.points_x - 1) as f32
    }

    /// Distance between adjacent rows in mm
    #[inline]
    pub fn spacing_y(&self) -> f32 {
        (self.max.y - self.min.y) / (self.points_y - 1) as f32
    }

    /// Validate a raw `(x, y)` pair
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> Option<GridIndex> {
        (x < self.points_x && y < self.points_y).then(|| GridIndex::new_unchecked(x, y))
    }

    /// Validate a signed `(x, y)` pair, as produced by curve arithmetic
    #[inline]
    pub fn index_signed(&self, x: i32, y: i32) -> Option<GridIndex> {
        if x < 0 || y < 0 {
            return None;
        }
        self.index(x as usize, y as usize)
    }

    /// True when the index addresses a cell of this grid
    #[inline]
    pub fn contains_index(&self, idx: GridIndex) -> bool {
        idx.x() < self.points_x && idx.y() < self.points_y
    }

    /// Row-major offset of an index (x outer, y inner); `None` for an index
    /// outside this grid.
    #[inline]
    pub(crate) fn offset(&self, idx: GridIndex) -> Option<usize> {
        self.contains_index(idx)
            .then(|| idx.x() * self.points_y + idx.y())
    }

    /// X coordinate of column `i`
    #[inline]
    pub fn x_pos(&self, i: usize) -> f32 {
        self.min.x + i as f32 * self.spacing_x()
    }

    /// Y coordinate of row `j`
    #[inline]
    pub fn y_pos(&self, j: usize) -> f32 {
        self.min.y + j as f32 * self.spacing_y()
    }

    /// Bed position of a mesh intersection
    #[inline]
    pub fn position(&self, idx: GridIndex) -> XyPos {
        XyPos::new(self.x_pos(idx.x()), self.y_pos(idx.y()))
    }

    /// Nearest intersection to a bed position, clamped to the grid.
    pub fn closest_index(&self, pos: XyPos) -> GridIndex {
        let snap = |v: f32, min: f32, spacing: f32, count: usize| -> usize {
            let raw = ((v - min) / spacing).clamp(0.0, (count - 1) as f32);
            if raw.is_nan() { 0 } else { raw.round() as usize }
        };
        GridIndex::new_unchecked(
            snap(pos.x, self.min.x, self.spacing_x(), self.points_x),
            snap(pos.y, self.min.y, self.spacing_y(), self.points_y),
        )
    }

    /// Column whose cell contains `x`, clamped so that `i + 1` is valid.
    #[inline]
    pub fn cell_column(&self, x: f32) -> usize {
        let raw = ((x - self.min.x) / self.spacing_x()).floor();
        raw.clamp(0.0, (self.points_x - 2) as f32) as usize
    }

    /// Row whose cell contains `y`, clamped so that `j + 1` is valid.
    #[inline]
    pub fn cell_row(&self, y: f32) -> usize {
        let raw = ((y - self.min.y) / self.spacing_y()).floor();
        raw.clamp(0.0, (self.points_y - 2) as f32) as usize
    }

    /// Iterate every index, x outer and y inner.
    pub fn indices(&self) -> GridIndices {
        GridIndices {
            width: self.points_x,
            height: self.points_y,
            next: 0,
        }
    }
}

/// Iterator over all indices of a geometry.
#[derive(Clone, Debug)]
pub struct GridIndices {
    width: usize,
    height: usize,
    next: usize,
}

impl Iterator for GridIndices {
    type Item = GridIndex;

    fn next(&mut self) -> Option<GridIndex> {
        if self.next >= self.width * self.height {
            return None;
        }
        let idx = GridIndex::new_unchecked(self.next / self.height, self.next % self.height);
        self.next += 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.width * self.height - self.next.min(self.width * self.height);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIndices {}
