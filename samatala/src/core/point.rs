//! Position and index types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Bed position in millimeters.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct XyPos {
    /// X coordinate in mm
    pub x: f32,
    /// Y coordinate in mm
    pub y: f32,
}

impl XyPos {
    /// Create a new position
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    #[inline]
    pub fn distance(&self, other: &XyPos) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// True when both components are finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for XyPos {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        XyPos::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for XyPos {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        XyPos::new(self.x - other.x, self.y - other.y)
    }
}

impl fmt::Display for XyPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Address of one mesh cell.
///
/// Only [`MeshGeometry`](super::MeshGeometry) hands these out. An index from
/// a larger geometry is rejected by the containers rather than remapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GridIndex {
    x: usize,
    y: usize,
}

impl GridIndex {
    /// Construction is restricted to the geometry, which validates bounds.
    #[inline]
    pub(crate) fn new_unchecked(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Column index (X axis)
    #[inline]
    pub fn x(&self) -> usize {
        self.x
    }

    /// Row index (Y axis)
    #[inline]
    pub fn y(&self) -> usize {
        self.y
    }

    /// Distance in cells to another index
    #[inline]
    pub fn cell_distance(&self, other: &GridIndex) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        dx.hypot(dy)
    }
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xy_distance() {
        let a = XyPos::new(0.0, 0.0);
        let b = XyPos::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert_eq!(b - a, b);
    }

    #[test]
    fn test_cell_distance() {
        let a = GridIndex::new_unchecked(1, 1);
        let b = GridIndex::new_unchecked(4, 5);
        assert!((a.cell_distance(&b) - 5.0).abs() < 1e-6);
    }
}
