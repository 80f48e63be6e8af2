//! Bilinear mesh interpolation.

use super::LevelingStrategy;
use crate::core::{MeshGeometry, XyPos};
use crate::mesh::MeshGrid;

#[inline]
fn lerp(a: f32, a1: f32, z1: f32, a2: f32, z2: f32) -> f32 {
    z1 + (a - a1) * (z2 - z1) / (a2 - a1)
}

/// Bilinear height of the mesh at `pos`.
///
/// Outside the mesh the edge cell's slope is continued. Any undefined
/// corner makes the result 0.
pub fn bilinear_z(mesh: &MeshGrid, pos: XyPos) -> f32 {
    let g = mesh.geometry();
    let (cx, cy) = (g.cell_column(pos.x), g.cell_row(pos.y));
    let at = |i: usize, j: usize| g.index(i, j).map_or(f32::NAN, |idx| mesh.get(idx));
    let (x1, x2) = (g.x_pos(cx), g.x_pos(cx + 1));
    let (y1, y2) = (g.y_pos(cy), g.y_pos(cy + 1));

    let front = lerp(pos.x, x1, at(cx, cy), x2, at(cx + 1, cy));
    let back = lerp(pos.x, x1, at(cx, cy + 1), x2, at(cx + 1, cy + 1));
    let z = lerp(pos.y, y1, front, y2, back);
    if z.is_nan() { 0.0 } else { z }
}

/// Correction by bilinear interpolation of a mesh snapshot.
#[derive(Clone, Debug)]
pub struct MeshStrategy {
    snapshot: MeshGrid,
    valid: bool,
}

impl MeshStrategy {
    /// Strategy over an all-undefined snapshot until refreshed
    pub fn new(geometry: &MeshGeometry) -> Self {
        Self {
            snapshot: MeshGrid::undefined(*geometry),
            valid: false,
        }
    }
}

impl LevelingStrategy for MeshStrategy {
    fn name(&self) -> &'static str {
        "mesh"
    }

    fn refresh(&mut self, mesh: &MeshGrid) {
        self.snapshot = mesh.clone();
        self.valid = mesh.is_fully_defined();
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn correction_at(&self, pos: XyPos) -> f32 {
        bilinear_z(&self.snapshot, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mesh() -> MeshGrid {
        let g = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(20.0, 20.0), 3, 3).unwrap();
        // z = 0.01x + 0.02y
        let mut m = MeshGrid::zeroed(g);
        for idx in g.indices() {
            let p = m.position(idx);
            m.set(idx, 0.01 * p.x + 0.02 * p.y);
        }
        m
    }

    #[test]
    fn test_bilinear_reproduces_plane() {
        let m = mesh();
        assert_relative_eq!(bilinear_z(&m, XyPos::new(5.0, 15.0)), 0.35, epsilon = 1e-6);
        assert_relative_eq!(bilinear_z(&m, XyPos::new(20.0, 20.0)), 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_extrapolates_beyond_edges() {
        let m = mesh();
        assert_relative_eq!(bilinear_z(&m, XyPos::new(30.0, 0.0)), 0.3, epsilon = 1e-6);
        assert_relative_eq!(bilinear_z(&m, XyPos::new(-10.0, 0.0)), -0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_undefined_corner_is_zero() {
        let mut m = mesh();
        m.set(m.index(1, 1).unwrap(), f32::NAN);
        assert_eq!(bilinear_z(&m, XyPos::new(5.0, 5.0)), 0.0);
        assert!(bilinear_z(&m, XyPos::new(15.0, 15.0)) == 0.0);
    }

    #[test]
    fn test_validity_needs_full_mesh() {
        let mut m = mesh();
        let mut s = MeshStrategy::new(m.geometry());
        assert!(!s.is_valid());
        s.refresh(&m);
        assert!(s.is_valid());
        m.set(m.index(0, 0).unwrap(), f32::NAN);
        s.refresh(&m);
        assert!(!s.is_valid());
    }
}
