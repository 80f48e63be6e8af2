//! Single-plane correction, as used by three-point and linear leveling.

use log::debug;

use super::LevelingStrategy;
use crate::core::XyPos;
use crate::fit::{LinearFitAccumulator, PlaneFit};
use crate::mesh::MeshGrid;

/// Correction from the best-fit plane of the defined cells.
#[derive(Clone, Debug, Default)]
pub struct PlanarStrategy {
    plane: Option<PlaneFit>,
}

impl PlanarStrategy {
    /// Strategy without a plane until refreshed
    pub fn new() -> Self {
        Self::default()
    }

    /// Current plane, if the last refresh could fit one
    pub fn plane(&self) -> Option<&PlaneFit> {
        self.plane.as_ref()
    }
}

impl LevelingStrategy for PlanarStrategy {
    fn name(&self) -> &'static str {
        "planar"
    }

    fn refresh(&mut self, mesh: &MeshGrid) {
        let mut acc = LinearFitAccumulator::new();
        for (idx, z) in mesh.defined() {
            let p = mesh.position(idx);
            acc.accumulate(p.x, p.y, z);
        }
        self.plane = acc.finish().ok();
        debug!("[Level] Planar strategy refreshed: {:?}", self.plane);
    }

    fn is_valid(&self) -> bool {
        self.plane.is_some()
    }

    fn correction_at(&self, pos: XyPos) -> f32 {
        self.plane.map_or(0.0, |p| p.z_at(pos.x, pos.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshGeometry;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_from_three_corners() {
        let g = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(100.0, 100.0), 2, 2).unwrap();
        let m = MeshGrid::from_rows(g, &[&[0.0, 0.1], &[0.2, f32::NAN]]).unwrap();
        let mut s = PlanarStrategy::new();
        s.refresh(&m);
        assert!(s.is_valid());
        assert_relative_eq!(s.correction_at(XyPos::new(100.0, 100.0)), 0.3, epsilon = 1e-5);
    }

    #[test]
    fn test_invalid_with_two_points() {
        let g = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(100.0, 100.0), 2, 2).unwrap();
        let m = MeshGrid::from_rows(g, &[&[0.0, 0.1], &[f32::NAN, f32::NAN]]).unwrap();
        let mut s = PlanarStrategy::new();
        s.refresh(&m);
        assert!(!s.is_valid());
        assert_eq!(s.correction_at(XyPos::new(10.0, 10.0)), 0.0);
    }
}
