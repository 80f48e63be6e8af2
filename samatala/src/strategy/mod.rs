//! Correction models queried by the motion path.
//!
//! A [`LevelingStrategy`] turns the mesh into "Z correction at this XY".
//! The kind is chosen once from configuration with [`build_strategy`];
//! after the mesh changes, [`LevelingStrategy::refresh`] re-derives
//! whatever the strategy caches.

mod fade;
mod mesh;
mod planar;

use serde::{Deserialize, Serialize};

use crate::core::XyPos;
use crate::mesh::MeshGrid;

pub use fade::FadeHeight;
pub use mesh::{MeshStrategy, bilinear_z};
pub use planar::PlanarStrategy;

/// Correction model interface.
pub trait LevelingStrategy: Send {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Rebuild cached state from the mesh
    fn refresh(&mut self, mesh: &MeshGrid);

    /// True when corrections can be trusted
    fn is_valid(&self) -> bool;

    /// Z correction (mm) at a bed position, before fading
    fn correction_at(&self, pos: XyPos) -> f32;
}

/// Available correction models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Bilinear interpolation of the mesh
    #[default]
    Mesh,
    /// Single best-fit plane through the defined cells
    Planar,
}

/// Construct the strategy selected in configuration.
pub fn build_strategy(kind: StrategyKind, mesh: &MeshGrid) -> Box<dyn LevelingStrategy> {
    let mut strategy: Box<dyn LevelingStrategy> = match kind {
        StrategyKind::Mesh => Box::new(MeshStrategy::new(mesh.geometry())),
        StrategyKind::Planar => Box::new(PlanarStrategy::new()),
    };
    strategy.refresh(mesh);
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshGeometry;

    #[test]
    fn test_build_refreshes_from_mesh() {
        let g = MeshGeometry::new(XyPos::new(0.0, 0.0), XyPos::new(10.0, 10.0), 3, 3).unwrap();
        let mut mesh = MeshGrid::zeroed(g);
        mesh.fill_all(0.2);
        for kind in [StrategyKind::Mesh, StrategyKind::Planar] {
            let s = build_strategy(kind, &mesh);
            assert!(s.is_valid(), "{}", s.name());
            assert!((s.correction_at(XyPos::new(4.0, 7.0)) - 0.2).abs() < 1e-5);
        }
    }
}
