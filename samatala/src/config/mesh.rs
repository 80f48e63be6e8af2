//! Mesh placement and bed size.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::core::{MeshGeometry, XyPos};
use crate::error::Result;

/// Mesh bounds and resolution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshSection {
    /// Left edge of the mesh (mm)
    #[serde(default = "defaults::mesh_min")]
    pub min_x: f32,
    /// Front edge of the mesh (mm)
    #[serde(default = "defaults::mesh_min")]
    pub min_y: f32,
    /// Right edge of the mesh (mm)
    #[serde(default = "defaults::mesh_max")]
    pub max_x: f32,
    /// Back edge of the mesh (mm)
    #[serde(default = "defaults::mesh_max")]
    pub max_y: f32,
    /// Columns
    #[serde(default = "defaults::mesh_points")]
    pub points_x: usize,
    /// Rows
    #[serde(default = "defaults::mesh_points")]
    pub points_y: usize,
}

impl Default for MeshSection {
    fn default() -> Self {
        Self {
            min_x: defaults::mesh_min(),
            min_y: defaults::mesh_min(),
            max_x: defaults::mesh_max(),
            max_y: defaults::mesh_max(),
            points_x: defaults::mesh_points(),
            points_y: defaults::mesh_points(),
        }
    }
}

impl MeshSection {
    /// Validated geometry
    pub fn geometry(&self) -> Result<MeshGeometry> {
        MeshGeometry::new(
            XyPos::new(self.min_x, self.min_y),
            XyPos::new(self.max_x, self.max_y),
            self.points_x,
            self.points_y,
        )
    }
}

/// Physical bed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BedSection {
    /// Width (mm)
    #[serde(default = "defaults::bed_size")]
    pub size_x: f32,
    /// Depth (mm)
    #[serde(default = "defaults::bed_size")]
    pub size_y: f32,
}

impl Default for BedSection {
    fn default() -> Self {
        Self {
            size_x: defaults::bed_size(),
            size_y: defaults::bed_size(),
        }
    }
}

impl BedSection {
    /// Center of the bed
    #[inline]
    pub fn center(&self) -> XyPos {
        XyPos::new(self.size_x / 2.0, self.size_y / 2.0)
    }

    /// True when `pos` is on the bed
    #[inline]
    pub fn contains(&self, pos: XyPos) -> bool {
        pos.x >= 0.0 && pos.x <= self.size_x && pos.y >= 0.0 && pos.y <= self.size_y
    }
}
