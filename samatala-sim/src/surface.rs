//! Simulated bed shape.

use samatala::XyPos;
use serde::Deserialize;

/// Bed height model: a tilted plane plus a radial bowl (or dome when the
/// depth is negative).
#[derive(Debug, Clone, Deserialize)]
pub struct BedSurface {
    /// Height at the bed origin (mm)
    #[serde(default)]
    pub offset: f32,

    /// Slope along X (mm per mm)
    #[serde(default)]
    pub tilt_x: f32,

    /// Slope along Y (mm per mm)
    #[serde(default)]
    pub tilt_y: f32,

    /// Bowl depth at `bowl_radius` from the center (mm)
    #[serde(default)]
    pub bowl_depth: f32,

    /// Radius the bowl depth is measured at (mm)
    #[serde(default = "default_bowl_radius")]
    pub bowl_radius: f32,

    /// Bowl center
    #[serde(default = "default_center")]
    pub center: XyPos,
}

fn default_bowl_radius() -> f32 {
    100.0
}

fn default_center() -> XyPos {
    XyPos::new(110.0, 110.0)
}

impl Default for BedSurface {
    fn default() -> Self {
        Self {
            offset: 0.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            bowl_depth: 0.0,
            bowl_radius: default_bowl_radius(),
            center: default_center(),
        }
    }
}

impl BedSurface {
    /// True bed height at `pos`
    pub fn height_at(&self, pos: XyPos) -> f32 {
        let plane = self.offset + self.tilt_x * pos.x + self.tilt_y * pos.y;
        if self.bowl_depth == 0.0 || self.bowl_radius <= 0.0 {
            return plane;
        }
        let r = pos.distance(&self.center) / self.bowl_radius;
        plane + self.bowl_depth * r * r
    }
}
