//! Probe placement and motion clearances.

use serde::{Deserialize, Serialize};

use super::{BedSection, defaults};
use crate::core::XyPos;

/// Probe settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeSection {
    /// Probe X position relative to the nozzle (mm)
    #[serde(default = "defaults::probe_offset_xy")]
    pub offset_x: f32,
    /// Probe Y position relative to the nozzle (mm)
    #[serde(default = "defaults::probe_offset_xy")]
    pub offset_y: f32,
    /// Probe trigger height relative to the nozzle (mm)
    #[serde(default)]
    pub offset_z: f32,
    /// Distance the probe keeps from the bed edges (mm)
    #[serde(default = "defaults::probing_margin")]
    pub margin: f32,
    /// Points probed for a three-point tilt
    #[serde(default = "defaults::tilt_points")]
    pub tilt_points: [XyPos; 3],
    /// Z raise between probe points (mm)
    #[serde(default = "defaults::z_clearance_between_probes")]
    pub z_clearance_between_probes: f32,
    /// Z raise for travel to and from a session (mm)
    #[serde(default = "defaults::z_clearance_deploy")]
    pub z_clearance_deploy: f32,
    /// Default nozzle height for manual probing and fine tuning (mm)
    #[serde(default = "defaults::manual_probe_start_z")]
    pub manual_probe_start_z: f32,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            offset_x: defaults::probe_offset_xy(),
            offset_y: defaults::probe_offset_xy(),
            offset_z: 0.0,
            margin: defaults::probing_margin(),
            tilt_points: defaults::tilt_points(),
            z_clearance_between_probes: defaults::z_clearance_between_probes(),
            z_clearance_deploy: defaults::z_clearance_deploy(),
            manual_probe_start_z: defaults::manual_probe_start_z(),
        }
    }
}

impl ProbeSection {
    /// Probe position relative to the nozzle
    #[inline]
    pub fn offset_xy(&self) -> XyPos {
        XyPos::new(self.offset_x, self.offset_y)
    }

    /// Rectangle the probe can reach on `bed`, as `(min, max)`.
    ///
    /// The probe must stay `margin` away from the edges and the nozzle
    /// must stay on the bed.
    pub fn reachable_area(&self, bed: &BedSection) -> (XyPos, XyPos) {
        let min = XyPos::new(
            self.margin.max(self.offset_x),
            self.margin.max(self.offset_y),
        );
        let max = XyPos::new(
            (bed.size_x - self.margin).min(bed.size_x + self.offset_x),
            (bed.size_y - self.margin).min(bed.size_y + self.offset_y),
        );
        (min, max)
    }

    /// True if the probe can be placed over `pos`
    pub fn can_reach(&self, bed: &BedSection, pos: XyPos) -> bool {
        let (min, max) = self.reachable_area(bed);
        pos.x >= min.x - 0.001
            && pos.x <= max.x + 0.001
            && pos.y >= min.y - 0.001
            && pos.y <= max.y + 0.001
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachable_area_follows_offset() {
        let bed = BedSection::default();
        let probe = ProbeSection {
            offset_x: -40.0,
            offset_y: 15.0,
            ..ProbeSection::default()
        };
        let (min, max) = probe.reachable_area(&bed);
        assert_eq!(min, XyPos::new(10.0, 15.0));
        assert_eq!(max, XyPos::new(180.0, 210.0));
        assert!(probe.can_reach(&bed, XyPos::new(180.0, 15.0)));
        assert!(!probe.can_reach(&bed, XyPos::new(190.0, 100.0)));
    }
}
