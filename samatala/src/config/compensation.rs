//! Probe temperature compensation settings.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::compensation::{ProbeTempCompensation, SensorCalibration, SensorKind};

fn probe_grid() -> SensorCalibration {
    SensorCalibration::default_for(SensorKind::Probe)
}

fn bed_grid() -> SensorCalibration {
    SensorCalibration::default_for(SensorKind::Bed)
}

fn hotend_grid() -> SensorCalibration {
    SensorCalibration::default_for(SensorKind::Hotend)
}

/// Compensation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompensationSection {
    /// Apply compensation to probe readings
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
    /// Probe thermistor grid
    #[serde(default = "probe_grid")]
    pub probe: SensorCalibration,
    /// Bed grid
    #[serde(default = "bed_grid")]
    pub bed: SensorCalibration,
    /// Hotend grid
    #[serde(default = "hotend_grid")]
    pub hotend: SensorCalibration,
    /// Points spanned when extrapolating past the tables (clamps when absent)
    #[serde(default)]
    pub linear_extrapolation: Option<usize>,
}

impl Default for CompensationSection {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            probe: probe_grid(),
            bed: bed_grid(),
            hotend: hotend_grid(),
            linear_extrapolation: None,
        }
    }
}

impl CompensationSection {
    /// Grid of one sensor
    pub fn grid(&self, sensor: SensorKind) -> SensorCalibration {
        match sensor {
            SensorKind::Probe => self.probe,
            SensorKind::Bed => self.bed,
            SensorKind::Hotend => self.hotend,
        }
    }

    /// Zeroed compensation tables with these grids
    pub fn build(&self) -> ProbeTempCompensation {
        ProbeTempCompensation::new(
            SensorKind::ALL.map(|kind| self.grid(kind)),
            self.linear_extrapolation,
        )
    }
}
