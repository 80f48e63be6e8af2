//! Temperature sensor kinds and their calibration grids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature sensor a calibration table belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Probe body thermistor
    Probe,
    /// Heated bed
    Bed,
    /// Hotend, entered by hand only
    Hotend,
}

impl SensorKind {
    /// All kinds in report order
    pub const ALL: [SensorKind; 3] = [SensorKind::Probe, SensorKind::Bed, SensorKind::Hotend];

    /// Slot of this kind in per-sensor arrays
    #[inline]
    pub fn index(self) -> usize {
        match self {
            SensorKind::Probe => 0,
            SensorKind::Bed => 1,
            SensorKind::Hotend => 2,
        }
    }

    /// Name used in reports
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Probe => "Probe",
            SensorKind::Bed => "Bed",
            SensorKind::Hotend => "Extruder",
        }
    }

    /// Whether a probing calibration run can fill this table
    #[inline]
    pub fn can_calibrate(self) -> bool {
        !matches!(self, SensorKind::Hotend)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_measurements() -> usize {
    10
}

/// Temperature grid of one sensor table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorCalibration {
    /// Temperature of the zero reference sample (°C)
    pub start_temp: f32,
    /// Step between samples (°C)
    pub temp_resolution: f32,
    /// Number of stored samples after the reference
    #[serde(default = "default_measurements")]
    pub measurements: usize,
}

impl SensorCalibration {
    /// Factory grid for a sensor kind
    pub fn default_for(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Probe => Self {
                start_temp: 30.0,
                temp_resolution: 5.0,
                measurements: 10,
            },
            SensorKind::Bed => Self {
                start_temp: 60.0,
                temp_resolution: 5.0,
                measurements: 10,
            },
            SensorKind::Hotend => Self {
                start_temp: 180.0,
                temp_resolution: 5.0,
                measurements: 20,
            },
        }
    }

    /// Temperature of table point `i` (0 is the reference)
    #[inline]
    pub fn temp_at(&self, i: usize) -> f32 {
        self.start_temp + i as f32 * self.temp_resolution
    }

    /// Temperature of the last stored sample
    #[inline]
    pub fn end_temp(&self) -> f32 {
        self.temp_at(self.measurements)
    }
}
