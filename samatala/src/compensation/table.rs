//! Per-sensor offset table: storage, interpolation and calibration fitting.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{SensorCalibration, SensorKind};

/// Largest plausible offset magnitude (µm).
pub const MAX_OFFSET_UM: i32 = 2000;

/// Largest plausible change between adjacent steps (µm).
pub const MAX_STEP_DELTA_UM: i32 = 800;

/// Fewest collected samples a calibration can be finished with.
pub const MIN_CALIBRATION_SAMPLES: usize = 3;

const REGRESSION_EPSILON: f32 = 1e-4;

/// Calibration and table editing failures.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CalibrationError {
    /// The sensor's table can only be edited by hand
    #[error("{0} offsets cannot be calibrated by probing")]
    NotCalibratable(SensorKind),
    /// No run was prepared
    #[error("No calibration in progress")]
    NotRunning,
    /// A sample was taken away from its grid temperature
    #[error("!{sensor} at {found:.1}C, sample expects {expected:.1}C")]
    OffTemperature {
        /// Sensor being calibrated
        sensor: SensorKind,
        /// Grid temperature of the sample
        expected: f32,
        /// Temperature reported by the host
        found: f32,
    },
    /// Every slot of the table already holds a sample
    #[error("{0} calibration table is full")]
    TableFull(SensorKind),
    /// Too few samples to finish
    #[error("!Insufficient measurements (min. {min}), got {got}")]
    InsufficientMeasurements {
        /// Samples collected
        got: usize,
        /// Samples required
        min: usize,
    },
    /// An offset exceeds the plausible range
    #[error("!Invalid Z-offset detected (0-2) at index {index}: {value_um} um")]
    OffsetOutOfRange {
        /// Table index
        index: usize,
        /// Offending value
        value_um: i32,
    },
    /// Two adjacent offsets differ too much
    #[error("!Invalid Z-offset between two probings detected (0-0.8) at index {index}: {delta_um} um")]
    StepTooLarge {
        /// Index of the second sample of the pair
        index: usize,
        /// Difference between the pair
        delta_um: i32,
    },
    /// Manual edit outside the table
    #[error("!Invalid index {index} for {sensor} (max {max}). Failed to set value")]
    IndexOutOfRange {
        /// Table being edited
        sensor: SensorKind,
        /// Requested index
        index: usize,
        /// Largest valid index
        max: usize,
    },
}

/// Offsets of one sensor, in micrometers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    sensor: SensorKind,
    grid: SensorCalibration,
    offsets: Vec<i16>,
}

impl CalibrationTable {
    /// Zeroed table
    pub fn new(sensor: SensorKind, grid: SensorCalibration) -> Self {
        Self {
            sensor,
            grid,
            offsets: vec![0; grid.measurements],
        }
    }

    /// Sensor this table belongs to
    #[inline]
    pub fn sensor(&self) -> SensorKind {
        self.sensor
    }

    /// Temperature grid
    #[inline]
    pub fn grid(&self) -> &SensorCalibration {
        &self.grid
    }

    /// Stored offsets, excluding the zero reference
    #[inline]
    pub fn offsets(&self) -> &[i16] {
        &self.offsets
    }

    /// Reset every offset to zero
    pub fn clear(&mut self) {
        self.offsets.fill(0);
    }

    /// Overwrite one offset
    pub fn set(&mut self, index: usize, value_um: i16) -> Result<(), CalibrationError> {
        let max = self.offsets.len().saturating_sub(1);
        let slot = self
            .offsets
            .get_mut(index)
            .ok_or(CalibrationError::IndexOutOfRange {
                sensor: self.sensor,
                index,
                max,
            })?;
        *slot = value_um;
        Ok(())
    }

    /// `(temperature, offset_um)` of point `i`; point 0 is the reference
    fn point(&self, i: usize) -> (f32, f32) {
        let offset = if i == 0 {
            0.0
        } else {
            self.offsets.get(i - 1).copied().unwrap_or(0) as f32
        };
        (self.grid.temp_at(i), offset)
    }

    /// Offset in micrometers at `temp`.
    ///
    /// `extrapolate` is the number of points spanned by the extrapolation
    /// line beyond either end; `None` clamps to the end values instead.
    pub fn offset_um(&self, temp: f32, extrapolate: Option<usize>) -> f32 {
        let n = self.offsets.len();
        if n == 0 || !temp.is_finite() {
            return 0.0;
        }
        let lerp = |x: f32, p1: (f32, f32), p2: (f32, f32)| {
            (p2.1 - p1.1) / (p2.0 - p1.0) * (x - p1.0) + p1.1
        };

        if temp < self.grid.start_temp {
            match extrapolate {
                Some(k) => lerp(temp, self.point(0), self.point(k.clamp(1, n))),
                None => 0.0,
            }
        } else if temp >= self.grid.end_temp() {
            match extrapolate {
                Some(k) => lerp(temp, self.point(n - k.clamp(1, n)), self.point(n)),
                None => self.offsets[n - 1] as f32,
            }
        } else {
            let idx = (((temp - self.grid.start_temp) / self.grid.temp_resolution) as usize).min(n - 1);
            lerp(temp, self.point(idx), self.point(idx + 1))
        }
    }

    /// Least-squares line through the reference and the first `count`
    /// samples, as `(slope, intercept)` in µm against `temp - start_temp`.
    fn regression(&self, count: usize) -> Option<(f32, f32)> {
        if count == 0 || count > self.offsets.len() {
            return None;
        }
        let res = self.grid.temp_resolution;
        // The reference point (0, 0) adds nothing to the sums but counts
        let (mut sum_x, mut sum_x2, mut sum_xy, mut sum_y) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for (i, &y) in self.offsets[..count].iter().enumerate() {
            let x = (i + 1) as f32 * res;
            let y = y as f32;
            sum_x += x;
            sum_x2 += x * x;
            sum_xy += x * y;
            sum_y += y;
        }
        let n = (count + 1) as f32;
        let denom = n * sum_x2 - sum_x * sum_x;
        if denom.abs() <= REGRESSION_EPSILON {
            return None;
        }
        let k = (n * sum_xy - sum_x * sum_y) / denom;
        let d = (sum_y - k * sum_x) / n;
        Some((k, d))
    }

    /// Complete a table of which the first `collected` samples were measured.
    ///
    /// Missing samples are extrapolated from a line fit, or repeat the last
    /// sample if the fit is degenerate. An implausible table is zeroed.
    pub(crate) fn complete(&mut self, collected: usize) -> Result<(), CalibrationError> {
        if collected < MIN_CALIBRATION_SAMPLES {
            self.clear();
            return Err(CalibrationError::InsufficientMeasurements {
                got: collected,
                min: MIN_CALIBRATION_SAMPLES,
            });
        }

        let n = self.offsets.len();
        if collected < n {
            match self.regression(collected) {
                Some((k, d)) => {
                    info!(
                        "[PTC] {} got {} measurements, applying linear extrapolation ({:.2} um/C)",
                        self.sensor, collected, k
                    );
                    for i in collected..n {
                        let x = (i + 1) as f32 * self.grid.temp_resolution;
                        let v = (k * x + d).round().clamp(i16::MIN as f32, i16::MAX as f32);
                        self.offsets[i] = v as i16;
                    }
                }
                None => {
                    warn!(
                        "[PTC] {} failed to extrapolate, repeating last value for higher temperatures",
                        self.sensor
                    );
                    let last = self.offsets[collected - 1];
                    self.offsets[collected..].fill(last);
                }
            }
        }

        if let Err(e) = self.sanity_check() {
            warn!("[PTC] {}", e);
            self.clear();
            return Err(e);
        }
        Ok(())
    }

    fn sanity_check(&self) -> Result<(), CalibrationError> {
        for (i, &v) in self.offsets.iter().enumerate() {
            let v = v as i32;
            if v.abs() > MAX_OFFSET_UM {
                return Err(CalibrationError::OffsetOutOfRange {
                    index: i,
                    value_um: v,
                });
            }
            if i > 0 {
                let delta = (self.offsets[i - 1] as i32 - v).abs();
                if delta > MAX_STEP_DELTA_UM {
                    return Err(CalibrationError::StepTooLarge {
                        index: i,
                        delta_um: delta,
                    });
                }
            }
        }
        Ok(())
    }

    /// Report lines, reference row first
    pub fn report_lines(&self) -> Vec<String> {
        (0..=self.offsets.len())
            .map(|i| {
                let (temp, offset) = self.point(i);
                format!(
                    "{} temp: {:.0}C; Offset: {:.0} um",
                    self.sensor.name(),
                    temp,
                    offset
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn probe_table() -> CalibrationTable {
        CalibrationTable::new(
            SensorKind::Probe,
            SensorCalibration::default_for(SensorKind::Probe),
        )
    }

    #[test]
    fn test_start_temp_is_zero() {
        let mut table = probe_table();
        for i in 0..10 {
            table.set(i, -(10 * (i as i16 + 1))).unwrap();
        }
        assert_eq!(table.offset_um(30.0, None), 0.0);
        assert_eq!(table.offset_um(30.0, Some(2)), 0.0);
    }

    #[test]
    fn test_interpolates_between_points() {
        let mut table = probe_table();
        table.set(0, -10).unwrap();
        table.set(1, -30).unwrap();
        assert_relative_eq!(table.offset_um(35.0, None), -10.0);
        assert_relative_eq!(table.offset_um(37.5, None), -20.0);
        assert_relative_eq!(table.offset_um(32.5, None), -5.0);
    }

    #[test]
    fn test_clamps_outside_range() {
        let mut table = probe_table();
        for i in 0..10 {
            table.set(i, 10 * (i as i16 + 1)).unwrap();
        }
        assert_eq!(table.offset_um(10.0, None), 0.0);
        assert_eq!(table.offset_um(80.0, None), 100.0);
        assert_eq!(table.offset_um(200.0, None), 100.0);
    }

    #[test]
    fn test_extrapolates_outside_range() {
        let mut table = probe_table();
        for i in 0..10 {
            table.set(i, 10 * (i as i16 + 1)).unwrap();
        }
        // 2 um/C slope continues on both sides
        assert_relative_eq!(table.offset_um(25.0, Some(1)), -10.0, epsilon = 1e-4);
        assert_relative_eq!(table.offset_um(90.0, Some(3)), 120.0, epsilon = 1e-4);
    }

    #[test]
    fn test_complete_extrapolates_linear_samples() {
        let mut table = probe_table();
        for (i, v) in [-10, -20, -30].into_iter().enumerate() {
            table.set(i, v).unwrap();
        }
        table.complete(3).unwrap();
        let expected: Vec<i16> = (1..=10).map(|i| -10 * i).collect();
        assert_eq!(table.offsets(), expected.as_slice());
        assert_relative_eq!(table.offset_um(70.0, None), -80.0, epsilon = 1e-3);
    }

    #[test]
    fn test_complete_degenerate_repeats_last() {
        let grid = SensorCalibration {
            start_temp: 30.0,
            temp_resolution: 0.001,
            measurements: 6,
        };
        let mut table = CalibrationTable::new(SensorKind::Bed, grid);
        for (i, v) in [5, 9, 12].into_iter().enumerate() {
            table.set(i, v).unwrap();
        }
        table.complete(3).unwrap();
        assert_eq!(table.offsets(), &[5, 9, 12, 12, 12, 12]);
    }

    #[test]
    fn test_complete_requires_three_samples() {
        let mut table = probe_table();
        table.set(0, -10).unwrap();
        table.set(1, -20).unwrap();
        assert_eq!(
            table.complete(2),
            Err(CalibrationError::InsufficientMeasurements { got: 2, min: 3 })
        );
        assert!(table.offsets().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_sanity_rejects_large_offsets() {
        let mut table = probe_table();
        for (i, v) in [-500, -1000, -1500].into_iter().enumerate() {
            table.set(i, v).unwrap();
        }
        // Extrapolation runs past -2000 um
        let err = table.complete(3).unwrap_err();
        assert!(matches!(err, CalibrationError::OffsetOutOfRange { .. }));
        assert!(table.offsets().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_sanity_rejects_large_steps() {
        let mut table = probe_table();
        for i in 0..10 {
            table.set(i, if i < 5 { 0 } else { 900 }).unwrap();
        }
        let err = table.complete(10).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::StepTooLarge {
                index: 5,
                delta_um: 900
            }
        );
        assert!(table.offsets().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_set_rejects_bad_index() {
        let mut table = probe_table();
        assert!(matches!(
            table.set(10, 1),
            Err(CalibrationError::IndexOutOfRange { index: 10, max: 9, .. })
        ));
    }

    #[test]
    fn test_report_has_reference_row() {
        let table = probe_table();
        let lines = table.report_lines();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "Probe temp: 30C; Offset: 0 um");
        assert_eq!(lines[10], "Probe temp: 80C; Offset: 0 um");
    }
}
