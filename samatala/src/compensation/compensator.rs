//! Calibration runs and measurement correction across all sensor tables.

use log::{debug, info};

use super::{CalibrationError, CalibrationTable, SensorCalibration, SensorKind};

/// State of a calibration run in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationRun {
    /// Table being filled
    pub sensor: SensorKind,
    /// Next table slot to write
    pub index: usize,
    /// Probe reading at the reference temperature (mm)
    pub base_z: f32,
}

/// Offset tables for every sensor plus the calibration run state.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeTempCompensation {
    tables: [CalibrationTable; 3],
    extrapolation: Option<usize>,
    run: Option<CalibrationRun>,
}

impl ProbeTempCompensation {
    /// Zeroed tables with the given grids.
    ///
    /// `extrapolation` is the point count used for linear extrapolation
    /// outside the tables; `None` clamps to the end values.
    pub fn new(grids: [SensorCalibration; 3], extrapolation: Option<usize>) -> Self {
        Self {
            tables: SensorKind::ALL.map(|kind| CalibrationTable::new(kind, grids[kind.index()])),
            extrapolation,
            run: None,
        }
    }

    /// Factory grids, clamped outside the tables
    pub fn with_defaults() -> Self {
        Self::new(SensorKind::ALL.map(SensorCalibration::default_for), None)
    }

    /// Table of one sensor
    #[inline]
    pub fn table(&self, sensor: SensorKind) -> &CalibrationTable {
        &self.tables[sensor.index()]
    }

    /// Mutable table of one sensor
    #[inline]
    pub fn table_mut(&mut self, sensor: SensorKind) -> &mut CalibrationTable {
        &mut self.tables[sensor.index()]
    }

    /// Replace a table, e.g. after loading from storage
    pub fn restore_table(&mut self, table: CalibrationTable) {
        let idx = table.sensor().index();
        self.tables[idx] = table;
    }

    /// Run in progress, if any
    #[inline]
    pub fn run(&self) -> Option<&CalibrationRun> {
        self.run.as_ref()
    }

    /// Zero every table
    pub fn reset_all(&mut self) {
        self.tables.iter_mut().for_each(CalibrationTable::clear);
        self.run = None;
        info!("[PTC] All offsets reset");
    }

    /// Overwrite one offset (µm)
    pub fn set_offset(
        &mut self,
        sensor: SensorKind,
        index: usize,
        value_um: i16,
    ) -> Result<(), CalibrationError> {
        self.table_mut(sensor).set(index, value_um)
    }

    /// Start a calibration run with the reading taken at the start temperature.
    pub fn prepare_new_calibration(
        &mut self,
        sensor: SensorKind,
        base_z: f32,
    ) -> Result<(), CalibrationError> {
        if !sensor.can_calibrate() {
            return Err(CalibrationError::NotCalibratable(sensor));
        }
        self.run = Some(CalibrationRun {
            sensor,
            index: 0,
            base_z,
        });
        debug!("[PTC] {} calibration started at z={:.4}", sensor, base_z);
        Ok(())
    }

    /// Store the next sample of the run. Returns the slot written.
    pub fn push_back_measurement(&mut self, z: f32) -> Result<usize, CalibrationError> {
        let run = self.run.as_mut().ok_or(CalibrationError::NotRunning)?;
        let table = &mut self.tables[run.sensor.index()];
        if run.index >= table.offsets().len() {
            return Err(CalibrationError::TableFull(run.sensor));
        }
        let offset = ((z - run.base_z) * 1000.0)
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        let slot = run.index;
        table.set(slot, offset)?;
        run.index += 1;
        debug!("[PTC] {} sample {}: {} um", run.sensor, slot, offset);
        Ok(slot)
    }

    /// End the run: extrapolate missing samples and validate the table.
    ///
    /// On failure the sensor's table is zeroed, which disables its
    /// compensation rather than applying an implausible one.
    pub fn finish_calibration(&mut self) -> Result<SensorKind, CalibrationError> {
        let run = self.run.take().ok_or(CalibrationError::NotRunning)?;
        self.tables[run.sensor.index()].complete(run.index)?;
        info!("[PTC] {} calibration complete", run.sensor);
        Ok(run.sensor)
    }

    /// Offset (mm) of a sensor at a temperature.
    pub fn compensate(&self, sensor: SensorKind, temp: f32) -> f32 {
        self.table(sensor).offset_um(temp, self.extrapolation) / 1000.0
    }

    /// Remove the temperature-induced offset from a probe reading.
    pub fn compensate_measurement(&self, sensor: SensorKind, temp: f32, z: f32) -> f32 {
        z - self.compensate(sensor, temp)
    }

    /// Full table report
    pub fn report(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            for line in table.report_lines() {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}
