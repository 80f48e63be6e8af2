//! Probe temperature compensation.
//!
//! Inductive and piezo probes trigger at slightly different heights as the
//! probe, bed and hotend warm up. Each sensor gets a calibration table of
//! offsets in micrometers at fixed temperature steps:
//!
//! ```text
//!   temp:    start   start+res   start+2res  ...  start+N·res
//!   offset:    0       t[0]        t[1]      ...    t[N-1]
//! ```
//!
//! The first point is the zero reference taken at calibration start.
//! Offsets between points are linearly interpolated; outside the table they
//! are clamped or extrapolated depending on configuration.

mod command;
mod compensator;
mod sensor;
mod table;

pub use command::PtcCommand;
pub use compensator::{CalibrationRun, ProbeTempCompensation};
pub use sensor::{SensorCalibration, SensorKind};
pub use table::{CalibrationError, CalibrationTable};
