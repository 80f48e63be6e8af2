//! Table maintenance commands (reset, set one value, report).

use serde::{Deserialize, Serialize};

use super::{CalibrationError, ProbeTempCompensation, SensorKind};

/// Operator command against the compensation tables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PtcCommand {
    /// Zero every table
    Reset,
    /// Write one offset
    Set {
        /// Table to edit
        sensor: SensorKind,
        /// Slot index (0 is the first step after the reference)
        index: usize,
        /// Offset in micrometers
        value_um: i16,
    },
    /// Print every table
    Report,
}

impl PtcCommand {
    /// Apply the command, returning the report text for [`PtcCommand::Report`].
    pub fn apply(&self, ptc: &mut ProbeTempCompensation) -> Result<Option<String>, CalibrationError> {
        match *self {
            PtcCommand::Reset => {
                ptc.reset_all();
                Ok(None)
            }
            PtcCommand::Set {
                sensor,
                index,
                value_um,
            } => {
                ptc.set_offset(sensor, index, value_um)?;
                Ok(None)
            }
            PtcCommand::Report => Ok(Some(ptc.report())),
        }
    }
}
