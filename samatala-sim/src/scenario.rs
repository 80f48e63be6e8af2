//! Scenario YAML parsing.
//!
//! A scenario is a named list of steps run in order against one printer:
//!
//! ```yaml
//! name: probe_and_fill
//! steps:
//!   - type: command
//!     words: {P: 1, T: ~}
//!   - type: command
//!     words: {P: 3}
//!   - type: check_mesh
//!     tolerance: 0.01
//! ```

use std::path::Path;

use samatala::compensation::{PtcCommand, SensorKind};
use samatala::workflow::LevelingParams;
use serde::Deserialize;

use crate::error::Result;

/// A scenario loaded from YAML
#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    /// Human-readable scenario name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: String,

    /// Steps in order
    pub steps: Vec<Step>,
}

/// One scenario step
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Run one leveling invocation
    Command {
        /// Command words
        words: LevelingParams,
        /// The command must be rejected
        #[serde(default)]
        expect_error: bool,
    },
    /// Answer the waiting prompt with a height
    Operator {
        /// Nozzle height or edit value (mm)
        z: f32,
    },
    /// Answer every remaining prompt with the true bed height under the
    /// nozzle plus `offset`
    OperatorAll {
        /// Added to each answer (mm)
        #[serde(default)]
        offset: f32,
        /// Thickness of the shim the operator measures on (mm)
        #[serde(default = "default_shim")]
        shim: f32,
    },
    /// Turn the encoder and apply the clicks
    Encoder {
        /// Signed click count
        clicks: i32,
    },
    /// Accept the current height or edit value
    Confirm,
    /// Abandon the waiting phase
    Abort,
    /// Request cancellation after more probes
    CancelAfter {
        /// Probes before the request
        probes: usize,
    },
    /// Withdraw a cancellation request
    ClearCancel,
    /// Set a sensor temperature
    SetTemperature {
        /// Sensor
        sensor: SensorKind,
        /// Temperature (°C)
        temp: f32,
    },
    /// Calibrate a sensor by probing one point at each table temperature
    Calibrate {
        /// Sensor to calibrate
        sensor: SensorKind,
        /// Probe X
        x: f32,
        /// Probe Y
        y: f32,
        /// Samples after the reference; the whole table when absent
        #[serde(default)]
        samples: Option<usize>,
    },
    /// Compensation table maintenance
    Ptc {
        /// Command to apply
        command: PtcCommand,
    },
    /// Compare defined mesh cells with the true bed
    CheckMesh {
        /// Largest accepted deviation (mm)
        tolerance: f32,
        /// Require every cell to be defined
        #[serde(default)]
        complete: bool,
    },
}

fn default_shim() -> f32 {
    0.1
}

impl Step {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Step::Command { .. } => "command",
            Step::Operator { .. } => "operator",
            Step::OperatorAll { .. } => "operator_all",
            Step::Encoder { .. } => "encoder",
            Step::Confirm => "confirm",
            Step::Abort => "abort",
            Step::CancelAfter { .. } => "cancel_after",
            Step::ClearCancel => "clear_cancel",
            Step::SetTemperature { .. } => "set_temperature",
            Step::Calibrate { .. } => "calibrate",
            Step::Ptc { .. } => "ptc",
            Step::CheckMesh { .. } => "check_mesh",
        }
    }
}

impl Scenario {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
