//! Error types for the leveling core.
//!
//! Probe failures and undefined cells travel as `NaN` inside the numeric
//! code; everything that stops an operation surfaces here.

use thiserror::Error;

use crate::compensation::CalibrationError;
use crate::config::ConfigError;
use crate::core::XyPos;
use crate::fill::FillError;
use crate::fit::FitError;
use crate::io::StorageError;
use crate::workflow::ParamError;

/// Leveling error
#[derive(Debug, Error)]
pub enum Error {
    /// Mesh bounds or point counts are unusable
    #[error("Invalid mesh geometry: {0}")]
    Geometry(String),

    /// A command parameter was rejected before anything changed
    #[error(transparent)]
    Param(#[from] ParamError),

    /// A plane fit failed; nothing was applied
    #[error("Could not complete LSF: {0}")]
    Fit(#[from] FitError),

    /// Gap filling stopped
    #[error(transparent)]
    Fill(#[from] FillError),

    /// Temperature calibration failed or was misused
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Mesh slot storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration could not be used
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The probe returned no reading
    #[error("?Error probing point {0}. Aborting operation.")]
    ProbeFailed(XyPos),

    /// A requested position cannot be reached
    #[error("XY outside printable radius: {0}")]
    Unreachable(XyPos),

    /// Operator input arrived with no interactive phase waiting for it
    #[error("No leveling session is waiting for input")]
    NoActiveSession,

    /// Leveling could not be enabled because the correction model is incomplete
    #[error("Mesh is not valid for leveling")]
    MeshInvalid,
}

impl Error {
    /// Stable short code for host-side reporting
    pub fn code(&self) -> &'static str {
        match self {
            Error::Geometry(_) => "GEOMETRY",
            Error::Param(_) => "PARAM",
            Error::Fit(_) => "FIT",
            Error::Fill(_) => "FILL",
            Error::Calibration(_) => "PTC",
            Error::Storage(_) => "STORAGE",
            Error::Config(_) => "CONFIG",
            Error::ProbeFailed(_) => "PROBE",
            Error::Unreachable(_) => "UNREACHABLE",
            Error::NoActiveSession => "NO_SESSION",
            Error::MeshInvalid => "MESH_INVALID",
        }
    }

    /// True for rejections that left every piece of state untouched
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Param(_) | Error::Unreachable(_) | Error::NoActiveSession
        )
    }
}

/// Result alias for leveling operations
pub type Result<T> = std::result::Result<T, Error>;
