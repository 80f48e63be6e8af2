//! Error types for the simulator

use samatala::io::StorageError;

/// Result type alias
pub type Result<T> = std::result::Result<T, SimError>;

/// Simulator error types
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration or scenario file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration values are unusable
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The leveling workflow rejected or failed a step
    #[error("Leveling error: {0}")]
    Leveling(#[from] samatala::Error),

    /// Mesh slot image could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A scenario step cannot run in the current state
    #[error("Scenario step {step}: {message}")]
    Scenario {
        /// 1-based step number
        step: usize,
        /// What went wrong
        message: String,
    },
}
