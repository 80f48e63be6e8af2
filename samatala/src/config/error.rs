//! Configuration loading errors.

use thiserror::Error;

/// Config load or validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Values parse but describe an impossible setup
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
