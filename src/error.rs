//! Error types for pamgate.

use thiserror::Error;

/// Common error type for pamgate.
///
/// Only setup paths (configuration, logging, oracle construction) produce
/// these. Login evaluation itself never fails.
#[derive(Error, Debug)]
pub enum GateError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration values or user input.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for pamgate operations.
pub type Result<T> = std::result::Result<T, GateError>;
