//! Error types for the heart rate monitor library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters or malformed frame data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The frame source could not be acquired or started
    #[error("Frame source error: {0}")]
    FrameSource(String),

    /// Estimator construction or processing error
    #[error("Estimator error: {0}")]
    EstimatorError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
