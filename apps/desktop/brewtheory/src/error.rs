use common::ErrorLocation;

use thiserror::Error;

/// Errors that stop the backend process before or while it serves.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Log sink could not be configured
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    /// Command-line value rejected after parsing
    #[error("Argument Error: {message} {location}")]
    Argument {
        message: String,
        location: ErrorLocation,
    },
}
