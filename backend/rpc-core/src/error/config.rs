use common::ErrorLocation;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Directory Not Found Error: {message} {location}")]
    DirectoryNotFound {
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Validation Error: {reason} {location}")]
    ValidationError {
        location: ErrorLocation,
        reason: String,
    },
}
