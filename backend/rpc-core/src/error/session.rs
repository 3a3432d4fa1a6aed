use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SessionError {
    /// Secure randomness or key generation was unavailable.
    #[error("Crypto Error: {message} {location}")]
    Crypto {
        message: String,
        location: ErrorLocation,
    },

    #[error("Duplicate Token Error: {message} {location}")]
    DuplicateToken {
        message: String,
        location: ErrorLocation,
    },
}

impl From<rand::Error> for SessionError {
    #[track_caller]
    fn from(error: rand::Error) -> Self {
        SessionError::Crypto {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
