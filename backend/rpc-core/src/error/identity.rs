use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IdentityError {
    #[error("Hostname Error: {message} {location}")]
    Hostname {
        message: String,
        location: ErrorLocation,
    },

    #[error("Serial Number Error: {message} {location}")]
    SerialNumber {
        message: String,
        location: ErrorLocation,
    },

    #[error("Certificate Error: {message} {location}")]
    Certificate {
        message: String,
        location: ErrorLocation,
    },

    #[error("TLS Config Error: {message} {location}")]
    Tls {
        message: String,
        location: ErrorLocation,
    },

    #[error("Certificate Write Error: {path}: {source} {location}")]
    Persist {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<rcgen::Error> for IdentityError {
    #[track_caller]
    fn from(error: rcgen::Error) -> Self {
        IdentityError::Certificate {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<rustls::Error> for IdentityError {
    #[track_caller]
    fn from(error: rustls::Error) -> Self {
        IdentityError::Tls {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
