use crate::error::{ConfigError, IdentityError};

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ServerError {
    #[error("Bind Error: {address}: {source} {location}")]
    Bind {
        location: ErrorLocation,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
