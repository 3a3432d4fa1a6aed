use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Misuse of a [`SessionToken`](crate::SessionToken).
#[derive(Debug, ThisError)]
pub enum TokenError {
    /// Tokens leave the process only through the key exchange response,
    /// never through a serializer.
    #[error("Token Exposure Error: {message} {location}")]
    Exposure {
        message: String,
        location: ErrorLocation,
    },
}
