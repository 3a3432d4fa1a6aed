use crate::error::SessionError;

use common::{ErrorLocation, InternalError};

use thiserror::Error as ThisError;

/// Failure returned by an RPC handler.
///
/// Any handler error aborts the request without a response. Handlers that
/// want the client to see a failure encode it in the response header instead.
#[derive(Debug, ThisError)]
pub enum HandlerError {
    #[error("Handler Error: {message} {location}")]
    Handler {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
