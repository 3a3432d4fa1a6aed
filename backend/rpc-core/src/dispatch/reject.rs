//! Transport-level rejects.
//!
//! A reject means the request gets no response at all: hyper closes the
//! connection without writing a status line. This is the fail-silent channel
//! for anything that may indicate tampering or probing. Application-level
//! failures never use it; they travel inside a successful response header.

use crate::error::handler::HandlerError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RejectReason {
    #[error("Unexpected request method {method}")]
    MethodNotAllowed { method: String },

    #[error("Unexpected request path {path}")]
    UnknownPath { path: String },

    #[error("Missing request header {header}")]
    MissingHeader { header: &'static str },

    #[error("Malformed request header {header}: {reason}")]
    MalformedHeader {
        header: &'static str,
        reason: String,
    },

    #[error("Invalid client token")]
    UnknownToken,

    #[error("Invalid message sequence: expected {expected} but got {received}")]
    SequenceMismatch { expected: i32, received: i32 },

    #[error("No handler for method {method}")]
    UnknownMethod { method: String },

    #[error("Error reading request body: {reason}")]
    BodyRead { reason: String },

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Error decoding request body: {reason}")]
    BodyDecode { reason: String },

    #[error("Message verification failed for method {method}")]
    SignatureMismatch { method: String },

    #[error("Handler aborted request: {0}")]
    Handler(#[from] HandlerError),

    #[error("No session available to sign the response")]
    MissingSession,

    #[error("Error building response: {reason}")]
    Response { reason: String },
}
