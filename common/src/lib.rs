//! Shared building blocks for the BrewTheory backend.
//!
//! - [`ErrorLocation`]: call-site capture used by every error enum in the workspace
//! - [`codes`]: the closed error taxonomy carried in RPC response headers
//! - [`SessionToken`]: bearer token wrapper that never prints its value

pub mod codes;
pub mod error;
pub mod redacted_token;

pub use codes::{Code, ErrorType, InternalError, Scope};
pub use error::error_location::ErrorLocation;
pub use error::token_error::TokenError;
pub use redacted_token::SessionToken;
