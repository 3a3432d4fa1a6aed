//! Error taxonomy shared between the backend and the front-end.
//!
//! Every failure that crosses the RPC boundary is reported as a
//! `(scope, code, type)` triple plus a short message. The numeric values are
//! part of the wire contract: the front-end decodes `ResponseHeader.scope` and
//! `ResponseHeader.code` straight into its own enums, so variants may only
//! ever be appended.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error as ThisError;

pub const STATUS_OK: &str = "OK";
pub const STATUS_SYSTEM_ERROR: &str = "SYSTEM_ERROR";
pub const STATUS_APP_ERROR: &str = "APP_ERROR";

/// Subsystem an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Scope {
    General = 0,
    Api = 1,
    Db = 2,
    Rpc = 3,
}

impl Scope {
    pub fn label(self) -> &'static str {
        match self {
            Scope::General => "general",
            Scope::Api => "api",
            Scope::Db => "db",
            Scope::Rpc => "rpc",
        }
    }
}

impl From<Scope> for i32 {
    fn from(scope: Scope) -> Self {
        scope as i32
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i32)
    }
}

/// Whether an error is an internal failure or a recoverable application one.
///
/// Wrong credentials are `Application`; a failed key derivation is `System`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorType {
    Ok = 0,
    System = 1,
    Application = 2,
}

impl ErrorType {
    /// Short status string written to `ResponseHeader.status`.
    pub fn status(self) -> &'static str {
        match self {
            ErrorType::Ok => STATUS_OK,
            ErrorType::System => STATUS_SYSTEM_ERROR,
            ErrorType::Application => STATUS_APP_ERROR,
        }
    }
}

/// Closed set of error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Code {
    Ok = 0,
    Unknown = 1,
    /// A non-taxonomy error tried to escape the RPC boundary.
    InternalEscape = 2,
    Unauthorized = 3,
    InvalidType = 4,
    Marshal = 5,
    OpenKey = 6,
    Encrypt = 7,
    Decrypt = 8,
    Crypto = 9,
    WriteBucket = 10,
    Save = 11,
    BucketMissing = 12,
    Decode = 13,
    DeriveKey = 14,
    ConvertId = 15,
    Lookup = 16,
    Load = 17,
    LoadAll = 18,
    Delete = 19,
    Create = 20,
    RecordMissing = 21,
}

impl Code {
    pub fn label(self) -> &'static str {
        match self {
            Code::Ok | Code::Unknown => "unknown internal error",
            Code::InternalEscape => "internal error escape",
            Code::Unauthorized => "error unauthorized",
            Code::InvalidType => "error invalid type",
            Code::Marshal => "error marshaling",
            Code::OpenKey => "error retrieving key",
            Code::Encrypt => "error encrypting",
            Code::Decrypt => "error decrypting",
            Code::Crypto => "cryptography error",
            Code::WriteBucket => "error writing to bucket",
            Code::Save => "error saving",
            Code::BucketMissing => "error bucket missing",
            Code::Decode => "error decoding",
            Code::DeriveKey => "error deriving key",
            Code::ConvertId => "error converting id",
            Code::Lookup => "error looking up",
            Code::Load => "error loading",
            Code::LoadAll => "error loading all",
            Code::Delete => "error deleting",
            Code::Create => "error creating",
            Code::RecordMissing => "error missing record",
        }
    }
}

impl From<Code> for i32 {
    fn from(code: Code) -> Self {
        code as i32
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i32)
    }
}

/// A taxonomy error: the only error shape allowed to reach a response header.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub scope: Scope,
    pub code: Code,
    pub error_type: ErrorType,
    pub message: String,
}

impl InternalError {
    /// System-level error with the default message for `scope` and `code`.
    pub fn new(scope: Scope, code: Code) -> Self {
        Self::with_type(scope, code, ErrorType::System)
    }

    /// Recoverable application-level error.
    pub fn application(scope: Scope, code: Code) -> Self {
        Self::with_type(scope, code, ErrorType::Application)
    }

    fn with_type(scope: Scope, code: Code, error_type: ErrorType) -> Self {
        Self {
            scope,
            code,
            error_type,
            message: format!("{} - {}", scope.label(), code.label()),
        }
    }

    /// Stable numeric `(scope, code)` pair for the wire.
    pub fn numeric(&self) -> (i32, i32) {
        (self.scope.into(), self.code.into())
    }

    pub fn status(&self) -> &'static str {
        self.error_type.status()
    }

    pub fn is_internal_error(error: &(dyn StdError + 'static)) -> bool {
        error.downcast_ref::<InternalError>().is_some()
    }
}

/// Coerces any error into the taxonomy.
///
/// Taxonomy errors pass through unchanged; anything else becomes
/// `general / InternalEscape`.
pub fn to_internal_error(error: &(dyn StdError + 'static)) -> InternalError {
    match error.downcast_ref::<InternalError>() {
        Some(internal) => internal.clone(),
        None => InternalError::new(Scope::General, Code::InternalEscape),
    }
}
