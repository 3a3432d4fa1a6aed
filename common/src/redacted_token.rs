//! Session bearer token with redacted Debug output.

use crate::{ErrorLocation, TokenError};

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;

use serde::ser::Error;
use zeroize::Zeroize;

/// A session token that never exposes its value in logs or debug output.
///
/// Hashes and compares by value so it can key the session registry and be
/// looked up with a plain `&str` taken from the `Client-Token` header.
#[derive(Clone)]
pub struct SessionToken {
    inner: String,
}

impl SessionToken {
    pub fn new(token: String) -> Self {
        Self { inner: token }
    }

    /// The raw token, for handing to the client in the key exchange response.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl PartialEq for SessionToken {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for SessionToken {}

impl Hash for SessionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl Borrow<str> for SessionToken {
    fn borrow(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken([REDACTED])")
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED SESSION TOKEN]")
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl serde::Serialize for SessionToken {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(TokenError::Exposure {
            message: String::from("SessionToken cannot be serialized - use as_str() explicitly"),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
