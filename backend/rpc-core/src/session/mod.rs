//! Per-client session state.
//!
//! A [`Session`] binds a bearer token to its sequence counters and key
//! material. Sessions are created only by the key exchange handler and are
//! mutated afterwards only by the dispatcher (counter updates).

mod registry;

pub use registry::{SessionRef, SessionRegistry};

use crate::error::session::SessionError;

use common::SessionToken;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use ed25519_dalek::{SECRET_KEY_LENGTH, SigningKey, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;

pub const TOKEN_BYTES: usize = 32;

/// `recv_counter` right after a handshake; the handshake itself counts as 1.
pub const INITIAL_RECV_COUNTER: i32 = 1;
pub const INITIAL_SEND_COUNTER: i32 = 0;

pub struct Session {
    token: SessionToken,
    /// Sequence number of the last accepted request.
    pub recv_counter: i32,
    /// Sequence number of the last sent response.
    pub send_counter: i32,
    sign_key: SigningKey,
    /// Client-supplied Ed25519 public key, stored unvalidated.
    verify_key: Vec<u8>,
}

impl Session {
    /// Fresh session with a random token and signing key.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if the OS random source fails.
    pub(crate) fn generate(verify_key: Vec<u8>) -> Result<Self, SessionError> {
        let mut token_bytes = [0u8; TOKEN_BYTES];
        OsRng.try_fill_bytes(&mut token_bytes)?;

        let mut secret = [0u8; SECRET_KEY_LENGTH];
        OsRng.try_fill_bytes(&mut secret)?;

        Ok(Self {
            token: SessionToken::new(URL_SAFE.encode(token_bytes)),
            recv_counter: INITIAL_RECV_COUNTER,
            send_counter: INITIAL_SEND_COUNTER,
            sign_key: SigningKey::from_bytes(&secret),
            verify_key,
        })
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn sign_key(&self) -> &SigningKey {
        &self.sign_key
    }

    /// Public half of the signing key, sent to the client during key exchange.
    pub fn public_sign_key(&self) -> VerifyingKey {
        self.sign_key.verifying_key()
    }

    pub fn verify_key(&self) -> &[u8] {
        &self.verify_key
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("recv_counter", &self.recv_counter)
            .field("send_counter", &self.send_counter)
            .field("verify_key_len", &self.verify_key.len())
            .finish_non_exhaustive()
    }
}
