//! Message-level signing and verification, independent of the TLS channel.
//!
//! Signatures cover only the payload bytes. Method, sequence and token headers
//! are unauthenticated metadata; replay protection comes from the sequence
//! counters alone.

use crate::session::Session;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};
use log::warn;

/// Signs the exact serialized response bytes with the session's key and
/// encodes the signature for the `Message-Signature` header.
pub fn sign(payload: &[u8], session: &Session) -> String {
    let signature = session.sign_key().sign(payload);
    STANDARD.encode(signature.to_bytes())
}

/// Verifies `signature` over the exact raw request bytes with the client key
/// stored in `session`.
///
/// Fails closed: no session, a malformed client key or a malformed signature
/// all yield `false`.
pub fn verify(payload: &[u8], signature: &[u8], session: Option<&Session>) -> bool {
    let Some(session) = session else {
        warn!("Request context has no session when verifying request");
        return false;
    };

    let key_bytes: [u8; 32] = match session.verify_key().try_into() {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(
                "Client verification key has invalid length {}",
                session.verify_key().len()
            );
            return false;
        }
    };

    let verifying_key = match VerifyingKey::from_bytes(&key_bytes) {
        Ok(key) => key,
        Err(e) => {
            warn!("Client verification key is not a valid point: {e}");
            return false;
        }
    };

    let signature = match Signature::from_slice(signature) {
        Ok(signature) => signature,
        Err(e) => {
            warn!("Malformed request signature: {e}");
            return false;
        }
    };

    match verifying_key.verify(payload, &signature) {
        Ok(()) => true,
        Err(_) => {
            warn!(
                "Request payload signature could not be verified ({} bytes)",
                payload.len()
            );
            false
        }
    }
}
