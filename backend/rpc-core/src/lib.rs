//! Authenticated RPC core for the BrewTheory backend.
//!
//! - [`identity`]: self-signed TLS certificate generated on every start
//! - [`session`]: token-keyed sessions with sequence counters and key material
//! - [`handshake`]: the `KeyExchange` handler that creates sessions
//! - [`auth`]: Ed25519 signing and verification of message payloads
//! - [`dispatch`]: header validation, counter enforcement and method routing
//! - [`server`]: the TLS listener and lifecycle signals

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod identity;
pub mod server;
pub mod session;

#[cfg(test)]
mod tests;
