//! Wire messages exchanged with the front-end.
//!
//! This crate contains pure data structures: the protobuf messages carried in
//! RPC request and response bodies, plus helpers for filling in the
//! structured error fields of a [`ResponseHeader`]. Handlers in `rpc-core`
//! build these; the front-end decodes them with its generated bindings.

pub mod proto;
pub mod response_header;

pub use proto::{
    EmptyRequest, EmptyResponse, IdRequest, IdResponse, KeyExchangeRequest, KeyExchangeResponse,
    RequestHeader, ResponseHeader,
};
