//! Handler seam for RPC methods.

use crate::dispatch::context::RequestContext;
use crate::error::handler::HandlerError;
use crate::session::SessionRegistry;

use futures_util::future::BoxFuture;

/// Serialized response message produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    payload: Vec<u8>,
}

impl Reply {
    pub fn message<M: prost::Message>(message: &M) -> Self {
        Self {
            payload: message.encode_to_vec(),
        }
    }

    /// Binary wire form; this exact byte string is what gets signed.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

pub type HandlerResult = Result<Reply, HandlerError>;

/// An RPC method implementation.
///
/// Receives the hex-decoded request payload. Returning `Err` aborts the
/// request without a response; errors the client should see belong in the
/// response message's `ResponseHeader`.
///
/// Implemented for any function shaped like
/// `fn(&SessionRegistry, &[u8], &mut RequestContext) -> BoxFuture<HandlerResult>`.
pub trait Handler: Send + Sync {
    fn handle<'a>(
        &'a self,
        registry: &'a SessionRegistry,
        payload: &'a [u8],
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a SessionRegistry, &'a [u8], &'a mut RequestContext) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        registry: &'a SessionRegistry,
        payload: &'a [u8],
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult> {
        self(registry, payload, context)
    }
}
