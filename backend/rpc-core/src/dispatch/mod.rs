//! Request validation and method routing.
//!
//! # Request pipeline
//!
//! 1. Only `POST /rpc` is served.
//! 2. Headers are parsed; the liveness probe short-circuits with `OK`.
//! 3. Authenticated methods look up their session by token, wait (bounded)
//!    for their turn, then advance `recv_counter` and require an exact match
//!    with `Message-Sequence`. A mismatch still consumes the counter value.
//! 4. The handler is looked up and the body is hex-decoded.
//! 5. Authenticated methods verify the payload signature before the handler
//!    runs; the key exchange verifies it afterwards, once the client key is
//!    known.
//! 6. The reply is base64-encoded, signed, and `send_counter` advanced.
//!
//! Every failure in this pipeline is a [`RejectReason`]: the caller closes the
//! connection without writing a response.

mod context;
mod handler;
pub mod headers;
mod reject;

pub use context::RequestContext;
pub use handler::{Handler, HandlerResult, Reply};
pub use headers::{RequestKind, RpcHeaders};
pub use reject::RejectReason;

use crate::auth;
use crate::config::ServerConfig;
use crate::handshake;
use crate::session::SessionRegistry;
use headers::{
    CLIENT_TOKEN_HEADER, KEY_EXCHANGE_METHOD, MESSAGE_SEQUENCE_HEADER, MESSAGE_SIGNATURE_HEADER, REQUEST_METHOD_HEADER,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};
use log::{debug, warn};
use uuid::Uuid;

pub const RPC_PATH: &str = "/rpc";

/// Body of a successful liveness probe.
pub const SERVICE_READY_RESPONSE: &str = "OK";

pub struct Dispatcher {
    registry: SessionRegistry,
    handlers: HashMap<String, Arc<dyn Handler>>,
    reorder_window: Duration,
}

impl Dispatcher {
    /// A dispatcher with only the key exchange handler registered.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_registry(config, SessionRegistry::new())
    }

    pub fn with_registry(config: &ServerConfig, registry: SessionRegistry) -> Self {
        let mut dispatcher = Self {
            registry,
            handlers: HashMap::new(),
            reorder_window: config.reorder_window,
        };
        dispatcher.register_handler(KEY_EXCHANGE_METHOD, handshake::key_exchange);
        dispatcher
    }

    /// Routes `method` to `handler`, replacing any previous registration.
    pub fn register_handler(&mut self, method: impl Into<String>, handler: impl Handler + 'static) {
        let method = method.into();
        debug!("Registering RPC handler [{method}]");
        self.handlers.insert(method, Arc::new(handler));
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        request: Request<Bytes>,
    ) -> Result<Response<Full<Bytes>>, RejectReason> {
        let request_id = Uuid::new_v4();

        if request.method() != Method::POST {
            return Err(RejectReason::MethodNotAllowed {
                method: request.method().to_string(),
            });
        }

        if request.uri().path() != RPC_PATH {
            return Err(RejectReason::UnknownPath {
                path: request.uri().path().to_owned(),
            });
        }

        let mut context = self.verify_headers(&request).await?;
        let method = context.headers.method.clone();
        let kind = context.headers.kind;
        debug!("[{request_id}] HTTP request for RPC method [{method}]");

        if kind == RequestKind::Liveness {
            return Ok(Response::new(Full::new(Bytes::from_static(
                SERVICE_READY_RESPONSE.as_bytes(),
            ))));
        }

        let handler = self
            .handlers
            .get(&method)
            .cloned()
            .ok_or_else(|| RejectReason::UnknownMethod {
                method: method.clone(),
            })?;

        let payload = hex::decode(request.body()).map_err(|e| RejectReason::BodyDecode {
            reason: e.to_string(),
        })?;

        if kind == RequestKind::Authenticated {
            self.verify_payload(&payload, &context)?;
        }

        let reply = handler
            .handle(&self.registry, &payload, &mut context)
            .await
            .inspect_err(|e| warn!("[{request_id}] Handler for [{method}] failed: {e}"))?;

        if kind == RequestKind::Handshake {
            self.verify_payload(&payload, &context)?;
        }

        let response = Self::emit(&reply, &mut context)?;
        debug!("[{request_id}] Responded to [{method}]");
        Ok(response)
    }

    /// Parses headers and, for authenticated methods, resolves the session and
    /// enforces the receive sequence. On success the session lock is held by
    /// the returned context.
    async fn verify_headers(&self, request: &Request<Bytes>) -> Result<RequestContext, RejectReason> {
        let headers = RpcHeaders::parse(request.headers())?;

        if headers.kind != RequestKind::Authenticated {
            return Ok(RequestContext::new(headers));
        }

        let Some(token) = headers.token.as_ref() else {
            return Err(RejectReason::MissingHeader {
                header: CLIENT_TOKEN_HEADER,
            });
        };

        let session_ref = self
            .registry
            .lookup(token.as_str())
            .await
            .ok_or(RejectReason::UnknownToken)?;

        let sequence = headers.sequence;
        if !session_ref.wait_for_turn(sequence, self.reorder_window).await {
            debug!("Sequence {sequence} did not become current within the reorder window");
        }

        let mut session = session_ref.lock().await;
        session.recv_counter = session.recv_counter.wrapping_add(1);
        let expected = session.recv_counter;
        session_ref.publish_received(expected);

        if sequence != expected {
            warn!("Invalid message sequence: expected {expected} but got {sequence}");
            return Err(RejectReason::SequenceMismatch {
                expected,
                received: sequence,
            });
        }

        let mut context = RequestContext::new(headers);
        context.attach_locked(session);
        Ok(context)
    }

    fn verify_payload(&self, payload: &[u8], context: &RequestContext) -> Result<(), RejectReason> {
        if auth::verify(payload, &context.headers.signature, context.session()) {
            return Ok(());
        }

        Err(RejectReason::SignatureMismatch {
            method: context.headers.method.clone(),
        })
    }

    fn emit(reply: &Reply, context: &mut RequestContext) -> Result<Response<Full<Bytes>>, RejectReason> {
        let method = context.headers.method.clone();
        let session = context.session_mut().ok_or(RejectReason::MissingSession)?;

        let signature = auth::sign(reply.payload(), session);
        session.send_counter = session.send_counter.wrapping_add(1);
        let sequence = session.send_counter;

        Response::builder()
            .status(StatusCode::OK)
            .header(MESSAGE_SIGNATURE_HEADER, signature)
            .header(MESSAGE_SEQUENCE_HEADER, sequence.to_string())
            .header(REQUEST_METHOD_HEADER, method)
            .body(Full::new(Bytes::from(STANDARD.encode(reply.payload()))))
            .map_err(|e| RejectReason::Response {
                reason: e.to_string(),
            })
    }
}
