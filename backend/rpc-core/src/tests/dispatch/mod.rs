//! Dispatcher tests driven through `Dispatcher::dispatch` without a socket.

mod headers;
mod ordering;
mod pipeline;

use crate::config::ServerConfig;
use crate::dispatch::headers::{
    CLIENT_TOKEN_HEADER, KEY_EXCHANGE_METHOD, MESSAGE_SEQUENCE_HEADER, MESSAGE_SIGNATURE_HEADER,
    REQUEST_METHOD_HEADER,
};
use crate::dispatch::{Dispatcher, HandlerResult, Reply, RequestContext, RpcHeaders};
use crate::error::HandlerError;
use crate::session::SessionRegistry;

use common::ErrorLocation;
use models::response_header::new_response_header;
use models::{IdRequest, IdResponse, KeyExchangeRequest, KeyExchangeResponse, RequestHeader};

use std::panic::Location;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use bytes::Bytes;
use ed25519_dalek::{SECRET_KEY_LENGTH, Signature, Signer, SigningKey, Verifier, VerifyingKey};
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::{HeaderMap, Method, Request, Response};
use prost::Message;
use rand::RngCore;
use rand::rngs::OsRng;

pub(super) const ECHO_METHOD: &str = "Echo";
pub(super) const FAILING_METHOD: &str = "Explode";

/// Decodes an `IdRequest` and echoes its id.
fn echo<'a>(
    _registry: &'a SessionRegistry,
    payload: &'a [u8],
    _context: &'a mut RequestContext,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        let request = IdRequest::decode(payload).map_err(|e| HandlerError::Handler {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Reply::message(&IdResponse {
            header: Some(new_response_header()),
            id: request.id,
        }))
    })
}

fn explode<'a>(
    _registry: &'a SessionRegistry,
    _payload: &'a [u8],
    _context: &'a mut RequestContext,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        Err(HandlerError::Handler {
            message: String::from("boil-over"),
            location: ErrorLocation::from(Location::caller()),
        })
    })
}

pub(super) fn test_dispatcher(reorder_window: Duration) -> Dispatcher {
    let config = ServerConfig::default().with_reorder_window(reorder_window);
    let mut dispatcher = Dispatcher::new(&config);
    dispatcher.register_handler(ECHO_METHOD, echo);
    dispatcher.register_handler(FAILING_METHOD, explode);
    dispatcher
}

pub(super) fn id_payload(id: &str) -> Vec<u8> {
    IdRequest {
        header: Some(RequestHeader {
            method: String::from(ECHO_METHOD),
        }),
        id: String::from(id),
    }
    .encode_to_vec()
}

/// Splits a response into its headers and base64-decoded payload.
pub(super) async fn open(response: Response<Full<Bytes>>) -> (HeaderMap, Vec<u8>) {
    let (parts, body) = response.into_parts();
    let body = body.collect().await.expect("full body").to_bytes();
    let payload = STANDARD.decode(&body).expect("base64 body");
    (parts.headers, payload)
}

pub(super) fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .expect("ascii header")
}

/// A front-end stand-in holding its own key pair and session state.
pub(super) struct TestClient {
    key: SigningKey,
    pub(super) token: Option<String>,
    pub(super) server_key: Option<VerifyingKey>,
    next_sequence: i32,
}

impl TestClient {
    pub(super) fn new() -> Self {
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        OsRng.fill_bytes(&mut secret);

        Self {
            key: SigningKey::from_bytes(&secret),
            token: None,
            server_key: None,
            next_sequence: 2,
        }
    }

    /// URL-safe base64 of a `KeyExchangeRequest` carrying this client's key.
    pub(super) fn key_exchange_envelope(&self) -> Vec<u8> {
        let request = KeyExchangeRequest {
            header: Some(RequestHeader {
                method: String::from(KEY_EXCHANGE_METHOD),
            }),
            public_key: self.key.verifying_key().to_bytes().to_vec(),
        };
        URL_SAFE.encode(request.encode_to_vec()).into_bytes()
    }

    pub(super) fn key_exchange_request(&self) -> Request<Bytes> {
        self.build(KEY_EXCHANGE_METHOD, &self.key_exchange_envelope(), 1, &self.key)
    }

    /// Performs the key exchange and adopts the returned token and key.
    pub(super) async fn handshake(&mut self, dispatcher: &Dispatcher) -> KeyExchangeResponse {
        let response = dispatcher
            .dispatch(self.key_exchange_request())
            .await
            .expect("key exchange should be answered");
        let (headers, payload) = open(response).await;
        let message = KeyExchangeResponse::decode(payload.as_slice()).expect("decode response");

        let server_key = VerifyingKey::from_bytes(
            message
                .public_key
                .as_slice()
                .try_into()
                .expect("32-byte server key"),
        )
        .expect("valid server key");
        assert!(verify_response(&headers, &payload, &server_key));

        self.token = Some(message.token.clone());
        self.server_key = Some(server_key);
        self.next_sequence = 2;
        message
    }

    /// Signed request with the next sequence number.
    pub(super) fn request(&mut self, method: &str, payload: &[u8]) -> Request<Bytes> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.request_with_sequence(method, payload, sequence)
    }

    pub(super) fn request_with_sequence(
        &self,
        method: &str,
        payload: &[u8],
        sequence: i32,
    ) -> Request<Bytes> {
        self.build(method, payload, sequence, &self.key)
    }

    /// Request signed with someone else's key.
    pub(super) fn forged_request(&self, method: &str, payload: &[u8], sequence: i32) -> Request<Bytes> {
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        OsRng.fill_bytes(&mut secret);
        self.build(method, payload, sequence, &SigningKey::from_bytes(&secret))
    }

    fn build(&self, method: &str, payload: &[u8], sequence: i32, key: &SigningKey) -> Request<Bytes> {
        let signature = key.sign(payload);

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/rpc")
            .header(REQUEST_METHOD_HEADER, method)
            .header(MESSAGE_SIGNATURE_HEADER, hex::encode(signature.to_bytes()))
            .header(MESSAGE_SEQUENCE_HEADER, sequence.to_string());

        if let Some(ref token) = self.token {
            builder = builder.header(CLIENT_TOKEN_HEADER, token);
        }

        builder
            .body(Bytes::from(hex::encode(payload)))
            .expect("valid request")
    }

    /// Checks a response signature against the key from the key exchange.
    pub(super) fn verifies(&self, headers: &HeaderMap, payload: &[u8]) -> bool {
        let server_key = self.server_key.as_ref().expect("handshake first");
        verify_response(headers, payload, server_key)
    }
}

fn verify_response(headers: &HeaderMap, payload: &[u8], key: &VerifyingKey) -> bool {
    let signature = STANDARD
        .decode(header(headers, MESSAGE_SIGNATURE_HEADER))
        .expect("base64 signature");
    let signature = Signature::from_slice(&signature).expect("64-byte signature");
    key.verify(payload, &signature).is_ok()
}

/// Bare request carrying only the given headers.
pub(super) fn raw_request(method: Method, path: &str, headers: &[(&str, &str)]) -> Request<Bytes> {
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::new()).expect("valid request")
}

pub(super) fn parse(headers: &[(&str, &str)]) -> Result<RpcHeaders, crate::dispatch::RejectReason> {
    let request = raw_request(Method::POST, "/rpc", headers);
    RpcHeaders::parse(request.headers())
}
