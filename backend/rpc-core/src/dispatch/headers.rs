//! RPC metadata carried in HTTP headers.

use common::SessionToken;

use hyper::HeaderMap;

use crate::dispatch::reject::RejectReason;

pub const REQUEST_METHOD_HEADER: &str = "Request-Method";
pub const CLIENT_TOKEN_HEADER: &str = "Client-Token";
pub const MESSAGE_SIGNATURE_HEADER: &str = "Message-Signature";
pub const MESSAGE_SEQUENCE_HEADER: &str = "Message-Sequence";

pub const KEY_EXCHANGE_METHOD: &str = "KeyExchange";
pub const SERVICE_READY_METHOD: &str = "SERVICE-READY";

/// How the dispatcher authenticates a request, decided by its method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Unauthenticated liveness probe.
    Liveness,
    /// Key exchange: no token, signature checked after the handler runs.
    Handshake,
    /// Everything else: token, sequence and signature all required.
    Authenticated,
}

impl RequestKind {
    pub fn for_method(method: &str) -> Self {
        match method {
            SERVICE_READY_METHOD => RequestKind::Liveness,
            KEY_EXCHANGE_METHOD => RequestKind::Handshake,
            _ => RequestKind::Authenticated,
        }
    }
}

/// Parsed request metadata.
#[derive(Debug, Clone)]
pub struct RpcHeaders {
    pub method: String,
    pub kind: RequestKind,
    pub token: Option<SessionToken>,
    /// Raw Ed25519 signature bytes, hex-decoded from `Message-Signature`.
    pub signature: Vec<u8>,
    pub sequence: i32,
}

impl RpcHeaders {
    /// Headers for a liveness probe; nothing beyond the method is read.
    pub fn liveness(method: String) -> Self {
        Self {
            method,
            kind: RequestKind::Liveness,
            token: None,
            signature: Vec::new(),
            sequence: 0,
        }
    }

    /// Parses every header the request kind requires.
    ///
    /// Missing and empty headers are treated alike. Nothing here consults the
    /// session registry; token lookup and counters are the dispatcher's job.
    pub fn parse(headers: &HeaderMap) -> Result<Self, RejectReason> {
        let method = required(headers, REQUEST_METHOD_HEADER)?.to_owned();
        let kind = RequestKind::for_method(&method);

        if kind == RequestKind::Liveness {
            return Ok(Self::liveness(method));
        }

        let token = match kind {
            RequestKind::Authenticated => Some(SessionToken::new(
                required(headers, CLIENT_TOKEN_HEADER)?.to_owned(),
            )),
            _ => None,
        };

        let signature = hex::decode(required(headers, MESSAGE_SIGNATURE_HEADER)?).map_err(|e| {
            RejectReason::MalformedHeader {
                header: MESSAGE_SIGNATURE_HEADER,
                reason: e.to_string(),
            }
        })?;

        let sequence = required(headers, MESSAGE_SEQUENCE_HEADER)?
            .parse::<i32>()
            .map_err(|e| RejectReason::MalformedHeader {
                header: MESSAGE_SEQUENCE_HEADER,
                reason: e.to_string(),
            })?;

        Ok(Self {
            method,
            kind,
            token,
            signature,
            sequence,
        })
    }
}

fn required<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, RejectReason> {
    let value = headers
        .get(name)
        .ok_or(RejectReason::MissingHeader { header: name })?
        .to_str()
        .map_err(|e| RejectReason::MalformedHeader {
            header: name,
            reason: e.to_string(),
        })?;

    if value.is_empty() {
        return Err(RejectReason::MissingHeader { header: name });
    }

    Ok(value)
}
