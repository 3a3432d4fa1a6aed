//! The `KeyExchange` handler, the only way a session comes into existence.

use crate::dispatch::{HandlerResult, Reply, RequestContext};
use crate::session::SessionRegistry;

use common::Code;
use models::response_header::{new_response_header, set_rpc_error};
use models::{KeyExchangeRequest, KeyExchangeResponse, ResponseHeader};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use futures_util::future::BoxFuture;
use log::{info, warn};
use prost::Message;

/// Decodes the client's public key, creates and registers a session, and
/// replies with the server's public key and the new token.
///
/// The request payload is URL-safe base64 of the binary `KeyExchangeRequest`
/// (on top of the hex layer the dispatcher already removed). Decode and key
/// generation failures come back as an rpc error in the response header; no
/// session is registered in that case.
pub fn key_exchange<'a>(
    registry: &'a SessionRegistry,
    payload: &'a [u8],
    context: &'a mut RequestContext,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        let mut response = KeyExchangeResponse {
            header: Some(new_response_header()),
            ..Default::default()
        };

        let request = match decode_request(payload) {
            Ok(request) => request,
            Err(reason) => {
                warn!("Error decoding key exchange request: {reason}");
                set_rpc_error(header_mut(&mut response), Code::Decode);
                return Ok(Reply::message(&response));
            }
        };

        let session = match registry.create(request.public_key) {
            Ok(session) => session,
            Err(e) => {
                warn!("Error creating session: {e}");
                set_rpc_error(header_mut(&mut response), Code::Crypto);
                return Ok(Reply::message(&response));
            }
        };

        response.public_key = session.public_sign_key().to_bytes().to_vec();
        response.token = session.token().as_str().to_owned();

        let session_ref = registry.register(session).await?;
        context.attach_session(session_ref).await;

        info!("Key exchange completed");
        Ok(Reply::message(&response))
    })
}

fn decode_request(payload: &[u8]) -> Result<KeyExchangeRequest, String> {
    let bytes = URL_SAFE.decode(payload).map_err(|e| e.to_string())?;
    KeyExchangeRequest::decode(bytes.as_slice()).map_err(|e| e.to_string())
}

fn header_mut(response: &mut KeyExchangeResponse) -> &mut ResponseHeader {
    response.header.get_or_insert_with(new_response_header)
}
