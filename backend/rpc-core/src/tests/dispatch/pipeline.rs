use super::{
    ECHO_METHOD, FAILING_METHOD, TestClient, header, id_payload, open, raw_request,
    test_dispatcher,
};
use crate::dispatch::headers::{
    MESSAGE_SEQUENCE_HEADER, MESSAGE_SIGNATURE_HEADER, REQUEST_METHOD_HEADER,
};
use crate::dispatch::{RejectReason, SERVICE_READY_RESPONSE};

use models::IdResponse;
use models::response_header::is_ok;

use std::time::Duration;

use http_body_util::BodyExt;
use hyper::{Method, StatusCode};
use prost::Message;

const WINDOW: Duration = Duration::from_millis(50);

/// **VALUE**: The liveness probe answers `OK` without any authentication.
///
/// **WHY THIS MATTERS**: The front-end polls this before it has a session.
///
/// **BUG THIS CATCHES**: Would catch the probe being routed through the token check, or
/// a signature/sequence leaking onto an unauthenticated response.
#[tokio::test]
async fn given_service_ready_probe_when_dispatched_then_returns_ok_unsigned() {
    // GIVEN
    let dispatcher = test_dispatcher(WINDOW);
    let request = raw_request(
        Method::POST,
        "/rpc",
        &[(REQUEST_METHOD_HEADER, "SERVICE-READY")],
    );

    // WHEN
    let response = dispatcher.dispatch(request).await.expect("probe answered");

    // THEN
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(MESSAGE_SIGNATURE_HEADER).is_none());
    assert!(response.headers().get(MESSAGE_SEQUENCE_HEADER).is_none());
    let body = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&body[..], SERVICE_READY_RESPONSE.as_bytes());
}

/// **VALUE**: Anything other than `POST /rpc` is rejected.
#[tokio::test]
async fn given_wrong_verb_or_path_when_dispatched_then_rejects() {
    let dispatcher = test_dispatcher(WINDOW);
    let probe = [(REQUEST_METHOD_HEADER, "SERVICE-READY")];

    let result = dispatcher
        .dispatch(raw_request(Method::GET, "/rpc", &probe))
        .await;
    assert!(matches!(result, Err(RejectReason::MethodNotAllowed { .. })));

    let result = dispatcher
        .dispatch(raw_request(Method::POST, "/", &probe))
        .await;
    assert!(matches!(result, Err(RejectReason::UnknownPath { .. })));
}

/// **VALUE**: A key exchange is answered with a signed response and the echoed method.
///
/// **BUG THIS CATCHES**: Would catch the first response using the wrong send sequence,
/// or signing the base64 text instead of the serialized message.
#[tokio::test]
async fn given_key_exchange_when_dispatched_then_response_is_signed_with_session_key() {
    // GIVEN
    let dispatcher = test_dispatcher(WINDOW);
    let client = TestClient::new();

    // WHEN
    let response = dispatcher
        .dispatch(client.key_exchange_request())
        .await
        .expect("key exchange answered");
    let (headers, payload) = open(response).await;

    // THEN
    assert_eq!(header(&headers, REQUEST_METHOD_HEADER), "KeyExchange");
    assert_eq!(header(&headers, MESSAGE_SEQUENCE_HEADER), "1");
    let message = models::KeyExchangeResponse::decode(payload.as_slice()).expect("decode");
    assert!(is_ok(message.header.as_ref().expect("header")));
    assert_eq!(dispatcher.registry().len().await, 1);
}

/// **VALUE**: End-to-end happy path: key exchange, then a signed call with sequence 2.
///
/// **WHY THIS MATTERS**: This is the protocol every front-end request follows.
///
/// **BUG THIS CATCHES**: Would catch the stored client key not being used for
/// verification, off-by-one counters, or responses the client cannot verify.
#[tokio::test]
async fn given_session_when_calling_with_next_sequence_then_accepted_and_verifiable() {
    // GIVEN: A client that completed the key exchange
    let dispatcher = test_dispatcher(WINDOW);
    let mut client = TestClient::new();
    client.handshake(&dispatcher).await;

    // WHEN: It calls Echo with sequence 2
    let request = client.request(ECHO_METHOD, &id_payload("ipa-42"));
    let response = dispatcher.dispatch(request).await.expect("accepted");
    let (headers, payload) = open(response).await;

    // THEN: The response verifies and carries send sequence 2
    assert!(client.verifies(&headers, &payload));
    assert_eq!(header(&headers, MESSAGE_SEQUENCE_HEADER), "2");
    assert_eq!(header(&headers, REQUEST_METHOD_HEADER), ECHO_METHOD);

    let message = IdResponse::decode(payload.as_slice()).expect("decode");
    assert_eq!(message.id, "ipa-42");

    // THEN: Counters advanced on the shared session
    let token = client.token.clone().expect("token");
    let session_ref = dispatcher.registry().lookup(&token).await.expect("session");
    let session = session_ref.lock().await;
    assert_eq!(session.recv_counter, 2);
    assert_eq!(session.send_counter, 2);
}

/// **VALUE**: Unknown tokens are dropped without a response.
#[tokio::test]
async fn given_unknown_token_when_calling_then_rejects() {
    let dispatcher = test_dispatcher(WINDOW);
    let mut client = TestClient::new();
    client.token = Some(String::from("forged-token"));

    let result = dispatcher
        .dispatch(client.request(ECHO_METHOD, &id_payload("x")))
        .await;

    assert!(matches!(result, Err(RejectReason::UnknownToken)));
}

/// **VALUE**: Requests signed with the wrong key are dropped.
///
/// **BUG THIS CATCHES**: Would catch verification against the server's own key or
/// skipping verification for non-handshake methods.
#[tokio::test]
async fn given_forged_signature_when_calling_then_rejects() {
    let dispatcher = test_dispatcher(WINDOW);
    let mut client = TestClient::new();
    client.handshake(&dispatcher).await;

    let result = dispatcher
        .dispatch(client.forged_request(ECHO_METHOD, &id_payload("x"), 2))
        .await;

    assert!(matches!(result, Err(RejectReason::SignatureMismatch { .. })));
}

/// **VALUE**: A wrong sequence is rejected but still consumes the counter value.
///
/// **WHY THIS MATTERS**: The counter advances regardless of outcome; a client that
/// skipped a number must resynchronize on the consumed value.
///
/// **BUG THIS CATCHES**: Would catch the counter only advancing on success, which would
/// let an attacker probe sequence numbers for free.
#[tokio::test]
async fn given_sequence_gap_when_calling_then_rejects_and_counter_advances() {
    // GIVEN
    let dispatcher = test_dispatcher(WINDOW);
    let mut client = TestClient::new();
    client.handshake(&dispatcher).await;

    // WHEN: Sequence 5 arrives instead of 2
    let result = dispatcher
        .dispatch(client.request_with_sequence(ECHO_METHOD, &id_payload("x"), 5))
        .await;

    // THEN: Rejected, expected value 2 consumed
    assert!(matches!(
        result,
        Err(RejectReason::SequenceMismatch {
            expected: 2,
            received: 5
        })
    ));

    // THEN: A stale 2 consumes 3, after which 4 is accepted
    let stale = dispatcher
        .dispatch(client.request_with_sequence(ECHO_METHOD, &id_payload("x"), 2))
        .await;
    assert!(matches!(
        stale,
        Err(RejectReason::SequenceMismatch {
            expected: 3,
            received: 2
        })
    ));

    let accepted = dispatcher
        .dispatch(client.request_with_sequence(ECHO_METHOD, &id_payload("x"), 4))
        .await;
    assert!(accepted.is_ok());
}

/// **VALUE**: Replaying an accepted request is rejected.
///
/// **BUG THIS CATCHES**: Would catch `>=` instead of exact comparison, or a counter that
/// is not persisted between requests.
#[tokio::test]
async fn given_accepted_request_when_replayed_then_rejects() {
    // GIVEN: An accepted request
    let dispatcher = test_dispatcher(WINDOW);
    let mut client = TestClient::new();
    client.handshake(&dispatcher).await;
    let payload = id_payload("replay-me");

    let first = dispatcher
        .dispatch(client.request_with_sequence(ECHO_METHOD, &payload, 2))
        .await;
    assert!(first.is_ok());

    // WHEN: The identical request is sent again
    let replay = dispatcher
        .dispatch(client.request_with_sequence(ECHO_METHOD, &payload, 2))
        .await;

    // THEN
    assert!(matches!(
        replay,
        Err(RejectReason::SequenceMismatch { .. })
    ));
}

/// **VALUE**: Unrouted methods, non-hex bodies and failing handlers produce no response.
#[tokio::test]
async fn given_unroutable_or_failing_calls_when_dispatched_then_rejects() {
    let dispatcher = test_dispatcher(WINDOW);
    let mut client = TestClient::new();
    client.handshake(&dispatcher).await;

    // Unknown method
    let result = dispatcher
        .dispatch(client.request("BrewDay", &id_payload("x")))
        .await;
    assert!(matches!(result, Err(RejectReason::UnknownMethod { .. })));

    // Body that is not hex
    let mut request = client.request(ECHO_METHOD, &id_payload("x"));
    *request.body_mut() = bytes::Bytes::from_static(b"not hex at all");
    let result = dispatcher.dispatch(request).await;
    assert!(matches!(result, Err(RejectReason::BodyDecode { .. })));

    // Handler error
    let result = dispatcher
        .dispatch(client.request(FAILING_METHOD, &id_payload("x")))
        .await;
    assert!(matches!(result, Err(RejectReason::Handler(_))));

    // Counters kept advancing through every reject
    let result = dispatcher
        .dispatch(client.request(ECHO_METHOD, &id_payload("x")))
        .await;
    assert!(result.is_ok());
}

/// **VALUE**: The handshake signature is checked after the session exists.
///
/// **WHY THIS MATTERS**: The server has to trust the embedded key to check the signature,
/// so a forged handshake still leaves a registered (but unusable) session behind.
///
/// **BUG THIS CATCHES**: Would catch a forged handshake being answered.
#[tokio::test]
async fn given_handshake_signed_with_other_key_when_dispatched_then_rejects() {
    let dispatcher = test_dispatcher(WINDOW);
    let client = TestClient::new();

    let request = client.forged_request("KeyExchange", &client.key_exchange_envelope(), 1);
    let result = dispatcher.dispatch(request).await;

    assert!(matches!(result, Err(RejectReason::SignatureMismatch { .. })));
    assert_eq!(dispatcher.registry().len().await, 1);
}

/// **VALUE**: An undecodable handshake is dropped and creates no session.
///
/// **BUG THIS CATCHES**: Would catch the decode-error response being emitted unsigned.
#[tokio::test]
async fn given_undecodable_handshake_when_dispatched_then_rejects_without_session() {
    let dispatcher = test_dispatcher(WINDOW);
    let client = TestClient::new();

    let request = client.request_with_sequence("KeyExchange", b"%%%", 1);
    let result = dispatcher.dispatch(request).await;

    assert!(matches!(result, Err(RejectReason::SignatureMismatch { .. })));
    assert!(dispatcher.registry().is_empty().await);
}
