use crate::server::helpers::{
    PING_METHOD, SigningClient, probe_request, send, start_test_server,
};

use rpc_core::config::{CERTIFICATE_FILE_NAME, ServerConfig};
use rpc_core::dispatch::headers::{MESSAGE_SEQUENCE_HEADER, REQUEST_METHOD_HEADER};

use models::EmptyRequest;
use models::response_header::is_ok;
use models::{EmptyResponse, RequestHeader};

use std::fs;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hyper::StatusCode;
use prost::Message;

fn ping_payload() -> Vec<u8> {
    EmptyRequest {
        header: Some(RequestHeader {
            method: String::from(PING_METHOD),
        }),
    }
    .encode_to_vec()
}

/// **VALUE**: The liveness probe works over a real TLS connection.
///
/// **WHY THIS MATTERS**: The front-end's first contact after launch is this probe; it must
/// succeed with nothing but the pinned certificate.
///
/// **BUG THIS CATCHES**: Would catch a TLS config without HTTP/1.1 ALPN, a certificate the
/// client cannot pin, or the probe requiring authentication.
#[tokio::test]
async fn given_running_server_when_probing_over_tls_then_returns_ok() {
    // GIVEN
    let server = start_test_server(|config| config).await;

    // WHEN
    let response = send(&server, probe_request()).await.expect("probe answered");

    // THEN
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"OK");
}

/// **VALUE**: The served certificate is the one persisted to the config directory.
///
/// **BUG THIS CATCHES**: Would catch the file being written before regeneration, leaving
/// the front-end pinning a stale certificate.
#[tokio::test]
async fn given_running_server_when_reading_certificate_file_then_matches_served_certificate() {
    let server = start_test_server(|config| config).await;

    let path = server.certificate_dir.path().join(CERTIFICATE_FILE_NAME);
    assert_eq!(server.handle.certificate_path(), path.as_path());
    assert_eq!(
        fs::read_to_string(&path).expect("certificate file"),
        server.certificate_pem
    );
}

/// **VALUE**: Full protocol over TLS: key exchange, then signed calls on new connections.
///
/// **WHY THIS MATTERS**: Sessions are bound to tokens, not connections; the front-end may
/// use a fresh connection for every call.
///
/// **BUG THIS CATCHES**: Would catch session state tied to a connection, or response
/// signatures that do not verify with the key from the key exchange.
#[tokio::test]
async fn given_key_exchange_when_calling_on_new_connections_then_responses_verify() {
    // GIVEN: A client with a session
    let server = start_test_server(|config| config).await;
    let mut client = SigningClient::new();
    let exchange = client.handshake(&server).await;
    assert!(is_ok(exchange.header.as_ref().expect("header")));

    for expected_sequence in ["2", "3", "4"] {
        // WHEN: Ping with the next sequence
        let response = send(&server, client.request(PING_METHOD, &ping_payload()))
            .await
            .expect("call answered");

        // THEN
        let payload = STANDARD.decode(&response.body).expect("base64 body");
        assert!(client.verifies(&response.headers, &payload));
        assert_eq!(
            response.headers[MESSAGE_SEQUENCE_HEADER],
            expected_sequence
        );
        assert_eq!(response.headers[REQUEST_METHOD_HEADER], PING_METHOD);
        let message = EmptyResponse::decode(payload.as_slice()).expect("decode");
        assert!(is_ok(message.header.as_ref().expect("header")));
    }
}

/// **VALUE**: Rejected requests get no HTTP response at all.
///
/// **WHY THIS MATTERS**: Fail-silent rejects give a probing client nothing to learn from.
///
/// **BUG THIS CATCHES**: Would catch rejects being mapped to a 4xx/5xx response.
#[tokio::test]
async fn given_unknown_token_when_calling_then_connection_closes_without_response() {
    // GIVEN
    let server = start_test_server(|config| config).await;
    let mut client = SigningClient::new().with_token("not-issued");

    // WHEN
    let result = send(&server, client.request(PING_METHOD, &ping_payload())).await;

    // THEN
    assert!(result.is_err(), "reject must not produce a response");
}

/// **VALUE**: A replayed request is dropped even on a new connection.
#[tokio::test]
async fn given_replayed_request_when_sent_again_then_no_response() {
    let server = start_test_server(|config| config).await;
    let mut client = SigningClient::new();
    client.handshake(&server).await;

    let first = send(&server, client.build(PING_METHOD, &ping_payload(), 2)).await;
    let replay = send(&server, client.build(PING_METHOD, &ping_payload(), 2)).await;

    assert!(first.is_ok());
    assert!(replay.is_err());
}

/// **VALUE**: Bodies above the configured cap are rejected before dispatch.
///
/// **BUG THIS CATCHES**: Would catch unbounded body buffering.
#[tokio::test]
async fn given_oversized_body_when_sending_then_no_response() {
    let server = start_test_server(|config| ServerConfig {
        max_body_bytes: 512,
        ..config
    })
    .await;
    let mut client = SigningClient::new();
    client.handshake(&server).await;

    let result = send(&server, client.request(PING_METHOD, &[0u8; 1024])).await;

    assert!(result.is_err());
}

/// **VALUE**: Requests N and N+1 on separate connections are both answered.
///
/// **BUG THIS CATCHES**: Would catch the later request failing when it reaches the
/// server first.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_parallel_connections_when_n_plus_one_arrives_first_then_both_answered() {
    // GIVEN
    let server = start_test_server(|config| config).await;
    let mut client = SigningClient::new();
    client.handshake(&server).await;
    let first = client.request(PING_METHOD, &ping_payload());
    let second = client.request(PING_METHOD, &ping_payload());

    // WHEN: N+1 goes out first
    let (late, early) = tokio::join!(send(&server, second), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        send(&server, first).await
    });

    // THEN
    let early = early.expect("N answered");
    let late = late.expect("N+1 answered");
    assert_eq!(early.headers[MESSAGE_SEQUENCE_HEADER], "2");
    assert_eq!(late.headers[MESSAGE_SEQUENCE_HEADER], "3");
}
