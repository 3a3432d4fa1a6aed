//! Test helpers for RPC server integration tests.
//!
//! - Starting a server on an ephemeral port with a throwaway certificate directory
//! - A TLS client pinned to the server's certificate
//! - A signing client that performs the key exchange and numbered calls

use rpc_core::config::ServerConfig;
use rpc_core::dispatch::headers::{
    CLIENT_TOKEN_HEADER, KEY_EXCHANGE_METHOD, MESSAGE_SEQUENCE_HEADER, MESSAGE_SIGNATURE_HEADER,
    REQUEST_METHOD_HEADER,
};
use rpc_core::dispatch::{Dispatcher, HandlerResult, Reply, RequestContext};
use rpc_core::identity::{LOCALHOST, ServerIdentity, SubjectNames};
use rpc_core::server::{ServerHandle, start_rpc_server_with_identity};
use rpc_core::session::SessionRegistry;

use models::response_header::new_response_header;
use models::{EmptyResponse, KeyExchangeRequest, KeyExchangeResponse, RequestHeader};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use bytes::Bytes;
use ed25519_dalek::{SECRET_KEY_LENGTH, Signature, Signer, SigningKey, Verifier, VerifyingKey};
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use prost::Message;
use rand::RngCore;
use rand::rngs::OsRng;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

pub const PING_METHOD: &str = "Ping";

fn ping<'a>(
    _registry: &'a SessionRegistry,
    _payload: &'a [u8],
    _context: &'a mut RequestContext,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        Ok(Reply::message(&EmptyResponse {
            header: Some(new_response_header()),
        }))
    })
}

/// A running server plus everything a client needs to reach it.
pub struct TestServer {
    pub handle: ServerHandle,
    pub certificate: CertificateDer<'static>,
    pub certificate_pem: String,
    pub certificate_dir: TempDir,
}

impl TestServer {
    pub fn addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }
}

pub fn test_config(certificate_dir: &TempDir) -> ServerConfig {
    ServerConfig::default()
        .with_listen_address("127.0.0.1:0")
        .with_certificate_dir(certificate_dir.path())
        .with_reorder_window(Duration::from_millis(500))
}

/// Test helper: Start a server on an ephemeral port with `Ping` registered.
pub async fn start_test_server(configure: impl FnOnce(ServerConfig) -> ServerConfig) -> TestServer {
    let certificate_dir = TempDir::new().expect("temp dir");
    let config = configure(test_config(&certificate_dir));

    let mut dispatcher = Dispatcher::new(&config);
    dispatcher.register_handler(PING_METHOD, ping);

    let identity =
        ServerIdentity::generate_for(SubjectNames::new(LOCALHOST, Vec::new())).expect("identity");
    let certificate = identity.certificate_der().clone();
    let certificate_pem = identity.certificate_pem().to_owned();

    let handle = start_rpc_server_with_identity(config, dispatcher, identity)
        .await
        .expect("Failed to start RPC server");

    TestServer {
        handle,
        certificate,
        certificate_pem,
        certificate_dir,
    }
}

/// Accepts exactly one certificate, the way the front-end pins the persisted PEM.
#[derive(Debug)]
struct PinnedCertificate {
    certificate: CertificateDer<'static>,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for PinnedCertificate {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if end_entity.as_ref() == self.certificate.as_ref() {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::General(String::from(
                "certificate does not match pinned certificate",
            )))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// What came back over the wire.
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Test helper: Send one request on a fresh TLS connection.
///
/// Returns `Err` when the server closed the connection without responding.
pub async fn send(
    server: &TestServer,
    request: Request<Full<Bytes>>,
) -> Result<RawResponse, hyper::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(PinnedCertificate {
            certificate: server.certificate.clone(),
            provider,
        }))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    let stream = TcpStream::connect(server.addr())
        .await
        .expect("Failed to connect to RPC server");
    let tls = TlsConnector::from(Arc::new(config))
        .connect(
            ServerName::try_from(LOCALHOST).expect("server name"),
            stream,
        )
        .await
        .expect("TLS handshake failed");

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(tls)).await?;
    tokio::spawn(connection);

    let response = sender.send_request(request).await?;
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();

    Ok(RawResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

pub fn probe_request() -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri("/rpc")
        .header(REQUEST_METHOD_HEADER, "SERVICE-READY")
        .body(Full::new(Bytes::new()))
        .expect("valid request")
}

/// A front-end stand-in with its own Ed25519 key.
pub struct SigningClient {
    key: SigningKey,
    token: Option<String>,
    server_key: Option<VerifyingKey>,
    next_sequence: i32,
}

impl SigningClient {
    pub fn new() -> Self {
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        OsRng.fill_bytes(&mut secret);

        Self {
            key: SigningKey::from_bytes(&secret),
            token: None,
            server_key: None,
            next_sequence: 2,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(String::from(token));
        self
    }

    /// Test helper: Perform the key exchange over `server`.
    pub async fn handshake(&mut self, server: &TestServer) -> KeyExchangeResponse {
        let request = KeyExchangeRequest {
            header: Some(RequestHeader {
                method: String::from(KEY_EXCHANGE_METHOD),
            }),
            public_key: self.key.verifying_key().to_bytes().to_vec(),
        };
        let envelope = URL_SAFE.encode(request.encode_to_vec()).into_bytes();

        let response = send(server, self.build(KEY_EXCHANGE_METHOD, &envelope, 1))
            .await
            .expect("key exchange should be answered");
        let payload = STANDARD.decode(&response.body).expect("base64 body");
        let message = KeyExchangeResponse::decode(payload.as_slice()).expect("decode response");

        let server_key = VerifyingKey::from_bytes(
            message
                .public_key
                .as_slice()
                .try_into()
                .expect("32-byte server key"),
        )
        .expect("valid server key");

        self.token = Some(message.token.clone());
        self.server_key = Some(server_key);
        self.next_sequence = 2;
        assert!(self.verifies(&response.headers, &payload));
        message
    }

    pub fn request(&mut self, method: &str, payload: &[u8]) -> Request<Full<Bytes>> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.build(method, payload, sequence)
    }

    pub fn build(&self, method: &str, payload: &[u8], sequence: i32) -> Request<Full<Bytes>> {
        let signature = self.key.sign(payload);

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
            .body(Full::new(Bytes::from(hex::encode(payload))))
            .expect("valid request")
    }

    pub fn verifies(&self, headers: &HeaderMap, payload: &[u8]) -> bool {
        let Some(ref server_key) = self.server_key else {
            return false;
        };
        let Some(signature) = headers.get(MESSAGE_SIGNATURE_HEADER) else {
            return false;
        };
        let signature = STANDARD
            .decode(signature.as_bytes())
            .expect("base64 signature");
        let signature = Signature::from_slice(&signature).expect("64-byte signature");
        server_key.verify(payload, &signature).is_ok()
    }
}
