use crate::server::helpers::{probe_request, send, start_test_server, test_config};

use rpc_core::config::{CERTIFICATE_FILE_NAME, ServerConfig};
use rpc_core::dispatch::Dispatcher;
use rpc_core::error::ServerError;
use rpc_core::identity::{LOCALHOST, ServerIdentity, SubjectNames};
use rpc_core::server::{
    ServiceStatus, Shutdown, lifecycle_channel, run_rpc_server, start_rpc_server_with_identity,
};

use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpStream;

fn localhost_identity() -> ServerIdentity {
    ServerIdentity::generate_for(SubjectNames::new(LOCALHOST, Vec::new())).expect("identity")
}

/// **VALUE**: A port already in use is a bind error, not a panic or a silent success.
///
/// **BUG THIS CATCHES**: Would catch the server claiming readiness without a listener.
#[tokio::test]
async fn given_port_in_use_when_starting_second_server_then_returns_bind_error() {
    // GIVEN: A running server
    let server = start_test_server(|config| config).await;
    let temp = TempDir::new().expect("temp dir");
    let config = test_config(&temp).with_listen_address(server.addr().to_string());

    // WHEN: A second server targets the same address
    let result =
        start_rpc_server_with_identity(config.clone(), Dispatcher::new(&config), localhost_identity())
            .await;

    // THEN
    assert!(matches!(result, Err(ServerError::Bind { .. })));
}

/// **VALUE**: Invalid configuration fails startup before anything is written.
#[tokio::test]
async fn given_invalid_config_when_starting_then_returns_config_error() {
    let temp = TempDir::new().expect("temp dir");
    let config = ServerConfig {
        max_body_bytes: 0,
        ..test_config(&temp)
    };

    let result =
        start_rpc_server_with_identity(config.clone(), Dispatcher::new(&config), localhost_identity())
            .await;

    assert!(matches!(result, Err(ServerError::Config(_))));
    assert!(!temp.path().join(CERTIFICATE_FILE_NAME).exists());
}

/// **VALUE**: A successful start announces readiness with the bound address.
///
/// **WHY THIS MATTERS**: The run loop prints `SERVICE_READY` on this signal; the front-end
/// connects as soon as it sees that line.
///
/// **BUG THIS CATCHES**: Would catch readiness being announced before the certificate is on
/// disk or before the listener accepts connections.
#[tokio::test]
async fn given_valid_config_when_running_server_then_ready_is_signalled() {
    // GIVEN
    let temp = TempDir::new().expect("temp dir");
    let config = test_config(&temp);
    let (sender, receiver) = lifecycle_channel();

    // WHEN
    tokio::spawn(run_rpc_server(config.clone(), Dispatcher::new(&config), sender));
    let status = tokio::time::timeout(Duration::from_secs(10), receiver.status)
        .await
        .expect("status in time")
        .expect("status sent");

    // THEN
    let ServiceStatus::Ready {
        address,
        certificate_path,
    } = status;
    assert!(certificate_path.exists());
    assert_eq!(certificate_path, temp.path().join(CERTIFICATE_FILE_NAME));
    assert!(TcpStream::connect(address).await.is_ok());
}

/// **VALUE**: A bootstrap failure requests an unsuccessful shutdown.
///
/// **BUG THIS CATCHES**: Would catch a failed start leaving the process alive without a
/// listener, or exiting with success.
#[tokio::test]
async fn given_unbindable_address_when_running_server_then_failed_shutdown_is_signalled() {
    // GIVEN
    let temp = TempDir::new().expect("temp dir");
    let config = test_config(&temp).with_listen_address("not-an-address");
    let (sender, receiver) = lifecycle_channel();

    // WHEN
    tokio::spawn(run_rpc_server(config.clone(), Dispatcher::new(&config), sender));
    let shutdown = tokio::time::timeout(Duration::from_secs(10), receiver.shutdown)
        .await
        .expect("shutdown in time")
        .expect("shutdown sent");

    // THEN
    assert_eq!(shutdown, Shutdown { success: false });
}

/// **VALUE**: Shutting the handle down stops new connections from being served.
#[tokio::test]
async fn given_running_server_when_shut_down_then_new_requests_fail() {
    // GIVEN
    let server = start_test_server(|config| config).await;
    assert!(send(&server, probe_request()).await.is_ok());
    let addr = server.addr();

    // WHEN
    server.handle.shutdown().await;

    // THEN
    assert!(TcpStream::connect(addr).await.is_err());
}

/// **VALUE**: Dropping the handle detaches the server instead of stopping it.
///
/// **BUG THIS CATCHES**: Would catch the closed stop channel being mistaken for a shutdown
/// request, which silently takes the listener down when a caller lets the handle go.
#[tokio::test]
async fn given_running_server_when_handle_dropped_then_connections_still_accepted() {
    // GIVEN
    let server = start_test_server(|config| config).await;
    let addr = server.addr();

    // WHEN
    drop(server.handle);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // THEN
    assert!(TcpStream::connect(addr).await.is_ok());
}
