// Integration of the run loop with a real RPC server

use brewtheory::service::{SERVICE_READY_LINE, wait_for_shutdown};

use rpc_core::config::ServerConfig;
use rpc_core::dispatch::Dispatcher;
use rpc_core::server::{Shutdown, lifecycle_channel, run_rpc_server};

use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::oneshot;

/// **VALUE**: A real server start drives the run loop to announce readiness, and an
/// interrupt afterwards ends it successfully.
///
/// **BUG THIS CATCHES**: Would catch the run loop returning on readiness, or the server
/// never sending `Ready`.
#[tokio::test]
async fn given_real_server_when_interrupted_after_ready_then_announced_and_successful() {
    // GIVEN
    let temp = TempDir::new().expect("temp dir");
    let config = ServerConfig::default()
        .with_listen_address("127.0.0.1:0")
        .with_certificate_dir(temp.path());
    let (lifecycle, receiver) = lifecycle_channel();
    tokio::spawn(run_rpc_server(config.clone(), Dispatcher::new(&config), lifecycle));

    // GIVEN: An interrupt that fires shortly after the certificate is written
    let certificate_path = config.certificate_path().expect("certificate path");
    let (interrupt_tx, interrupt_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        while !certificate_path.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = interrupt_tx.send(());
    });

    // WHEN
    let mut out = Vec::new();
    let shutdown = tokio::time::timeout(
        Duration::from_secs(20),
        wait_for_shutdown(
            receiver,
            async move {
                let _ = interrupt_rx.await;
            },
            &mut out,
        ),
    )
    .await
    .expect("run loop should end");

    // THEN
    assert_eq!(shutdown, Shutdown { success: true });
    assert_eq!(
        String::from_utf8(out).expect("utf8"),
        format!("{SERVICE_READY_LINE}\n")
    );
}
