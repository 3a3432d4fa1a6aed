//! One-shot signals from the RPC server to the process run loop.

use std::net::SocketAddr;
use std::path::PathBuf;

use log::debug;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Listener bound and TLS configured; the certificate is on disk.
    Ready {
        address: SocketAddr,
        certificate_path: PathBuf,
    },
}

/// Request to end the process; `success` selects the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    pub success: bool,
}

/// Server side of the lifecycle channels. Each signal is sent at most once.
pub struct LifecycleSender {
    status: Option<oneshot::Sender<ServiceStatus>>,
    shutdown: Option<oneshot::Sender<Shutdown>>,
}

/// Run-loop side of the lifecycle channels.
pub struct LifecycleReceiver {
    pub status: oneshot::Receiver<ServiceStatus>,
    pub shutdown: oneshot::Receiver<Shutdown>,
}

pub fn lifecycle_channel() -> (LifecycleSender, LifecycleReceiver) {
    let (status_tx, status_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    (
        LifecycleSender {
            status: Some(status_tx),
            shutdown: Some(shutdown_tx),
        },
        LifecycleReceiver {
            status: status_rx,
            shutdown: shutdown_rx,
        },
    )
}

impl LifecycleSender {
    pub fn ready(&mut self, status: ServiceStatus) {
        match self.status.take() {
            Some(sender) => {
                if sender.send(status).is_err() {
                    debug!("Run loop stopped listening for service status");
                }
            }
            None => debug!("Service status already announced"),
        }
    }

    pub fn shutdown(&mut self, success: bool) {
        match self.shutdown.take() {
            Some(sender) => {
                if sender.send(Shutdown { success }).is_err() {
                    debug!("Run loop stopped listening for shutdown");
                }
            }
            None => debug!("Shutdown already requested"),
        }
    }
}
