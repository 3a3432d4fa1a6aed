//! Handle to a running RPC server.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Handle returned by [`start_rpc_server`](crate::server::start_rpc_server).
///
/// Dropping the handle detaches the server: it keeps accepting connections
/// until the process exits. [`ServerHandle::shutdown`] stops accepting new
/// connections; connections already being served run to completion on their
/// own tasks.
pub struct ServerHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) certificate_path: PathBuf,
    pub(crate) stop: Option<oneshot::Sender<()>>,
    pub(crate) accept_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to (with the real port when `:0` was requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn certificate_path(&self) -> &Path {
        &self.certificate_path
    }

    /// Waits until the accept loop exits. Returns `false` if it panicked.
    pub async fn stopped(self) -> bool {
        match self.accept_task.await {
            Ok(()) => true,
            Err(e) => {
                warn!("RPC accept loop terminated abnormally: {e}");
                false
            }
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        debug!("Stopping RPC server on {}", self.local_addr);
        let _ = self.stopped().await;
    }
}
