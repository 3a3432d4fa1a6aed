//! Process run loop: start the RPC server, announce readiness, wait for shutdown.

use crate::cli::Args;
use crate::error::BackendError;
use crate::logger;

use rpc_core::dispatch::Dispatcher;
use rpc_core::server::{LifecycleReceiver, ServiceStatus, Shutdown, lifecycle_channel, run_rpc_server};

use std::future::Future;
use std::io::{Write, stdout};

use log::{debug, error, info, warn};
use tokio::spawn as TokioSpawn;

/// Line printed on stdout once the server is listening.
pub const SERVICE_READY_LINE: &str = "SERVICE_READY";

/// Runs the backend until shutdown is requested by the server or by Ctrl-C.
///
/// # Errors
///
/// Returns [`BackendError`] if the flags are invalid or the logger cannot be set up.
/// Server startup failures are reported as an unsuccessful [`Shutdown`] instead.
pub async fn run(args: &Args) -> Result<Shutdown, BackendError> {
    let level = args.log_level()?;
    logger::initialize(&args.logfile, level)?;

    let config = args.server_config();
    info!("Starting BrewTheory backend on {}", config.listen_address);

    let dispatcher = Dispatcher::new(&config);
    let (lifecycle, receiver) = lifecycle_channel();
    TokioSpawn(run_rpc_server(config, dispatcher, lifecycle));

    let shutdown = wait_for_shutdown(receiver, interrupt(), &mut stdout()).await;
    info!("Shutting down (success: {})", shutdown.success);
    Ok(shutdown)
}

/// Waits for a lifecycle signal, printing [`SERVICE_READY_LINE`] to `out` on `Ready`.
///
/// Completion of `interrupt` counts as a successful shutdown. If the server side
/// goes away without requesting shutdown, the result is a failure.
pub async fn wait_for_shutdown<W: Write>(
    lifecycle: LifecycleReceiver,
    interrupt: impl Future<Output = ()>,
    out: &mut W,
) -> Shutdown {
    let LifecycleReceiver {
        mut status,
        mut shutdown,
    } = lifecycle;
    tokio::pin!(interrupt);
    let mut status_pending = true;

    loop {
        tokio::select! {
            result = &mut status, if status_pending => {
                status_pending = false;
                match result {
                    Ok(ServiceStatus::Ready { address, certificate_path }) => {
                        info!("RPC server ready on {address}, certificate at {}", certificate_path.display());
                        announce_ready(out);
                    }
                    Err(_) => debug!("Status channel closed before readiness"),
                }
            }
            result = &mut shutdown => {
                return result.unwrap_or_else(|_| {
                    error!("RPC server exited without requesting shutdown");
                    Shutdown { success: false }
                });
            }
            () = &mut interrupt => {
                info!("Interrupt received");
                return Shutdown { success: true };
            }
        }
    }
}

fn announce_ready<W: Write>(out: &mut W) {
    if let Err(e) = writeln!(out, "{SERVICE_READY_LINE}").and_then(|()| out.flush()) {
        warn!("Failed to announce readiness: {e}");
    }
}

/// Resolves on Ctrl-C; never resolves if the signal handler cannot be installed.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
