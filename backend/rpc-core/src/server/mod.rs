//! TLS-terminated HTTP/1.1 listener in front of the [`Dispatcher`].
//!
//! # Protocol
//!
//! One route, `POST /rpc`. Each accepted connection is served on its own task.
//! A dispatcher reject is returned to hyper as a service error, which makes
//! hyper drop the connection without writing a response.

mod handle;
mod lifecycle;

pub use handle::ServerHandle;
pub use lifecycle::{LifecycleReceiver, LifecycleSender, ServiceStatus, Shutdown, lifecycle_channel};

use crate::config::{CERTIFICATE_FILE_NAME, ServerConfig};
use crate::dispatch::{Dispatcher, RejectReason};
use crate::error::server::ServerError;
use crate::identity::ServerIdentity;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;

/// Generates this machine's identity, persists the certificate and starts
/// listening.
///
/// # Errors
///
/// Returns [`ServerError`] if the configuration is invalid, the identity
/// cannot be generated or written, or the address cannot be bound.
pub async fn start_rpc_server(
    config: ServerConfig,
    dispatcher: Dispatcher,
) -> Result<ServerHandle, ServerError> {
    let identity = ServerIdentity::generate()?;
    start_rpc_server_with_identity(config, dispatcher, identity).await
}

/// Like [`start_rpc_server`] with a caller-supplied identity.
pub async fn start_rpc_server_with_identity(
    config: ServerConfig,
    dispatcher: Dispatcher,
    identity: ServerIdentity,
) -> Result<ServerHandle, ServerError> {
    config.validate()?;

    let certificate_path = identity.persist(&config.certificate_dir()?, CERTIFICATE_FILE_NAME)?;
    let acceptor = TlsAcceptor::from(identity.tls_config()?);

    let listener = TcpListener::bind(&config.listen_address)
        .await
        .map_err(|e| ServerError::Bind {
            location: ErrorLocation::from(Location::caller()),
            address: config.listen_address.clone(),
            source: e,
        })?;

    let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
        location: ErrorLocation::from(Location::caller()),
        address: config.listen_address.clone(),
        source: e,
    })?;

    info!("RPC server listening on {local_addr}");

    let (stop_tx, stop_rx) = oneshot::channel();
    let accept_task = TokioSpawn(accept_loop(
        listener,
        acceptor,
        Arc::new(dispatcher),
        config.max_body_bytes,
        stop_rx,
    ));

    Ok(ServerHandle {
        local_addr,
        certificate_path,
        stop: Some(stop_tx),
        accept_task,
    })
}

/// Starts the server and reports through `lifecycle`: `Ready` once listening,
/// `Shutdown { success: false }` if startup fails or the accept loop dies.
pub async fn run_rpc_server(
    config: ServerConfig,
    dispatcher: Dispatcher,
    mut lifecycle: LifecycleSender,
) {
    let handle = match start_rpc_server(config, dispatcher).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("RPC server failed to start: {e}");
            lifecycle.shutdown(false);
            return;
        }
    };

    lifecycle.ready(ServiceStatus::Ready {
        address: handle.local_addr(),
        certificate_path: handle.certificate_path().to_path_buf(),
    });

    handle.stopped().await;
    error!("RPC server stopped unexpectedly");
    lifecycle.shutdown(false);
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
    mut stop: oneshot::Receiver<()>,
) {
    let mut stoppable = true;

    loop {
        tokio::select! {
            signal = &mut stop, if stoppable => match signal {
                Ok(()) => {
                    info!("RPC server no longer accepting connections");
                    return;
                }
                // Handle dropped: keep serving until the process exits.
                Err(_) => {
                    debug!("RPC server handle dropped, server detached");
                    stoppable = false;
                }
            },
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {peer}");
                    TokioSpawn(serve_connection(
                        stream,
                        peer,
                        acceptor.clone(),
                        Arc::clone(&dispatcher),
                        max_body_bytes,
                    ));
                }
                Err(e) => warn!("Error accepting connection: {e}"),
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
) {
    let tls_stream = match acceptor.accept(stream).await {
        Ok(tls_stream) => tls_stream,
        Err(e) => {
            warn!("TLS handshake with {peer} failed: {e}");
            return;
        }
    };

    let service = service_fn(move |request: Request<Incoming>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle_request(&dispatcher, request, peer, max_body_bytes).await }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(tls_stream), service)
        .await
    {
        debug!("Connection from {peer} closed: {e}");
    }
}

async fn handle_request(
    dispatcher: &Dispatcher,
    request: Request<Incoming>,
    peer: SocketAddr,
    max_body_bytes: usize,
) -> Result<Response<Full<Bytes>>, RejectReason> {
    let (parts, body) = request.into_parts();

    let body = Limited::new(body, max_body_bytes)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                RejectReason::BodyTooLarge {
                    limit: max_body_bytes,
                }
            } else {
                RejectReason::BodyRead {
                    reason: e.to_string(),
                }
            }
        })
        .inspect_err(|e| warn!("Rejected request from {peer}: {e}"))?
        .to_bytes();

    dispatcher
        .dispatch(Request::from_parts(parts, body))
        .await
        .inspect_err(|e| warn!("Rejected request from {peer}: {e}"))
}
