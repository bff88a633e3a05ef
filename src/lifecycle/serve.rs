//! Serving loop shared by the primary and exposition servers.
//!
//! # Responsibilities
//! - Serve an axum router on a bound listener
//! - Spawn the shutdown watcher (OS signal vs shared cancellation)
//! - Drain in-flight requests within a bounded grace window
//! - Distinguish shutdown-induced close from listener failure

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use super::shutdown::{watch_for_shutdown, LifecycleState, ServerState, Shutdown, ShutdownGate};
use super::signals;

/// Listener failures. A clean shutdown is never reported as one.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server already started")]
    AlreadyStarted,

    #[error("server failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// Per-server serving options.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Server name used in log events.
    pub name: &'static str,
    /// How long in-flight requests may run after shutdown starts.
    pub grace: Duration,
    /// Watch SIGTERM/SIGINT in addition to the shared token.
    pub watch_signals: bool,
}

impl ServeOptions {
    pub fn new(name: &'static str, grace: Duration) -> Self {
        Self {
            name,
            grace,
            watch_signals: true,
        }
    }
}

/// Bind a TCP listener, mapping failures to [`ServeError::Bind`].
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServeError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })
}

/// Serve `router` until `shutdown` is triggered or a termination signal is
/// delivered, then stop accepting and drain for at most `options.grace`.
///
/// Returns only after the listener has stopped serving. A `state` that has
/// already left `NotStarted` yields [`ServeError::AlreadyStarted`].
pub async fn serve_until_shutdown(
    listener: TcpListener,
    router: Router,
    shutdown: Shutdown,
    state: Arc<LifecycleState>,
    options: ServeOptions,
) -> Result<(), ServeError> {
    if !state.transition(ServerState::NotStarted, ServerState::Running) {
        return Err(ServeError::AlreadyStarted);
    }
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            state.set(ServerState::Stopped);
            return Err(e.into());
        }
    };
    let gate = Arc::new(ShutdownGate::new(options.name, state.clone()));

    tracing::info!(server = options.name, address = %addr, "Server starting");

    let watcher = {
        let gate = gate.clone();
        let shutdown = shutdown.clone();
        let watch_signals = options.watch_signals;
        tokio::spawn(async move {
            let signal = async move {
                if watch_signals {
                    signals::termination().await
                } else {
                    std::future::pending::<()>().await
                }
            };
            watch_for_shutdown(&gate, &shutdown, signal).await
        })
    };

    let serve = axum::serve(listener, router)
        .with_graceful_shutdown(gate.stopped())
        .into_future();
    tokio::pin!(serve);

    let result = tokio::select! {
        res = &mut serve => res.map_err(ServeError::Serve),
        _ = grace_elapsed(&gate, options.grace) => {
            tracing::warn!(
                server = options.name,
                grace_ms = options.grace.as_millis() as u64,
                "In-flight requests did not drain in time, forcing close"
            );
            Ok(())
        }
    };

    watcher.abort();
    state.set(ServerState::Stopped);

    match &result {
        Ok(()) => tracing::info!(server = options.name, "Server stopped"),
        Err(e) => tracing::error!(server = options.name, error = %e, "Server failed"),
    }
    result
}

async fn grace_elapsed(gate: &ShutdownGate, grace: Duration) {
    gate.stopped().await;
    tokio::time::sleep(grace).await;
}
