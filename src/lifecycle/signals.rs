//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGTERM and SIGINT
//! - Resolve a future once either is delivered
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A handler that cannot be installed never resolves; it must not
//!   trigger a spurious shutdown

use std::future;

/// Wait for a process termination signal (SIGTERM or SIGINT).
#[cfg(unix)]
pub async fn termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut int) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Failed to install termination signal handlers");
            return future::pending().await;
        }
    };

    tokio::select! {
        _ = term.recv() => tracing::info!(signal = "SIGTERM", "Termination signal received"),
        _ = int.recv() => tracing::info!(signal = "SIGINT", "Termination signal received"),
    }
}

/// Wait for a process termination signal (Ctrl-C).
#[cfg(not(unix))]
pub async fn termination() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        return future::pending().await;
    }
    tracing::info!(signal = "ctrl-c", "Termination signal received");
}
