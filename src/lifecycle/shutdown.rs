//! Shutdown coordination shared by the primary and exposition servers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Process-wide cancellation signal.
///
/// Clones share the same underlying token. Triggering is idempotent and wakes
/// every task waiting on [`Shutdown::cancelled`].
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trigger the shutdown signal. Safe to call any number of times.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves once shutdown has been triggered.
    pub fn cancelled(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }

    /// A child signal: cancelled together with this one, but triggering the
    /// child does not propagate upward.
    pub fn child(&self) -> Shutdown {
        Shutdown {
            token: self.token.child_token(),
        }
    }
}

/// Lifecycle of a single server.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl From<u8> for ServerState {
    fn from(val: u8) -> Self {
        match val {
            1 => ServerState::Running,
            2 => ServerState::ShuttingDown,
            3 => ServerState::Stopped,
            _ => ServerState::NotStarted,
        }
    }
}

/// Atomically updated [`ServerState`].
#[derive(Debug)]
pub struct LifecycleState {
    state: AtomicU8,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ServerState::NotStarted as u8),
        }
    }

    pub fn get(&self) -> ServerState {
        ServerState::from(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ServerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move `from → to` only if the current state is `from`.
    pub(crate) fn transition(&self, from: ServerState, to: ServerState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

/// What initiated a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM / SIGINT.
    Signal,
    /// The shared [`Shutdown`] was triggered.
    Cancelled,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::Signal => f.write_str("signal"),
            ShutdownReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Single-fire gate that starts the stop sequence of one server.
///
/// Only the first call to [`ShutdownGate::fire`] has an effect; later calls
/// observe the shutdown as already in progress and return `false`.
#[derive(Debug)]
pub struct ShutdownGate {
    name: &'static str,
    fired: AtomicBool,
    stop: CancellationToken,
    state: Arc<LifecycleState>,
}

impl ShutdownGate {
    pub fn new(name: &'static str, state: Arc<LifecycleState>) -> Self {
        Self {
            name,
            fired: AtomicBool::new(false),
            stop: CancellationToken::new(),
            state,
        }
    }

    /// Start the stop sequence. Returns `true` only for the call that won.
    pub fn fire(&self, reason: ShutdownReason) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(server = self.name, reason = %reason, "Shutdown already in progress");
            return false;
        }

        tracing::info!(server = self.name, reason = %reason, "Shutting down");
        self.state
            .transition(ServerState::Running, ServerState::ShuttingDown);
        self.stop.cancel();
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Resolves once the gate has fired.
    pub fn stopped(&self) -> WaitForCancellationFutureOwned {
        self.stop.clone().cancelled_owned()
    }
}

/// Wait for the first of an OS signal or the shared cancellation, then fire
/// the gate.
///
/// A signal also triggers `shutdown`, so every other component watching the
/// same token stops too.
pub async fn watch_for_shutdown<S>(gate: &ShutdownGate, shutdown: &Shutdown, signal: S) -> ShutdownReason
where
    S: Future<Output = ()>,
{
    let reason = tokio::select! {
        biased;
        _ = shutdown.cancelled() => ShutdownReason::Cancelled,
        _ = signal => ShutdownReason::Signal,
    };

    if reason == ShutdownReason::Signal {
        shutdown.trigger();
    }
    gate.fire(reason);
    reason
}
