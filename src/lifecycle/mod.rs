//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Triggers:
//!     SIGTERM/SIGINT (signals.rs) ─┐
//!                                  ├→ ShutdownGate (fires once per server)
//!     Shutdown::trigger() ─────────┘        │
//!                                           ▼
//! Serving (serve.rs):
//!     Running → stop accepting → drain in-flight (bounded grace) → Stopped
//! ```
//!
//! # Design Decisions
//! - One shared `Shutdown` token per process; every server watches it
//! - An OS signal also triggers the shared token so all servers stop in unison
//! - Each server owns a single-fire gate, so a second trigger is a no-op
//! - Shutdown has a deadline: forced close after the grace window

pub mod serve;
pub mod shutdown;
pub mod signals;

pub use serve::{serve_until_shutdown, ServeError, ServeOptions};
pub use shutdown::{
    watch_for_shutdown, LifecycleState, ServerState, Shutdown, ShutdownGate, ShutdownReason,
};
