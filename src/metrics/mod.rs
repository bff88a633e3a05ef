//! Metrics subsystem.
//!
//! # Data Flow
//! ```text
//! request → middleware.rs (time + label) ─┐
//! app code ───────────────────────────────┼→ registry.rs (per-series accumulators)
//!                                         │
//! scrape  → server.rs (GET <path>) ───────┘   render() → Prometheus text
//! ```
//!
//! # Metrics
//! - `http.server.requests` (timer): `method`, `uri`, `status`, `outcome`,
//!   plus `appName` and any configured default labels
//!
//! # Design Decisions
//! - The registry is an explicit handle, injected into the middleware and
//!   the exposition server
//! - Timers are exported as Prometheus summaries in seconds

pub mod labels;
pub mod middleware;
pub mod registry;
pub mod server;

pub use labels::LabelSet;
pub use middleware::{
    track_requests, MatchedRouteUri, Outcome, RawUri, RequestMetrics, UriMapper,
    HTTP_SERVER_REQUESTS,
};
pub use registry::{MetricsRegistry, SeriesSnapshot, SeriesValue, TimerSummary};
pub use server::{MetricsServer, MetricsServerError, EXPOSITION_CONTENT_TYPE};
