//! Metrics exposition server.
//!
//! # Responsibilities
//! - Serve the registry in Prometheus text format at the configured path
//! - Answer 404 for every other path
//! - Shut down on SIGTERM/SIGINT or the shared cancellation, exactly once
//! - Hand out request instrumentation stamped with the service labels

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{parse_listen_addr, MetricsConfig, DEFAULT_METRICS_ADDRESS, DEFAULT_METRICS_PATH};
use crate::lifecycle::serve::{self, serve_until_shutdown, ServeError, ServeOptions};
use crate::lifecycle::{LifecycleState, ServerState, Shutdown};

use super::labels::LabelSet;
use super::middleware::{MatchedRouteUri, RequestMetrics};
use super::registry::MetricsRegistry;

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Errors raised while building or running the metrics server.
#[derive(Debug, Error)]
pub enum MetricsServerError {
    #[error("metrics server requires a service name be provided by configuration")]
    MissingServiceName,

    #[error("invalid metrics server address {0:?}")]
    InvalidAddress(String),

    #[error("metrics server path must start with '/', got {0:?}")]
    InvalidPath(String),

    #[error("metrics server already started")]
    AlreadyStarted,

    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// HTTP listener exposing a [`MetricsRegistry`] for pull-based scraping.
#[derive(Debug)]
pub struct MetricsServer {
    address: SocketAddr,
    path: String,
    grace: Duration,
    watch_signals: bool,
    registry: MetricsRegistry,
    shutdown: Shutdown,
    default_labels: LabelSet,
    state: Arc<LifecycleState>,
}

impl MetricsServer {
    /// Build a server for `service_name`, applying the default address and
    /// path when the config leaves them unset.
    pub fn new(
        service_name: &str,
        config: &MetricsConfig,
        registry: MetricsRegistry,
        shutdown: Shutdown,
    ) -> Result<Self, MetricsServerError> {
        if service_name.trim().is_empty() {
            return Err(MetricsServerError::MissingServiceName);
        }

        let raw_address = config
            .address
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_METRICS_ADDRESS);
        let address = parse_listen_addr(raw_address)
            .ok_or_else(|| MetricsServerError::InvalidAddress(raw_address.to_string()))?;

        let path = config
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_METRICS_PATH);
        if !path.starts_with('/') {
            return Err(MetricsServerError::InvalidPath(path.to_string()));
        }

        let mut default_labels: LabelSet = config
            .default_labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        default_labels.insert("appName", service_name);

        Ok(Self {
            address,
            path: path.to_string(),
            grace: Duration::from_secs(config.shutdown_grace_secs),
            watch_signals: true,
            registry,
            shutdown,
            default_labels,
            state: Arc::new(LifecycleState::new()),
        })
    }

    /// Only stop on the shared cancellation, never on OS signals.
    pub fn without_signal_handling(mut self) -> Self {
        self.watch_signals = false;
        self
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn default_labels(&self) -> &LabelSet {
        &self.default_labels
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// Instrumentation keyed by the raw request URI.
    pub fn request_metrics(&self) -> RequestMetrics {
        RequestMetrics::new(self.registry.clone()).with_default_labels(self.default_labels.clone())
    }

    /// Instrumentation keyed by the matched route template.
    pub fn route_metrics(&self) -> RequestMetrics {
        self.request_metrics().with_uri_mapper(MatchedRouteUri)
    }

    /// The exposition router: the metrics path, 404 elsewhere.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.path, get(render_metrics))
            .with_state(self.registry.clone())
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn start(&self) -> Result<(), MetricsServerError> {
        let listener = serve::bind(self.address).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    ///
    /// A graceful shutdown returns `Ok(())`.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), MetricsServerError> {
        tracing::info!(path = %self.path, "Metrics exposition enabled");

        let options = ServeOptions {
            watch_signals: self.watch_signals,
            ..ServeOptions::new("metrics", self.grace)
        };
        serve_until_shutdown(
            listener,
            self.router(),
            self.shutdown.clone(),
            self.state.clone(),
            options,
        )
        .await
        .map_err(|e| match e {
            ServeError::AlreadyStarted => MetricsServerError::AlreadyStarted,
            other => MetricsServerError::Serve(other),
        })
    }
}

async fn render_metrics(State(registry): State<MetricsRegistry>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        registry.render(),
    )
}
