//! Primary HTTP server.
//!
//! # Responsibilities
//! - Wrap the application router with request metrics, timeout and tracing
//! - Bind the configured address
//! - Serve until the shared shutdown fires, draining within the grace window

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{parse_listen_addr, ServerConfig};
use crate::lifecycle::serve::{self, serve_until_shutdown, ServeError, ServeOptions};
use crate::lifecycle::{LifecycleState, ServerState, Shutdown};
use crate::metrics::RequestMetrics;

#[derive(Debug, Error)]
pub enum HttpServerError {
    #[error("invalid server bind address {0:?}")]
    InvalidAddress(String),

    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// HTTP server for the application's own routes.
pub struct HttpServer {
    router: Router,
    address: SocketAddr,
    grace: Duration,
    shutdown: Shutdown,
    state: Arc<LifecycleState>,
}

impl HttpServer {
    /// Create a server for `app`, instrumented with `metrics`.
    pub fn new(
        config: &ServerConfig,
        app: Router,
        metrics: RequestMetrics,
        shutdown: Shutdown,
    ) -> Result<Self, HttpServerError> {
        let address = parse_listen_addr(&config.bind_address)
            .ok_or_else(|| HttpServerError::InvalidAddress(config.bind_address.clone()))?;

        let router = Self::build_router(config, app, metrics);
        Ok(Self {
            router,
            address,
            grace: Duration::from_secs(config.shutdown_grace_secs),
            shutdown,
            state: Arc::new(LifecycleState::new()),
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Metrics sit outside the timeout so timed-out requests are recorded.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, app: Router, metrics: RequestMetrics) -> Router {
        let app = app.layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )));
        metrics
            .instrument(app)
            .layer(TraceLayer::new_for_http())
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn start(self) -> Result<(), HttpServerError> {
        let listener = serve::bind(self.address).await?;
        self.run(listener).await
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), HttpServerError> {
        serve_until_shutdown(
            listener,
            self.router,
            self.shutdown,
            self.state,
            ServeOptions::new("http", self.grace),
        )
        .await?;
        Ok(())
    }
}
