//! Application context.
//!
//! # Responsibilities
//! - Decode and validate the service configuration
//! - Build the logger, metrics registry and exposition server once
//! - Hand typed views of application-specific config sections to callers
//! - Run the primary server and the exposition server on one shutdown signal
//!
//! # Design Decisions
//! - Construction fails fast on any config, logging or metrics error
//! - The raw config table is kept so application sections stay available

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::loader::{self, ConfigError};
use crate::config::ServiceConfig;
use crate::http::{HttpServer, HttpServerError};
use crate::lifecycle::Shutdown;
use crate::logging::{new_leveled_logger, LeveledLogger, LoggingError};
use crate::metrics::{MetricsRegistry, MetricsServer, MetricsServerError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Metrics(#[from] MetricsServerError),

    #[error(transparent)]
    Http(#[from] HttpServerError),
}

/// Everything a service needs, wired from one config.
pub struct ApplicationContext {
    raw: toml::Table,
    config: ServiceConfig,
    logger: Arc<dyn LeveledLogger>,
    registry: MetricsRegistry,
    metrics_server: MetricsServer,
    shutdown: Shutdown,
}

impl ApplicationContext {
    pub fn new(raw: toml::Table, shutdown: Shutdown) -> Result<Self, AppError> {
        let config = loader::service_config(&raw)?;
        let logger = new_leveled_logger(&config.logging)?;
        let registry = MetricsRegistry::new();
        let metrics_server = MetricsServer::new(
            &config.service_name,
            &config.metrics,
            registry.clone(),
            shutdown.clone(),
        )?;

        tracing::debug!(service = %config.service_name, "Application context ready");

        Ok(Self {
            raw,
            config,
            logger,
            registry,
            metrics_server,
            shutdown,
        })
    }

    /// Load the config file at `path` and build the context.
    pub fn from_path(path: &Path, shutdown: Shutdown) -> Result<Self, AppError> {
        let raw = loader::load_raw(path)?;
        Self::new(raw, shutdown)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn logger(&self) -> Arc<dyn LeveledLogger> {
        self.logger.clone()
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    pub fn metrics_server(&self) -> &MetricsServer {
        &self.metrics_server
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Decode an application-defined view of the config.
    pub fn get_config<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        Ok(loader::decode(&self.raw)?)
    }

    /// Run the exposition server until shutdown.
    pub async fn collect_metrics(&self) -> Result<(), AppError> {
        Ok(self.metrics_server.start().await?)
    }

    /// Bind the configured address and serve `router` until shutdown.
    pub async fn start(&self, router: Router) -> Result<(), AppError> {
        Ok(self.http_server(router)?.start().await?)
    }

    /// Serve `router` on a bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener, router: Router) -> Result<(), AppError> {
        Ok(self.http_server(router)?.run(listener).await?)
    }

    fn http_server(&self, router: Router) -> Result<HttpServer, HttpServerError> {
        HttpServer::new(
            &self.config.server,
            router,
            self.metrics_server.route_metrics(),
            self.shutdown.clone(),
        )
    }
}
