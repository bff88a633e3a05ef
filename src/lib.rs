//! Service observability toolkit: metrics registry and exposition server,
//! request instrumentation, leveled logging with remote forwarding.

pub mod app;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod metrics;

pub use app::{AppError, ApplicationContext};
pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use logging::{Level, LeveledLogger};
pub use metrics::{MetricsRegistry, MetricsServer};
