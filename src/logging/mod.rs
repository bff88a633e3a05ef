//! Leveled logging subsystem.
//!
//! # Data Flow
//! ```text
//! call site → LeveledLogger (trait)
//!                ├→ BackendLogger → Logger: threshold → hooks → formatter → writer
//!                │                                        └→ RemoteLogHook → collector
//!                ├→ TracingLogger: threshold → hooks → tracing events
//!                └→ NoopLogger
//! ```
//!
//! # Design Decisions
//! - Call sites only see [`LeveledLogger`]; the backend is chosen by config
//! - Loggers are immutable; deriving one with extra fields copies them
//! - This is the application log stream. Internal diagnostics of this crate
//!   go through `tracing` directly

pub mod adapters;
pub mod backend;
pub mod configure;
pub mod formatter;
pub mod hostname;
pub mod level;
pub mod leveled;
pub mod remote;

use thiserror::Error;

pub use adapters::{BackendLogger, NoopLogger, TracingLogger};
pub use backend::{Hook, Logger, LoggerBuilder, Record, EXIT_FLUSH_TIMEOUT};
pub use configure::{
    configure_logger, configure_logger_with, new_leveled_logger, new_leveled_logger_with,
    remote_hook,
};
pub use formatter::{FieldMap, FormatError, Formatter, JsonFormatter, TextFormatter};
pub use hostname::{resolve_hostname, resolve_hostname_from};
pub use level::{Level, ParseLevelError};
pub use leveled::{Fields, LeveledLogger};
pub use remote::{HttpLogFormatter, RemoteLogHook, RemoteLogStats, REMOTE_QUEUE_CAPACITY};

/// Errors raised while building a logger.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("remote logging is enabled but no endpoint is configured")]
    MissingRemoteEndpoint,

    #[error("invalid remote logging endpoint {endpoint:?}: {source}")]
    InvalidRemoteEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unable to determine hostname for remote logging")]
    HostnameUnresolved,

    #[error("failed to instantiate remote log formatter: {0}")]
    RemoteFormatter(&'static str),

    #[error("failed to start remote log delivery: {0}")]
    Worker(#[source] std::io::Error),
}
