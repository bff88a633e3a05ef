//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse into a raw table)
//!     → schema.rs (typed ServiceConfig view)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!
//! The raw table is kept so applications can decode their own sections.
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    JsonFormatConfig, LoggerBackend, LoggingConfig, MetricsConfig, RemoteLoggingConfig,
    ServerConfig, ServiceConfig, DEFAULT_METRICS_ADDRESS, DEFAULT_METRICS_PATH,
};
pub use validation::{parse_listen_addr, validate_config, ValidationError};
