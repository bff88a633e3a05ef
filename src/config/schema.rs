//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every section
//! carries defaults so a minimal config only needs `service_name`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Default path the metrics exposition endpoint is served on.
pub const DEFAULT_METRICS_PATH: &str = "/armory-observability/metrics";

/// Default metrics exposition address (all interfaces, port 3001).
pub const DEFAULT_METRICS_ADDRESS: &str = ":3001";

/// Root configuration for an instrumented service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name, stamped on every request metric as `appName`.
    pub service_name: String,

    /// Primary server settings.
    pub server: ServerConfig,

    /// Metrics exposition settings.
    pub metrics: MetricsConfig,

    /// Leveled logger settings.
    pub logging: LoggingConfig,
}

/// Primary server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000" or ":3000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Drain window for in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":3000".to_string(),
            request_timeout_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

/// Metrics exposition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Exposition bind address. Defaults to [`DEFAULT_METRICS_ADDRESS`].
    pub address: Option<String>,

    /// Exposition path. Defaults to [`DEFAULT_METRICS_PATH`].
    pub path: Option<String>,

    /// Drain window for in-flight scrapes on shutdown, in seconds.
    pub shutdown_grace_secs: u64,

    /// Static labels added to every request metric.
    pub default_labels: BTreeMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: None,
            path: None,
            shutdown_grace_secs: 5,
            default_labels: BTreeMap::new(),
        }
    }
}

/// Which leveled logger adapter the application context builds.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoggerBackend {
    /// Built-in backend with text/JSON formatting and the remote hook.
    #[default]
    Native,
    /// Forward records to the process-wide `tracing` subscriber.
    Tracing,
    /// Discard everything.
    Noop,
}

/// Leveled logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub backend: LoggerBackend,

    /// Remote log forwarding.
    pub remote: RemoteLoggingConfig,

    /// Structured (JSON) output.
    pub json: JsonFormatConfig,
}

/// Remote log forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RemoteLoggingConfig {
    pub enabled: bool,

    /// Collector URL every record is POSTed to.
    pub endpoint: String,

    pub version: String,

    #[serde(rename = "customerId")]
    pub customer_id: String,

    /// Lowest level forwarded. Unset forwards every level.
    pub level: Option<String>,
}

/// Structured output configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct JsonFormatConfig {
    pub enabled: bool,

    /// Level threshold; unparsable values fall back to info.
    pub level: String,

    /// Remaps the canonical `time`, `msg` and `level` keys.
    pub fields: HashMap<String, String>,
}
