//! Building loggers from [`LoggingConfig`].

use std::sync::Arc;

use url::Url;

use crate::config::{LoggerBackend, LoggingConfig, RemoteLoggingConfig};

use super::adapters::{BackendLogger, NoopLogger, TracingLogger};
use super::backend::{Logger, LoggerBuilder};
use super::formatter::{FieldMap, JsonFormatter};
use super::hostname::resolve_hostname;
use super::leveled::LeveledLogger;
use super::level::Level;
use super::remote::{HttpLogFormatter, RemoteLogHook};
use super::LoggingError;

/// Create the process logger for `config`.
pub fn new_leveled_logger(config: &LoggingConfig) -> Result<Arc<dyn LeveledLogger>, LoggingError> {
    new_leveled_logger_with(config, resolve_hostname)
}

/// [`new_leveled_logger`] with an explicit hostname resolver.
///
/// The native and tracing backends both honour `json.level` and remote
/// forwarding. The noop backend ignores both.
pub fn new_leveled_logger_with<F>(
    config: &LoggingConfig,
    resolve_hostname: F,
) -> Result<Arc<dyn LeveledLogger>, LoggingError>
where
    F: FnOnce() -> Result<String, LoggingError>,
{
    match config.backend {
        LoggerBackend::Native => {
            let logger = configure_logger_with(Logger::builder(), config, resolve_hostname)?.build();
            Ok(Arc::new(BackendLogger::new(logger)))
        }
        LoggerBackend::Tracing => {
            let mut logger =
                TracingLogger::new().with_level(Level::parse_or(&config.json.level, Level::Info));
            if config.remote.enabled {
                let hook = remote_hook(&config.remote, resolve_hostname)?;
                tracing::info!(endpoint = %hook.endpoint(), "Remote log forwarding enabled");
                logger = logger.with_hook(Arc::new(hook));
            }
            Ok(Arc::new(logger))
        }
        LoggerBackend::Noop => Ok(NoopLogger::shared()),
    }
}

/// Apply level, format and remote forwarding from `config` to `builder`.
pub fn configure_logger(
    builder: LoggerBuilder,
    config: &LoggingConfig,
) -> Result<LoggerBuilder, LoggingError> {
    configure_logger_with(builder, config, resolve_hostname)
}

/// [`configure_logger`] with an explicit hostname resolver.
pub fn configure_logger_with<F>(
    mut builder: LoggerBuilder,
    config: &LoggingConfig,
    resolve_hostname: F,
) -> Result<LoggerBuilder, LoggingError>
where
    F: FnOnce() -> Result<String, LoggingError>,
{
    builder = builder.level(Level::parse_or(&config.json.level, Level::Info));

    if config.json.enabled {
        let field_map = FieldMap::from_config(&config.json.fields);
        builder = builder.formatter(JsonFormatter::new(field_map));
    }

    if config.remote.enabled {
        let hook = remote_hook(&config.remote, resolve_hostname)?;
        tracing::info!(endpoint = %hook.endpoint(), "Remote log forwarding enabled");
        builder = builder.hook(Arc::new(hook));
    }

    Ok(builder)
}

/// Build the remote hook. The endpoint is checked before the hostname.
pub fn remote_hook<F>(
    config: &RemoteLoggingConfig,
    resolve_hostname: F,
) -> Result<RemoteLogHook, LoggingError>
where
    F: FnOnce() -> Result<String, LoggingError>,
{
    if config.endpoint.trim().is_empty() {
        return Err(LoggingError::MissingRemoteEndpoint);
    }
    let endpoint =
        Url::parse(&config.endpoint).map_err(|source| LoggingError::InvalidRemoteEndpoint {
            endpoint: config.endpoint.clone(),
            source,
        })?;

    let hostname = resolve_hostname()?;
    let formatter = HttpLogFormatter::new(hostname, &config.customer_id, &config.version)?;

    let threshold = config
        .level
        .as_deref()
        .map_or(Level::Debug, |level| Level::parse_or(level, Level::Debug));

    RemoteLogHook::new(endpoint, formatter, threshold)
}
