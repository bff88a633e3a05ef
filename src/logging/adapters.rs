//! [`LeveledLogger`] implementations.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde_json::Value;

use super::backend::{Hook, Logger, Record, EXIT_FLUSH_TIMEOUT};
use super::leveled::{Fields, LeveledLogger};
use super::level::Level;

/// Adapter over the native [`Logger`].
#[derive(Debug, Clone)]
pub struct BackendLogger {
    logger: Logger,
    fields: Fields,
}

impl BackendLogger {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            fields: Fields::new(),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl LeveledLogger for BackendLogger {
    fn with_field(&self, key: &str, value: Value) -> Arc<dyn LeveledLogger> {
        Arc::new(Self {
            logger: self.logger.clone(),
            fields: self.fields.clone().with(key, value),
        })
    }

    fn with_fields(&self, fields: Fields) -> Arc<dyn LeveledLogger> {
        Arc::new(Self {
            logger: self.logger.clone(),
            fields: self.fields.clone().merged(&fields),
        })
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.logger.is_enabled(level) {
            self.logger.log(level, &self.fields, args.to_string());
        }
    }

    fn terminate(&self, code: i32) {
        self.logger.exit(code)
    }
}

const TRACING_TARGET: &str = "svc_observability::log";

/// Adapter that forwards records as `tracing` events.
///
/// `tracing` has no fatal or panic level: those are emitted at ERROR with a
/// `severity` field. Records below `level` are dropped before hooks run; the
/// installed subscriber may filter further.
#[derive(Clone)]
pub struct TracingLogger {
    level: Level,
    hooks: Arc<[Arc<dyn Hook>]>,
    fields: Fields,
}

impl fmt::Debug for TracingLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingLogger")
            .field("level", &self.level)
            .field("hooks", &self.hooks.len())
            .field("fields", &self.fields)
            .finish()
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingLogger {
    /// Forward everything, no hooks.
    pub fn new() -> Self {
        Self {
            level: Level::Debug,
            hooks: Arc::from(Vec::new()),
            fields: Fields::new(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        let mut hooks = self.hooks.to_vec();
        hooks.push(hook);
        self.hooks = hooks.into();
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    fn derive(&self, fields: Fields) -> Arc<dyn LeveledLogger> {
        Arc::new(Self {
            level: self.level,
            hooks: self.hooks.clone(),
            fields,
        })
    }

    fn fire_hooks(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.hooks.iter().any(|hook| hook.enabled(level)) {
            return;
        }
        let record = Record {
            time: Utc::now(),
            level,
            message: args.to_string(),
            fields: self.fields.clone(),
        };
        for hook in self.hooks.iter().filter(|hook| hook.enabled(level)) {
            hook.fire(&record);
        }
    }
}

impl LeveledLogger for TracingLogger {
    fn with_field(&self, key: &str, value: Value) -> Arc<dyn LeveledLogger> {
        self.derive(self.fields.clone().with(key, value))
    }

    fn with_fields(&self, fields: Fields) -> Arc<dyn LeveledLogger> {
        self.derive(self.fields.clone().merged(&fields))
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if level < self.level {
            return;
        }
        self.fire_hooks(level, args);

        let fields = &self.fields;
        match level {
            Level::Debug => tracing::debug!(target: TRACING_TARGET, fields = %fields, "{}", args),
            Level::Info => tracing::info!(target: TRACING_TARGET, fields = %fields, "{}", args),
            Level::Warn => tracing::warn!(target: TRACING_TARGET, fields = %fields, "{}", args),
            Level::Error | Level::Fatal | Level::Panic => tracing::error!(
                target: TRACING_TARGET,
                severity = level.as_str(),
                fields = %fields,
                "{}",
                args
            ),
        }
    }

    fn terminate(&self, code: i32) {
        for hook in self.hooks.iter() {
            hook.flush(EXIT_FLUSH_TIMEOUT);
        }
        std::process::exit(code)
    }
}

/// Adapter that discards everything, including fatal and panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl NoopLogger {
    /// A process-wide instance; cloning it does not allocate.
    pub fn shared() -> Arc<dyn LeveledLogger> {
        static NOOP: OnceLock<Arc<NoopLogger>> = OnceLock::new();
        NOOP.get_or_init(|| Arc::new(NoopLogger)).clone()
    }
}

impl LeveledLogger for NoopLogger {
    fn with_field(&self, _key: &str, _value: Value) -> Arc<dyn LeveledLogger> {
        NoopLogger::shared()
    }

    fn with_fields(&self, _fields: Fields) -> Arc<dyn LeveledLogger> {
        NoopLogger::shared()
    }

    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}

    fn terminate(&self, _code: i32) {}

    fn fatal_fmt(&self, _args: fmt::Arguments<'_>) {}

    fn panic_fmt(&self, _args: fmt::Arguments<'_>) {}
}
