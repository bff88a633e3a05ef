//! Native logging backend.
//!
//! # Responsibilities
//! - Drop records below the configured threshold
//! - Fire hooks for records that pass, before local formatting
//! - Format and write each record to the configured output
//!
//! # Design Decisions
//! - The output sits behind a mutex so lines from concurrent callers never
//!   interleave
//! - Write and format failures are reported through `tracing` and otherwise
//!   swallowed; logging never fails the caller
//! - Before a fatal exit every hook gets a bounded window to flush

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::formatter::{Formatter, TextFormatter};
use super::leveled::Fields;
use super::level::Level;

/// One log event as seen by hooks and formatters.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub fields: Fields,
}

/// Side channel invoked for every record that passes the threshold.
pub trait Hook: Send + Sync {
    /// Levels this hook wants to see.
    fn enabled(&self, level: Level) -> bool;

    /// Handle one record. Must not block the caller for long.
    fn fire(&self, record: &Record);

    /// Wait at most `timeout` for records already fired to be handled.
    fn flush(&self, _timeout: Duration) {}
}

/// Flush window granted to hooks before the process exits.
pub const EXIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub type ExitHandler = Arc<dyn Fn(i32) + Send + Sync>;

struct LoggerCore {
    level: Level,
    formatter: Box<dyn Formatter>,
    out: Mutex<Box<dyn Write + Send>>,
    hooks: Vec<Arc<dyn Hook>>,
    exit: ExitHandler,
}

/// Shared, cheaply cloneable native logger.
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.core.level)
            .field("hooks", &self.core.hooks.len())
            .finish()
    }
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    pub fn level(&self) -> Level {
        self.core.level
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.core.level
    }

    pub fn hook_count(&self) -> usize {
        self.core.hooks.len()
    }

    /// Emit a record: threshold, hooks, then format and write.
    pub fn log(&self, level: Level, fields: &Fields, message: String) {
        if !self.is_enabled(level) {
            return;
        }

        let record = Record {
            time: Utc::now(),
            level,
            message,
            fields: fields.clone(),
        };

        for hook in &self.core.hooks {
            if hook.enabled(level) {
                hook.fire(&record);
            }
        }

        let bytes = match self.core.formatter.format(&record) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping log record");
                return;
            }
        };

        let mut out = self.core.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(&bytes).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "Failed to write log record");
        }
    }

    /// Flush every hook, then run the exit handler.
    pub fn exit(&self, code: i32) {
        for hook in &self.core.hooks {
            hook.flush(EXIT_FLUSH_TIMEOUT);
        }
        (self.core.exit)(code)
    }
}

/// Builder for [`Logger`]. Defaults: info threshold, text format, stderr.
pub struct LoggerBuilder {
    level: Level,
    formatter: Box<dyn Formatter>,
    out: Box<dyn Write + Send>,
    hooks: Vec<Arc<dyn Hook>>,
    exit: ExitHandler,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: Level::Info,
            formatter: Box::new(TextFormatter),
            out: Box::new(io::stderr()),
            hooks: Vec::new(),
            exit: Arc::new(|code| std::process::exit(code)),
        }
    }
}

impl LoggerBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn writer(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Replace the process exit used after fatal records.
    pub fn exit_handler(mut self, exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit = Arc::new(exit);
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            core: Arc::new(LoggerCore {
                level: self.level,
                formatter: self.formatter,
                out: Mutex::new(self.out),
                hooks: self.hooks,
                exit: self.exit,
            }),
        }
    }
}
