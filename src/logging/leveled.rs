//! The leveled logger capability interface.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::level::Level;

/// Structured fields attached to a log record, in insertion order.
///
/// Keys are unique; setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key.into(), value.into());
        self
    }

    /// Return a copy with every field of `other` set.
    pub fn merged(mut self, other: &Fields) -> Self {
        for (key, value) in other.iter() {
            self.set(key.to_string(), value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn set(&mut self, key: String, value: Value) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Fields::new(), |fields, (k, v)| fields.with(k, v))
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Leveled, structured logging.
///
/// Call sites depend only on this trait; the backend behind it can be swapped
/// (native, `tracing`, no-op) without changing their behavior. `with_field`
/// and `with_fields` return a new logger and never modify the receiver.
pub trait LeveledLogger: Send + Sync {
    fn with_field(&self, key: &str, value: Value) -> Arc<dyn LeveledLogger>;

    fn with_fields(&self, fields: Fields) -> Arc<dyn LeveledLogger>;

    /// Emit one record if `level` passes the logger's threshold.
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    /// Ends the process after a fatal record.
    fn terminate(&self, code: i32) {
        std::process::exit(code)
    }

    fn debug(&self, message: &str) {
        self.log(Level::Debug, format_args!("{message}"))
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, format_args!("{message}"))
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, format_args!("{message}"))
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, format_args!("{message}"))
    }

    fn fatal(&self, message: &str) {
        self.fatal_fmt(format_args!("{message}"))
    }

    fn panic(&self, message: &str) {
        self.panic_fmt(format_args!("{message}"))
    }

    fn debug_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }

    fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    fn warn_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    /// Emit at fatal level, then [`LeveledLogger::terminate`] with status 1.
    fn fatal_fmt(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Fatal, args);
        self.terminate(1);
    }

    /// Emit at panic level, then panic with the same message.
    fn panic_fmt(&self, args: fmt::Arguments<'_>) {
        let message = args.to_string();
        self.log(Level::Panic, format_args!("{message}"));
        panic!("{message}");
    }
}
