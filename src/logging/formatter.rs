//! Record formatters for the native backend.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde_json::{Map, Value};
use thiserror::Error;

use super::backend::Record;

pub const FIELD_KEY_TIME: &str = "time";
pub const FIELD_KEY_MSG: &str = "msg";
pub const FIELD_KEY_LEVEL: &str = "level";

#[derive(Debug, Error)]
#[error("failed to format log record: {0}")]
pub struct FormatError(#[from] serde_json::Error);

/// Turns a record into the bytes written to the output.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError>;
}

pub(crate) fn timestamp(record: &Record) -> String {
    record.time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `key=value` lines, quoting values that contain anything beyond a plain
/// identifier-ish character set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut line = String::with_capacity(128);
        write_pair(&mut line, FIELD_KEY_TIME, &timestamp(record));
        line.push(' ');
        write_pair(&mut line, FIELD_KEY_LEVEL, record.level.as_str());
        line.push(' ');
        write_pair(&mut line, FIELD_KEY_MSG, &record.message);
        for (key, value) in record.fields.iter() {
            line.push(' ');
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            write_pair(&mut line, key, &text);
        }
        line.push('\n');
        Ok(line.into_bytes())
    }
}

fn write_pair(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    if needs_quoting(value) {
        let _ = write!(out, "{value:?}");
    } else {
        out.push_str(value);
    }
}

/// Empty values are written bare (`key=`).
fn needs_quoting(value: &str) -> bool {
    value.chars().any(|c| {
        !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+'))
    })
}

/// Renames for the built-in JSON keys.
///
/// Only `time`, `msg` and `level` can be renamed; other entries in the
/// configured map are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    time: Option<String>,
    msg: Option<String>,
    level: Option<String>,
}

impl FieldMap {
    pub fn from_config(fields: &HashMap<String, String>) -> Self {
        let mut map = FieldMap::default();
        for (key, renamed) in fields {
            let slot = match key.as_str() {
                FIELD_KEY_TIME => &mut map.time,
                FIELD_KEY_MSG => &mut map.msg,
                FIELD_KEY_LEVEL => &mut map.level,
                _ => continue,
            };
            if !renamed.is_empty() {
                *slot = Some(renamed.clone());
            }
        }
        map
    }

    pub fn time_key(&self) -> &str {
        self.time.as_deref().unwrap_or(FIELD_KEY_TIME)
    }

    pub fn msg_key(&self) -> &str {
        self.msg.as_deref().unwrap_or(FIELD_KEY_MSG)
    }

    pub fn level_key(&self) -> &str {
        self.level.as_deref().unwrap_or(FIELD_KEY_LEVEL)
    }

    fn is_reserved(&self, key: &str) -> bool {
        key == self.time_key() || key == self.msg_key() || key == self.level_key()
    }
}

/// One JSON object per line.
///
/// A user field that collides with a built-in key is kept as
/// `fields.<key>` rather than overwriting it.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    field_map: FieldMap,
}

impl JsonFormatter {
    pub fn new(field_map: FieldMap) -> Self {
        Self { field_map }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut data = Map::new();
        for (key, value) in record.fields.iter() {
            let key = if self.field_map.is_reserved(key) {
                format!("fields.{key}")
            } else {
                key.to_string()
            };
            data.insert(key, value.clone());
        }
        data.insert(
            self.field_map.time_key().to_string(),
            Value::String(timestamp(record)),
        );
        data.insert(
            self.field_map.msg_key().to_string(),
            Value::String(record.message.clone()),
        );
        data.insert(
            self.field_map.level_key().to_string(),
            Value::String(record.level.as_str().to_string()),
        );

        let mut bytes = serde_json::to_vec(&Value::Object(data))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
