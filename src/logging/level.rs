//! Log levels.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Severity of a log record, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    /// Emitted, then the process exits.
    Fatal,
    /// Emitted, then the calling thread panics.
    Panic,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("not a valid log level: {0:?}")]
pub struct ParseLevelError(String);

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
        }
    }

    /// Parse `value`, falling back to `default` when it is not a level name.
    pub fn parse_or(value: &str, default: Level) -> Level {
        value.parse().unwrap_or(default)
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "panic" => Ok(Level::Panic),
            "fatal" => Ok(Level::Fatal),
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" | "trace" => Ok(Level::Debug),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("WARN".parse(), Ok(Level::Warn));
        assert_eq!("warning".parse(), Ok(Level::Warn));
        assert_eq!(" debug ".parse(), Ok(Level::Debug));
        assert_eq!("trace".parse(), Ok(Level::Debug));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_unparsable_falls_back() {
        assert_eq!(Level::parse_or("", Level::Info), Level::Info);
        assert_eq!(Level::parse_or("loud", Level::Info), Level::Info);
        assert_eq!(Level::parse_or("error", Level::Info), Level::Error);
    }

    #[test]
    fn test_severity_order() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Fatal < Level::Panic);
        assert_eq!(Level::ALL.iter().max(), Some(&Level::Panic));
    }
}
