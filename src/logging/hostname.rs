//! Hostname resolution for remote log records.

use super::LoggingError;

/// The machine hostname, or `$HOSTNAME` when the system lookup fails.
pub fn resolve_hostname() -> Result<String, LoggingError> {
    resolve_hostname_from(system_hostname(), std::env::var("HOSTNAME").ok())
}

/// Pick `lookup`, falling back to `env`; empty values count as missing.
pub fn resolve_hostname_from(
    lookup: Option<String>,
    env: Option<String>,
) -> Result<String, LoggingError> {
    lookup
        .filter(|h| !h.trim().is_empty())
        .or_else(|| env.filter(|h| !h.trim().is_empty()))
        .ok_or(LoggingError::HostnameUnresolved)
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => Some(name.to_string_lossy().into_owned()),
        Err(e) => {
            tracing::debug!(error = %e, "gethostname failed");
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}
