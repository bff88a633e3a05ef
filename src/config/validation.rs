//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate listen addresses and the exposition path
//! - Require a remote endpoint whenever remote forwarding is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("service_name must not be empty")]
    MissingServiceName,

    #[error("{field}: invalid listen address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("metrics.path must start with '/', got {0:?}")]
    InvalidMetricsPath(String),

    #[error("remote log forwarding enabled but logging.remote.endpoint is unset")]
    MissingRemoteEndpoint,

    #[error("logging.remote.endpoint {0:?} is not a valid URL")]
    InvalidRemoteEndpoint(String),
}

/// Parse a listen address. A bare `":port"` binds all IPv4 interfaces.
pub fn parse_listen_addr(value: &str) -> Option<SocketAddr> {
    if let Some(port) = value.strip_prefix(':') {
        let port = port.parse().ok()?;
        return Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }
    value.parse().ok()
}

/// Check a loaded configuration for semantic errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::MissingServiceName);
    }

    if parse_listen_addr(&config.server.bind_address).is_none() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    if let Some(addr) = config.metrics.address.as_deref().filter(|a| !a.is_empty()) {
        if parse_listen_addr(addr).is_none() {
            errors.push(ValidationError::InvalidAddress {
                field: "metrics.address",
                value: addr.to_string(),
            });
        }
    }

    if let Some(path) = config.metrics.path.as_deref().filter(|p| !p.is_empty()) {
        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidMetricsPath(path.to_string()));
        }
    }

    let remote = &config.logging.remote;
    if remote.enabled {
        if remote.endpoint.is_empty() {
            errors.push(ValidationError::MissingRemoteEndpoint);
        } else if url::Url::parse(&remote.endpoint).is_err() {
            errors.push(ValidationError::InvalidRemoteEndpoint(remote.endpoint.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listen_addr() {
        assert_eq!(
            parse_listen_addr(":3001"),
            Some("0.0.0.0:3001".parse().unwrap())
        );
        assert_eq!(
            parse_listen_addr("127.0.0.1:9000"),
            Some("127.0.0.1:9000".parse().unwrap())
        );
        assert!(parse_listen_addr(":nope").is_none());
        assert!(parse_listen_addr("localhost").is_none());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.server.bind_address = "garbage".into();
        config.metrics.path = Some("metrics".into());
        config.logging.remote.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::MissingServiceName));
        assert!(errors.contains(&ValidationError::MissingRemoteEndpoint));
    }

    #[test]
    fn test_remote_endpoint_only_required_when_enabled() {
        let mut config = ServiceConfig {
            service_name: "canals".into(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());

        config.logging.remote.enabled = true;
        config.logging.remote.endpoint = "not a url".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidRemoteEndpoint("not a url".into())]
        );

        config.logging.remote.endpoint = "http://collector.local/logs".into();
        assert!(validate_config(&config).is_ok());
    }
}
