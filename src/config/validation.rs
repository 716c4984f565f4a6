//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that URLs and addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.base_port == 0 {
        errors.push(ValidationError::new("listener.base_port", "must be non-zero"));
    }
    if config.listener.bind_host.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_host", "must not be empty"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be at least 1"));
    }

    if let Err(e) = url::Url::parse(&config.upstream.base_url) {
        errors.push(ValidationError::new(
            "upstream.base_url",
            format!("invalid URL '{}': {}", config.upstream.base_url, e),
        ));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.request_timeout_secs", "must be non-zero"));
    }
    if config.upstream.max_connections == 0 {
        errors.push(ValidationError::new("upstream.max_connections", "must be at least 1"));
    }

    if config.limits.max_request_bytes == 0 {
        errors.push(ValidationError::new("limits.max_request_bytes", "must be non-zero"));
    }
    if config.limits.read_chunk_bytes == 0 {
        errors.push(ValidationError::new("limits.read_chunk_bytes", "must be non-zero"));
    } else if config.limits.read_chunk_bytes > config.limits.max_request_bytes {
        errors.push(ValidationError::new(
            "limits.read_chunk_bytes",
            "must not exceed limits.max_request_bytes",
        ));
    }

    if config.timeouts.connection_secs == 0 {
        errors.push(ValidationError::new("timeouts.connection_secs", "must be non-zero"));
    }
    if config.timeouts.probe_secs == 0 {
        errors.push(ValidationError::new("timeouts.probe_secs", "must be non-zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
