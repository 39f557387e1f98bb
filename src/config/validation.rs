//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL > 0, buffers > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// Minimum accepted length of the session signing secret.
pub const MIN_SECRET_LEN: usize = 16;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("session.secret must be at least {MIN_SECRET_LEN} bytes")]
    ShortSecret,

    #[error("bridge.namespace must not contain '.' or whitespace")]
    InvalidNamespace,

    #[error("observability.log_format must be \"pretty\" or \"json\", got {0:?}")]
    LogFormat(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.playground.extension.is_empty() {
        errors.push(ValidationError::Empty { field: "playground.extension" });
    }

    if config.session.secret.is_empty() {
        errors.push(ValidationError::Empty { field: "session.secret" });
    } else if config.session.secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::ShortSecret);
    }

    if config.session.cookie_name.is_empty() {
        errors.push(ValidationError::Empty { field: "session.cookie_name" });
    }

    if config.session.max_age_secs == 0 {
        errors.push(ValidationError::Zero { field: "session.max_age_secs" });
    }

    if config.live.marker_header.is_empty() {
        errors.push(ValidationError::Empty { field: "live.marker_header" });
    }

    if config.live.buffer == 0 {
        errors.push(ValidationError::Zero { field: "live.buffer" });
    }

    if config.live.default_delay_ms == 0 {
        errors.push(ValidationError::Zero { field: "live.default_delay_ms" });
    }

    if config.bridge.namespace.is_empty() {
        errors.push(ValidationError::Empty { field: "bridge.namespace" });
    } else if config
        .bridge
        .namespace
        .chars()
        .any(|c| c == '.' || c.is_whitespace())
    {
        errors.push(ValidationError::InvalidNamespace);
    }

    if config.bridge.capacity == 0 {
        errors.push(ValidationError::Zero { field: "bridge.capacity" });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::LogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
