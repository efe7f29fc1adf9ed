//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (quota and window > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::BridgeConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
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

pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.ingest.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "ingest.bind_address",
            format!("'{}' is not a socket address", config.ingest.bind_address),
        ));
    }
    if !config.ingest.path.starts_with('/') {
        errors.push(ValidationError::new("ingest.path", "must start with '/'"));
    }
    if config.ingest.max_body_bytes == 0 {
        errors.push(ValidationError::new("ingest.max_body_bytes", "must be greater than 0"));
    }
    let rate_limit = &config.ingest.rate_limit;
    if rate_limit.enabled {
        if rate_limit.max_requests == 0 {
            errors.push(ValidationError::new(
                "ingest.rate_limit.max_requests",
                "must be greater than 0",
            ));
        }
        if rate_limit.window_secs == 0 {
            errors.push(ValidationError::new(
                "ingest.rate_limit.window_secs",
                "must be greater than 0",
            ));
        }
    }

    if config.logger.client_log_endpoint.trim().is_empty() {
        errors.push(ValidationError::new("logger.client_log_endpoint", "must not be empty"));
    }
    if let Some(origin) = &config.logger.server_origin {
        if url::Url::parse(origin).is_err() {
            errors.push(ValidationError::new(
                "logger.server_origin",
                format!("'{}' is not an absolute URL", origin),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
