//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that would otherwise
//! surface as runtime failures deep inside a sender or reader.
//! All violations are reported, not just the first.

use std::net::SocketAddr;

use reqwest::header::HeaderName;
use thiserror::Error;

use crate::config::schema::HarnessConfig;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be set when its mode is enabled")]
    MissingUrl(&'static str),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid header name '{0}'")]
    HeaderName(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &HarnessConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let pushes = config.modes.logs || config.modes.plain_text || config.modes.tail;
    if pushes && config.target.url.trim().is_empty() {
        errors.push(ValidationError::MissingUrl("target.url"));
    }
    if config.modes.tail {
        if config.tail.url.trim().is_empty() {
            errors.push(ValidationError::MissingUrl("tail.url"));
        }
        if config.tail.readers == 0 {
            errors.push(ValidationError::Zero { field: "tail.readers" });
        }
        if config.tail.lines_per_tick == 0 {
            errors.push(ValidationError::Zero { field: "tail.lines_per_tick" });
        }
    }

    if config.modes.logs && config.payload.log_lines_per_tick == 0 {
        errors.push(ValidationError::Zero { field: "payload.log_lines_per_tick" });
    }
    if config.modes.plain_text && config.payload.plain_lines_per_tick == 0 {
        errors.push(ValidationError::Zero { field: "payload.plain_lines_per_tick" });
    }
    if config.payload.sends_per_tick == 0 {
        errors.push(ValidationError::Zero { field: "payload.sends_per_tick" });
    }
    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "retry.max_attempts" });
    }
    if config.retry.attempt_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "retry.attempt_timeout_secs" });
    }

    for name in config.target.headers.keys() {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
    }

    if config.modes.tail
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
