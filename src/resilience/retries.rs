//! Retry policy for push deliveries.
//!
//! A cycle makes at most `max_attempts` attempts. Every failed attempt is
//! followed by the same fixed delay; there is no exponential growth and no
//! jitter, so dashboards built on the cadence stay valid.

use std::time::Duration;

use reqwest::StatusCode;

use crate::config::RetryConfig;

/// Attempt cap used when nothing is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Delay after each failed attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
/// Deadline for a single attempt, connect through body.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded retry with fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff(),
            attempt_timeout: config.attempt_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `failures` failed ones.
    pub fn should_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }
}

/// Result class of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptClass {
    Success,
    Retryable,
}

/// Any 2xx is success; everything else may be retried.
pub fn classify(status: StatusCode) -> AttemptClass {
    if status.is_success() {
        AttemptClass::Success
    } else {
        AttemptClass::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.backoff, Duration::from_secs(1));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_should_retry_boundary() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(9));
        assert!(!policy.should_retry(10));
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify(StatusCode::OK), AttemptClass::Success);
        assert_eq!(classify(StatusCode::NO_CONTENT), AttemptClass::Success);
        assert_eq!(classify(StatusCode::BAD_REQUEST), AttemptClass::Retryable);
        assert_eq!(classify(StatusCode::SERVICE_UNAVAILABLE), AttemptClass::Retryable);
        assert_eq!(classify(StatusCode::MOVED_PERMANENTLY), AttemptClass::Retryable);
    }

    #[test]
    fn test_from_config_clamps_zero() {
        let mut config = RetryConfig::default();
        config.max_attempts = 0;
        config.backoff_ms = 25;
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, Duration::from_millis(25));
    }
}
