//! Delivery error definitions.

use thiserror::Error;

/// Errors produced while generating or delivering one cycle.
///
/// None of these escape the pipeline driver: they are logged and counted.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Payload could not be encoded. Fatal to the cycle, never retried.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Generator could not build a payload. Fatal to the cycle.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Connection, TLS or timeout failure. Retryable.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. Retryable; the body is kept for diagnostics only.
    #[error("request error [{status}]: >>{body}<<")]
    Protocol { status: u16, body: String },

    /// The last allowed attempt failed; the payload is dropped.
    #[error("giving up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<DeliveryError>,
    },

    /// A configured header could not be applied.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
}

impl From<serde_json::Error> for DeliveryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl DeliveryError {
    /// Whether a fresh attempt may fix this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol { .. })
    }
}

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeliveryError::Protocol {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "request error [503]: >>overloaded<<");
        assert!(err.is_retryable());

        let exhausted = DeliveryError::RetryExhausted {
            attempts: 10,
            last: Box::new(err),
        };
        assert!(exhausted.to_string().starts_with("giving up after 10 attempts"));
        assert!(!exhausted.is_retryable());
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let err: DeliveryError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(matches!(err, DeliveryError::Serialization(_)));
        assert!(!err.is_retryable());
    }
}
