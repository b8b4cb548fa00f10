//! Tail frame shapes and verification errors.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::delivery::DeliveryError;

/// One inbound tail message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TailFrame {
    #[serde(default)]
    pub streams: Vec<TailStream>,
}

/// A label-set and the entries pushed for it.
///
/// Entries are kept loosely typed: the first element is the nanosecond
/// timestamp string, anything after it is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TailStream {
    #[serde(default)]
    pub stream: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// Errors that stop verification from starting or continuing.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("invalid tail URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported tail URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    #[error("subscription to {url} failed: {source}")]
    Subscribe {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("log writer could not be built: {0}")]
    Writer(#[from] DeliveryError),
}

/// Errors confined to a single frame or record. Never propagated.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record timestamp '{0}' is not a nanosecond integer")]
    Timestamp(String),
}

/// Result type for tail subscription setup.
pub type TailResult<T> = Result<T, TailError>;
