//! Delivery and verification statistics.
//!
//! One [`StatsRegistry`] is constructed by the orchestrator and injected
//! into every pipeline and tail reader. Snapshots are eventually consistent
//! and never tied to a single delivery.

pub mod registry;

pub use registry::{labelled, StatsRegistry, StatsSnapshot, Summary};

/// Successful deliveries.
pub const REQ_OK: &str = "req_ok";
/// Retryable attempt failures.
pub const REQ_ERR: &str = "req_err";
/// Cycles abandoned after the last retry.
pub const REQ_FAIL: &str = "req_fail";
/// Body size of successful deliveries, bytes.
pub const REQ_BYTES: &str = "req_bytes";
/// Duration of the successful attempt, milliseconds.
pub const REQ_TIME_MS: &str = "req_time_ms";
/// Records sent, per sender identity.
pub const SENT_SIZE: &str = "sent_size_count";
/// Emission-to-receipt latency on tail subscriptions, seconds.
pub const TAIL_LATENCY: &str = "ws_lat";
/// Records observed on tail subscriptions.
pub const LOGS_RECEIVED: &str = "logs_received";
