//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Delivery attempt:
//!     → per-attempt timeout (reqwest client deadline)
//!     → classify (transport error / non-2xx → retryable, 2xx → success)
//!     → retryable: fixed backoff, next attempt until the cap
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every push has a deadline
//! - Retries stay inside one cycle and never requeue the payload

pub mod retries;

pub use retries::{classify, AttemptClass, RetryPolicy};
