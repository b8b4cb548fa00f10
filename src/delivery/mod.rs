//! Delivery subsystem.
//!
//! # Data Flow
//! ```text
//! tick (pipeline.rs driver)
//!     → Generator::generate (request.rs contract, random.rs helper)
//!     → RequestSource::serialize
//!     → spawned delivery: POST with bounded retry (resilience)
//!     → StatsRegistry (ok / err / fail, bytes, latency, sent size)
//! ```
//!
//! # Design Decisions
//! - One spawned task per cycle; the driver never awaits deliveries
//! - The record-count capability is checked per payload, not assumed
//! - Each pipeline owns its random source and HTTP client

pub mod pipeline;
pub mod random;
pub mod request;
pub mod types;

pub use pipeline::{DeliveryPipeline, PipelineSettings};
pub use random::RandomSource;
pub use request::{Generator, RawRequest, RequestSource, SizedRequest};
pub use types::{DeliveryError, DeliveryResult};
