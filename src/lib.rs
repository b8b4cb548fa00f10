//! Long-running ingestion load and freshness harness.
//!
//! Pushes synthetic log traffic at a backend at a fixed cadence, retries
//! failed pushes with a bounded policy, and measures how quickly pushed
//! records reappear on live tail subscriptions.

pub mod config;
pub mod delivery;
pub mod generators;
pub mod lifecycle;
pub mod observability;
pub mod report;
pub mod resilience;
pub mod stats;
pub mod verification;

pub use config::HarnessConfig;
pub use delivery::DeliveryPipeline;
pub use lifecycle::Shutdown;
pub use stats::StatsRegistry;
pub use verification::TailVerifier;
