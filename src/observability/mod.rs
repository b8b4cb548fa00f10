//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipelines and tail readers produce:
//!     → tracing events (logging.rs subscriber)
//!     → StatsRegistry updates, mirrored into metrics.rs
//!
//! Consumers:
//!     → Console reporter (StatsRegistry snapshots)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::Exporter;
