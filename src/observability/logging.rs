//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level so a single run can be
//! made noisier without touching the config file.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a configured level.
pub fn default_directive(level: &str) -> String {
    format!("ingest_longtest={level},tower_http=warn")
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
