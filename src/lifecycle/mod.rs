//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build stats/exporter → Start senders / verifier
//!
//! Shutdown:
//!     Ctrl-C or fatal reader error → Shutdown::trigger
//!         → tail readers leave their supervisory wait and close
//!         → pipelines stop ticking; in-flight deliveries finish on their own
//! ```

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
