//! Tail verification subsystem.
//!
//! # Data Flow
//! ```text
//! reader URL
//!     → target.rs (ws/wss rewrite, tail query, org + credential headers)
//!     → subsystem.rs: N × reader.rs subscriptions
//!     → settle delay → log writer ("writer-<n>") via generators::logs
//!
//! inbound frame (reader.rs)
//!     → per record: latency = receipt − emission (seconds)
//!     → StatsRegistry: ws_lat observation + logs_received increment
//! ```
//!
//! # Design Decisions
//! - Subscription failure is fatal for the whole process; frame and record
//!   errors are skipped silently
//! - Readers stay subscribed for the life of the run; cancellation only
//!   closes the outbound side, the read loop ends with the connection
//! - One receipt time per frame, shared by all records in it

pub mod reader;
pub mod subsystem;
pub mod target;
pub mod types;

pub use reader::{record_frame, TailReader};
pub use subsystem::{TailVerifier, VerifierSettings};
pub use target::{tail_query, TailTarget, TAIL_PATH};
pub use types::{FrameError, TailError, TailFrame, TailResult, TailStream};
