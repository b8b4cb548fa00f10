//! One long-lived tail subscription.
//!
//! A reader runs two activities once subscribed:
//! - the read loop, which turns every inbound record into one latency
//!   observation and one received-count increment, and exits on its own
//!   when the connection errors or closes;
//! - the supervisory wait, which blocks on the shared cancellation signal
//!   and then closes the connection.
//!
//! Failing to subscribe is reported on the fatal channel. Malformed frames
//! and records are skipped and never leave the reader.

use std::sync::Arc;
use std::time::SystemTime;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::generators::logs::unix_nanos;
use crate::lifecycle::ShutdownSignal;
use crate::stats::{StatsRegistry, LOGS_RECEIVED, TAIL_LATENCY};
use crate::verification::target::TailTarget;
use crate::verification::types::{FrameError, TailError, TailFrame};

/// A tail subscriber.
#[derive(Debug, Clone)]
pub struct TailReader {
    index: usize,
    target: Arc<TailTarget>,
    stats: Arc<StatsRegistry>,
}

impl TailReader {
    pub fn new(index: usize, target: Arc<TailTarget>, stats: Arc<StatsRegistry>) -> Self {
        Self {
            index,
            target,
            stats,
        }
    }

    /// Subscribe, then read until cancelled.
    pub async fn run(self, mut shutdown: ShutdownSignal, fatal: mpsc::UnboundedSender<TailError>) {
        let request = match self.target.request() {
            Ok(request) => request,
            Err(e) => {
                let _ = fatal.send(e);
                return;
            }
        };

        let socket = match tokio_tungstenite::connect_async(request).await {
            Ok((socket, _)) => socket,
            Err(source) => {
                tracing::error!(reader = self.index, url = %self.target.url, error = %source, "Tail subscription failed");
                let _ = fatal.send(TailError::Subscribe {
                    url: self.target.url.to_string(),
                    source,
                });
                return;
            }
        };
        tracing::debug!(reader = self.index, url = %self.target.url, "Tail subscription established");

        let (mut sink, stream) = socket.split();
        tokio::spawn(read_loop(stream, self.stats.clone(), self.index));

        shutdown.wait().await;

        // Ask the backend to close; the read loop ends when it does.
        tracing::debug!(reader = self.index, "Tail reader closing");
        let _ = sink.close().await;
    }
}

async fn read_loop<S>(mut stream: S, stats: Arc<StatsRegistry>, reader: usize)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        let received_at = SystemTime::now();
        let result = match message {
            Ok(Message::Text(text)) => record_frame(&stats, text.as_bytes(), received_at),
            Ok(Message::Binary(data)) => record_frame(&stats, &data, received_at),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(reader, error = %e, "Tail connection ended");
                break;
            }
        };
        if let Err(e) = result {
            tracing::debug!(reader, error = %e, "Skipping malformed tail frame");
        }
    }
}

/// Fold one frame into the shared stats.
///
/// Every record with a parseable timestamp yields one latency observation
/// (seconds between emission and `received_at`) and one received increment.
/// Returns the number of records recorded.
pub fn record_frame(
    stats: &StatsRegistry,
    payload: &[u8],
    received_at: SystemTime,
) -> Result<usize, FrameError> {
    let frame: TailFrame = serde_json::from_slice(payload)?;
    let now = unix_nanos(received_at);
    let mut recorded = 0;

    for stream in &frame.streams {
        for entry in &stream.values {
            match entry_latency(entry, now) {
                Ok(latency) => {
                    stats.observe(TAIL_LATENCY, latency);
                    stats.inc(LOGS_RECEIVED);
                    recorded += 1;
                }
                Err(e) => tracing::debug!(error = %e, "Skipping tail record"),
            }
        }
    }
    Ok(recorded)
}

/// Seconds between the entry's emission stamp and `now` (Unix nanoseconds).
fn entry_latency(entry: &[serde_json::Value], now: i128) -> Result<f64, FrameError> {
    let emitted = entry_timestamp(entry)?;
    let nanos = now
        .checked_sub(i128::from(emitted))
        .ok_or_else(|| FrameError::Timestamp(emitted.to_string()))?;
    Ok(nanos as f64 / 1e9)
}

/// Emission stamps are signed 64-bit nanosecond counts.
fn entry_timestamp(entry: &[serde_json::Value]) -> Result<i64, FrameError> {
    let raw = match entry.first() {
        Some(serde_json::Value::String(s)) => s.as_str(),
        Some(other) => return Err(FrameError::Timestamp(other.to_string())),
        None => return Err(FrameError::Timestamp(String::new())),
    };
    raw.parse::<i64>()
        .map_err(|_| FrameError::Timestamp(raw.to_string()))
}
