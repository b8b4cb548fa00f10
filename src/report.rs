//! Periodic console summary.
//!
//! Reads a snapshot of the shared registry on every tick and prints one
//! block of totals. Nothing here mutates stats.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time;

use crate::lifecycle::ShutdownSignal;
use crate::stats::{
    StatsRegistry, StatsSnapshot, LOGS_RECEIVED, REQ_BYTES, REQ_ERR, REQ_FAIL, REQ_OK,
    REQ_TIME_MS, TAIL_LATENCY,
};

const MB: f64 = 1024.0 * 1024.0;

/// Render the summary for `snapshot`, `elapsed` after start.
pub fn format_summary(snapshot: &StatsSnapshot, elapsed: Duration) -> String {
    let mut out = format!(
        "Ok requests: {}, Errors: {}, Failed: {}",
        snapshot.counter(REQ_OK),
        snapshot.counter(REQ_ERR),
        snapshot.counter(REQ_FAIL),
    );

    if let Some(time) = snapshot.summary(REQ_TIME_MS) {
        out.push_str(&format!(
            "\nRequest time: min {:.0}ms, max {:.0}ms, avg {:.1}ms",
            time.min,
            time.max,
            time.mean()
        ));
    }

    let sent_mb = snapshot.summary(REQ_BYTES).map(|s| s.sum).unwrap_or(0.0) / MB;
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { sent_mb / secs } else { 0.0 };
    out.push_str(&format!("\nSent: {sent_mb:.2} MB, {rate:.2} MB/s"));

    let received = snapshot.counter(LOGS_RECEIVED);
    if received > 0 {
        let latency = snapshot.summary(TAIL_LATENCY).map(|s| s.mean()).unwrap_or(0.0);
        out.push_str(&format!(
            "\nTail received: {received}, mean latency {latency:.3}s"
        ));
    }
    out
}

/// Print a summary every `interval` until `shutdown` fires.
pub async fn run_reporter(
    stats: Arc<StatsRegistry>,
    interval: Duration,
    mut shutdown: ShutdownSignal,
) {
    let started = Instant::now();
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}", format_summary(&stats.collect(), started.elapsed()));
            }
            _ = shutdown.wait() => {
                tracing::debug!("Reporter received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let text = format_summary(&StatsRegistry::new().collect(), Duration::from_secs(1));
        assert!(text.starts_with("Ok requests: 0, Errors: 0, Failed: 0"));
        assert!(!text.contains("Request time"));
        assert!(!text.contains("Tail received"));
    }

    #[test]
    fn test_totals_and_rates() {
        let stats = StatsRegistry::new();
        stats.inc(REQ_OK);
        stats.inc(REQ_OK);
        stats.add(REQ_ERR, 3);
        stats.observe(REQ_TIME_MS, 10.0);
        stats.observe(REQ_TIME_MS, 30.0);
        stats.observe(REQ_BYTES, MB);
        stats.observe(REQ_BYTES, MB);
        stats.inc(LOGS_RECEIVED);
        stats.observe(TAIL_LATENCY, 0.5);

        let text = format_summary(&stats.collect(), Duration::from_secs(2));
        assert!(text.contains("Ok requests: 2, Errors: 3, Failed: 0"));
        assert!(text.contains("min 10ms, max 30ms, avg 20.0ms"));
        assert!(text.contains("Sent: 2.00 MB, 1.00 MB/s"));
        assert!(text.contains("Tail received: 1, mean latency 0.500s"));
    }

    #[tokio::test]
    async fn test_reporter_exits_on_shutdown() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let handle = tokio::spawn(run_reporter(
            Arc::new(StatsRegistry::new()),
            Duration::from_millis(10),
            shutdown.subscribe(),
        ));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
