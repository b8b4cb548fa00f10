//! End-to-end freshness verification.
//!
//! `run()` fans out tail readers, waits for their subscriptions to settle,
//! then starts the log writer and the metrics endpoint. `stop()` fires the
//! shared cancellation signal and halts the writer's ticks.
//!
//! A reader that cannot subscribe reports on a dedicated fatal channel;
//! [`TailVerifier::fatal`] yields the first such error so the orchestrator
//! can terminate the process instead of verifying with a degraded fan-out.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{SenderConfig, TailConfig};
use crate::delivery::DeliveryPipeline;
use crate::generators::log_pipeline;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::spawn_exposition;
use crate::resilience::RetryPolicy;
use crate::stats::StatsRegistry;
use crate::verification::reader::TailReader;
use crate::verification::target::TailTarget;
use crate::verification::types::{TailError, TailResult};

/// Fan-out and timing knobs.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Concurrent tail subscriptions.
    pub readers: usize,

    /// Delay between launching readers and starting the writer.
    pub settle: Duration,

    /// Number of log writers.
    pub writers: usize,

    /// Where to serve `/metrics`; `None` leaves exposition to someone else.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            readers: 100,
            settle: Duration::from_secs(1),
            writers: 1,
            metrics_address: None,
        }
    }
}

impl VerifierSettings {
    pub fn from_config(config: &TailConfig, metrics_address: Option<SocketAddr>) -> Self {
        Self {
            readers: config.readers,
            settle: Duration::from_millis(config.settle_ms),
            writers: 1,
            metrics_address,
        }
    }
}

/// One writer plus N tail readers sharing a cancellation signal.
pub struct TailVerifier {
    config: SenderConfig,
    settings: VerifierSettings,
    policy: RetryPolicy,
    stats: Arc<StatsRegistry>,
    target: Arc<TailTarget>,
    shutdown: Shutdown,
    started: AtomicBool,
    writers: Mutex<Vec<DeliveryPipeline>>,
    readers: Mutex<Vec<JoinHandle<()>>>,
    exposition: Mutex<Option<JoinHandle<()>>>,
    fatal_tx: mpsc::UnboundedSender<TailError>,
    fatal_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TailError>>,
}

impl TailVerifier {
    /// Fails when the reader URL cannot be turned into a tail target.
    pub fn new(
        config: SenderConfig,
        settings: VerifierSettings,
        policy: RetryPolicy,
        stats: Arc<StatsRegistry>,
    ) -> TailResult<Self> {
        let target = Arc::new(TailTarget::from_reader_url(&config.reader_url, config.org_id())?);
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            settings,
            policy,
            stats,
            target,
            shutdown: Shutdown::new(),
            started: AtomicBool::new(false),
            writers: Mutex::new(Vec::new()),
            readers: Mutex::new(Vec::new()),
            exposition: Mutex::new(None),
            fatal_tx,
            fatal_rx: tokio::sync::Mutex::new(fatal_rx),
        })
    }

    pub fn target(&self) -> &TailTarget {
        &self.target
    }

    /// Launch readers, settle, start writers and exposition.
    /// A second call is a no-op.
    pub async fn run(&self) -> TailResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!(
            readers = self.settings.readers,
            url = %self.target.url,
            "Starting tail readers"
        );
        {
            let mut readers = self.readers.lock().expect("verifier readers mutex poisoned");
            for index in 0..self.settings.readers {
                let reader = TailReader::new(index, self.target.clone(), self.stats.clone());
                readers.push(tokio::spawn(
                    reader.run(self.shutdown.subscribe(), self.fatal_tx.clone()),
                ));
            }
        }

        tokio::time::sleep(self.settings.settle).await;

        for _ in 0..self.settings.writers {
            self.start_writer()?;
        }

        if let Some(addr) = self.settings.metrics_address {
            self.start_exposition(addr).await;
        }
        Ok(())
    }

    fn start_writer(&self) -> TailResult<()> {
        let mut writers = self.writers.lock().expect("verifier writers mutex poisoned");
        let config = self.config.with_id(format!("writer-{}", writers.len()));
        let writer = log_pipeline(config, self.policy, self.stats.clone())?;
        writer.run();
        writers.push(writer);
        Ok(())
    }

    async fn start_exposition(&self, addr: SocketAddr) {
        let Some(exporter) = self.stats.exporter().cloned() else {
            tracing::warn!("No exporter attached to stats; metrics endpoint not started");
            return;
        };
        match spawn_exposition(addr, exporter).await {
            Ok((_, handle)) => {
                *self.exposition.lock().expect("verifier exposition mutex poisoned") = Some(handle);
            }
            Err(e) => tracing::warn!(address = %addr, error = %e, "Metrics endpoint unavailable"),
        }
    }

    /// Fire the cancellation signal and stop the writers' ticks.
    pub fn stop(&self) {
        self.shutdown.trigger();
        for writer in self.writers.lock().expect("verifier writers mutex poisoned").iter() {
            writer.stop();
        }
        if let Some(handle) = self
            .exposition
            .lock()
            .expect("verifier exposition mutex poisoned")
            .take()
        {
            handle.abort();
        }
    }

    /// First subscription failure reported by any reader.
    pub async fn fatal(&self) -> Option<TailError> {
        self.fatal_rx.lock().await.recv().await
    }

    /// Readers that have not returned yet.
    pub fn active_readers(&self) -> usize {
        self.readers
            .lock()
            .expect("verifier readers mutex poisoned")
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Writer pipelines started so far.
    pub fn writer_count(&self) -> usize {
        self.writers.lock().expect("verifier writers mutex poisoned").len()
    }
}

impl std::fmt::Debug for TailVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailVerifier")
            .field("target", &self.target.url.as_str())
            .field("readers", &self.settings.readers)
            .field("writers", &self.settings.writers)
            .finish()
    }
}
