//! Rate-paced, retrying delivery pipeline.
//!
//! # State Transitions
//! ```text
//! Stopped --run()--> Running --stop()--> Stopped
//! Running --run()--> Running   (no-op, single driver)
//! ```
//!
//! Every tick runs `sends_per_tick` cycles. A cycle generates and encodes a
//! payload on the driver task, then delivers it on its own spawned task so
//! the tick cadence never waits on the backend. Cycles may overlap and
//! complete out of order; retries within one cycle are sequential.
//!
//! `stop()` only halts the driver. Spawned deliveries run on until success
//! or retry exhaustion and still record their outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::SenderConfig;
use crate::delivery::random::RandomSource;
use crate::delivery::request::{Generator, RequestSource};
use crate::delivery::types::{DeliveryError, DeliveryResult};
use crate::resilience::{classify, AttemptClass, RetryPolicy};
use crate::stats::{StatsRegistry, REQ_BYTES, REQ_ERR, REQ_FAIL, REQ_OK, REQ_TIME_MS, SENT_SIZE};

/// Per-flavor pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Path appended to the sender's base URL.
    pub path: String,

    /// Tick period.
    pub interval: Duration,

    /// Cycles per tick.
    pub sends_per_tick: usize,

    /// Content type applied before the configured headers.
    pub content_type: &'static str,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            interval: Duration::from_secs(1),
            sends_per_tick: 1,
            content_type: "application/json",
        }
    }
}

/// Periodic generate-and-deliver driver for one sender.
pub struct DeliveryPipeline {
    inner: Arc<Inner>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    config: SenderConfig,
    settings: PipelineSettings,
    policy: RetryPolicy,
    generator: Box<dyn Generator>,
    random: RandomSource,
    client: reqwest::Client,
    headers: HeaderMap,
    endpoint: String,
    stats: Arc<StatsRegistry>,
    in_flight: AtomicUsize,
}

impl DeliveryPipeline {
    /// Build a pipeline. Fails only on headers that cannot be encoded
    /// or when the HTTP client cannot be constructed.
    pub fn new(
        config: SenderConfig,
        settings: PipelineSettings,
        policy: RetryPolicy,
        generator: impl Generator,
        stats: Arc<StatsRegistry>,
    ) -> DeliveryResult<Self> {
        let headers = build_headers(settings.content_type, &config)?;
        let client = reqwest::Client::builder()
            .timeout(policy.attempt_timeout)
            .build()?;
        let endpoint = format!("{}{}", config.url.trim_end_matches('/'), settings.path);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                settings,
                policy,
                generator: Box::new(generator),
                random: RandomSource::new(),
                client,
                headers,
                endpoint,
                stats,
                in_flight: AtomicUsize::new(0),
            }),
            driver: Mutex::new(None),
        })
    }

    /// Start the periodic driver. Calling this while running is a no-op.
    pub fn run(&self) {
        let mut driver = self.driver.lock().expect("pipeline driver mutex poisoned");
        if driver.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        tracing::info!(
            id = %self.inner.config.id,
            endpoint = %self.inner.endpoint,
            interval_ms = self.inner.settings.interval.as_millis() as u64,
            sends_per_tick = self.inner.settings.sends_per_tick,
            "Delivery pipeline starting"
        );
        let inner = self.inner.clone();
        *driver = Some(tokio::spawn(inner.drive()));
    }

    /// Halt future ticks. In-flight deliveries are left to finish.
    pub fn stop(&self) {
        let handle = self
            .driver
            .lock()
            .expect("pipeline driver mutex poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!(id = %self.inner.config.id, "Delivery pipeline stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .expect("pipeline driver mutex poisoned")
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Deliveries spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn config(&self) -> &SenderConfig {
        &self.inner.config
    }

    /// The pipeline's random helper, as handed to its generator.
    pub fn random(&self) -> &RandomSource {
        &self.inner.random
    }

    /// Encode `request` and deliver it on a detached task, recording stats.
    ///
    /// Serialization errors are returned immediately; delivery outcomes are
    /// available through the returned handle and the stats registry.
    pub fn deliver(
        &self,
        request: &dyn RequestSource,
    ) -> DeliveryResult<JoinHandle<DeliveryResult<()>>> {
        self.inner.clone().dispatch(request)
    }

    /// Deliver without touching stats, awaiting the outcome.
    /// `url` overrides the configured endpoint when given.
    pub async fn probe(&self, request: &dyn RequestSource, url: Option<&str>) -> DeliveryResult<()> {
        let body = request.serialize()?;
        let size = request.as_sized().map(|s| s.size());
        self.inner.send(body, size, url, false).await
    }
}

impl Drop for DeliveryPipeline {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.lock() {
            if let Some(handle) = driver.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for DeliveryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryPipeline")
            .field("id", &self.inner.config.id)
            .field("endpoint", &self.inner.endpoint)
            .field("interval", &self.inner.settings.interval)
            .finish()
    }
}

impl Inner {
    async fn drive(self: Arc<Self>) {
        let period = self.settings.interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            for _ in 0..self.settings.sends_per_tick.max(1) {
                self.clone().cycle();
            }
        }
    }

    /// One generate-then-deliver unit. Never blocks on the network.
    fn cycle(self: Arc<Self>) {
        let request = match self.generator.generate(&self.config, &self.random) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(id = %self.config.id, error = %e, "Payload generation failed");
                return;
            }
        };
        if let Err(e) = Arc::clone(&self).dispatch(request.as_ref()) {
            tracing::error!(id = %self.config.id, error = %e, "Payload serialization failed");
        }
    }

    fn dispatch(
        self: Arc<Self>,
        request: &dyn RequestSource,
    ) -> DeliveryResult<JoinHandle<DeliveryResult<()>>> {
        let body = request.serialize()?;
        let size = request.as_sized().map(|s| s.size());

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(tokio::spawn(async move {
            let result = self.send(body, size, None, true).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }))
    }

    /// Bounded retry with fixed backoff.
    async fn send(
        &self,
        body: Vec<u8>,
        size: Option<usize>,
        url: Option<&str>,
        count: bool,
    ) -> DeliveryResult<()> {
        let url = url.unwrap_or(self.endpoint.as_str());
        let stats = Recorder {
            stats: &self.stats,
            count,
        };
        let mut failures = 0u32;

        loop {
            let start = Instant::now();
            let err = match self.attempt(url, body.clone()).await {
                Ok(()) => {
                    stats.inc(REQ_OK);
                    if let Some(size) = size {
                        stats.add_for(SENT_SIZE, &self.config.id, size as u64);
                    }
                    stats.observe(REQ_BYTES, body.len() as f64);
                    stats.observe(REQ_TIME_MS, start.elapsed().as_millis() as f64);
                    return Ok(());
                }
                Err(e) => e,
            };

            tracing::warn!(id = %self.config.id, attempt = failures + 1, error = %err, "Request error");
            stats.inc(REQ_ERR);
            time::sleep(self.policy.backoff).await;
            failures += 1;

            if !self.policy.should_retry(failures) {
                stats.inc(REQ_FAIL);
                tracing::error!(id = %self.config.id, attempts = failures, "Delivery abandoned");
                return Err(DeliveryError::RetryExhausted {
                    attempts: failures,
                    last: Box::new(err),
                });
            }
        }
    }

    async fn attempt(&self, url: &str, body: Vec<u8>) -> DeliveryResult<()> {
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        match classify(status) {
            AttemptClass::Success => {
                let _ = response.bytes().await;
                Ok(())
            }
            AttemptClass::Retryable => {
                let body = response.text().await.unwrap_or_default();
                Err(DeliveryError::Protocol {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

/// Stats facade honoring the per-call `count` flag.
struct Recorder<'a> {
    stats: &'a StatsRegistry,
    count: bool,
}

impl Recorder<'_> {
    fn inc(&self, name: &str) {
        if self.count {
            self.stats.inc(name);
        }
    }

    fn add_for(&self, name: &str, id: &str, n: u64) {
        if self.count {
            self.stats.add_for(name, id, n);
        }
    }

    fn observe(&self, name: &str, value: f64) {
        if self.count {
            self.stats.observe(name, value);
        }
    }
}

/// Default content type first, then configured headers verbatim.
fn build_headers(content_type: &'static str, config: &SenderConfig) -> DeliveryResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| DeliveryError::InvalidHeader(name.clone()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| DeliveryError::InvalidHeader(name.as_str().to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
