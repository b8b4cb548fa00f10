//! Metrics exposition.
//!
//! # Responsibilities
//! - Own an explicitly constructed Prometheus recorder (never installed globally)
//! - Hand out counter/histogram handles keyed by name and labels
//! - Serve the rendered text format on `GET /metrics`
//!
//! # Metrics
//! - `req_ok`, `req_err`, `req_fail` (counters): delivery outcomes
//! - `req_bytes`, `req_time_ms` (summaries): successful request size and latency
//! - `sent_size_count{id}` (counter): records sent per sender identity
//! - `ws_lat` (histogram, seconds): tail latency
//! - `logs_received` (counter): records observed on tail subscriptions

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use metrics::{Counter, Histogram, Key, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::stats::TAIL_LATENCY;

/// Bucket bounds for the tail latency histogram, in seconds.
pub const TAIL_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.3, 0.5, 1.0, 2.0, 10.0];

/// Prometheus-backed metric sink.
pub struct Exporter {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Exporter {
    /// Build a recorder with the harness bucket layout.
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .add_global_label("job", "longtest")
            .set_buckets_for_metric(Matcher::Full(TAIL_LATENCY.to_string()), TAIL_LATENCY_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();
        Ok(Self { recorder, handle })
    }

    /// Counter handle for `name` with the given labels.
    pub fn counter(&self, name: &str, labels: &[(&'static str, &str)]) -> Counter {
        self.recorder.register_counter(&key(name, labels), &metadata())
    }

    /// Histogram handle for `name`.
    pub fn histogram(&self, name: &str) -> Histogram {
        self.recorder.register_histogram(&key(name, &[]), &metadata())
    }

    /// Render the current state in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter").finish_non_exhaustive()
    }
}

fn key(name: &str, labels: &[(&'static str, &str)]) -> Key {
    let labels: Vec<Label> = labels
        .iter()
        .map(|(k, v)| Label::new(*k, v.to_string()))
        .collect();
    Key::from_parts(name.to_string(), labels)
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

/// Router exposing `GET /metrics`.
pub fn router(exporter: Arc<Exporter>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(exporter)
        .layer(TraceLayer::new_for_http())
}

async fn render_metrics(State(exporter): State<Arc<Exporter>>) -> String {
    exporter.render()
}

/// Bind `addr` and serve the exposition endpoint in the background.
///
/// Bind errors are returned to the caller; serve errors are logged.
pub async fn spawn_exposition(
    addr: SocketAddr,
    exporter: Arc<Exporter>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Metrics endpoint listening");

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(exporter)).await {
            tracing::error!(error = %e, "Metrics endpoint stopped");
        }
    });
    Ok((local_addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_labelled_counter() {
        let exporter = Exporter::new().unwrap();
        exporter.counter("sent_size_count", &[("id", "logs")]).increment(40);
        let text = exporter.render();
        assert!(text.contains("sent_size_count"));
        assert!(text.contains("id=\"logs\""));
        assert!(text.contains("40"));
    }

    #[test]
    fn test_tail_latency_uses_buckets() {
        let exporter = Exporter::new().unwrap();
        exporter.histogram(TAIL_LATENCY).record(0.25);
        let text = exporter.render();
        assert!(text.contains("ws_lat_bucket"));
        assert!(text.contains("le=\"0.3\""));
    }

    #[tokio::test]
    async fn test_exposition_serves_text() {
        let exporter = Arc::new(Exporter::new().unwrap());
        exporter.counter("req_ok", &[]).increment(1);
        let (addr, handle) = spawn_exposition("127.0.0.1:0".parse().unwrap(), exporter)
            .await
            .unwrap();

        let body = reqwest::get(format!("http://{}/metrics", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("req_ok"));
        handle.abort();
    }
}
