//! Ingestion long-test harness.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                          LONG TEST                               │
//!   │                                                                  │
//!   │  per org id:                                                     │
//!   │   ┌────────────┐  POST /loki/api/v1/push   ┌──────────────────┐  │
//!   │   │ logs (L)   │──────────────────────────▶│                  │  │
//!   │   └────────────┘                           │                  │  │
//!   │   ┌────────────┐  POST /test-lines         │    ingestion     │  │
//!   │   │ plain (N)  │──────────────────────────▶│     backend      │  │
//!   │   └────────────┘                           │                  │  │
//!   │   ┌────────────┐  writer-0 push            │                  │  │
//!   │   │ verify (W) │──────────────────────────▶│                  │  │
//!   │   │            │◀── N × ws tail ───────────│                  │  │
//!   │   └────────────┘                           └──────────────────┘  │
//!   │         │                                                        │
//!   │         ▼                                                        │
//!   │   StatsRegistry ──▶ reporter (stdout) + /metrics (Prometheus)    │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ingest_longtest::config::{
    apply_env_overrides, read_config, validate_config, ConfigError, HarnessConfig, ModeConfig,
    SenderConfig, DSN_HEADER, ORG_ID_HEADER,
};
use ingest_longtest::delivery::{DeliveryPipeline, RandomSource};
use ingest_longtest::generators::logs::{log_settings, LogGenerator};
use ingest_longtest::generators::plain_text::{plain_text_settings, PlainTextGenerator};
use ingest_longtest::generators::vocabulary;
use ingest_longtest::lifecycle::Shutdown;
use ingest_longtest::observability::{self, metrics::spawn_exposition, Exporter};
use ingest_longtest::report::run_reporter;
use ingest_longtest::resilience::RetryPolicy;
use ingest_longtest::stats::StatsRegistry;
use ingest_longtest::verification::{TailVerifier, VerifierSettings};

#[derive(Parser, Debug)]
#[command(name = "ingest-longtest")]
#[command(about = "Long-running ingestion load test with tail latency verification", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mode letters: L (logs), W (tail verification), N (newline-delimited plain text).
    #[arg(short, long)]
    mode: Option<String>,

    /// Push endpoint base URL.
    #[arg(long)]
    url: Option<String>,

    /// Tail endpoint base URL.
    #[arg(long)]
    reader_url: Option<String>,

    /// Prometheus exposition address.
    #[arg(long)]
    metrics_address: Option<String>,
}

fn build_config(cli: &Cli) -> Result<HarnessConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => HarnessConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    if let Some(mode) = &cli.mode {
        config.modes = ModeConfig::from_letters(mode);
    }
    if let Some(url) = &cli.url {
        config.target.url = url.clone();
    }
    if let Some(url) = &cli.reader_url {
        config.tail.url = url.clone();
    }
    if let Some(addr) = &cli.metrics_address {
        config.observability.metrics_address = addr.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Sender template for one tenant. `org_id` may be empty.
fn sender_template(config: &HarnessConfig, org_id: &str, random: &RandomSource) -> SenderConfig {
    let mut headers: BTreeMap<String, String> = config.target.headers.clone();
    if !org_id.is_empty() {
        headers.insert(ORG_ID_HEADER.to_string(), org_id.to_string());
    }
    if let Some(dsn) = &config.target.dsn {
        headers.insert(DSN_HEADER.to_string(), dsn.clone());
    }

    let containers = if config.payload.containers.is_empty() {
        vocabulary::container_names(config.payload.generated_containers, random)
    } else {
        config.payload.containers.clone()
    };
    let lines = if config.payload.lines.is_empty() {
        vocabulary::log_lines(config.payload.generated_lines, random)
    } else {
        config.payload.lines.clone()
    };

    SenderConfig {
        id: String::new(),
        url: config.target.url.clone(),
        reader_url: config.tail.url.clone(),
        headers,
        containers,
        lines,
        lines_per_tick: 0,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    observability::logging::init(&config.observability.log_level);
    tracing::info!("ingest-longtest v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        url = %config.target.url,
        reader_url = %config.tail.url,
        logs = config.modes.logs,
        tail = config.modes.tail,
        plain_text = config.modes.plain_text,
        orgs = config.target.org_ids.len(),
        "Configuration loaded"
    );

    if !config.modes.any() {
        tracing::warn!("No mode selected; nothing to do");
        return Ok(());
    }

    let exporter = Arc::new(Exporter::new()?);
    let stats = Arc::new(StatsRegistry::with_exporter(exporter.clone()));
    let policy = RetryPolicy::from(&config.retry);

    match config.observability.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => {
            if let Err(e) = spawn_exposition(addr, exporter).await {
                tracing::warn!(address = %addr, error = %e, "Metrics endpoint unavailable");
            }
        }
        Err(_) => tracing::warn!(
            metrics_address = %config.observability.metrics_address,
            "Failed to parse metrics address"
        ),
    }

    let org_ids = if config.target.org_ids.is_empty() {
        vec![String::new()]
    } else {
        config.target.org_ids.clone()
    };

    let random = RandomSource::new();
    let mut pipelines = Vec::new();
    let mut verifiers = Vec::new();

    for org_id in &org_ids {
        let template = sender_template(&config, org_id, &random);

        if config.modes.logs {
            let mut sender = template.with_id("logs");
            sender.lines_per_tick = config.payload.log_lines_per_tick;
            let pipeline = DeliveryPipeline::new(
                sender,
                log_settings(config.payload.sends_per_tick),
                policy,
                LogGenerator,
                stats.clone(),
            )?;
            pipeline.run();
            pipelines.push(pipeline);
        }

        if config.modes.plain_text {
            let mut sender = template.with_id("plain_text");
            sender.lines_per_tick = config.payload.plain_lines_per_tick;
            let pipeline = DeliveryPipeline::new(
                sender,
                plain_text_settings(config.payload.sends_per_tick),
                policy,
                PlainTextGenerator,
                stats.clone(),
            )?;
            pipeline.run();
            pipelines.push(pipeline);
        }

        if config.modes.tail {
            let mut sender = template.clone();
            sender.lines_per_tick = config.tail.lines_per_tick;
            let verifier = Arc::new(TailVerifier::new(
                sender,
                VerifierSettings::from_config(&config.tail, None),
                policy,
                stats.clone(),
            )?);
            verifiers.push(verifier);
        }
    }

    let shutdown = Shutdown::new();
    if let Some(interval) = config.report.interval() {
        tokio::spawn(run_reporter(stats.clone(), interval, shutdown.subscribe()));
    }

    let (fatal_tx, mut fatal_rx) = tokio::sync::mpsc::unbounded_channel();
    for verifier in &verifiers {
        let verifier = verifier.clone();
        let fatal_tx = fatal_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = verifier.run().await {
                let _ = fatal_tx.send(e);
                return;
            }
            if let Some(e) = verifier.fatal().await {
                let _ = fatal_tx.send(e);
            }
        });
    }
    drop(fatal_tx);

    let fatal = async {
        match fatal_rx.recv().await {
            Some(e) => e,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Received Ctrl-C, shutting down");
        }
        error = fatal => {
            tracing::error!(error = %error, "Tail verification failed");
            std::process::exit(1);
        }
    }

    shutdown.trigger();
    for pipeline in &pipelines {
        pipeline.stop();
    }
    for verifier in &verifiers {
        verifier.stop();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
