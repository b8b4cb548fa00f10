//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the harness.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Header carrying the tenant identifier; also copied into the `orgid` label.
pub const ORG_ID_HEADER: &str = "X-Scope-OrgID";

/// Header carrying the storage DSN override.
pub const DSN_HEADER: &str = "X-CH-DSN";

/// Root configuration for the harness.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    /// Push endpoint settings.
    pub target: TargetConfig,

    /// Tail endpoint settings.
    pub tail: TailConfig,

    /// Which payload flavors to run.
    pub modes: ModeConfig,

    /// Shared generator inputs.
    pub payload: PayloadConfig,

    /// Retry configuration.
    pub retry: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Console reporter settings.
    pub report: ReportConfig,
}

/// Push endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the ingestion backend (e.g., "http://localhost:3100").
    pub url: String,

    /// Tenant identifiers. One run of every enabled mode is started per entry.
    /// An empty list means a single run without a tenant header.
    pub org_ids: Vec<String>,

    /// Optional DSN forwarded as `X-CH-DSN`.
    pub dsn: Option<String>,

    /// Extra static headers applied verbatim to every push.
    pub headers: BTreeMap<String, String>,
}

/// Tail endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TailConfig {
    /// Base URL of the query side. Credentials in the userinfo part are
    /// translated into API key headers.
    pub url: String,

    /// Number of concurrent tail subscriptions.
    pub readers: usize,

    /// Grace period between launching readers and starting the writer.
    pub settle_ms: u64,

    /// Lines per tick pushed by the verification writer.
    pub lines_per_tick: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            readers: 100,
            settle_ms: 1000,
            lines_per_tick: 5,
        }
    }
}

/// Mode selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModeConfig {
    /// JSON log push.
    pub logs: bool,

    /// Tail latency verification.
    pub tail: bool,

    /// Plain-text line push.
    pub plain_text: bool,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            logs: true,
            tail: false,
            plain_text: false,
        }
    }
}

impl ModeConfig {
    /// Parse a mode string such as "LW": `L` logs, `W` tail verification,
    /// `N` newline-delimited plain text. Unknown letters are ignored.
    pub fn from_letters(letters: &str) -> Self {
        Self {
            logs: letters.contains('L'),
            tail: letters.contains('W'),
            plain_text: letters.contains('N'),
        }
    }

    pub fn any(&self) -> bool {
        self.logs || self.tail || self.plain_text
    }
}

/// Inputs shared by every generator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// Candidate container identities. Generated when empty.
    pub containers: Vec<String>,

    /// Number of container names to generate when none are configured.
    pub generated_containers: usize,

    /// Candidate text lines. Generated when empty.
    pub lines: Vec<String>,

    /// Number of lines to generate when none are configured.
    pub generated_lines: usize,

    /// Log lines per tick for the JSON log flavor.
    pub log_lines_per_tick: usize,

    /// Lines per tick for the plain-text flavor.
    pub plain_lines_per_tick: usize,

    /// Generate-and-deliver cycles per tick.
    pub sends_per_tick: usize,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            generated_containers: 3300,
            lines: Vec::new(),
            generated_lines: 1000,
            log_lines_per_tick: 3000,
            plain_lines_per_tick: 3000,
            sends_per_tick: 1,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per cycle.
    pub max_attempts: u32,

    /// Fixed delay after every failed attempt, in milliseconds.
    pub backoff_ms: u64,

    /// Per-attempt timeout in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_ms: 1000,
            attempt_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: "0.0.0.0:2112".to_string(),
        }
    }
}

/// Console reporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Seconds between summaries. Zero disables the reporter.
    pub interval_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { interval_secs: 1 }
    }
}

impl ReportConfig {
    /// Reporting period, `None` when the reporter is disabled.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

/// Immutable per-sender settings handed to a delivery pipeline.
#[derive(Debug, Clone, Default)]
pub struct SenderConfig {
    /// Sender identity used for metric attribution.
    pub id: String,

    /// Base URL of the push endpoint.
    pub url: String,

    /// Base URL of the tail endpoint (verification only).
    pub reader_url: String,

    /// Static headers, applied after the default content type.
    pub headers: BTreeMap<String, String>,

    /// Candidate container identities.
    pub containers: Vec<String>,

    /// Candidate text lines.
    pub lines: Vec<String>,

    /// Line budget per cycle.
    pub lines_per_tick: usize,
}

impl SenderConfig {
    /// The tenant id, or an empty string when none is configured.
    pub fn org_id(&self) -> &str {
        self.headers
            .get(ORG_ID_HEADER)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Copy of this config under another identity.
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.id = id.into();
        config
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}
