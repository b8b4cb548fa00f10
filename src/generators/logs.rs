//! Reference JSON log payload.
//!
//! A batch is a list of streams, each one label-set with [`GROUP_SIZE`]
//! timestamped lines. Streams are appended whole until the line budget is
//! reached, so a batch may carry more lines than the budget but never fewer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::SenderConfig;
use crate::delivery::{
    DeliveryPipeline, DeliveryResult, Generator, PipelineSettings, RandomSource, RequestSource,
    SizedRequest,
};
use crate::resilience::RetryPolicy;
use crate::stats::StatsRegistry;

/// Push path for JSON log batches.
pub const LOG_PUSH_PATH: &str = "/loki/api/v1/push";

/// Lines per stream.
pub const GROUP_SIZE: usize = 20;

/// Severity values picked per stream.
pub const LEVELS: [&str; 3] = ["info", "debug", "error"];

/// Marker label value the tail query filters on.
pub const SENDER_MARKER: &str = "logtest1";

/// One label-set with its timestamped lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStream {
    pub stream: BTreeMap<String, String>,
    /// `(unix nanoseconds as a decimal string, line)`.
    pub values: Vec<(String, String)>,
}

/// A push body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    pub streams: Vec<LogStream>,
}

impl RequestSource for LogRequest {
    fn serialize(&self) -> DeliveryResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn as_sized(&self) -> Option<&dyn SizedRequest> {
        Some(self)
    }
}

impl SizedRequest for LogRequest {
    fn size(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }
}

/// Nanoseconds since the Unix epoch.
pub fn unix_nanos(at: SystemTime) -> i128 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i128,
        Err(e) => -(e.duration().as_nanos() as i128),
    }
}

/// Generator for [`LogRequest`] batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogGenerator;

impl Generator for LogGenerator {
    fn generate(
        &self,
        config: &SenderConfig,
        random: &RandomSource,
    ) -> DeliveryResult<Box<dyn RequestSource>> {
        Ok(Box::new(log_batch(config, random)))
    }
}

/// Build one batch of at least `config.lines_per_tick` lines.
pub fn log_batch(config: &SenderConfig, random: &RandomSource) -> LogRequest {
    let mut request = LogRequest::default();
    let mut total = 0;

    while total < config.lines_per_tick {
        let stream = BTreeMap::from([
            ("orgid".to_string(), config.org_id().to_string()),
            ("container".to_string(), random.pick(&config.containers).to_string()),
            ("level".to_string(), LEVELS[random.below(LEVELS.len())].to_string()),
            ("superCard".to_string(), random.next_i31().to_string()),
            ("sender".to_string(), SENDER_MARKER.to_string()),
            ("__name__".to_string(), "logs".to_string()),
            ("__ttl_days__".to_string(), "25".to_string()),
            ("sender_id".to_string(), config.id.clone()),
        ]);
        let values = (0..GROUP_SIZE)
            .map(|_| {
                let ts = unix_nanos(SystemTime::now()).to_string();
                (ts, random.pick(&config.lines).to_string())
            })
            .collect();

        request.streams.push(LogStream { stream, values });
        total += GROUP_SIZE;
    }
    request
}

/// Pipeline settings for the JSON log flavor.
pub fn log_settings(sends_per_tick: usize) -> PipelineSettings {
    PipelineSettings {
        path: LOG_PUSH_PATH.to_string(),
        interval: Duration::from_secs(1),
        sends_per_tick,
        content_type: "application/json",
    }
}

/// JSON log sender, one batch per second.
pub fn log_pipeline(
    config: SenderConfig,
    policy: RetryPolicy,
    stats: Arc<StatsRegistry>,
) -> DeliveryResult<DeliveryPipeline> {
    DeliveryPipeline::new(config, log_settings(1), policy, LogGenerator, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ORG_ID_HEADER;

    fn config(budget: usize) -> SenderConfig {
        let mut config = SenderConfig {
            id: "logs".into(),
            containers: vec!["c1".into(), "c2".into()],
            lines: vec!["hello".into(), "world".into()],
            lines_per_tick: budget,
            ..Default::default()
        };
        config.headers.insert(ORG_ID_HEADER.into(), "42".into());
        config
    }

    #[test]
    fn test_size_never_below_budget() {
        let random = RandomSource::seeded(3);
        for budget in [1, 5, 19, 20, 21, 40, 3000] {
            let batch = log_batch(&config(budget), &random);
            assert!(batch.size() >= budget, "budget {budget} got {}", batch.size());
            assert!(batch.size() < budget + GROUP_SIZE);
            assert!(batch.streams.iter().all(|s| s.values.len() == GROUP_SIZE));
        }
    }

    #[test]
    fn test_zero_budget_is_empty() {
        let batch = log_batch(&config(0), &RandomSource::seeded(3));
        assert_eq!(batch.size(), 0);
    }

    #[test]
    fn test_labels() {
        let batch = log_batch(&config(1), &RandomSource::seeded(3));
        let labels = &batch.streams[0].stream;
        assert_eq!(labels["orgid"], "42");
        assert_eq!(labels["sender"], SENDER_MARKER);
        assert_eq!(labels["sender_id"], "logs");
        assert_eq!(labels["__name__"], "logs");
        assert!(LEVELS.contains(&labels["level"].as_str()));
        assert!(["c1", "c2"].contains(&labels["container"].as_str()));
        assert!(labels["superCard"].parse::<i32>().unwrap() >= 0);
    }

    #[test]
    fn test_wire_shape() {
        let batch = log_batch(&config(1), &RandomSource::seeded(3));
        let body = RequestSource::serialize(&batch).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let value = &json["streams"][0]["values"][0];
        assert!(value[0].as_str().unwrap().parse::<i128>().is_ok());
        assert!(value[1].is_string());
        assert!(batch.as_sized().is_some());
    }

    #[test]
    fn test_empty_candidates_yield_empty_strings() {
        let mut config = config(1);
        config.containers.clear();
        config.lines.clear();
        let batch = log_batch(&config, &RandomSource::seeded(3));
        assert_eq!(batch.streams[0].stream["container"], "");
        assert_eq!(batch.streams[0].values[0].1, "");
    }
}
