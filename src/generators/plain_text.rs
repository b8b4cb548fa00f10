//! Newline-terminated plain-text payload. Carries no record count.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SenderConfig;
use crate::delivery::{
    DeliveryPipeline, DeliveryResult, Generator, PipelineSettings, RandomSource, RequestSource,
};
use crate::resilience::RetryPolicy;
use crate::stats::StatsRegistry;

pub const PLAIN_TEXT_PATH: &str = "/test-lines";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainTextRequest {
    pub lines: Vec<String>,
}

impl RequestSource for PlainTextRequest {
    fn serialize(&self) -> DeliveryResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        Ok(buf)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextGenerator;

impl Generator for PlainTextGenerator {
    fn generate(
        &self,
        config: &SenderConfig,
        random: &RandomSource,
    ) -> DeliveryResult<Box<dyn RequestSource>> {
        let lines = (0..config.lines_per_tick)
            .map(|_| random.pick(&config.lines).to_string())
            .collect();
        Ok(Box::new(PlainTextRequest { lines }))
    }
}

pub fn plain_text_settings(sends_per_tick: usize) -> PipelineSettings {
    PipelineSettings {
        path: PLAIN_TEXT_PATH.to_string(),
        interval: Duration::from_secs(10),
        sends_per_tick,
        content_type: "text/plain",
    }
}

/// Plain-text sender, one batch every ten seconds.
pub fn plain_text_pipeline(
    config: SenderConfig,
    policy: RetryPolicy,
    stats: Arc<StatsRegistry>,
) -> DeliveryResult<DeliveryPipeline> {
    DeliveryPipeline::new(config, plain_text_settings(1), policy, PlainTextGenerator, stats)
}
