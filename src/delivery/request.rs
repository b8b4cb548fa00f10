//! Payload contract between generators and the delivery pipeline.

use crate::config::SenderConfig;
use crate::delivery::random::RandomSource;
use crate::delivery::types::DeliveryResult;

/// A unit of work produced by a generator.
pub trait RequestSource: Send + Sync {
    /// Encode the payload body.
    fn serialize(&self) -> DeliveryResult<Vec<u8>>;

    /// Record-count capability. Payloads that can count their records
    /// return `Some(self)`; the count only feeds the sent-size metric.
    fn as_sized(&self) -> Option<&dyn SizedRequest> {
        None
    }
}

/// Optional capability: number of logical records in a payload.
pub trait SizedRequest {
    fn size(&self) -> usize;
}

/// Builds one payload per cycle.
pub trait Generator: Send + Sync + 'static {
    fn generate(
        &self,
        config: &SenderConfig,
        random: &RandomSource,
    ) -> DeliveryResult<Box<dyn RequestSource>>;
}

impl<F> Generator for F
where
    F: Fn(&SenderConfig, &RandomSource) -> DeliveryResult<Box<dyn RequestSource>>
        + Send
        + Sync
        + 'static,
{
    fn generate(
        &self,
        config: &SenderConfig,
        random: &RandomSource,
    ) -> DeliveryResult<Box<dyn RequestSource>> {
        self(config, random)
    }
}

/// Opaque pre-encoded body, mostly useful for probes and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub body: Vec<u8>,
    pub records: Option<usize>,
}

impl RawRequest {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            records: None,
        }
    }

    pub fn with_records(mut self, records: usize) -> Self {
        self.records = Some(records);
        self
    }
}

impl RequestSource for RawRequest {
    fn serialize(&self) -> DeliveryResult<Vec<u8>> {
        Ok(self.body.clone())
    }

    fn as_sized(&self) -> Option<&dyn SizedRequest> {
        self.records.is_some().then_some(self as &dyn SizedRequest)
    }
}

impl SizedRequest for RawRequest {
    fn size(&self) -> usize {
        self.records.unwrap_or(0)
    }
}
