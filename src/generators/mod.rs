//! Payload generators.
//!
//! Each flavor provides a [`RequestSource`](crate::delivery::RequestSource)
//! type, a [`Generator`](crate::delivery::Generator) and its pipeline
//! settings (path, cadence, content type).

pub mod logs;
pub mod plain_text;
pub mod vocabulary;

pub use logs::{log_batch, log_pipeline, LogGenerator, LogRequest, LogStream};
pub use plain_text::{plain_text_pipeline, PlainTextGenerator, PlainTextRequest};
