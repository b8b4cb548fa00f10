//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (URL, READER_URL, ORG_ID, DSN, MODE)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → HarnessConfig (validated, immutable)
//!     → SenderConfig per pipeline, owned by that pipeline
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a pipeline is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, read_config, ConfigError};
pub use schema::{
    HarnessConfig, ModeConfig, ObservabilityConfig, PayloadConfig, ReportConfig, RetryConfig,
    SenderConfig, TailConfig, TargetConfig, DSN_HEADER, ORG_ID_HEADER,
};
pub use validation::{validate_config, ValidationError};
