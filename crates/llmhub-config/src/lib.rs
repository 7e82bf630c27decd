#![allow(clippy::must_use_candidate)]

mod env;
pub mod http;
mod loader;
pub mod provider;
pub mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;

pub use http::HttpConfig;
pub use provider::ProviderConfig;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level llmhub configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Outbound HTTP settings shared by every adapter
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Named provider endpoints, in file order
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
}
