//! Logging setup for llmhub
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! compact text or a JSON formatting layer.

use llmhub_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global subscriber from configuration
///
/// `RUST_LOG`, when set, takes precedence over `log_filter`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = filter(config);
    let directives = filter.to_string();
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(filter = %directives, format = ?config.format, "telemetry initialized");
    Ok(())
}

/// Filter from `RUST_LOG`, else the configured directives, else `info`
fn filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|e| {
            eprintln!("invalid log filter '{}': {e}, falling back to 'info'", config.log_filter);
            EnvFilter::new("info")
        })
}
