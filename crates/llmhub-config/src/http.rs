use std::time::Duration;

use serde::Deserialize;

/// Outbound HTTP settings
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Upper bound for one upstream exchange (e.g. "60s", "2m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

impl HttpConfig {
    /// Parsed transport timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string cannot be parsed
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        duration_str::parse(&self.timeout).map_err(|e| anyhow::anyhow!("invalid http.timeout '{}': {e}", self.timeout))
    }
}

fn default_timeout() -> String {
    "60s".to_string()
}
