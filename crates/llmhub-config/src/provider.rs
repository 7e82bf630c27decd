use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// One configured provider endpoint
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Registered provider identifier (e.g. "openai", "claude", "qwen")
    pub provider: String,
    /// API key, optional only for providers that accept none
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override, the provider default when absent
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Model used when a request names none
    #[serde(default)]
    pub model: Option<String>,
}
