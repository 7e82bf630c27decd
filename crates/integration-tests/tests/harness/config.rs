//! Programmatic configuration builder for integration tests

use llmhub_config::{Config, ProviderConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default HTTP and telemetry settings
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Add a provider entry pointed at a mock backend
    pub fn with_provider(mut self, name: &str, provider: &str, base_url: &str) -> Self {
        self.config.providers.insert(
            name.to_owned(),
            ProviderConfig {
                provider: provider.to_owned(),
                api_key: Some(SecretString::from("test-key")),
                base_url: Some(base_url.parse().expect("valid URL")),
                model: None,
            },
        );
        self
    }

    /// Set the default model of an existing provider entry
    pub fn with_model(mut self, name: &str, model: &str) -> Self {
        if let Some(entry) = self.config.providers.get_mut(name) {
            entry.model = Some(model.to_owned());
        }
        self
    }

    /// Set the outbound HTTP timeout
    pub fn with_timeout(mut self, timeout: &str) -> Self {
        timeout.clone_into(&mut self.config.http.timeout);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
