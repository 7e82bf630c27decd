use std::path::Path;

use anyhow::{Context, bail};

use crate::{Config, ProviderConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::parse(&raw)
    }

    /// Expand, deserialize and validate configuration text
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus file access
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand(raw).context("config variable expansion failed")?;
        let config: Self = toml::from_str(&expanded).context("failed to parse config")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending entry
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http.timeout()?.is_zero() {
            bail!("http.timeout must be greater than zero");
        }

        for (name, provider) in &self.providers {
            if name.trim().is_empty() {
                bail!("provider entries must have a non-empty name");
            }

            if provider.provider.trim().is_empty() {
                bail!("providers.{name}.provider must not be empty");
            }

            if let Some(ref url) = provider.base_url
                && !matches!(url.scheme(), "http" | "https")
            {
                bail!("providers.{name}.base_url must be http or https, got '{}'", url.scheme());
            }
        }

        Ok(())
    }

    /// Look up a configured provider entry by name
    ///
    /// # Errors
    ///
    /// Returns an error if no entry has that name
    pub fn provider(&self, name: &str) -> anyhow::Result<&ProviderConfig> {
        self.providers
            .get(name)
            .with_context(|| format!("no provider named '{name}' is configured"))
    }
}
