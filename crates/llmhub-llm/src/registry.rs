//! Provider identifier to adapter factory lookup
//!
//! Built once at startup, then shared behind an `Arc` and only read.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::claude::ClaudeAdapter;
use crate::adapter::gemini::GeminiAdapter;
use crate::adapter::qwen::QwenAdapter;
use crate::adapter::rest::{BUILTIN_PROFILES, RestAdapter, RestProfile};
use crate::adapter::{Adapter, AdapterSettings, DEFAULT_TIMEOUT};
use crate::error::LlmError;
use crate::provider::ProviderId;

/// Builds an adapter from caller settings
pub type AdapterFactory = Arc<dyn Fn(AdapterSettings) -> Result<Arc<dyn Adapter>, LlmError> + Send + Sync>;

#[derive(Clone)]
pub struct AdapterRegistry {
    factories: HashMap<ProviderId, AdapterFactory>,
    timeout: Duration,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.providers())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Registry holding every built-in provider
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        for profile in BUILTIN_PROFILES {
            registry.register_profile(profile.clone());
        }

        registry.register(ProviderId::CLAUDE, |settings| Ok(Arc::new(ClaudeAdapter::new(&settings)?)));
        registry.register(ProviderId::QWEN, |settings| Ok(Arc::new(QwenAdapter::new(&settings)?)));
        registry.register(ProviderId::GEMINI, |settings| Ok(Arc::new(GeminiAdapter::new(&settings)?)));

        registry
    }

    /// Transport timeout handed to every adapter created from now on
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a factory, replacing any earlier one for the same provider
    pub fn register<F>(&mut self, provider: ProviderId, factory: F)
    where
        F: Fn(AdapterSettings) -> Result<Arc<dyn Adapter>, LlmError> + Send + Sync + 'static,
    {
        if self.factories.insert(provider.clone(), Arc::new(factory)).is_some() {
            tracing::debug!(provider = %provider, "replaced adapter factory");
        }
    }

    /// Register an `OpenAI`-compatible provider by profile
    pub fn register_profile(&mut self, profile: RestProfile) {
        let provider = profile.provider.clone();
        self.register(provider, move |settings| Ok(Arc::new(RestAdapter::new(&profile, &settings)?)));
    }

    /// Build an adapter for `provider`
    ///
    /// An empty `base_url` selects the provider's default endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnregisteredProvider`] for an unknown provider, or
    /// whatever the factory rejects (missing key, invalid base URL)
    pub fn create(&self, provider: &str, api_key: &str, base_url: &str) -> Result<Arc<dyn Adapter>, LlmError> {
        let mut settings = AdapterSettings::new(ProviderId::new(provider), api_key).with_timeout(self.timeout);
        if !base_url.trim().is_empty() {
            settings = settings.with_base_url(base_url);
        }

        self.create_with(settings)
    }

    /// Build an adapter from complete settings, including their timeout
    ///
    /// # Errors
    ///
    /// Same as [`AdapterRegistry::create`]
    pub fn create_with(&self, settings: AdapterSettings) -> Result<Arc<dyn Adapter>, LlmError> {
        let Some(factory) = self.factories.get(&settings.provider) else {
            return Err(LlmError::UnregisteredProvider {
                provider: settings.provider,
            });
        };

        factory(settings)
    }

    /// Timeout applied by [`AdapterRegistry::create`]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.factories.contains_key(provider)
    }

    /// Registered provider ids, sorted
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut providers: Vec<_> = self.factories.keys().cloned().collect();
        providers.sort();
        providers
    }
}
