use std::borrow::Cow;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::Stream;
use llmhub_config::ProviderConfig;
use llmhub_llm::adapter::AdapterSettings;
use llmhub_llm::{
    Adapter, AdapterCapabilities, AdapterRegistry, ByteStream, ChatCompletionChunk, ChatCompletionRequest,
    ChatCompletionResponse, LlmError, ProviderId, RequestContext, sse,
};
use secrecy::{ExposeSecret, SecretString};

use crate::Result;

/// Settings for one [`Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Registered provider identifier
    pub provider: String,
    pub api_key: SecretString,
    /// Provider default when absent or empty
    pub base_url: Option<String>,
    /// Used for requests that name no model
    pub model: Option<String>,
    /// Overrides the registry's transport timeout
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: SecretString::from(api_key.into()),
            base_url: None,
            model: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of [`Client::dispatch`]
pub enum Completion {
    Response(ChatCompletionResponse),
    Stream(ByteStream),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").finish_non_exhaustive(),
        }
    }
}

/// Entry point for chat completions against one provider
#[derive(Clone)]
pub struct Client {
    adapter: Arc<dyn Adapter>,
    default_model: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("provider", self.adapter.provider())
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client backed by the built-in providers
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty or unregistered provider,
    /// a missing key or an unusable base URL
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_registry(Arc::new(AdapterRegistry::with_builtin()), config)
    }

    /// Create a client from an injected registry
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`]
    pub fn with_registry(registry: Arc<AdapterRegistry>, config: ClientConfig) -> Result<Self> {
        let provider = config.provider.trim();
        if provider.is_empty() {
            return Err(LlmError::InvalidConfig {
                provider: ProviderId::new(provider),
                reason: "provider is required".to_owned(),
            });
        }

        let mut settings = AdapterSettings::new(ProviderId::new(provider), config.api_key.expose_secret())
            .with_timeout(config.timeout.unwrap_or_else(|| registry.timeout()));
        if let Some(base_url) = config.base_url.filter(|url| !url.trim().is_empty()) {
            settings = settings.with_base_url(base_url);
        }

        let adapter = registry.create_with(settings)?;

        tracing::debug!(provider = %adapter.provider(), "client ready");

        Ok(Self {
            adapter,
            default_model: config.model.filter(|model| !model.trim().is_empty()),
        })
    }

    /// Create a client from a configured provider entry
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`]
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().to_owned())
            .unwrap_or_default();

        Self::new(ClientConfig {
            provider: config.provider.clone(),
            api_key: SecretString::from(api_key),
            base_url: config.base_url.as_ref().map(ToString::to_string),
            model: config.model.clone(),
            timeout: Some(timeout),
        })
    }

    /// Identity of the serving adapter
    pub fn provider(&self) -> &ProviderId {
        self.adapter.provider()
    }

    pub fn capabilities(&self) -> AdapterCapabilities {
        self.adapter.capabilities()
    }

    pub async fn chat_completion(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        let request = self.prepare(request, false)?;
        self.adapter.chat_completion(ctx, &request).await
    }

    /// Start a streamed completion and return the raw event bytes
    pub async fn chat_completion_stream(&self, ctx: &RequestContext, request: &ChatCompletionRequest) -> Result<ByteStream> {
        let request = self.prepare(request, true)?;
        self.adapter.chat_completion_stream(ctx, &request).await
    }

    /// Start a streamed completion decoded into canonical chunks
    pub async fn chat_completion_chunks(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>> {
        let bytes = self.chat_completion_stream(ctx, request).await?;
        Ok(Box::pin(sse::chunks(bytes, self.capabilities().format, self.provider().clone())))
    }

    /// Route on the request's `stream` flag
    pub async fn dispatch(&self, ctx: &RequestContext, request: &ChatCompletionRequest) -> Result<Completion> {
        if request.stream {
            self.chat_completion_stream(ctx, request).await.map(Completion::Stream)
        } else {
            self.chat_completion(ctx, request).await.map(Completion::Response)
        }
    }

    /// Fill the default model and align the stream flag without touching the caller's request
    fn prepare<'a>(&self, request: &'a ChatCompletionRequest, stream: bool) -> Result<Cow<'a, ChatCompletionRequest>> {
        let mut request = Cow::Borrowed(request);

        if request.model.trim().is_empty() {
            let Some(model) = &self.default_model else {
                return Err(LlmError::invalid_request(self.provider(), "model is required"));
            };
            model.clone_into(&mut request.to_mut().model);
        }

        if request.stream != stream {
            request.to_mut().stream = stream;
        }

        Ok(request)
    }
}
