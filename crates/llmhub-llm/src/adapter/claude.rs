//! Adapter for the Anthropic Messages API

use async_trait::async_trait;
use http::{HeaderMap, HeaderName};
use llmhub_core::RequestContext;

use super::{Adapter, AdapterCapabilities, AdapterSettings, validate};
use crate::capability::ensure_tools_supported;
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse};
use crate::provider::ProviderId;
use crate::stream::{ByteStream, StreamFormat};
use crate::transport::{self, Headers, HttpTransport};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const API_VERSION: &str = "2023-06-01";

/// Short model names and the dated ids they stand for
static MODEL_ALIASES: &[(&str, &str)] = &[
    ("claude-3-opus", "claude-3-opus-20240229"),
    ("claude-3-sonnet", "claude-3-sonnet-20240229"),
    ("claude-3-haiku", "claude-3-haiku-20240307"),
    ("claude-3-5-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-3-5-haiku", "claude-3-5-haiku-20241022"),
];

/// Resolve a short model name, passing unknown names through
pub fn resolve_model(model: &str) -> &str {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == model)
        .map_or(model, |(_, id)| id)
}

#[derive(Debug)]
pub struct ClaudeAdapter {
    provider: ProviderId,
    url: String,
    headers: HeaderMap,
    transport: HttpTransport,
}

impl ClaudeAdapter {
    /// # Errors
    ///
    /// Returns [`LlmError::MissingCredential`] for an empty key, or
    /// [`LlmError::InvalidConfig`] for an unusable base URL
    pub fn new(settings: &AdapterSettings) -> Result<Self, LlmError> {
        let provider = settings.provider.clone();
        let key = settings.require_key()?;
        let base_url = settings.resolve_base_url(DEFAULT_BASE_URL)?;

        let headers = Headers::new(&provider)
            .secret(HeaderName::from_static("x-api-key"), key)?
            .with(HeaderName::from_static("anthropic-version"), API_VERSION)
            .build();

        Ok(Self {
            transport: HttpTransport::new(&provider, settings.timeout)?,
            url: transport::join(&base_url, "/messages"),
            provider,
            headers,
        })
    }

    fn prepare(&self, request: &ChatCompletionRequest) -> Result<AnthropicRequest, LlmError> {
        validate(&self.provider, request)?;

        let model = resolve_model(&request.model);
        ensure_tools_supported(&self.provider, model, request)?;

        let mut native = AnthropicRequest::try_from(request)
            .map_err(|e| LlmError::invalid_request(&self.provider, e.to_string()))?;
        model.clone_into(&mut native.model);

        if request.response_format.is_some() {
            tracing::debug!(provider = %self.provider, "response_format is not supported and was dropped");
        }

        Ok(native)
    }
}

#[async_trait]
impl Adapter for ClaudeAdapter {
    fn provider(&self) -> &ProviderId {
        &self.provider
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::native(StreamFormat::Anthropic)
    }

    async fn chat_completion(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let body = self.prepare(request)?;

        tracing::debug!(provider = %self.provider, model = %body.model, url = %self.url, "sending chat completion");

        let response = self.transport.post(ctx, &self.url, &self.headers, &body).await?;
        let native: AnthropicResponse = self.transport.json(ctx, response).await?;

        Ok(native.into())
    }

    async fn chat_completion_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream, LlmError> {
        let mut body = self.prepare(request)?;
        body.stream = Some(true);

        tracing::debug!(provider = %self.provider, model = %body.model, url = %self.url, "starting chat completion stream");

        self.transport.post_stream(ctx, &self.url, &self.headers, &body).await
    }
}
