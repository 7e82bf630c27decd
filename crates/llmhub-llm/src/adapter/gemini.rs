//! Adapter for the Google Generative Language API
//!
//! Streams natively through `streamGenerateContent?alt=sse`; each event is a
//! partial `GenerateContentResponse`, decoded with [`StreamFormat::Gemini`].

use async_trait::async_trait;
use http::{HeaderMap, HeaderName};
use llmhub_core::RequestContext;

use super::{Adapter, AdapterCapabilities, AdapterSettings, validate};
use crate::capability::ensure_tools_supported;
use crate::error::LlmError;
use crate::protocol::google::{GoogleRequest, GoogleResponse};
use crate::provider::ProviderId;
use crate::stream::{ByteStream, StreamFormat};
use crate::transport::{Headers, HttpTransport};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug)]
pub struct GeminiAdapter {
    provider: ProviderId,
    base_url: String,
    headers: HeaderMap,
    transport: HttpTransport,
}

impl GeminiAdapter {
    /// # Errors
    ///
    /// Returns [`LlmError::MissingCredential`] for an empty key, or
    /// [`LlmError::InvalidConfig`] for an unusable base URL
    pub fn new(settings: &AdapterSettings) -> Result<Self, LlmError> {
        let provider = settings.provider.clone();
        let key = settings.require_key()?;

        let headers = Headers::new(&provider)
            .secret(HeaderName::from_static("x-goog-api-key"), key)?
            .build();

        Ok(Self {
            base_url: settings.resolve_base_url(DEFAULT_BASE_URL)?,
            transport: HttpTransport::new(&provider, settings.timeout)?,
            provider,
            headers,
        })
    }

    /// Endpoint for `method` on `model`, accepting ids with or without the `models/` prefix
    fn url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:{method}", self.base_url)
    }

    fn prepare(&self, request: &ChatCompletionRequest) -> Result<GoogleRequest, LlmError> {
        validate(&self.provider, request)?;
        ensure_tools_supported(&self.provider, &request.model, request)?;

        GoogleRequest::try_from(request).map_err(|e| LlmError::invalid_request(&self.provider, e.to_string()))
    }
}

#[async_trait]
impl Adapter for GeminiAdapter {
    fn provider(&self) -> &ProviderId {
        &self.provider
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::native(StreamFormat::Gemini)
    }

    async fn chat_completion(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let body = self.prepare(request)?;
        let url = self.url(&request.model, "generateContent");

        tracing::debug!(provider = %self.provider, model = %request.model, url = %url, "sending chat completion");

        let response = self.transport.post(ctx, &url, &self.headers, &body).await?;
        let native: GoogleResponse = self.transport.json(ctx, response).await?;

        let mut completion = ChatCompletionResponse::from(native);
        if completion.model.is_empty() {
            completion.model.clone_from(&request.model);
        }

        Ok(completion)
    }

    async fn chat_completion_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream, LlmError> {
        let body = self.prepare(request)?;
        let url = format!("{}?alt=sse", self.url(&request.model, "streamGenerateContent"));

        tracing::debug!(provider = %self.provider, model = %request.model, url = %url, "starting chat completion stream");

        self.transport.post_stream(ctx, &url, &self.headers, &body).await
    }
}
