//! Adapter for Alibaba `DashScope` text generation

use async_trait::async_trait;
use http::{HeaderMap, HeaderName};
use llmhub_core::RequestContext;

use super::{Adapter, AdapterCapabilities, AdapterSettings, validate};
use crate::capability::ensure_tools_supported;
use crate::error::LlmError;
use crate::protocol::dashscope::{DashScopeRequest, DashScopeResponse};
use crate::provider::ProviderId;
use crate::stream::{ByteStream, StreamFormat};
use crate::transport::{self, Headers, HttpTransport};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
const ENDPOINT: &str = "/services/aigc/text-generation/generation";
const SSE_HEADER: &str = "x-dashscope-sse";

/// Resolve a short model name, passing unknown names through
pub fn resolve_model(model: &str) -> &str {
    match model {
        "qwen-max-long" => "qwen-max-longcontext",
        other => other,
    }
}

#[derive(Debug)]
pub struct QwenAdapter {
    provider: ProviderId,
    url: String,
    headers: HeaderMap,
    stream_headers: HeaderMap,
    transport: HttpTransport,
}

impl QwenAdapter {
    /// # Errors
    ///
    /// Returns [`LlmError::MissingCredential`] for an empty key, or
    /// [`LlmError::InvalidConfig`] for an unusable base URL
    pub fn new(settings: &AdapterSettings) -> Result<Self, LlmError> {
        let provider = settings.provider.clone();
        let key = settings.require_key()?;
        let base_url = settings.resolve_base_url(DEFAULT_BASE_URL)?;

        let headers = Headers::new(&provider)
            .bearer(key)?
            .with(HeaderName::from_static(SSE_HEADER), "disable")
            .build();
        let stream_headers = Headers::new(&provider)
            .bearer(key)?
            .with(HeaderName::from_static(SSE_HEADER), "enable")
            .build();

        Ok(Self {
            transport: HttpTransport::new(&provider, settings.timeout)?,
            url: transport::join(&base_url, ENDPOINT),
            provider,
            headers,
            stream_headers,
        })
    }

    fn prepare(&self, request: &ChatCompletionRequest) -> Result<DashScopeRequest, LlmError> {
        validate(&self.provider, request)?;

        let model = resolve_model(&request.model);
        ensure_tools_supported(&self.provider, model, request)?;

        let mut native = DashScopeRequest::from(request);
        model.clone_into(&mut native.model);

        let dropped = dropped_parameters(request);
        if !dropped.is_empty() {
            tracing::debug!(provider = %self.provider, parameters = ?dropped, "unsupported parameters were dropped");
        }

        Ok(native)
    }
}

/// Canonical parameters `DashScope` has no field for
fn dropped_parameters(request: &ChatCompletionRequest) -> Vec<&'static str> {
    [
        ("presence_penalty", request.presence_penalty.is_some()),
        ("frequency_penalty", request.frequency_penalty.is_some()),
        ("response_format", request.response_format.is_some()),
        ("logit_bias", request.logit_bias.is_some()),
        ("logprobs", request.logprobs.is_some() || request.top_logprobs.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, set)| set.then_some(name))
    .collect()
}

#[async_trait]
impl Adapter for QwenAdapter {
    fn provider(&self) -> &ProviderId {
        &self.provider
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::native(StreamFormat::DashScope)
    }

    async fn chat_completion(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let body = self.prepare(request)?;

        tracing::debug!(provider = %self.provider, model = %body.model, url = %self.url, "sending chat completion");

        let response = self.transport.post(ctx, &self.url, &self.headers, &body).await?;
        let native: DashScopeResponse = self.transport.json(ctx, response).await?;

        let mut completion = ChatCompletionResponse::from(native);
        completion.model = body.model;

        Ok(completion)
    }

    async fn chat_completion_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream, LlmError> {
        let mut body = self.prepare(request)?;
        body.parameters.incremental_output = Some(true);

        tracing::debug!(provider = %self.provider, model = %body.model, url = %self.url, "starting chat completion stream");

        self.transport
            .post_stream(ctx, &self.url, &self.stream_headers, &body)
            .await
    }
}
