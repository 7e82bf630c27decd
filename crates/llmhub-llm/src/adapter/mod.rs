//! Provider adapters
//!
//! An adapter translates canonical requests into one provider's wire format,
//! performs the HTTP exchange and translates the answer back.

pub mod claude;
pub mod gemini;
pub mod qwen;
pub mod rest;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use llmhub_core::RequestContext;
use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;
use crate::provider::ProviderId;
use crate::stream::{ByteStream, StreamFormat, StreamingMode};
use crate::transport;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Default bound for one upstream exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Translation contract every provider implements
///
/// Implementations never mutate the caller's request and never retry.
#[async_trait]
pub trait Adapter: fmt::Debug + Send + Sync {
    /// Identity of the provider this adapter serves
    fn provider(&self) -> &ProviderId;

    /// How this adapter delivers streamed completions
    fn capabilities(&self) -> AdapterCapabilities;

    /// Perform a complete (non-streamed) chat completion
    async fn chat_completion(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError>;

    /// Start a streamed chat completion
    ///
    /// Success means the upstream accepted the request; the returned bytes
    /// carry the provider's event framing, see [`AdapterCapabilities::format`].
    async fn chat_completion_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream, LlmError>;
}

/// Streaming behaviour advertised by an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterCapabilities {
    pub streaming: StreamingMode,
    pub format: StreamFormat,
}

impl AdapterCapabilities {
    pub const fn native(format: StreamFormat) -> Self {
        Self {
            streaming: StreamingMode::Native,
            format,
        }
    }

    pub const fn buffered() -> Self {
        Self {
            streaming: StreamingMode::Buffered,
            format: StreamFormat::OpenAi,
        }
    }
}

/// Everything a factory needs to build an adapter
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub provider: ProviderId,
    pub api_key: SecretString,
    /// Empty or absent means the provider default
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl AdapterSettings {
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: SecretString::from(api_key.into()),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The API key, rejecting an empty one
    pub(crate) fn require_key(&self) -> Result<&str, LlmError> {
        let key = self.api_key.expose_secret();
        if key.trim().is_empty() {
            return Err(LlmError::MissingCredential {
                provider: self.provider.clone(),
            });
        }
        Ok(key)
    }

    /// The configured base URL or `default`, validated and without trailing slash
    pub(crate) fn resolve_base_url(&self, default: &str) -> Result<String, LlmError> {
        let base = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(default);

        transport::validate_base_url(&self.provider, base)?;
        Ok(base.trim_end_matches('/').to_owned())
    }
}

/// Reject requests that violate the canonical invariants
pub(crate) fn validate(provider: &ProviderId, request: &ChatCompletionRequest) -> Result<(), LlmError> {
    request
        .validate()
        .map_err(|reason| LlmError::invalid_request(provider, reason))
}
