//! Adapter for `OpenAI`-compatible chat completion endpoints
//!
//! Most providers speak the same schema and differ only in base URL, path
//! and auth header, so a single adapter is parameterized by a [`RestProfile`].

use async_trait::async_trait;
use http::{HeaderMap, HeaderName};
use llmhub_core::RequestContext;
use secrecy::ExposeSecret;

use super::{Adapter, AdapterCapabilities, AdapterSettings, validate};
use crate::capability::ensure_tools_supported;
use crate::error::LlmError;
use crate::protocol::openai::OpenAiRequest;
use crate::provider::ProviderId;
use crate::stream::{ByteStream, StreamFormat};
use crate::transport::{self, Headers, HttpTransport};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// How the API key is presented upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Raw key in the named header
    Header(&'static str),
    /// No credential is sent
    None,
}

/// Static description of an `OpenAI`-compatible provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestProfile {
    pub provider: ProviderId,
    pub default_base_url: &'static str,
    pub endpoint: &'static str,
    pub auth: AuthStyle,
    /// When false an empty key is accepted and no auth header is sent
    pub key_required: bool,
}

impl RestProfile {
    /// Bearer-authenticated profile on the standard `/chat/completions` path
    pub const fn bearer(provider: ProviderId, default_base_url: &'static str) -> Self {
        Self {
            provider,
            default_base_url,
            endpoint: "/chat/completions",
            auth: AuthStyle::Bearer,
            key_required: true,
        }
    }

    #[must_use]
    pub const fn with_endpoint(mut self, endpoint: &'static str) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Send the raw key in `header` instead of a bearer token
    #[must_use]
    pub const fn with_header_auth(mut self, header: &'static str) -> Self {
        self.auth = AuthStyle::Header(header);
        self
    }

    #[must_use]
    pub const fn key_optional(mut self) -> Self {
        self.key_required = false;
        self
    }
}

/// Profiles of every built-in `OpenAI`-compatible provider
pub static BUILTIN_PROFILES: &[RestProfile] = &[
    RestProfile::bearer(ProviderId::OPENAI, "https://api.openai.com/v1"),
    RestProfile::bearer(ProviderId::DEEPSEEK, "https://api.deepseek.com/v1"),
    RestProfile::bearer(ProviderId::SILICONFLOW, "https://api.siliconflow.cn/v1"),
    RestProfile::bearer(ProviderId::MISTRAL, "https://api.mistral.ai/v1"),
    RestProfile::bearer(ProviderId::GROQ, "https://api.groq.com/openai/v1"),
    RestProfile::bearer(ProviderId::OPENROUTER, "https://openrouter.ai/api/v1"),
    RestProfile::bearer(ProviderId::COZE, "https://api.coze.cn/v1"),
    RestProfile::bearer(ProviderId::DOUBAO, "https://ark.cn-beijing.volces.com/api/v3"),
    RestProfile::bearer(
        ProviderId::ERNIE,
        "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat",
    )
    .with_endpoint("/completions"),
    RestProfile::bearer(ProviderId::QIHOO_360, "https://api.360.cn/v1"),
    RestProfile::bearer(ProviderId::BAICHUAN, "https://api.baichuan-ai.com/v1"),
    RestProfile::bearer(ProviderId::CHATGLM, "https://open.bigmodel.cn/api/paas/v4"),
    RestProfile::bearer(ProviderId::COHERE, "https://api.cohere.ai/v1"),
    RestProfile::bearer(ProviderId::HUNYUAN, "https://hunyuan.tencentcloudapi.com"),
    RestProfile::bearer(ProviderId::MINIMAX, "https://api.minimax.chat/v1"),
    RestProfile::bearer(ProviderId::MOONSHOT, "https://api.moonshot.cn/v1"),
    RestProfile::bearer(ProviderId::NOVITA, "https://api.novita.ai/v3"),
    RestProfile::bearer(ProviderId::OLLAMA, "http://localhost:11434/v1").key_optional(),
    RestProfile::bearer(ProviderId::SPARK, "https://spark-api.xf-yun.com/v1"),
    RestProfile::bearer(ProviderId::STEPFUN, "https://api.stepfun.com/v1"),
    RestProfile::bearer(ProviderId::TOGETHER, "https://api.together.xyz/v1"),
    RestProfile::bearer(ProviderId::XAI, "https://api.x.ai/v1"),
    RestProfile::bearer(ProviderId::YI, "https://api.lingyiwanwu.com/v1"),
];

/// Adapter for any `OpenAI`-compatible endpoint
#[derive(Debug)]
pub struct RestAdapter {
    provider: ProviderId,
    url: String,
    headers: HeaderMap,
    transport: HttpTransport,
}

impl RestAdapter {
    /// Build an adapter from a profile and caller settings
    ///
    /// The provider identity comes from `settings`, so one profile can back
    /// several registered names.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingCredential`] for an empty key when the profile
    /// requires one, or [`LlmError::InvalidConfig`] for an unusable base URL
    pub fn new(profile: &RestProfile, settings: &AdapterSettings) -> Result<Self, LlmError> {
        let provider = settings.provider.clone();
        let key = if profile.key_required {
            settings.require_key()?
        } else {
            settings.api_key.expose_secret().trim()
        };

        let base_url = settings.resolve_base_url(profile.default_base_url)?;
        let url = transport::join(&base_url, profile.endpoint);

        let headers = Headers::new(&provider);
        let headers = match profile.auth {
            _ if key.is_empty() => headers,
            AuthStyle::Bearer => headers.bearer(key)?,
            AuthStyle::Header(name) => {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| LlmError::InvalidConfig {
                    provider: provider.clone(),
                    reason: format!("invalid auth header name {name:?}"),
                })?;
                headers.secret(name, key)?
            }
            AuthStyle::None => headers,
        };

        tracing::debug!(provider = %provider, url = %url, "created rest adapter");

        Ok(Self {
            transport: HttpTransport::new(&provider, settings.timeout)?,
            provider,
            url,
            headers: headers.build(),
        })
    }

    fn prepare<'a>(&self, request: &'a ChatCompletionRequest) -> Result<OpenAiRequest<'a>, LlmError> {
        validate(&self.provider, request)?;
        ensure_tools_supported(&self.provider, &request.model, request)?;

        Ok(OpenAiRequest::from(request))
    }
}

#[async_trait]
impl Adapter for RestAdapter {
    fn provider(&self) -> &ProviderId {
        &self.provider
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::native(StreamFormat::OpenAi)
    }

    async fn chat_completion(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let body = self.prepare(request)?;

        tracing::debug!(provider = %self.provider, model = %request.model, url = %self.url, "sending chat completion");

        let response = self.transport.post(ctx, &self.url, &self.headers, &body).await?;
        self.transport.json(ctx, response).await
    }

    async fn chat_completion_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream, LlmError> {
        let body = self.prepare(request)?.streaming();

        tracing::debug!(provider = %self.provider, model = %request.model, url = %self.url, "starting chat completion stream");

        self.transport.post_stream(ctx, &self.url, &self.headers, &body).await
    }
}
