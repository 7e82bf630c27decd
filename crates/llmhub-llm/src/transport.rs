//! HTTP plumbing shared by the adapters

use std::time::Duration;

use futures_util::TryStreamExt;
use http::{HeaderMap, HeaderName, HeaderValue};
use llmhub_core::RequestContext;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::provider::ProviderId;
use crate::stream::{self, ByteStream};

/// Pooled HTTP client bound to one provider
///
/// Synchronous calls are bounded by the configured timeout end to end.
/// Streaming calls are bounded only until response headers arrive; after
/// that the request context alone governs the body.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
    provider: ProviderId,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(provider: &ProviderId, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                provider: provider.clone(),
                reason: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            provider: provider.clone(),
            timeout,
        })
    }

    /// POST a JSON body and return the successful response
    pub async fn post<B>(
        &self,
        ctx: &RequestContext,
        url: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<reqwest::Response, LlmError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let request = self
            .client
            .post(url)
            .headers(headers.clone())
            .timeout(self.timeout)
            .json(body);

        self.send(ctx, request).await
    }

    /// POST a JSON body expecting a server-sent event stream
    pub async fn post_stream<B>(
        &self,
        ctx: &RequestContext,
        url: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<ByteStream, LlmError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let request = self
            .client
            .post(url)
            .headers(headers.clone())
            .header(http::header::ACCEPT, "text/event-stream")
            .json(body);

        let response = match tokio::time::timeout(self.timeout, self.send(ctx, request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!(provider = %self.provider, "upstream stream did not start in time");
                return Err(LlmError::DeadlineExceeded {
                    provider: self.provider.clone(),
                });
            }
        };

        let provider = self.provider.clone();
        let body = response.bytes_stream().map_err(move |e| LlmError::Streaming {
            provider: provider.clone(),
            reason: e.to_string(),
        });

        Ok(stream::guard(self.provider.clone(), Box::pin(body), ctx))
    }

    /// Read the whole body and decode it as JSON
    pub async fn json<T>(&self, ctx: &RequestContext, response: reqwest::Response) -> Result<T, LlmError>
    where
        T: DeserializeOwned,
    {
        let bytes = ctx
            .run(response.bytes())
            .await
            .map_err(|reason| LlmError::interrupted(&self.provider, reason))?
            .map_err(|source| self.transport_error(source))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(provider = %self.provider, error = %e, "failed to decode upstream response");
            LlmError::decode(&self.provider, e)
        })
    }

    async fn send(&self, ctx: &RequestContext, request: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let response = ctx
            .run(request.send())
            .await
            .map_err(|reason| LlmError::interrupted(&self.provider, reason))?
            .map_err(|source| self.transport_error(source))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = ctx
            .run(response.text())
            .await
            .map_err(|reason| LlmError::interrupted(&self.provider, reason))?
            .unwrap_or_default();

        tracing::error!(provider = %self.provider, status = %status, "upstream returned error");

        Err(LlmError::Upstream {
            provider: self.provider.clone(),
            status,
            body,
        })
    }

    fn transport_error(&self, source: reqwest::Error) -> LlmError {
        if source.is_timeout() {
            tracing::error!(provider = %self.provider, error = %source, "upstream request timed out");
        } else {
            tracing::error!(provider = %self.provider, error = %source, "upstream request failed");
        }

        LlmError::Transport {
            provider: self.provider.clone(),
            source,
        }
    }
}

/// Header set attached to every upstream call
#[derive(Debug)]
pub(crate) struct Headers {
    provider: ProviderId,
    map: HeaderMap,
}

impl Headers {
    pub fn new(provider: &ProviderId) -> Self {
        Self {
            provider: provider.clone(),
            map: HeaderMap::new(),
        }
    }

    pub fn bearer(self, token: &str) -> Result<Self, LlmError> {
        self.secret(http::header::AUTHORIZATION, &format!("Bearer {token}"))
    }

    /// Header holding a credential, excluded from debug output
    pub fn secret(mut self, name: impl Into<HeaderName>, value: &str) -> Result<Self, LlmError> {
        let mut value = self.value(value)?;
        value.set_sensitive(true);
        self.map.insert(name.into(), value);
        Ok(self)
    }

    pub fn with(mut self, name: impl Into<HeaderName>, value: &'static str) -> Self {
        self.map.insert(name.into(), HeaderValue::from_static(value));
        self
    }

    pub fn build(self) -> HeaderMap {
        self.map
    }

    fn value(&self, value: &str) -> Result<HeaderValue, LlmError> {
        HeaderValue::from_str(value).map_err(|_| LlmError::InvalidConfig {
            provider: self.provider.clone(),
            reason: "credential contains characters not allowed in a header".to_owned(),
        })
    }
}

/// Join a base URL and an endpoint path without doubling slashes
pub(crate) fn join(base: &str, endpoint: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), endpoint.trim_start_matches('/'))
}

/// Check a base URL is absolute http(s)
pub(crate) fn validate_base_url(provider: &ProviderId, base: &str) -> Result<(), LlmError> {
    let url = url::Url::parse(base).map_err(|e| LlmError::InvalidConfig {
        provider: provider.clone(),
        reason: format!("invalid base url {base:?}: {e}"),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(LlmError::InvalidConfig {
            provider: provider.clone(),
            reason: format!("unsupported url scheme: {scheme}"),
        }),
    }
}
