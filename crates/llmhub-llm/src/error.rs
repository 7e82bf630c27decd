use http::StatusCode;
use llmhub_core::{HttpError, Interrupted};
use thiserror::Error;

use crate::provider::ProviderId;

/// Errors that can occur while serving a chat completion
///
/// Every variant names the provider it concerns.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No factory is registered for the requested provider
    #[error("unsupported provider: {provider}")]
    UnregisteredProvider { provider: ProviderId },

    /// The provider requires an API key and none was supplied
    #[error("{provider}: api key is required")]
    MissingCredential { provider: ProviderId },

    /// Adapter settings are unusable (malformed base URL, header value, ...)
    #[error("{provider}: invalid configuration: {reason}")]
    InvalidConfig { provider: ProviderId, reason: String },

    /// The canonical request violates an invariant or cannot be translated
    #[error("{provider}: invalid request: {reason}")]
    InvalidRequest { provider: ProviderId, reason: String },

    /// Tool or function calling was requested from a target that lacks it
    #[error("tool use not supported for provider {provider} (model {model})")]
    ToolsUnsupported { provider: ProviderId, model: String },

    /// DNS, connect, TLS or transport timeout failure
    #[error("{provider} transport error: {source}")]
    Transport {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    /// The caller cancelled the request context
    #[error("{provider}: request cancelled")]
    Cancelled { provider: ProviderId },

    /// The request context deadline passed
    #[error("{provider}: deadline exceeded")]
    DeadlineExceeded { provider: ProviderId },

    /// Upstream answered with a non-success status
    #[error("{provider} api error: status {status}, body: {body}")]
    Upstream {
        provider: ProviderId,
        status: StatusCode,
        body: String,
    },

    /// Upstream body did not match the expected shape
    #[error("{provider}: failed to decode response: {reason}")]
    Decode { provider: ProviderId, reason: String },

    /// Stream broke after it was established
    #[error("{provider} streaming error: {reason}")]
    Streaming { provider: ProviderId, reason: String },
}

/// Broad error category, mirroring how callers are expected to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal to the call, fix the setup or the request
    Configuration,
    /// The provider or model cannot serve the requested feature
    Capability,
    /// Network-level failure, cancellation or deadline
    Transport,
    /// Upstream returned a non-2xx status
    Upstream,
    /// Upstream payload could not be understood
    Decode,
}

impl LlmError {
    /// Map a context interruption to the matching error
    pub fn interrupted(provider: &ProviderId, reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => Self::Cancelled {
                provider: provider.clone(),
            },
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded {
                provider: provider.clone(),
            },
        }
    }

    pub fn invalid_request(provider: &ProviderId, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            provider: provider.clone(),
            reason: reason.into(),
        }
    }

    pub fn decode(provider: &ProviderId, reason: impl ToString) -> Self {
        Self::Decode {
            provider: provider.clone(),
            reason: reason.to_string(),
        }
    }

    /// Provider this error concerns
    pub const fn provider(&self) -> &ProviderId {
        match self {
            Self::UnregisteredProvider { provider }
            | Self::MissingCredential { provider }
            | Self::InvalidConfig { provider, .. }
            | Self::InvalidRequest { provider, .. }
            | Self::ToolsUnsupported { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Cancelled { provider }
            | Self::DeadlineExceeded { provider }
            | Self::Upstream { provider, .. }
            | Self::Decode { provider, .. }
            | Self::Streaming { provider, .. } => provider,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnregisteredProvider { .. }
            | Self::MissingCredential { .. }
            | Self::InvalidConfig { .. }
            | Self::InvalidRequest { .. } => ErrorKind::Configuration,
            Self::ToolsUnsupported { .. } => ErrorKind::Capability,
            Self::Transport { .. } | Self::Cancelled { .. } | Self::DeadlineExceeded { .. } => ErrorKind::Transport,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Decode { .. } | Self::Streaming { .. } => ErrorKind::Decode,
        }
    }

    /// Whether an outer retry policy could reasonably try again
    ///
    /// The adapters never retry on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Upstream { status, .. } => *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
            Self::Streaming { .. } => true,
            _ => false,
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnregisteredProvider { .. } => StatusCode::NOT_FOUND,
            Self::MissingCredential { .. } => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest { .. } | Self::ToolsUnsupported { .. } => StatusCode::BAD_REQUEST,
            Self::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => StatusCode::TOO_MANY_REQUESTS,
            Self::Transport { .. } | Self::Upstream { .. } | Self::Decode { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidConfig { .. } | Self::Streaming { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::UnregisteredProvider { .. } => "not_found_error",
            Self::MissingCredential { .. } => "authentication_error",
            Self::InvalidRequest { .. } | Self::ToolsUnsupported { .. } => "invalid_request_error",
            Self::Transport { .. } | Self::Cancelled { .. } | Self::DeadlineExceeded { .. } => "transport_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Decode { .. } => "decode_error",
            Self::Streaming { .. } => "streaming_error",
            Self::InvalidConfig { .. } => "internal_error",
        }
    }

    fn error_code(&self) -> Option<&str> {
        match self {
            Self::ToolsUnsupported { .. } => Some("tools_unsupported"),
            Self::UnregisteredProvider { .. } => Some("unsupported_provider"),
            _ => None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Upstream bodies and configuration details stay in the logs
            Self::Upstream { provider, status, .. } => format!("{provider} returned status {status}"),
            Self::InvalidConfig { provider, .. } => format!("{provider} is misconfigured"),
            other => other.to_string(),
        }
    }
}
