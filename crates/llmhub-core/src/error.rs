use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. An HTTP front-end
/// turns these into actual responses, keeping domain errors decoupled
/// from any web framework.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Machine-readable error code, when one applies
    fn error_code(&self) -> Option<&str> {
        None
    }

    /// `OpenAI`-style error envelope for this error
    fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                message: self.client_message(),
                error_type: self.error_type().to_owned(),
                param: None,
                code: self.error_code().map(str::to_owned),
            },
        }
    }
}

/// Error envelope returned to API consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error details inside an [`ErrorBody`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Unavailable;

    impl std::fmt::Display for Unavailable {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("backend unavailable: 10.0.0.3 refused")
        }
    }

    impl std::error::Error for Unavailable {}

    impl HttpError for Unavailable {
        fn status_code(&self) -> StatusCode {
            StatusCode::BAD_GATEWAY
        }

        fn error_type(&self) -> &str {
            "api_error"
        }

        fn client_message(&self) -> String {
            "upstream unavailable".to_owned()
        }
    }

    #[test]
    fn error_body_uses_client_message() {
        let body = serde_json::to_value(Unavailable.to_error_body()).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "error": {"message": "upstream unavailable", "type": "api_error"}
            })
        );
    }
}
