//! `DashScope` text-generation wire format types
//!
//! Messages are wrapped in `input`, sampling settings in `parameters`.

use serde::{Deserialize, Serialize};

use crate::types::{Content, Role};

// -- Request types --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashScopeRequest {
    pub model: String,
    pub input: DashScopeInput,
    #[serde(skip_serializing_if = "DashScopeParameters::is_empty")]
    pub parameters: DashScopeParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashScopeInput {
    pub messages: Vec<DashScopeMessage>,
}

/// Message with content passed through as given (string or parts)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashScopeMessage {
    pub role: Role,
    pub content: Content,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashScopeParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Each stream event carries only the new text when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_output: Option<bool>,
}

impl DashScopeParameters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// -- Response types --

/// Response body, also the payload of each stream event
#[derive(Debug, Clone, Deserialize)]
pub struct DashScopeResponse {
    #[serde(default)]
    pub request_id: String,
    pub output: DashScopeOutput,
    #[serde(default)]
    pub usage: DashScopeUsage,
}

/// Output in either the `text` or the `message` result format
#[derive(Debug, Clone, Deserialize)]
pub struct DashScopeOutput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub choices: Vec<DashScopeChoice>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashScopeChoice {
    pub message: DashScopeChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashScopeChoiceMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DashScopeUsage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}
