//! `OpenAI`-compatible chat completion request body
//!
//! Responses need no wire type of their own: the canonical response already
//! has the `OpenAI` shape and is decoded directly.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{FunctionCallChoice, FunctionDefinition, Message, ResponseFormat, Stop, ToolChoice, ToolDefinition};

/// Request body borrowing from the canonical request
///
/// Every optional field is omitted unless set, since several upstreams
/// reject unexpected keys, empty arrays or explicit nulls.
#[derive(Debug, Serialize)]
pub struct OpenAiRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a Stop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<&'a BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    #[serde(skip_serializing_if = "is_empty")]
    pub tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'a ToolChoice>,
    #[serde(skip_serializing_if = "is_empty")]
    pub functions: &'a [FunctionDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<&'a FunctionCallChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<&'a ResponseFormat>,
}

#[allow(clippy::ref_option_ref, clippy::trivially_copy_pass_by_ref)]
fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}
