use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::{FunctionCallChoice, FunctionDefinition, ToolChoice, ToolDefinition};

/// Canonical chat completion request
///
/// Field names and shapes follow the `OpenAI` chat completions schema, which
/// most upstreams accept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages, in order
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Stop>,
    /// Random seed for deterministic generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Whether the caller wants a streamed response
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    /// End-user identifier forwarded for abuse monitoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    /// Tool definitions available to the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// How the model should select tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Legacy function definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDefinition>,
    /// Legacy function selection directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallChoice>,
    /// Requested output format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Self::default()
        }
    }

    /// Whether the request asks for tool or function calling in any form
    pub fn uses_tools(&self) -> bool {
        !self.tools.is_empty()
            || !self.functions.is_empty()
            || self.tool_choice.is_some()
            || self.function_call.is_some()
    }

    /// Stop sequences as a list, empty when none were given
    pub fn stop_sequences(&self) -> Vec<String> {
        match &self.stop {
            Some(Stop::One(sequence)) => vec![sequence.clone()],
            Some(Stop::Many(sequences)) => sequences.clone(),
            None => Vec::new(),
        }
    }

    /// Check the request-level invariants
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model is required".to_owned());
        }

        if self.messages.is_empty() {
            return Err("at least one message is required".to_owned());
        }

        for (index, message) in self.messages.iter().enumerate() {
            message.validate().map_err(|reason| format!("messages[{index}]: {reason}"))?;
        }

        let mut names = HashSet::new();
        let declared = self
            .tools
            .iter()
            .map(|tool| &tool.function)
            .chain(&self.functions);

        for function in declared {
            if !names.insert(function.name.as_str()) {
                return Err(format!("duplicate tool name: {}", function.name));
            }
        }

        Ok(())
    }
}

/// Stop sequences, given either as a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stop {
    One(String),
    Many(Vec<String>),
}

/// Requested output format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { json_schema: serde_json::Value },
}
