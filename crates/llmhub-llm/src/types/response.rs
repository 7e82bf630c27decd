use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::message::{Message, ToolCall};
use super::stream::MessageDelta;

/// Reason the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the `max_tokens` limit
    Length,
    /// Model decided to call a tool
    ToolCalls,
    /// Model issued a legacy function call
    FunctionCall,
    /// Content was filtered by safety systems
    ContentFilter,
    /// Any other upstream-specific reason, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// Token usage statistics
///
/// Decoding recomputes the total only when both parts are reported and keeps
/// the upstream total otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UsageCounts")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Usage counters as an upstream reports them, any of which may be missing
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UsageCounts {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl From<UsageCounts> for Usage {
    fn from(counts: UsageCounts) -> Self {
        let prompt_tokens = counts.prompt_tokens.unwrap_or_default();
        let completion_tokens = counts.completion_tokens.unwrap_or_default();

        let total_tokens = match (counts.prompt_tokens, counts.completion_tokens, counts.total_tokens) {
            (Some(_), Some(_), _) | (_, _, None) => prompt_tokens.saturating_add(completion_tokens),
            (_, _, Some(total)) => total,
        };

        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

/// A single completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    /// Generated message
    #[serde(default)]
    pub message: Message,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
    /// Partial message, present on streaming chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<MessageDelta>,
}

impl Choice {
    pub const fn new(index: u32, message: Message, finish_reason: Option<FinishReason>) -> Self {
        Self {
            index,
            message,
            finish_reason,
            delta: None,
        }
    }
}

/// Canonical chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Unique response identifier
    #[serde(default)]
    pub id: String,
    /// Object type (e.g. "chat.completion")
    #[serde(default = "default_object")]
    pub object: String,
    /// Unix timestamp of creation
    #[serde(default)]
    pub created: u64,
    /// Model used for generation
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

fn default_object() -> String {
    "chat.completion".to_owned()
}

impl ChatCompletionResponse {
    /// Single-choice response built by adapters that translate native formats
    pub fn single(
        id: impl Into<String>,
        model: impl Into<String>,
        message: Message,
        finish_reason: Option<FinishReason>,
        usage: Usage,
    ) -> Self {
        Self {
            id: id.into(),
            object: default_object(),
            created: unix_now(),
            model: model.into(),
            choices: vec![Choice::new(0, message, finish_reason)],
            usage,
            system_fingerprint: None,
        }
    }

    /// Text of the first choice, if any
    pub fn first_text(&self) -> Option<String> {
        self.choices.first().map(|choice| choice.message.text())
    }

    /// Tool calls of the first choice
    pub fn first_tool_calls(&self) -> &[ToolCall] {
        self.choices
            .first()
            .map(|choice| choice.message.tool_calls())
            .unwrap_or_default()
    }
}

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
