//! Conversion between canonical types and the `DashScope` format

use crate::protocol::dashscope::{
    DashScopeInput, DashScopeMessage, DashScopeParameters, DashScopeRequest, DashScopeResponse, DashScopeUsage,
};
use crate::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Content, FinishReason, Message, MessageDelta,
    Role, Usage, UsageCounts, unix_now,
};

impl From<&ChatCompletionRequest> for DashScopeRequest {
    fn from(request: &ChatCompletionRequest) -> Self {
        let messages = request
            .messages
            .iter()
            .map(|message| DashScopeMessage {
                role: message.role,
                content: message.content.clone().unwrap_or_else(|| Content::Text(String::new())),
            })
            .collect();

        Self {
            model: request.model.clone(),
            input: DashScopeInput { messages },
            parameters: DashScopeParameters {
                temperature: request.temperature,
                top_p: request.top_p,
                max_tokens: request.max_tokens,
                stop: request.stop_sequences(),
                seed: request.seed,
                incremental_output: None,
            },
        }
    }
}

impl From<DashScopeUsage> for Usage {
    fn from(usage: DashScopeUsage) -> Self {
        Self::from(UsageCounts {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
        })
    }
}

impl DashScopeResponse {
    /// Generated text and finish reason, whichever result format was used
    fn into_parts(self) -> (String, Option<FinishReason>) {
        let output = self.output;
        let first = output.choices.into_iter().next();

        let reason = output
            .finish_reason
            .or_else(|| first.as_ref().and_then(|choice| choice.finish_reason.clone()));
        let text = output
            .text
            .or_else(|| first.map(|choice| choice.message.content))
            .unwrap_or_default();

        (text, reason.as_deref().and_then(finish_reason))
    }
}

impl From<DashScopeResponse> for ChatCompletionResponse {
    fn from(response: DashScopeResponse) -> Self {
        let id = response.request_id.clone();
        let usage = response.usage.into();
        let (text, finish_reason) = response.into_parts();

        Self::single(id, String::new(), Message::assistant(text), finish_reason, usage)
    }
}

/// `null` marks an unfinished stream event
fn finish_reason(reason: &str) -> Option<FinishReason> {
    match reason {
        "" | "null" => None,
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        other => Some(FinishReason::Other(other.to_owned())),
    }
}

/// Turns incremental stream events into canonical chunks
#[derive(Debug, Default)]
pub struct DashScopeStreamState {
    created: u64,
    started: bool,
}

impl DashScopeStreamState {
    pub fn new() -> Self {
        Self {
            created: unix_now(),
            started: false,
        }
    }

    pub fn convert_event(&mut self, event: DashScopeResponse) -> ChatCompletionChunk {
        let id = event.request_id.clone();
        let usage: Usage = event.usage.into();
        let (text, finish_reason) = event.into_parts();

        let delta = MessageDelta {
            role: (!self.started).then_some(Role::Assistant),
            content: (!text.is_empty()).then_some(text),
            tool_calls: None,
        };
        self.started = true;

        let finished = finish_reason.is_some();
        let mut chunk = ChatCompletionChunk::delta(id, String::new(), self.created, delta, finish_reason);
        if finished {
            chunk.usage = Some(usage);
        }
        chunk
    }
}
