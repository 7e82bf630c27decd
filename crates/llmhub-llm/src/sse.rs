//! Decoding helpers for streamed completions
//!
//! Adapters hand back raw bytes; callers who want typed chunks run them
//! through [`chunks`] with the adapter's [`StreamFormat`], and optionally fold
//! them back into a full response with [`StreamAccumulator`].

use std::collections::BTreeMap;

use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt, TryStreamExt, stream};

use crate::convert::anthropic::AnthropicStreamState;
use crate::convert::dashscope::DashScopeStreamState;
use crate::convert::google::GeminiStreamState;
use crate::error::LlmError;
use crate::protocol::anthropic::AnthropicStreamEvent;
use crate::protocol::dashscope::DashScopeResponse;
use crate::protocol::google::GoogleResponse;
use crate::provider::ProviderId;
use crate::stream::{ByteStream, StreamFormat};
use crate::types::{
    ChatCompletionChunk, ChatCompletionResponse, Choice, Content, FinishReason, FunctionCall, Message, Role, ToolCall,
    ToolType, Usage,
};

/// Decode a server-sent event byte stream into canonical chunks
///
/// The `OpenAI` `[DONE]` sentinel ends the stream. Event payloads that cannot
/// be decoded, and upstream `error` events, surface as errors in-line.
pub fn chunks(
    body: ByteStream,
    format: StreamFormat,
    provider: ProviderId,
) -> impl Stream<Item = Result<ChatCompletionChunk, LlmError>> + Send {
    let mut decoder = Decoder::new(format, provider.clone());

    body.eventsource()
        .map_err(move |e| match e {
            EventStreamError::Transport(e) => e,
            EventStreamError::Utf8(e) => LlmError::Streaming {
                provider: provider.clone(),
                reason: e.to_string(),
            },
            EventStreamError::Parser(e) => LlmError::Streaming {
                provider: provider.clone(),
                reason: e.to_string(),
            },
        })
        .take_while(|event| {
            let done = matches!(event, Ok(event) if event.data.trim() == "[DONE]");
            std::future::ready(!done)
        })
        .map(move |event| match event {
            Ok(event) => decoder.decode(&event.event, &event.data),
            Err(e) => vec![Err(e)],
        })
        .flat_map(stream::iter)
}

/// Read a decoded chunk stream to the end and assemble the full response
///
/// # Errors
///
/// Returns the first error the stream yields
pub async fn collect<S>(stream: S) -> Result<ChatCompletionResponse, LlmError>
where
    S: Stream<Item = Result<ChatCompletionChunk, LlmError>>,
{
    let mut accumulator = StreamAccumulator::default();
    let mut stream = std::pin::pin!(stream);

    while let Some(chunk) = stream.next().await {
        accumulator.push(&chunk?);
    }

    Ok(accumulator.finish())
}

struct Decoder {
    provider: ProviderId,
    state: DecoderState,
}

enum DecoderState {
    OpenAi,
    Anthropic(AnthropicStreamState),
    DashScope(DashScopeStreamState),
    Gemini(GeminiStreamState),
}

impl Decoder {
    fn new(format: StreamFormat, provider: ProviderId) -> Self {
        let state = match format {
            StreamFormat::OpenAi => DecoderState::OpenAi,
            StreamFormat::Anthropic => DecoderState::Anthropic(AnthropicStreamState::new()),
            StreamFormat::DashScope => DecoderState::DashScope(DashScopeStreamState::new()),
            StreamFormat::Gemini => DecoderState::Gemini(GeminiStreamState::new()),
        };

        Self { provider, state }
    }

    fn decode(&mut self, event: &str, data: &str) -> Vec<Result<ChatCompletionChunk, LlmError>> {
        if data.trim().is_empty() {
            return Vec::new();
        }

        if event == "error" {
            return vec![Err(self.streaming_error(data))];
        }

        match &mut self.state {
            DecoderState::OpenAi => vec![decode_openai(&self.provider, data)],
            DecoderState::Anthropic(state) => match serde_json::from_str::<AnthropicStreamEvent>(data) {
                Ok(event) => match state.convert_event(event) {
                    Ok(chunks) => chunks.into_iter().map(Ok).collect(),
                    Err(reason) => vec![Err(self.streaming_error(&reason))],
                },
                Err(e) => vec![Err(LlmError::decode(&self.provider, e))],
            },
            DecoderState::DashScope(state) => match serde_json::from_str::<DashScopeResponse>(data) {
                Ok(event) => vec![Ok(state.convert_event(event))],
                Err(e) => vec![Err(LlmError::decode(&self.provider, e))],
            },
            DecoderState::Gemini(state) => match serde_json::from_str::<serde_json::Value>(data) {
                Ok(value) if value.get("error").is_some() => {
                    vec![Err(self.streaming_error(&value["error"].to_string()))]
                }
                Ok(value) => match serde_json::from_value::<GoogleResponse>(value) {
                    Ok(event) => vec![Ok(state.convert_event(event))],
                    Err(e) => vec![Err(LlmError::decode(&self.provider, e))],
                },
                Err(e) => vec![Err(LlmError::decode(&self.provider, e))],
            },
        }
    }

    fn streaming_error(&self, reason: &str) -> LlmError {
        tracing::warn!(provider = %self.provider, reason, "upstream reported a stream error");

        LlmError::Streaming {
            provider: self.provider.clone(),
            reason: reason.to_owned(),
        }
    }
}

fn decode_openai(provider: &ProviderId, data: &str) -> Result<ChatCompletionChunk, LlmError> {
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| LlmError::decode(provider, e))?;

    if let Some(error) = value.get("error") {
        return Err(LlmError::Streaming {
            provider: provider.clone(),
            reason: error.to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| LlmError::decode(provider, e))
}

/// Folds streamed chunks back into a complete response
///
/// Text deltas are concatenated and tool-call fragments are merged by their
/// index within each choice.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    id: String,
    model: String,
    created: u64,
    choices: BTreeMap<u32, PartialChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Default)]
struct PartialChoice {
    content: Option<String>,
    tool_calls: BTreeMap<u32, ToolCall>,
    finish_reason: Option<FinishReason>,
}

impl StreamAccumulator {
    pub fn push(&mut self, chunk: &ChatCompletionChunk) {
        if self.id.is_empty() {
            self.id.clone_from(&chunk.id);
        }
        if self.model.is_empty() {
            self.model.clone_from(&chunk.model);
        }
        if self.created == 0 {
            self.created = chunk.created;
        }
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }

        for choice in &chunk.choices {
            let partial = self.choices.entry(choice.index).or_default();

            if let Some(text) = &choice.delta.content {
                partial.content.get_or_insert_with(String::new).push_str(text);
            }

            for delta in choice.delta.tool_calls.iter().flatten() {
                let call = partial.tool_calls.entry(delta.index).or_insert_with(|| ToolCall {
                    id: String::new(),
                    tool_type: ToolType::Function,
                    function: FunctionCall::default(),
                });

                if let Some(id) = &delta.id {
                    call.id.clone_from(id);
                }
                if let Some(function) = &delta.function {
                    if let Some(name) = &function.name {
                        call.function.name.push_str(name);
                    }
                    if let Some(arguments) = &function.arguments {
                        call.function.arguments.push_str(arguments);
                    }
                }
            }

            if choice.finish_reason.is_some() {
                partial.finish_reason.clone_from(&choice.finish_reason);
            }
        }
    }

    pub fn finish(self) -> ChatCompletionResponse {
        let choices = self
            .choices
            .into_iter()
            .map(|(index, partial)| {
                let tool_calls: Vec<_> = partial.tool_calls.into_values().collect();
                let message = Message {
                    role: Role::Assistant,
                    content: partial.content.map(Content::Text),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                    ..Message::default()
                };

                Choice::new(index, message, partial.finish_reason)
            })
            .collect();

        ChatCompletionResponse {
            id: self.id,
            object: "chat.completion".to_owned(),
            created: self.created,
            model: self.model,
            choices,
            usage: self.usage.unwrap_or_default(),
            system_fingerprint: None,
        }
    }
}
