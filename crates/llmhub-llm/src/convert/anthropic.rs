//! Conversion between canonical types and the Anthropic Messages format

use super::{ConvertError, encode_arguments, parse_arguments, split_data_uri};
use crate::protocol::anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicMetadata,
    AnthropicRequest, AnthropicResponse, AnthropicResponseBlock, AnthropicRole, AnthropicStreamBlock,
    AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool, AnthropicToolChoice, AnthropicUsage,
};
use crate::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Content, ContentPart, FinishReason,
    FunctionCallChoice, FunctionCallDelta, FunctionCallMode, FunctionDefinition, Message, MessageDelta, Role,
    ToolCall, ToolCallDelta, ToolChoice, ToolChoiceMode, ToolType, Usage, unix_now,
};

/// Used when the caller leaves `max_tokens` unset, the API requires one
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

// -- Request: canonical -> Anthropic --

impl TryFrom<&ChatCompletionRequest> for AnthropicRequest {
    type Error = ConvertError;

    fn try_from(request: &ChatCompletionRequest) -> Result<Self, Self::Error> {
        let mut system = Vec::new();
        let mut messages = Vec::new();

        for message in &request.messages {
            match message.role {
                Role::System => {
                    let text = message.text();
                    if !text.is_empty() {
                        system.push(text);
                    }
                }
                Role::Tool => push_tool_result(&mut messages, message)?,
                Role::User => messages.push(AnthropicMessage {
                    role: AnthropicRole::User,
                    content: content_to_anthropic(message.content.as_ref()),
                }),
                Role::Assistant => messages.push(assistant_to_anthropic(message)?),
            }
        }

        let tools = request
            .tools
            .iter()
            .map(|tool| &tool.function)
            .chain(&request.functions)
            .map(AnthropicTool::from)
            .collect();

        let tool_choice = match (&request.tool_choice, &request.function_call) {
            (Some(choice), _) => Some(AnthropicToolChoice::from(choice)),
            (None, Some(choice)) => Some(AnthropicToolChoice::from(choice)),
            (None, None) => None,
        };

        Ok(Self {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            temperature: request.temperature,
            top_p: request.top_p,
            stop_sequences: request.stop_sequences(),
            stream: None,
            tools,
            tool_choice,
            metadata: request.user.clone().map(|user_id| AnthropicMetadata { user_id }),
        })
    }
}

/// Append a tool result, merging consecutive results into one user turn
fn push_tool_result(messages: &mut Vec<AnthropicMessage>, message: &Message) -> Result<(), ConvertError> {
    let tool_use_id = message.tool_call_id.clone().ok_or(ConvertError::MissingToolCallId)?;
    let block = AnthropicContentBlock::ToolResult {
        tool_use_id,
        content: message.text(),
    };

    if let Some(AnthropicMessage {
        role: AnthropicRole::User,
        content: AnthropicContent::Blocks(blocks),
    }) = messages.last_mut()
        && blocks
            .iter()
            .all(|block| matches!(block, AnthropicContentBlock::ToolResult { .. }))
    {
        blocks.push(block);
    } else {
        messages.push(AnthropicMessage {
            role: AnthropicRole::User,
            content: AnthropicContent::Blocks(vec![block]),
        });
    }

    Ok(())
}

/// Assistant turn, re-encoding issued calls as `tool_use` blocks
fn assistant_to_anthropic(message: &Message) -> Result<AnthropicMessage, ConvertError> {
    // A legacy function call has no id; its name stands in for one
    let calls: Vec<(&str, &str, &str)> = match &message.function_call {
        Some(call) => vec![(call.name.as_str(), call.name.as_str(), call.arguments.as_str())],
        None => message
            .tool_calls()
            .iter()
            .map(|call| (call.id.as_str(), call.function.name.as_str(), call.function.arguments.as_str()))
            .collect(),
    };

    if calls.is_empty() {
        return Ok(AnthropicMessage {
            role: AnthropicRole::Assistant,
            content: content_to_anthropic(message.content.as_ref()),
        });
    }

    let mut blocks = Vec::with_capacity(calls.len() + 1);

    let text = message.text();
    if !text.is_empty() {
        blocks.push(AnthropicContentBlock::Text { text });
    }

    for (id, name, arguments) in calls {
        blocks.push(AnthropicContentBlock::ToolUse {
            id: id.to_owned(),
            name: name.to_owned(),
            input: parse_arguments(id, arguments)?,
        });
    }

    Ok(AnthropicMessage {
        role: AnthropicRole::Assistant,
        content: AnthropicContent::Blocks(blocks),
    })
}

fn content_to_anthropic(content: Option<&Content>) -> AnthropicContent {
    match content {
        None => AnthropicContent::Text(String::new()),
        Some(Content::Text(text)) => AnthropicContent::Text(text.clone()),
        Some(Content::Parts(parts)) => AnthropicContent::Blocks(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                    ContentPart::ImageUrl { image_url } => AnthropicContentBlock::Image {
                        source: split_data_uri(&image_url.url).map_or_else(
                            || AnthropicImageSource::Url {
                                url: image_url.url.clone(),
                            },
                            |(media_type, data)| AnthropicImageSource::Base64 {
                                media_type: media_type.to_owned(),
                                data: data.to_owned(),
                            },
                        ),
                    },
                })
                .collect(),
        ),
    }
}

impl From<&FunctionDefinition> for AnthropicTool {
    fn from(function: &FunctionDefinition) -> Self {
        Self {
            name: function.name.clone(),
            description: function.description.clone(),
            input_schema: function
                .parameters
                .clone()
                .unwrap_or_else(|| serde_json::json!({"type": "object"})),
        }
    }
}

impl From<&ToolChoice> for AnthropicToolChoice {
    fn from(choice: &ToolChoice) -> Self {
        match choice {
            ToolChoice::Mode(ToolChoiceMode::None) => Self::None,
            ToolChoice::Mode(ToolChoiceMode::Auto) => Self::Auto,
            ToolChoice::Mode(ToolChoiceMode::Required) => Self::Any,
            ToolChoice::Function(forced) => Self::Tool {
                name: forced.function.name.clone(),
            },
        }
    }
}

impl From<&FunctionCallChoice> for AnthropicToolChoice {
    fn from(choice: &FunctionCallChoice) -> Self {
        match choice {
            FunctionCallChoice::Mode(FunctionCallMode::None) => Self::None,
            FunctionCallChoice::Mode(FunctionCallMode::Auto) => Self::Auto,
            FunctionCallChoice::Named(function) => Self::Tool {
                name: function.name.clone(),
            },
        }
    }
}

// -- Response: Anthropic -> canonical --

impl From<AnthropicResponse> for ChatCompletionResponse {
    fn from(response: AnthropicResponse) -> Self {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                AnthropicResponseBlock::Text { text: fragment } => text.push_str(&fragment),
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::function(id, name, encode_arguments(&input)));
                }
                AnthropicResponseBlock::Unsupported => {}
            }
        }

        let message = Message {
            role: Role::Assistant,
            content: (!text.is_empty() || tool_calls.is_empty()).then(|| Content::Text(text)),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            ..Message::default()
        };

        Self::single(
            response.id,
            response.model,
            message,
            response.stop_reason.as_deref().map(finish_reason),
            response.usage.into(),
        )
    }
}

impl From<AnthropicUsage> for Usage {
    fn from(usage: AnthropicUsage) -> Self {
        Self::new(usage.input_tokens, usage.output_tokens)
    }
}

fn finish_reason(stop_reason: &str) -> FinishReason {
    match stop_reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_owned()),
    }
}

// -- Stream: Anthropic events -> canonical chunks --

/// Tracks message metadata and tool-call numbering across stream events
///
/// Anthropic numbers content blocks across all block types, so a tool use
/// following a text block has block index 1+. Canonical tool-call indices
/// are assigned sequentially instead.
#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    id: String,
    model: String,
    created: u64,
    input_tokens: u32,
    next_tool_index: u32,
    current_tool_index: Option<u32>,
}

impl AnthropicStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one stream event into zero or more canonical chunks
    ///
    /// # Errors
    ///
    /// Returns the upstream error message when the stream reports an error event
    pub fn convert_event(&mut self, event: AnthropicStreamEvent) -> Result<Vec<ChatCompletionChunk>, String> {
        let chunks = match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.id = message.id;
                self.model = message.model;
                self.created = unix_now();
                self.input_tokens = message.usage.map_or(0, |usage| usage.input_tokens);

                vec![self.chunk(
                    MessageDelta {
                        role: Some(Role::Assistant),
                        ..MessageDelta::default()
                    },
                    None,
                )]
            }
            AnthropicStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                AnthropicStreamBlock::ToolUse { id, name } => {
                    let index = self.next_tool_index;
                    self.next_tool_index += 1;
                    self.current_tool_index = Some(index);

                    vec![self.chunk(
                        tool_delta(ToolCallDelta {
                            index,
                            id: Some(id),
                            tool_type: Some(ToolType::Function),
                            function: Some(FunctionCallDelta {
                                name: Some(name),
                                arguments: None,
                            }),
                        }),
                        None,
                    )]
                }
                AnthropicStreamBlock::Text { text } if !text.is_empty() => {
                    vec![self.chunk(MessageDelta::text(text), None)]
                }
                AnthropicStreamBlock::Text { .. } | AnthropicStreamBlock::Unsupported => Vec::new(),
            },
            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } => vec![self.chunk(MessageDelta::text(text), None)],
                AnthropicStreamDelta::InputJsonDelta { partial_json } => match self.current_tool_index {
                    Some(index) => vec![self.chunk(
                        tool_delta(ToolCallDelta {
                            index,
                            id: None,
                            tool_type: None,
                            function: Some(FunctionCallDelta {
                                name: None,
                                arguments: Some(partial_json),
                            }),
                        }),
                        None,
                    )],
                    None => Vec::new(),
                },
                AnthropicStreamDelta::Unsupported => Vec::new(),
            },
            AnthropicStreamEvent::ContentBlockStop { .. } => {
                self.current_tool_index = None;
                Vec::new()
            }
            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                let mut chunk = self.chunk(MessageDelta::default(), delta.stop_reason.as_deref().map(finish_reason));
                chunk.usage = usage.map(|usage| Usage::new(self.input_tokens, usage.output_tokens));
                vec![chunk]
            }
            AnthropicStreamEvent::MessageStop | AnthropicStreamEvent::Ping => Vec::new(),
            AnthropicStreamEvent::Error { error } => return Err(format!("{}: {}", error.error_type, error.message)),
        };

        Ok(chunks)
    }

    fn chunk(&self, delta: MessageDelta, finish_reason: Option<FinishReason>) -> ChatCompletionChunk {
        ChatCompletionChunk::delta(&self.id, &self.model, self.created, delta, finish_reason)
    }
}

fn tool_delta(call: ToolCallDelta) -> MessageDelta {
    MessageDelta {
        tool_calls: Some(vec![call]),
        ..MessageDelta::default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{FunctionCall, ToolDefinition};

    fn weather_request() -> ChatCompletionRequest {
        let mut request = ChatCompletionRequest::new(
            "claude-3-5-sonnet",
            vec![
                Message::system("You are terse."),
                Message::user("Weather in NYC?"),
                Message {
                    content: Some(Content::Text("Checking.".to_owned())),
                    ..Message::with_tool_calls(vec![ToolCall::function(
                        "toolu_1",
                        "get_weather",
                        "{\"city\":\"NYC\"}",
                    )])
                },
                Message::tool("toolu_1", "72F"),
            ],
        );
        request.tools = vec![ToolDefinition::function(FunctionDefinition {
            name: "get_weather".to_owned(),
            description: Some("Current weather".to_owned()),
            parameters: None,
        })];
        request
    }

    #[test]
    fn system_message_moves_to_top_level() {
        let native = AnthropicRequest::try_from(&weather_request()).unwrap();
        let body = serde_json::to_value(&native).unwrap();

        assert_eq!(body["system"], "You are terse.");
        assert!(body["messages"].as_array().unwrap().iter().all(|m| m["role"] != "system"));
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn multiple_system_messages_are_joined() {
        let request = ChatCompletionRequest::new(
            "claude-3-opus",
            vec![Message::system("one"), Message::user("hi"), Message::system("two")],
        );

        let native = AnthropicRequest::try_from(&request).unwrap();
        assert_eq!(native.system.as_deref(), Some("one\n\ntwo"));
        assert_eq!(native.messages.len(), 1);
    }

    #[test]
    fn tool_history_becomes_blocks() {
        let native = AnthropicRequest::try_from(&weather_request()).unwrap();
        let body = serde_json::to_value(&native).unwrap();

        assert_eq!(
            body["messages"][1],
            json!({
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Checking."},
                    {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "NYC"}}
                ]
            })
        );
        assert_eq!(
            body["messages"][2],
            json!({
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": "72F"}]
            })
        );
        assert_eq!(
            body["tools"],
            json!([{"name": "get_weather", "description": "Current weather", "input_schema": {"type": "object"}}])
        );
    }

    #[test]
    fn consecutive_tool_results_share_a_turn() {
        let request = ChatCompletionRequest::new(
            "claude-3-5-sonnet",
            vec![
                Message::user("Compare"),
                Message::with_tool_calls(vec![
                    ToolCall::function("toolu_a", "get_weather", "{\"city\":\"NYC\"}"),
                    ToolCall::function("toolu_b", "get_weather", "{\"city\":\"SF\"}"),
                ]),
                Message::tool("toolu_a", "72F"),
                Message::tool("toolu_b", "61F"),
            ],
        );

        let native = AnthropicRequest::try_from(&request).unwrap();
        assert_eq!(native.messages.len(), 3);
        assert!(matches!(
            &native.messages[2].content,
            AnthropicContent::Blocks(blocks) if blocks.len() == 2
        ));
    }

    #[test]
    fn legacy_function_call_uses_name_as_id() {
        let request = ChatCompletionRequest::new(
            "claude-3-5-sonnet",
            vec![
                Message::user("hi"),
                Message {
                    function_call: Some(FunctionCall {
                        name: "lookup".to_owned(),
                        arguments: "{}".to_owned(),
                    }),
                    ..Message::default()
                },
            ],
        );

        let body = serde_json::to_value(AnthropicRequest::try_from(&request).unwrap()).unwrap();
        assert_eq!(body["messages"][1]["content"][0]["id"], "lookup");
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let request = ChatCompletionRequest::new(
            "claude-3-5-sonnet",
            vec![
                Message::user("hi"),
                Message::with_tool_calls(vec![ToolCall::function("toolu_1", "lookup", "{oops")]),
            ],
        );

        assert!(matches!(
            AnthropicRequest::try_from(&request),
            Err(ConvertError::InvalidArguments { ref id, .. }) if id == "toolu_1"
        ));
    }

    #[test]
    fn data_uri_image_becomes_base64_source() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "claude-3-5-sonnet",
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "What is this?"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
            ]}]
        }))
        .unwrap();

        let body = serde_json::to_value(AnthropicRequest::try_from(&request).unwrap()).unwrap();
        assert_eq!(
            body["messages"][0]["content"][1],
            json!({"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "AAAA"}})
        );
    }

    #[test]
    fn forced_tool_choice_maps_to_tool() {
        let mut request = weather_request();
        request.tool_choice = Some(ToolChoice::function("get_weather"));

        let body = serde_json::to_value(AnthropicRequest::try_from(&request).unwrap()).unwrap();
        assert_eq!(body["tool_choice"], json!({"type": "tool", "name": "get_weather"}));
    }

    #[test]
    fn response_blocks_are_classified() {
        let native: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "thinking", "thinking": "...", "signature": "x"},
                {"type": "text", "text": "Let me "},
                {"type": "text", "text": "check."},
                {"type": "tool_use", "id": "toolu_9", "name": "get_weather", "input": {"city": "NYC"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 20, "output_tokens": 8}
        }))
        .unwrap();

        let response = ChatCompletionResponse::from(native);
        let choice = &response.choices[0];

        assert_eq!(choice.message.text(), "Let me check.");
        assert_eq!(choice.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(choice.message.tool_calls()[0].id, "toolu_9");
        assert_eq!(response.usage, Usage::new(20, 8));
    }

    #[test]
    fn tool_arguments_round_trip_semantically() {
        let original = ToolCall::function("toolu_1", "get_weather", "{\"city\":\"NYC\"}");
        let request = ChatCompletionRequest::new(
            "claude-3-5-sonnet",
            vec![Message::user("hi"), Message::with_tool_calls(vec![original.clone()])],
        );

        let encoded = serde_json::to_value(AnthropicRequest::try_from(&request).unwrap()).unwrap();
        let tool_use = encoded["messages"][1]["content"][0].clone();

        let native: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "model": "claude-3-5-sonnet-20241022",
            "content": [tool_use],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap();
        let decoded = ChatCompletionResponse::from(native);

        let before: serde_json::Value = serde_json::from_str(&original.function.arguments).unwrap();
        let after: serde_json::Value =
            serde_json::from_str(&decoded.first_tool_calls()[0].function.arguments).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn stream_events_become_chunks() {
        let events: Vec<AnthropicStreamEvent> = serde_json::from_value(json!([
            {"type": "message_start", "message": {"id": "msg_1", "type": "message", "role": "assistant",
                "model": "claude-3-5-sonnet-20241022", "usage": {"input_tokens": 12, "output_tokens": 1}}},
            {"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}},
            {"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hi"}},
            {"type": "content_block_stop", "index": 0},
            {"type": "content_block_start", "index": 1,
                "content_block": {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {}}},
            {"type": "content_block_delta", "index": 1,
                "delta": {"type": "input_json_delta", "partial_json": "{\"city\":"}},
            {"type": "content_block_delta", "index": 1,
                "delta": {"type": "input_json_delta", "partial_json": "\"NYC\"}"}},
            {"type": "content_block_stop", "index": 1},
            {"type": "message_delta", "delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 9}},
            {"type": "message_stop"}
        ]))
        .unwrap();

        let mut state = AnthropicStreamState::new();
        let chunks: Vec<_> = events
            .into_iter()
            .flat_map(|event| state.convert_event(event).unwrap())
            .collect();

        assert_eq!(chunks[0].choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunks[1].choices[0].delta.content.as_deref(), Some("Hi"));

        let tool_start = chunks[2].choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(tool_start[0].index, 0);
        assert_eq!(tool_start[0].id.as_deref(), Some("toolu_1"));

        let last = chunks.last().unwrap();
        assert_eq!(last.choices[0].finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(last.usage, Some(Usage::new(12, 9)));
    }

    #[test]
    fn stream_error_event_is_reported() {
        let event: AnthropicStreamEvent = serde_json::from_value(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }))
        .unwrap();

        let error = AnthropicStreamState::new().convert_event(event).unwrap_err();
        assert_eq!(error, "overloaded_error: Overloaded");
    }
}
