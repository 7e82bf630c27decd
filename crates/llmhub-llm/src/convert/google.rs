//! Conversion between canonical types and the Google Generative Language format

use std::collections::HashMap;

use uuid::Uuid;

use super::{ConvertError, encode_arguments, parse_arguments, split_data_uri};
use crate::protocol::google::{
    GoogleCandidate, GoogleContent, GoogleFunctionCall, GoogleFunctionCallingConfig, GoogleFunctionDeclaration,
    GoogleFunctionResponse, GoogleGenerationConfig, GoogleInlineData, GooglePart, GoogleRequest, GoogleResponse,
    GoogleTool, GoogleToolConfig, GoogleUsageMetadata,
};
use crate::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Choice, ChunkChoice, Content, ContentPart,
    FinishReason, FunctionCallChoice, FunctionCallDelta, FunctionCallMode, Message, MessageDelta, ResponseFormat, Role,
    ToolCall, ToolCallDelta, ToolChoice, ToolChoiceMode, ToolType, Usage, UsageCounts, unix_now,
};

// -- Request: canonical -> Google --

impl TryFrom<&ChatCompletionRequest> for GoogleRequest {
    type Error = ConvertError;

    fn try_from(request: &ChatCompletionRequest) -> Result<Self, Self::Error> {
        let mut system = Vec::new();
        let mut contents = Vec::new();
        // Function responses are keyed by name here, callers link them by call id
        let mut call_names: HashMap<&str, &str> = HashMap::new();

        for message in &request.messages {
            match message.role {
                Role::System => system.push(GooglePart::text(message.text())),
                Role::User => contents.push(GoogleContent {
                    role: Some("user".to_owned()),
                    parts: content_parts(message),
                }),
                Role::Assistant => {
                    let mut parts = content_parts(message);

                    if let Some(call) = &message.function_call {
                        call_names.insert(&call.name, &call.name);
                        parts.push(function_call_part(None, &call.name, &call.arguments)?);
                    }

                    for call in message.tool_calls() {
                        call_names.insert(&call.id, &call.function.name);
                        parts.push(function_call_part(
                            Some(&call.id),
                            &call.function.name,
                            &call.function.arguments,
                        )?);
                    }

                    contents.push(GoogleContent {
                        role: Some("model".to_owned()),
                        parts,
                    });
                }
                Role::Tool => {
                    let id = message.tool_call_id.as_deref().ok_or(ConvertError::MissingToolCallId)?;
                    let name = call_names
                        .get(id)
                        .copied()
                        .or(message.name.as_deref())
                        .unwrap_or(id);

                    contents.push(GoogleContent {
                        role: Some("user".to_owned()),
                        parts: vec![GooglePart {
                            function_response: Some(GoogleFunctionResponse {
                                id: Some(id.to_owned()),
                                name: name.to_owned(),
                                response: tool_response(&message.text()),
                            }),
                            ..GooglePart::default()
                        }],
                    });
                }
            }
        }

        let declarations: Vec<_> = request
            .tools
            .iter()
            .map(|tool| &tool.function)
            .chain(&request.functions)
            .map(|function| GoogleFunctionDeclaration {
                name: function.name.clone(),
                description: function.description.clone(),
                parameters: function.parameters.clone(),
            })
            .collect();

        let tools = if declarations.is_empty() {
            Vec::new()
        } else {
            vec![GoogleTool {
                function_declarations: declarations,
            }]
        };

        Ok(Self {
            contents,
            system_instruction: (!system.is_empty()).then(|| GoogleContent {
                role: None,
                parts: system,
            }),
            generation_config: GoogleGenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                max_output_tokens: request.max_tokens,
                stop_sequences: request.stop_sequences(),
                presence_penalty: request.presence_penalty,
                frequency_penalty: request.frequency_penalty,
                seed: request.seed,
                response_mime_type: match request.response_format {
                    Some(ResponseFormat::JsonObject | ResponseFormat::JsonSchema { .. }) => {
                        Some("application/json".to_owned())
                    }
                    Some(ResponseFormat::Text) | None => None,
                },
            },
            tools,
            tool_config: tool_config(request),
        })
    }
}

fn content_parts(message: &Message) -> Vec<GooglePart> {
    match &message.content {
        None => Vec::new(),
        Some(Content::Text(text)) if text.is_empty() => Vec::new(),
        Some(Content::Text(text)) => vec![GooglePart::text(text.clone())],
        Some(Content::Parts(parts)) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => GooglePart::text(text.clone()),
                ContentPart::ImageUrl { image_url } => match split_data_uri(&image_url.url) {
                    Some((mime_type, data)) => GooglePart {
                        inline_data: Some(GoogleInlineData {
                            mime_type: mime_type.to_owned(),
                            data: data.to_owned(),
                        }),
                        ..GooglePart::default()
                    },
                    // Remote images are not fetched; the URL is passed as text
                    None => GooglePart::text(image_url.url.clone()),
                },
            })
            .collect(),
    }
}

fn function_call_part(id: Option<&str>, name: &str, arguments: &str) -> Result<GooglePart, ConvertError> {
    Ok(GooglePart {
        function_call: Some(GoogleFunctionCall {
            id: id.map(str::to_owned),
            name: name.to_owned(),
            args: parse_arguments(id.unwrap_or(name), arguments)?,
        }),
        ..GooglePart::default()
    })
}

/// Function responses must be JSON objects; other payloads are wrapped
fn tool_response(text: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(_) | Err(_) => serde_json::json!({ "result": text }),
    }
}

fn tool_config(request: &ChatCompletionRequest) -> Option<GoogleToolConfig> {
    let (mode, allowed) = match (&request.tool_choice, &request.function_call) {
        (Some(ToolChoice::Mode(ToolChoiceMode::None)), _)
        | (None, Some(FunctionCallChoice::Mode(FunctionCallMode::None))) => ("NONE", Vec::new()),
        (Some(ToolChoice::Mode(ToolChoiceMode::Auto)), _)
        | (None, Some(FunctionCallChoice::Mode(FunctionCallMode::Auto))) => ("AUTO", Vec::new()),
        (Some(ToolChoice::Mode(ToolChoiceMode::Required)), _) => ("ANY", Vec::new()),
        (Some(ToolChoice::Function(forced)), _) => ("ANY", vec![forced.function.name.clone()]),
        (None, Some(FunctionCallChoice::Named(function))) => ("ANY", vec![function.name.clone()]),
        (None, None) => return None,
    };

    Some(GoogleToolConfig {
        function_calling_config: GoogleFunctionCallingConfig {
            mode,
            allowed_function_names: allowed,
        },
    })
}

// -- Response: Google -> canonical --

impl From<GoogleResponse> for ChatCompletionResponse {
    fn from(response: GoogleResponse) -> Self {
        let choices = response
            .candidates
            .into_iter()
            .zip(0u32..)
            .map(|(candidate, position)| candidate_to_choice(candidate, position))
            .collect();

        Self {
            id: response
                .response_id
                .unwrap_or_else(|| format!("chatcmpl-{}", Uuid::new_v4().simple())),
            object: "chat.completion".to_owned(),
            created: unix_now(),
            model: response.model_version.unwrap_or_default(),
            choices,
            usage: response.usage_metadata.map(Usage::from).unwrap_or_default(),
            system_fingerprint: None,
        }
    }
}

impl From<GoogleUsageMetadata> for Usage {
    fn from(usage: GoogleUsageMetadata) -> Self {
        Self::from(UsageCounts {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        })
    }
}

fn candidate_to_choice(candidate: GoogleCandidate, position: u32) -> Choice {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in candidate.content.parts {
        if let Some(fragment) = part.text {
            text.push_str(&fragment);
        }

        if let Some(call) = part.function_call {
            let id = call
                .id
                .unwrap_or_else(|| format!("call_{}_{}", call.name, tool_calls.len()));
            tool_calls.push(ToolCall::function(id, call.name, encode_arguments(&call.args)));
        }
    }

    let finish = finish_reason(candidate.finish_reason.as_deref(), !tool_calls.is_empty());

    let message = Message {
        role: Role::Assistant,
        content: (!text.is_empty() || tool_calls.is_empty()).then(|| Content::Text(text)),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        ..Message::default()
    };

    Choice::new(candidate.index.unwrap_or(position), message, finish)
}

fn finish_reason(reason: Option<&str>, called_tools: bool) -> Option<FinishReason> {
    match reason {
        None | Some("FINISH_REASON_UNSPECIFIED") => None,
        Some("STOP") if called_tools => Some(FinishReason::ToolCalls),
        Some("STOP") => Some(FinishReason::Stop),
        Some("MAX_TOKENS") => Some(FinishReason::Length),
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
            Some(FinishReason::ContentFilter)
        }
        Some(other) => Some(FinishReason::Other(other.to_ascii_lowercase())),
    }
}

// -- Stream: Google -> canonical --

/// Turns `streamGenerateContent` events into canonical chunks
///
/// Every event is a partial `GoogleResponse`. Text parts become content
/// deltas and each function call arrives whole, so it is emitted as one
/// complete tool-call delta. Usage is cumulative and forwarded as reported.
#[derive(Debug, Default)]
pub struct GeminiStreamState {
    id: Option<String>,
    created: u64,
    candidates: HashMap<u32, CandidateProgress>,
}

#[derive(Debug, Default)]
struct CandidateProgress {
    started: bool,
    tool_calls: u32,
}

impl GeminiStreamState {
    pub fn new() -> Self {
        Self {
            id: None,
            created: unix_now(),
            candidates: HashMap::new(),
        }
    }

    pub fn convert_event(&mut self, event: GoogleResponse) -> ChatCompletionChunk {
        let id = self
            .id
            .get_or_insert_with(|| {
                event
                    .response_id
                    .clone()
                    .unwrap_or_else(|| format!("chatcmpl-{}", Uuid::new_v4().simple()))
            })
            .clone();

        let choices = event
            .candidates
            .into_iter()
            .zip(0u32..)
            .map(|(candidate, position)| self.candidate_delta(candidate, position))
            .collect();

        ChatCompletionChunk {
            id,
            object: "chat.completion.chunk".to_owned(),
            created: self.created,
            model: event.model_version.unwrap_or_default(),
            choices,
            usage: event.usage_metadata.map(Usage::from),
        }
    }

    fn candidate_delta(&mut self, candidate: GoogleCandidate, position: u32) -> ChunkChoice {
        let index = candidate.index.unwrap_or(position);
        let progress = self.candidates.entry(index).or_default();

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in candidate.content.parts {
            if let Some(fragment) = part.text {
                text.push_str(&fragment);
            }

            if let Some(call) = part.function_call {
                let id = call
                    .id
                    .unwrap_or_else(|| format!("call_{}_{}", call.name, progress.tool_calls));
                tool_calls.push(ToolCallDelta {
                    index: progress.tool_calls,
                    id: Some(id),
                    tool_type: Some(ToolType::Function),
                    function: Some(FunctionCallDelta {
                        name: Some(call.name),
                        arguments: Some(encode_arguments(&call.args)),
                    }),
                });
                progress.tool_calls += 1;
            }
        }

        let delta = MessageDelta {
            role: (!progress.started).then_some(Role::Assistant),
            content: (!text.is_empty()).then_some(text),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        };
        progress.started = true;

        ChunkChoice {
            index,
            delta,
            finish_reason: finish_reason(candidate.finish_reason.as_deref(), progress.tool_calls > 0),
        }
    }
}
