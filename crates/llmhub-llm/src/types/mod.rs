//! Canonical types for chat completion requests and responses
//!
//! These types are provider-agnostic and serve as the normalized
//! representation that every wire format converts to and from. Their
//! serialized form is the `OpenAI` chat completions schema.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Content, ContentPart, FunctionCall, ImageUrl, Message, Role, ToolCall, ToolType};
pub use request::{ChatCompletionRequest, ResponseFormat, Stop};
pub use response::{ChatCompletionResponse, Choice, FinishReason, Usage, UsageCounts, unix_now};
pub use stream::{ChatCompletionChunk, ChunkChoice, FunctionCallDelta, MessageDelta, ToolCallDelta};
pub use tool::{
    FunctionCallChoice, FunctionCallMode, FunctionDefinition, FunctionName, ToolChoice, ToolChoiceFunction,
    ToolChoiceMode, ToolDefinition,
};
