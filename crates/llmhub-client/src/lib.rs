#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Chat completions through one client, whatever the provider
//!
//! A [`Client`] binds one provider adapter plus caller defaults and exposes
//! synchronous and streamed completion calls on the canonical types.

mod client;

pub use client::{Client, ClientConfig, Completion};
pub use llmhub_llm::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, LlmError, Message, ProviderId, RequestContext,
};

/// Client result type
pub type Result<T> = std::result::Result<T, LlmError>;
