//! Streaming contract
//!
//! A streamed completion is an open byte channel carrying the upstream's
//! server-sent events in transmission order. Framing and decoding are left
//! to the caller; see [`crate::sse`] for decoding helpers.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, stream};
use llmhub_core::{Interrupted, RequestContext};

use crate::error::LlmError;
use crate::provider::ProviderId;
use crate::types::{
    ChatCompletionChunk, ChatCompletionResponse, ChunkChoice, Content, FunctionCallDelta, MessageDelta, Role,
    ToolCallDelta, ToolType,
};

/// Raw response body of a streamed completion
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// How an adapter delivers streamed completions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingMode {
    /// Bytes are forwarded as the upstream produces them
    Native,
    /// One synchronous call replayed as a stream once it completes
    Buffered,
}

/// Server-sent event framing carried by the byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// `data: {chat.completion.chunk}` events terminated by `data: [DONE]`
    OpenAi,
    /// Anthropic `message_start` / `content_block_delta` / ... events
    Anthropic,
    /// `DashScope` incremental output events
    DashScope,
    /// Google `streamGenerateContent?alt=sse` events, one partial response each
    Gemini,
}

/// Stop a byte stream when the request context is cancelled or expires
///
/// The interrupted stream yields one final error item and then ends; the
/// inner stream, and with it the upstream connection, is dropped at once.
pub fn guard(provider: ProviderId, inner: ByteStream, ctx: &RequestContext) -> ByteStream {
    Box::pin(Guarded {
        provider,
        inner: Some(inner),
        stop: Some(ctx.interrupted()),
    })
}

struct Guarded {
    provider: ProviderId,
    inner: Option<ByteStream>,
    stop: Option<Pin<Box<dyn Future<Output = Interrupted> + Send>>>,
}

impl Stream for Guarded {
    type Item = Result<Bytes, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if let Some(stop) = this.stop.as_mut()
            && let Poll::Ready(reason) = stop.as_mut().poll(cx)
        {
            this.stop = None;
            this.inner = None;
            return Poll::Ready(Some(Err(LlmError::interrupted(&this.provider, reason))));
        }

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        let next = inner.as_mut().poll_next(cx);
        if let Poll::Ready(None) = next {
            this.inner = None;
            this.stop = None;
        }
        next
    }
}

/// Replay a complete response as `OpenAI`-style server-sent events
///
/// Used by adapters without incremental delivery. Reading the stream to the
/// end and folding the chunks yields the same message, finish reason and
/// usage as the synchronous response.
pub fn buffered(provider: &ProviderId, response: &ChatCompletionResponse) -> ByteStream {
    let mut chunks = Vec::with_capacity(response.choices.len() + 1);

    for choice in &response.choices {
        let tool_calls: Vec<_> = choice
            .message
            .tool_calls()
            .iter()
            .zip(0u32..)
            .map(|(call, index)| ToolCallDelta {
                index,
                id: Some(call.id.clone()),
                tool_type: Some(ToolType::Function),
                function: Some(FunctionCallDelta {
                    name: Some(call.function.name.clone()),
                    arguments: Some(call.function.arguments.clone()),
                }),
            })
            .collect();

        chunks.push(ChatCompletionChunk {
            choices: vec![ChunkChoice {
                index: choice.index,
                delta: MessageDelta {
                    role: Some(Role::Assistant),
                    content: choice.message.content.as_ref().map(Content::as_text),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                },
                finish_reason: choice.finish_reason.clone(),
            }],
            ..empty_chunk(response)
        });
    }

    chunks.push(ChatCompletionChunk {
        usage: Some(response.usage),
        ..empty_chunk(response)
    });

    let provider = provider.clone();
    let events: Vec<Result<Bytes, LlmError>> = chunks
        .iter()
        .map(|chunk| {
            serde_json::to_string(chunk)
                .map(|json| Bytes::from(format!("data: {json}\n\n")))
                .map_err(|e| LlmError::Streaming {
                    provider: provider.clone(),
                    reason: e.to_string(),
                })
        })
        .chain(std::iter::once(Ok(Bytes::from_static(b"data: [DONE]\n\n"))))
        .collect();

    Box::pin(stream::iter(events))
}

fn empty_chunk(response: &ChatCompletionResponse) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: response.id.clone(),
        object: "chat.completion.chunk".to_owned(),
        created: response.created,
        model: response.model.clone(),
        choices: Vec::new(),
        usage: None,
    }
}
