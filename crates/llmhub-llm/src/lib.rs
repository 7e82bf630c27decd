//! Unified chat completion layer over many LLM providers
//!
//! Callers speak one canonical, `OpenAI`-shaped request and response model.
//! An [`AdapterRegistry`] maps provider identifiers to [`Adapter`]s, which
//! translate to each provider's wire format, perform the HTTP exchange and
//! translate the answer back. Tool calling is refused up front for targets
//! the [`capability`] table marks as unable to serve it.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod adapter;
pub mod capability;
pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod sse;
pub mod stream;
mod transport;
pub mod types;

pub use adapter::{Adapter, AdapterCapabilities, AdapterSettings};
pub use capability::{ensure_tools_supported, model_supports_tools, provider_supports_tools};
pub use error::{ErrorKind, LlmError};
pub use llmhub_core::RequestContext;
pub use provider::ProviderId;
pub use registry::{AdapterFactory, AdapterRegistry};
pub use stream::{ByteStream, StreamFormat, StreamingMode};
pub use types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Message};
