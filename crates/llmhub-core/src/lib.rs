//! Shared primitives for the llmhub crates

#![allow(clippy::must_use_candidate)]

mod context;
mod error;

pub use context::{Interrupted, RequestContext};
pub use error::{ErrorBody, ErrorDetail, HttpError};
