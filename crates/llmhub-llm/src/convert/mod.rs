//! Conversion between canonical types and provider wire formats
//!
//! Each submodule handles the conversions for one provider protocol.
//! Conversions that can fail report a [`ConvertError`]; adapters attach
//! the provider identity when surfacing it.

pub mod anthropic;
pub mod dashscope;
pub mod google;
pub mod openai;

use thiserror::Error;

/// Reasons a canonical request cannot be expressed in a wire format
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Tool call arguments must be a JSON document for block-based formats
    #[error("tool call {id} has invalid JSON arguments: {source}")]
    InvalidArguments {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("tool message is missing tool_call_id")]
    MissingToolCallId,
}

/// Parse string-encoded tool arguments into a JSON value
///
/// Empty arguments are read as an empty object.
pub(crate) fn parse_arguments(id: &str, arguments: &str) -> Result<serde_json::Value, ConvertError> {
    if arguments.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }

    serde_json::from_str(arguments).map_err(|source| ConvertError::InvalidArguments {
        id: id.to_owned(),
        source,
    })
}

/// Serialize parsed tool arguments back into their string form
pub(crate) fn encode_arguments(input: &serde_json::Value) -> String {
    serde_json::to_string(input).unwrap_or_else(|_| "{}".to_owned())
}

/// Split a `data:` URI into media type and base64 payload
pub(crate) fn split_data_uri(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    Some((media_type, data))
}
