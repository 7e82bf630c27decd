//! Tool-calling capability gate
//!
//! Unknown providers are treated as unable to call tools, while unknown
//! models of a known provider are assumed able to: new models of a vendor
//! tend to inherit its capabilities, unknown vendors get no benefit of the
//! doubt.

use tracing::debug;

use crate::error::LlmError;
use crate::provider::ProviderId;
use crate::types::ChatCompletionRequest;

/// Provider-level tool support
static PROVIDER_TOOLS: &[(&str, bool)] = &[
    ("openai", true),
    ("claude", true),
    ("gemini", true),
    ("openrouter", true),
    ("groq", true),
    ("deepseek", true),
    ("together", true),
    ("siliconflow", true),
    ("moonshot", true),
    ("stepfun", true),
    ("mistral", true),
    ("cohere", true),
    ("novita", true),
    ("xai", true),
    ("qwen", false),
    ("baichuan", false),
    ("chatglm", false),
    ("ernie", false),
    ("spark", false),
    ("hunyuan", false),
    ("360", false),
    ("minimax", false),
    ("yi", false),
    ("doubao", false),
    ("ollama", false),
    ("coze", false),
];

/// Per-model exceptions for providers that otherwise support tools
static MODEL_TOOLS: &[(&str, &str, bool)] = &[
    ("claude", "claude-3-haiku", false),
    ("claude", "claude-3-haiku-20240307", false),
];

/// Whether the provider offers tool/function calling at all
pub fn provider_supports_tools(provider: &str) -> bool {
    PROVIDER_TOOLS
        .iter()
        .find(|(id, _)| *id == provider)
        .is_some_and(|(_, supported)| *supported)
}

/// Whether a specific model of the provider offers tool/function calling
pub fn model_supports_tools(provider: &str, model: &str) -> bool {
    if !provider_supports_tools(provider) {
        return false;
    }

    MODEL_TOOLS
        .iter()
        .find(|(id, name, _)| *id == provider && *name == model)
        .is_none_or(|(_, _, supported)| *supported)
}

/// Refuse a tool-bearing request the target cannot serve
///
/// `model` is the name the upstream will see, after any aliasing; the
/// caller's original name is checked too so both spellings are covered.
///
/// # Errors
///
/// Returns [`LlmError::ToolsUnsupported`] naming the provider and model
pub fn ensure_tools_supported(
    provider: &ProviderId,
    model: &str,
    request: &ChatCompletionRequest,
) -> Result<(), LlmError> {
    if !request.uses_tools() {
        return Ok(());
    }

    let supported =
        model_supports_tools(provider.as_str(), &request.model) && model_supports_tools(provider.as_str(), model);

    if supported {
        Ok(())
    } else {
        debug!(provider = %provider, model = %request.model, "rejecting tool request");

        Err(LlmError::ToolsUnsupported {
            provider: provider.clone(),
            model: request.model.clone(),
        })
    }
}
