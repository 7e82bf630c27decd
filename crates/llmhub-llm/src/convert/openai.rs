//! Canonical request to `OpenAI`-compatible body

use crate::protocol::openai::OpenAiRequest;
use crate::types::ChatCompletionRequest;

impl<'a> From<&'a ChatCompletionRequest> for OpenAiRequest<'a> {
    fn from(request: &'a ChatCompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
            stop: request.stop.as_ref(),
            seed: request.seed,
            // The operation decides streaming, not the caller's flag
            stream: None,
            user: request.user.as_deref(),
            logit_bias: request.logit_bias.as_ref(),
            logprobs: request.logprobs,
            top_logprobs: request.top_logprobs,
            tools: &request.tools,
            tool_choice: request.tool_choice.as_ref(),
            functions: &request.functions,
            function_call: request.function_call.as_ref(),
            response_format: request.response_format.as_ref(),
        }
    }
}

impl OpenAiRequest<'_> {
    /// Same body with `"stream": true`
    #[must_use]
    pub const fn streaming(mut self) -> Self {
        self.stream = Some(true);
        self
    }
}
