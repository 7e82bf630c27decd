mod harness;

use harness::mock_llm::MockLlm;
use llmhub_client::{ChatCompletionRequest, Client, ClientConfig, LlmError, Message, ProviderId, RequestContext};
use llmhub_llm::ErrorKind;
use llmhub_llm::types::{FunctionCallChoice, FunctionCallMode, FunctionDefinition, ToolChoice, ToolChoiceMode, ToolDefinition};

fn weather_function() -> FunctionDefinition {
    FunctionDefinition {
        name: "get_weather".to_owned(),
        description: None,
        parameters: Some(serde_json::json!({"type": "object"})),
    }
}

fn with_tools(model: &str) -> ChatCompletionRequest {
    let mut request = ChatCompletionRequest::new(model, vec![Message::user("Weather?")]);
    request.tools = vec![ToolDefinition::function(weather_function())];
    request
}

async fn rejected(provider: &str, base_url: &str, request: &ChatCompletionRequest) -> LlmError {
    let client = Client::new(ClientConfig::new(provider, "test-key").with_base_url(base_url)).unwrap();
    client.chat_completion(&RequestContext::new(), request).await.unwrap_err()
}

#[tokio::test]
async fn tool_requests_to_providers_without_tools_never_leave_the_process() {
    let mock = MockLlm::start().await.unwrap();

    for provider in ["yi", "baichuan", "minimax", "ollama", "doubao"] {
        let error = rejected(provider, &mock.base_url(), &with_tools("some-model")).await;

        let LlmError::ToolsUnsupported { provider: id, model } = &error else {
            panic!("{provider}: expected tools unsupported, got {error:?}");
        };
        assert_eq!(id.as_str(), provider);
        assert_eq!(model, "some-model");
        assert_eq!(error.kind(), ErrorKind::Capability);
    }

    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn qwen_rejects_tools_before_calling_dashscope() {
    let mock = MockLlm::start().await.unwrap();

    let error = rejected("qwen", &mock.dashscope_base_url(), &with_tools("qwen-max")).await;

    assert!(matches!(error, LlmError::ToolsUnsupported { .. }), "got {error:?}");
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn gated_claude_model_is_rejected_under_its_alias_too() {
    let mock = MockLlm::start().await.unwrap();

    for model in ["claude-3-haiku", "claude-3-haiku-20240307"] {
        let error = rejected("claude", &mock.base_url(), &with_tools(model)).await;

        let LlmError::ToolsUnsupported { provider, .. } = &error else {
            panic!("{model}: expected tools unsupported, got {error:?}");
        };
        assert_eq!(*provider, ProviderId::CLAUDE);
    }

    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn every_tool_field_engages_the_gate() {
    let mock = MockLlm::start().await.unwrap();

    let mut functions = ChatCompletionRequest::new("yi-large", vec![Message::user("Weather?")]);
    functions.functions = vec![weather_function()];

    let mut tool_choice = ChatCompletionRequest::new("yi-large", vec![Message::user("Weather?")]);
    tool_choice.tool_choice = Some(ToolChoice::Mode(ToolChoiceMode::Auto));

    let mut function_call = ChatCompletionRequest::new("yi-large", vec![Message::user("Weather?")]);
    function_call.function_call = Some(FunctionCallChoice::Mode(FunctionCallMode::Auto));

    for request in [functions, tool_choice, function_call] {
        let error = rejected("yi", &mock.base_url(), &request).await;
        assert!(matches!(error, LlmError::ToolsUnsupported { .. }), "got {error:?}");
    }

    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn plain_requests_pass_the_gate() {
    let mock = MockLlm::start().await.unwrap();
    let client = Client::new(ClientConfig::new("yi", "test-key").with_base_url(mock.base_url())).unwrap();

    let request = ChatCompletionRequest::new("yi-large", vec![Message::user("Hello")]);
    client.chat_completion(&RequestContext::new(), &request).await.unwrap();

    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn unknown_model_of_a_tool_provider_is_allowed() {
    let mock = MockLlm::start().await.unwrap();
    let client = Client::new(ClientConfig::new("openai", "test-key").with_base_url(mock.base_url())).unwrap();

    let response = client
        .chat_completion(&RequestContext::new(), &with_tools("gpt-next-preview"))
        .await
        .unwrap();

    assert_eq!(response.first_tool_calls().len(), 1);
    assert_eq!(mock.request_count(), 1);
}
