mod harness;

use harness::mock_llm::{MockLlm, REPLY};
use llmhub_client::{ChatCompletionRequest, Client, ClientConfig, Message, RequestContext};
use llmhub_llm::sse;
use llmhub_llm::types::{FinishReason, FunctionDefinition, ToolCall, ToolChoice, ToolDefinition};

fn client(base_url: &str) -> Client {
    Client::new(ClientConfig::new("claude", "test-key").with_base_url(base_url)).unwrap()
}

fn weather_tool() -> ToolDefinition {
    ToolDefinition::function(FunctionDefinition {
        name: "get_weather".to_owned(),
        description: Some("Get current weather".to_owned()),
        parameters: Some(serde_json::json!({
            "type": "object",
            "properties": {"location": {"type": "string"}}
        })),
    })
}

#[tokio::test]
async fn messages_request_carries_version_and_key_headers() {
    let mock = MockLlm::start().await.unwrap();
    let client = client(&mock.base_url());

    let request = ChatCompletionRequest::new(
        "claude-3-5-sonnet-20241022",
        vec![Message::system("be brief"), Message::user("Hello")],
    );
    let response = client.chat_completion(&RequestContext::new(), &request).await.unwrap();

    assert_eq!(response.first_text().as_deref(), Some(REPLY));
    assert_eq!(response.id, "msg_test_123");
    assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
    assert_eq!(response.usage.prompt_tokens, 10);
    assert_eq!(response.usage.completion_tokens, 5);
    assert_eq!(response.usage.total_tokens, 15);

    let seen = mock.last_request().unwrap();
    assert_eq!(seen.path, "/v1/messages");
    assert_eq!(seen.header("x-api-key"), Some("test-key"));
    assert_eq!(seen.header("anthropic-version"), Some("2023-06-01"));
    assert!(seen.header("authorization").is_none());
    assert_eq!(seen.body["system"], "be brief");
    assert_eq!(seen.body["messages"][0]["role"], "user");
    assert!(seen.body["max_tokens"].as_u64().is_some_and(|n| n > 0));
}

#[tokio::test]
async fn model_alias_is_resolved_before_sending() {
    let mock = MockLlm::start().await.unwrap();
    let client = client(&mock.base_url());

    let request = ChatCompletionRequest::new("claude-3-5-sonnet", vec![Message::user("Hello")]);
    let response = client.chat_completion(&RequestContext::new(), &request).await.unwrap();

    let sent = mock.last_request().unwrap().body["model"].as_str().unwrap().to_owned();
    assert_ne!(sent, "claude-3-5-sonnet");
    assert!(sent.starts_with("claude-3-5-sonnet-"));
    assert_eq!(response.model, sent);
}

#[tokio::test]
async fn tool_use_round_trip() {
    let mock = MockLlm::start().await.unwrap();
    let client = client(&mock.base_url());

    let mut request = ChatCompletionRequest::new("claude-3-5-sonnet-20241022", vec![Message::user("Weather in SF?")]);
    request.tools = vec![weather_tool()];
    request.tool_choice = Some(ToolChoice::function("get_weather"));

    let response = client.chat_completion(&RequestContext::new(), &request).await.unwrap();

    let calls = response.first_tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "toolu_test_123");
    assert_eq!(calls[0].function.name, "get_weather");
    let arguments: serde_json::Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
    assert_eq!(arguments, serde_json::json!({"location": "San Francisco"}));
    assert_eq!(response.choices[0].finish_reason, Some(FinishReason::ToolCalls));

    let seen = mock.last_request().unwrap();
    assert_eq!(seen.body["tools"][0]["name"], "get_weather");
    assert_eq!(seen.body["tools"][0]["input_schema"]["type"], "object");
    assert_eq!(
        seen.body["tool_choice"],
        serde_json::json!({"type": "tool", "name": "get_weather"})
    );
}

#[tokio::test]
async fn tool_results_are_sent_as_user_turns() {
    let mock = MockLlm::start().await.unwrap();
    let client = client(&mock.base_url());

    let call = ToolCall::function("toolu_1", "get_weather", r#"{"location":"SF"}"#);
    let mut request = ChatCompletionRequest::new(
        "claude-3-5-sonnet-20241022",
        vec![
            Message::user("Weather in SF?"),
            Message::with_tool_calls(vec![call]),
            Message::tool("toolu_1", "sunny"),
        ],
    );
    request.tools = vec![weather_tool()];

    client.chat_completion(&RequestContext::new(), &request).await.unwrap();

    let messages = mock.last_request().unwrap().body["messages"].clone();
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"][0]["type"], "tool_use");
    assert_eq!(messages[1]["content"][0]["input"], serde_json::json!({"location": "SF"}));
    assert_eq!(messages[2]["role"], "user");
    assert_eq!(messages[2]["content"][0]["type"], "tool_result");
    assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
}

#[tokio::test]
async fn streamed_tool_use_is_reassembled() {
    let mock = MockLlm::start().await.unwrap();
    let client = client(&mock.base_url());

    let mut request = ChatCompletionRequest::new("claude-3-5-sonnet-20241022", vec![Message::user("Weather in SF?")]);
    request.tools = vec![weather_tool()];

    let stream = client
        .chat_completion_chunks(&RequestContext::new(), &request)
        .await
        .unwrap();
    let response = sse::collect(stream).await.unwrap();

    let calls = response.first_tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "toolu_test_123");
    assert_eq!(calls[0].function.arguments, r#"{"location":"San Francisco"}"#);
    assert_eq!(response.choices[0].finish_reason, Some(FinishReason::ToolCalls));
    assert_eq!(response.usage.prompt_tokens, 10);
    assert_eq!(response.usage.completion_tokens, 5);

    assert_eq!(mock.last_request().unwrap().body["stream"], true);
}
