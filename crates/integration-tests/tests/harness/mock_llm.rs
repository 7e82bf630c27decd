//! Mock upstream LLM server for integration tests
//!
//! Serves canned replies in the `OpenAI`, Anthropic, `DashScope` and Gemini
//! wire formats and records the last request it received.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Default reply text
pub const REPLY: &str = "Hello from mock LLM";

/// Mock upstream that returns predictable responses
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

/// A request as the upstream saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

struct MockLlmState {
    request_count: AtomicU32,
    /// Number of requests to fail before succeeding (0 = never fail)
    fail_count: AtomicU32,
    /// Send the first stream event, then hold the connection open
    stall_streams: bool,
    response_content: Option<String>,
    last_request: Mutex<Option<Recorded>>,
}

impl MockLlmState {
    fn content(&self) -> &str {
        self.response_content.as_deref().unwrap_or(REPLY)
    }

    fn record(&self, uri: &Uri, headers: HeaderMap, body: &Value) {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let recorded = Recorded {
            path: uri.path().to_owned(),
            query: uri.query().map(ToOwned::to_owned),
            headers,
            body: body.clone(),
        };
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(recorded);
        }
    }

    /// Consume one scheduled failure, if any are left
    fn take_failure(&self) -> Option<Response> {
        self.fail_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .ok()?;

        let body = json!({
            "error": {
                "message": "mock server intentional failure",
                "type": "server_error"
            }
        });
        Some((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
    }

    fn event_stream(&self, events: Vec<String>) -> Response {
        let body = if self.stall_streams {
            let first = events.into_iter().take(1).map(|event| Ok::<_, Infallible>(Bytes::from(event)));
            Body::from_stream(futures::stream::iter(first).chain(futures::stream::pending()))
        } else {
            Body::from(events.concat())
        };

        ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
    }
}

impl MockLlm {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// Start a mock server that fails the first `n` requests with 500
    pub async fn start_failing(n: u32) -> anyhow::Result<Self> {
        Self::builder().failing(n).start().await
    }

    /// Start a mock server with a custom response content
    pub async fn start_with_response(content: &str) -> anyhow::Result<Self> {
        Self::builder().response(content).start().await
    }

    /// Start a mock server whose streams never finish
    pub async fn start_stalling() -> anyhow::Result<Self> {
        Self::builder().stalling().start().await
    }

    fn builder() -> MockLlmBuilder {
        MockLlmBuilder::default()
    }

    /// `OpenAI`-style base URL, also valid for the Anthropic messages route
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn dashscope_base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    pub fn gemini_base_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    /// Number of requests that reached any route
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// Last request received, if any
    pub fn last_request(&self) -> Option<Recorded> {
        self.state.last_request.lock().ok().and_then(|last| last.clone())
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Default)]
struct MockLlmBuilder {
    fail_count: u32,
    stall_streams: bool,
    response_content: Option<String>,
}

impl MockLlmBuilder {
    const fn failing(mut self, n: u32) -> Self {
        self.fail_count = n;
        self
    }

    fn response(mut self, content: &str) -> Self {
        self.response_content = Some(content.to_owned());
        self
    }

    const fn stalling(mut self) -> Self {
        self.stall_streams = true;
        self
    }

    async fn start(self) -> anyhow::Result<MockLlm> {
        let state = Arc::new(MockLlmState {
            request_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(self.fail_count),
            stall_streams: self.stall_streams,
            response_content: self.response_content,
            last_request: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_openai))
            .route("/v1/messages", routing::post(handle_anthropic))
            .route(
                "/api/v1/services/aigc/text-generation/generation",
                routing::post(handle_dashscope),
            )
            .route("/v1beta/models/{target}", routing::post(handle_gemini))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockLlm { addr, shutdown, state })
    }
}

fn has_tools(body: &Value) -> bool {
    body.get("tools")
        .and_then(Value::as_array)
        .is_some_and(|tools| !tools.is_empty())
}

fn model(body: &Value) -> String {
    body["model"].as_str().unwrap_or_default().to_owned()
}

/// Split reply text into a few stream pieces
fn pieces(content: &str) -> Vec<String> {
    content.split_inclusive(' ').map(ToOwned::to_owned).collect()
}

fn data(value: &Value) -> String {
    format!("data: {value}\n\n")
}

// -- OpenAI --

async fn handle_openai(State(state): State<Arc<MockLlmState>>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record(&uri, headers, &body);
    if let Some(failure) = state.take_failure() {
        return failure;
    }

    if body["stream"].as_bool().unwrap_or(false) {
        return state.event_stream(openai_events(&state, &body));
    }

    let message = if has_tools(&body) {
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_test_123",
                "type": "function",
                "function": {"name": "get_weather", "arguments": "{\"location\":\"San Francisco\"}"}
            }]
        })
    } else {
        json!({"role": "assistant", "content": state.content()})
    };
    let finish_reason = if has_tools(&body) { "tool_calls" } else { "stop" };

    Json(json!({
        "id": "chatcmpl-test-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model(&body),
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
    .into_response()
}

fn openai_events(state: &MockLlmState, body: &Value) -> Vec<String> {
    let model = model(body);
    let chunk = |delta: Value, finish_reason: Value| {
        data(&json!({
            "id": "chatcmpl-test-stream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
        }))
    };

    let mut events = vec![chunk(json!({"role": "assistant"}), Value::Null)];

    if has_tools(body) {
        events.push(chunk(
            json!({"tool_calls": [{
                "index": 0,
                "id": "call_test_123",
                "type": "function",
                "function": {"name": "get_weather", "arguments": ""}
            }]}),
            Value::Null,
        ));
        for part in ["{\"location\":", "\"San Francisco\"}"] {
            events.push(chunk(
                json!({"tool_calls": [{"index": 0, "function": {"arguments": part}}]}),
                Value::Null,
            ));
        }
        events.push(chunk(json!({}), json!("tool_calls")));
    } else {
        for piece in pieces(state.content()) {
            events.push(chunk(json!({"content": piece}), Value::Null));
        }
        events.push(chunk(json!({}), json!("stop")));
    }

    events.push(data(&json!({
        "id": "chatcmpl-test-stream",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": model,
        "choices": [],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })));
    events.push("data: [DONE]\n\n".to_owned());

    events
}

// -- Anthropic --

async fn handle_anthropic(
    State(state): State<Arc<MockLlmState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(&uri, headers, &body);
    if let Some(failure) = state.take_failure() {
        return failure;
    }

    if body["stream"].as_bool().unwrap_or(false) {
        return state.event_stream(anthropic_events(&state, &body));
    }

    let (content, stop_reason) = if has_tools(&body) {
        (
            json!([{
                "type": "tool_use",
                "id": "toolu_test_123",
                "name": "get_weather",
                "input": {"location": "San Francisco"}
            }]),
            "tool_use",
        )
    } else {
        (json!([{"type": "text", "text": state.content()}]), "end_turn")
    };

    Json(json!({
        "id": "msg_test_123",
        "type": "message",
        "role": "assistant",
        "model": model(&body),
        "content": content,
        "stop_reason": stop_reason,
        "usage": {"input_tokens": 10, "output_tokens": 5}
    }))
    .into_response()
}

fn anthropic_events(state: &MockLlmState, body: &Value) -> Vec<String> {
    let event = |name: &str, payload: Value| format!("event: {name}\ndata: {payload}\n\n");

    let mut events = vec![event(
        "message_start",
        json!({
            "type": "message_start",
            "message": {"id": "msg_test_stream", "model": model(body), "usage": {"input_tokens": 10, "output_tokens": 0}}
        }),
    )];

    let stop_reason = if has_tools(body) {
        events.push(event(
            "content_block_start",
            json!({
                "type": "content_block_start",
                "index": 0,
                "content_block": {"type": "tool_use", "id": "toolu_test_123", "name": "get_weather", "input": {}}
            }),
        ));
        for part in ["{\"location\":", "\"San Francisco\"}"] {
            events.push(event(
                "content_block_delta",
                json!({
                    "type": "content_block_delta",
                    "index": 0,
                    "delta": {"type": "input_json_delta", "partial_json": part}
                }),
            ));
        }
        "tool_use"
    } else {
        events.push(event(
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        ));
        for piece in pieces(state.content()) {
            events.push(event(
                "content_block_delta",
                json!({
                    "type": "content_block_delta",
                    "index": 0,
                    "delta": {"type": "text_delta", "text": piece}
                }),
            ));
        }
        "end_turn"
    };

    events.push(event("content_block_stop", json!({"type": "content_block_stop", "index": 0})));
    events.push(event(
        "message_delta",
        json!({
            "type": "message_delta",
            "delta": {"stop_reason": stop_reason},
            "usage": {"output_tokens": 5}
        }),
    ));
    events.push(event("message_stop", json!({"type": "message_stop"})));

    events
}

// -- DashScope --

async fn handle_dashscope(
    State(state): State<Arc<MockLlmState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let streaming = headers
        .get("x-dashscope-sse")
        .is_some_and(|value| value.as_bytes() == b"enable");

    state.record(&uri, headers, &body);
    if let Some(failure) = state.take_failure() {
        return failure;
    }

    let usage = json!({"input_tokens": 10, "output_tokens": 5, "total_tokens": 15});

    if streaming {
        let pieces = pieces(state.content());
        let last = pieces.len().saturating_sub(1);
        let events = pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| {
                let finish_reason = if i == last { "stop" } else { "null" };
                let payload = json!({
                    "request_id": "req-mock",
                    "output": {"text": piece, "finish_reason": finish_reason},
                    "usage": usage
                });
                format!("id:{}\nevent:result\ndata:{payload}\n\n", i + 1)
            })
            .collect();
        return state.event_stream(events);
    }

    Json(json!({
        "request_id": "req-mock",
        "output": {"text": state.content(), "finish_reason": "stop"},
        "usage": usage
    }))
    .into_response()
}

// -- Gemini --

async fn handle_gemini(
    State(state): State<Arc<MockLlmState>>,
    Path(target): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let streaming = target.ends_with(":streamGenerateContent") && uri.query() == Some("alt=sse");

    state.record(&uri, headers, &body);
    if let Some(failure) = state.take_failure() {
        return failure;
    }

    let model = target.split_once(':').map_or(target.as_str(), |(model, _)| model);
    let usage = json!({"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15});
    let parts = if has_tools(&body) {
        vec![json!([{"functionCall": {"name": "get_weather", "args": {"location": "San Francisco"}}}])]
    } else if streaming {
        pieces(state.content()).into_iter().map(|piece| json!([{"text": piece}])).collect()
    } else {
        vec![json!([{"text": state.content()}])]
    };

    let last = parts.len().saturating_sub(1);
    let mut responses = parts.into_iter().enumerate().map(|(i, parts)| {
        let mut candidate = json!({"content": {"role": "model", "parts": parts}, "index": 0});
        let mut response = json!({"modelVersion": model, "responseId": "gemini-mock"});
        if i == last {
            candidate["finishReason"] = json!("STOP");
            response["usageMetadata"] = usage.clone();
        }
        response["candidates"] = json!([candidate]);
        response
    });

    if streaming {
        return state.event_stream(responses.map(|response| data(&response)).collect());
    }

    Json(responses.next().unwrap_or_default()).into_response()
}
