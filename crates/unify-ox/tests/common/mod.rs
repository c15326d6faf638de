#![allow(dead_code)]

use std::path::Path;

use serde_json::{Value, json};
use unify_ox::ApiConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn config(server: &MockServer, cache_path: &Path) -> ApiConfig {
    ApiConfig::builder()
        .api_key("test-key")
        .base_url(format!("{}/v0", server.uri()))
        .cache_path(cache_path)
        .build()
}

pub fn completion(model: &str, content: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
    })
}

pub fn chunk(model: &str, content: Option<&str>) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "delta": {"content": content},
            "finish_reason": null
        }]
    })
}

/// Server-sent events body: one `data:` event per chunk, then `[DONE]`.
pub fn sse_body(chunks: &[Value]) -> String {
    let mut body: String = chunks.iter().map(|c| format!("data: {c}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

pub async fn mount_listing(server: &MockServer, route: &str, values: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/v0/{route}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(values)))
        .mount(server)
        .await;
}

pub async fn mount_endpoints(server: &MockServer) {
    mount_listing(server, "endpoints", &["gpt-4@openai", "llama-3-8b@together"]).await;
}
