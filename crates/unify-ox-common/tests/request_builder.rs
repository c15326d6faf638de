use std::time::Duration;

use serde_json::{Value, json};
use unify_ox_common::{
    ApiErrorKind, AuthMethod, BlockingRequestBuilder, CommonRequestError, Endpoint, HttpMethod,
    MultipartForm, RequestBuilder, RequestConfig, SseParser,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> RequestConfig {
    RequestConfig::new(format!("{}/v0/", server.uri()))
        .with_auth(AuthMethod::Bearer("test-key".to_string()))
        .with_header("accept", "application/json")
}

#[test]
fn test_endpoint_creation() {
    let endpoint = Endpoint::new("chat/completions", HttpMethod::Post);
    assert_eq!(endpoint.path, "chat/completions");
    assert_eq!(endpoint.method, HttpMethod::Post);
    assert!(endpoint.extra_headers.is_empty());
    assert!(endpoint.query_params.is_empty());
    assert!(endpoint.timeout.is_none());
}

#[test]
fn test_endpoint_builder_methods() {
    let endpoint = Endpoint::new("endpoint-metrics", HttpMethod::Get)
        .with_query_param("model", "gpt-4")
        .with_query_param("provider", "openai")
        .with_header("x-trace", "1")
        .with_timeout(Duration::from_secs(10));

    assert_eq!(
        endpoint.query_params,
        vec![
            ("model".to_string(), "gpt-4".to_string()),
            ("provider".to_string(), "openai".to_string())
        ]
    );
    assert_eq!(endpoint.extra_headers.get("x-trace").map(String::as_str), Some("1"));
    assert_eq!(endpoint.timeout, Some(Duration::from_secs(10)));
}

#[test]
fn test_url_joining_ignores_stray_slashes() {
    let config = RequestConfig::new("https://api.unify.ai/v0/");
    let endpoint = Endpoint::new("/credits", HttpMethod::Get);
    assert_eq!(config.url_for(&endpoint), "https://api.unify.ai/v0/credits");
}

#[test]
fn test_multipart_form_builder() {
    let form = MultipartForm::new()
        .text("name", "prompts")
        .file_from_bytes("file", "prompts.jsonl", b"{}\n".to_vec());
    let _form: reqwest::multipart::Form = form.build();
}

#[tokio::test]
async fn test_request_json_sends_auth_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/models"))
        .and(query_param("provider", "openai"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["gpt-4", "gpt-4o"])))
        .expect(1)
        .mount(&server)
        .await;

    let builder = RequestBuilder::new(reqwest::Client::new(), config(&server));
    let endpoint = Endpoint::new("models", HttpMethod::Get).with_query_param("provider", "openai");
    let models: Vec<String> = builder.request(&endpoint).await.unwrap();

    assert_eq!(models, vec!["gpt-4".to_string(), "gpt-4o".to_string()]);
}

#[tokio::test]
async fn test_error_status_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v0/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let builder = RequestBuilder::new(reqwest::Client::new(), config(&server));
    let endpoint = Endpoint::new("chat/completions", HttpMethod::Post);
    let result: Result<Value, _> = builder.request_json(&endpoint, Some(&json!({}))).await;

    match result {
        Err(CommonRequestError::Api(err)) => {
            assert_eq!(err.kind, ApiErrorKind::RateLimit);
            assert_eq!(err.status, 429);
            assert_eq!(err.message, "slow down");
        }
        other => panic!("expected a rate limit error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let builder = RequestBuilder::new(reqwest::Client::new(), config(&server));
    let result: Result<Value, _> = builder
        .request(&Endpoint::new("credits", HttpMethod::Get))
        .await;

    assert!(matches!(result, Err(CommonRequestError::UnexpectedResponse(_))));
}

#[tokio::test]
async fn test_open_stream_decodes_events() {
    let server = MockServer::start().await;
    let sse = "data: {\"n\": 1}\n\ndata: {\"n\": 2}\n\ndata: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/v0/chat/completions"))
        .and(body_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let builder = RequestBuilder::new(reqwest::Client::new(), config(&server));
    let endpoint = Endpoint::new("chat/completions", HttpMethod::Post);
    let response = builder
        .open_stream(&endpoint, &json!({"stream": true}))
        .await
        .unwrap();

    let mut parser = SseParser::new(response);
    let mut seen = Vec::new();
    while let Some(event) = parser.next_event::<Value>().await.unwrap() {
        seen.push(event["n"].as_i64().unwrap());
    }
    assert_eq!(seen, vec![1, 2]);
}

#[tokio::test]
async fn test_blocking_builder_matches_async_behaviour() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/providers"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["openai", "anthropic"])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v0/dataset"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "no such dataset"})))
        .mount(&server)
        .await;

    let config = config(&server);
    let (providers, missing) = tokio::task::spawn_blocking(move || {
        let builder = BlockingRequestBuilder::new(reqwest::blocking::Client::new(), config);
        let providers: Vec<String> = builder
            .request(&Endpoint::new("providers", HttpMethod::Get))
            .unwrap();
        let missing: Result<Value, _> = builder.request(
            &Endpoint::new("dataset", HttpMethod::Delete).with_query_param("name", "gone"),
        );
        (providers, missing)
    })
    .await
    .unwrap();

    assert_eq!(providers, vec!["openai".to_string(), "anthropic".to_string()]);
    match missing {
        Err(CommonRequestError::Api(err)) => {
            assert_eq!(err.kind, ApiErrorKind::NotFound);
            assert_eq!(err.message, "no such dataset");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}
