mod common;

use serde_json::json;
use unify_ox::{ApiError, ApiErrorKind, ChatMessage, DatasetEntry, UnifyApi, UnifyError};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::config;

fn api(server: &MockServer) -> UnifyApi {
    UnifyApi::new(&config(server, std::path::Path::new("unused.json")))
}

#[tokio::test]
async fn test_credit_balance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/credits"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "me", "credits": 42.75})))
        .expect(1)
        .mount(&server)
        .await;

    let credits = api(&server).get_credit_balance().await.unwrap();
    assert!((credits - 42.75).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_credit_balance_bad_body_is_value_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": 1})))
        .mount(&server)
        .await;

    let err = api(&server).get_credit_balance().await.unwrap_err();
    assert!(matches!(err, UnifyError::Value(_)));
}

#[tokio::test]
async fn test_credit_balance_keeps_status_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/credits"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid API key"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = api(&server).get_credit_balance().await.unwrap_err();
    match err {
        UnifyError::Api(ApiError { kind, status, message }) => {
            assert_eq!(kind, ApiErrorKind::Authentication);
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("expected an authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_endpoint_metrics_query_and_first_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/endpoint-metrics"))
        .and(query_param("model", "gpt-4o"))
        .and(query_param("provider", "openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"ttft": 100.0, "itl": 5.0, "input_cost": 2.5, "output_cost": 10.0,
             "measured_at": 1_717_200_000, "region": "EU", "seq_len": "long"},
            {"ttft": 900.0, "itl": 50.0, "input_cost": 2.5, "output_cost": 10.0,
             "measured_at": 1_717_100_000}
        ])))
        .mount(&server)
        .await;

    let metrics = api(&server).get_endpoint_metrics("gpt-4o@openai").await.unwrap();
    assert!((metrics.time_to_first_token - 100.0).abs() < f64::EPSILON);
    assert_eq!(metrics.region.as_deref(), Some("EU"));
    assert_eq!(metrics.seq_len.as_deref(), Some("long"));
}

#[tokio::test]
async fn test_endpoint_metrics_empty_is_value_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/endpoint-metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = api(&server).get_endpoint_metrics("gpt-4o@openai").await.unwrap_err();
    assert!(matches!(err, UnifyError::Value(_)));

    let malformed = api(&server).get_endpoint_metrics("gpt-4o").await.unwrap_err();
    assert!(matches!(malformed, UnifyError::Usage(_)));
}

#[tokio::test]
async fn test_listings_forward_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/endpoints"))
        .and(query_param("provider", "together"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["llama-3-8b@together"])))
        .mount(&server)
        .await;

    let endpoints = api(&server)
        .list_endpoints(None, Some("together"))
        .await
        .unwrap();
    assert_eq!(endpoints, vec!["llama-3-8b@together".to_string()]);
}

#[tokio::test]
async fn test_upload_dataset_from_dictionary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v0/dataset"))
        .and(body_string_contains("name=\"name\""))
        .and(body_string_contains("arithmetic"))
        .and(body_string_contains("filename=\"arithmetic.jsonl\""))
        .and(body_string_contains("\"ref_answer\":\"4\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"info": "Dataset uploaded"})))
        .expect(1)
        .mount(&server)
        .await;

    let entries = vec![DatasetEntry::new(
        vec![ChatMessage::user("What is 2 + 2?")],
        Some("4".to_string()),
    )];
    let info = api(&server)
        .upload_dataset_from_dictionary("arithmetic", &entries)
        .await
        .unwrap();
    assert_eq!(info["info"], "Dataset uploaded");
}

#[tokio::test]
async fn test_upload_rejects_invalid_file_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v0/dataset"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.jsonl");
    std::fs::write(&file, "{\"prompt\": \"no query here\"}\n").unwrap();

    let err = api(&server)
        .upload_dataset_from_file("bad", &file)
        .await
        .unwrap_err();
    assert!(matches!(err, UnifyError::Value(_)));
}

#[tokio::test]
async fn test_dataset_download_list_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/dataset"))
        .and(query_param("name", "arithmetic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"query": {"messages": [{"role": "user", "content": "What is 2 + 2?"}]}, "ref_answer": "4"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/dataset/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["arithmetic", "trivia"])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v0/dataset"))
        .and(query_param("name", "arithmetic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"info": "deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    let entries = api.download_dataset("arithmetic").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].ref_answer.as_deref(), Some("4"));

    let names = api.list_datasets().await.unwrap();
    assert!(names.contains(&"arithmetic".to_string()));

    api.delete_dataset("arithmetic").await.unwrap();
}
