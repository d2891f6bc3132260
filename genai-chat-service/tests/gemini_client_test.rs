//! Gemini client tests against a local wiremock server.

use genai_chat_service::services::providers::gemini::{GeminiClient, GeminiConfig};
use genai_chat_service::services::providers::{FinishReason, ProviderError, TextProvider};
use secrecy::Secret;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.5-flash";
const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    client_with(&format!("{}/v1beta", server.uri()), "test-key", 5_000)
}

fn client_with(api_base: &str, api_key: &str, timeout_ms: u64) -> GeminiClient {
    GeminiClient::new(GeminiConfig {
        api_key: Secret::new(api_key.to_string()),
        api_base: api_base.to_string(),
        timeout: Duration::from_millis(timeout_ms),
    })
    .expect("Failed to build Gemini client")
}

fn text_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 2, "candidatesTokenCount": 3, "totalTokenCount": 5}
    })
}

async fn mount_generate(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn generate_sends_prompt_and_key_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Hi there!")))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap();

    assert_eq!(response.text.as_deref(), Some("Hi there!"));
    assert_eq!(response.input_tokens, 2);
    assert_eq!(response.output_tokens, 3);
    assert_eq!(response.finish_reason, FinishReason::Complete);
}

#[tokio::test]
async fn model_resource_prefix_is_accepted() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(200).set_body_json(text_response("ok"))).await;

    let response = client_for(&server)
        .generate("models/gemini-2.5-flash", "Hello")
        .await
        .unwrap();

    assert_eq!(response.text.as_deref(), Some("ok"));
}

#[tokio::test]
async fn multi_part_answers_are_concatenated() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Hi"}, {"text": " there"}, {"text": "!"}]}}]
        })),
    )
    .await;

    let response = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap();

    assert_eq!(response.text.as_deref(), Some("Hi there!"));
}

#[tokio::test]
async fn response_without_text_is_not_an_error() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"candidates": []})),
    )
    .await;

    let response = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap();

    assert!(response.text.is_none());
    assert_eq!(response.input_tokens, 0);
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
        })),
    )
    .await;

    let err = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::RateLimited));
}

#[tokio::test]
async fn invalid_api_key_maps_to_unauthorized() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]
            }
        })),
    )
    .await;

    let err = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    match err {
        ProviderError::Unauthorized(message) => assert!(message.contains("API key not valid")),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn forbidden_maps_to_unauthorized() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(403).set_body_string("denied")).await;

    let err = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Unauthorized(ref m) if m == "denied"));
}

#[tokio::test]
async fn server_errors_carry_status_and_message() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": 500, "message": "Internal error encountered.", "status": "INTERNAL"}
        })),
    )
    .await;

    let err = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    match err {
        ProviderError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal error encountered.");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_error_body_is_kept_verbatim() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(503).set_body_string("upstream unavailable"),
    )
    .await;

    let err = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    assert!(
        matches!(err, ProviderError::Api { status: 503, ref message } if message == "upstream unavailable")
    );
}

#[tokio::test]
async fn malformed_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(200).set_body_string("not json")).await;

    let err = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn blocked_prompt_is_a_success_without_text() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"},
            "usageMetadata": {"promptTokenCount": 4, "totalTokenCount": 4}
        })),
    )
    .await;

    let response = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap();

    assert!(response.text.is_none());
    assert_eq!(response.input_tokens, 4);
    assert_eq!(response.output_tokens, 0);
    assert_eq!(response.finish_reason, FinishReason::ContentFilter);
}

#[tokio::test]
async fn safety_stop_is_a_success_without_text() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })),
    )
    .await;

    let response = client_for(&server)
        .generate(MODEL, "Hello")
        .await
        .unwrap();

    assert!(response.text.is_none());
    assert_eq!(response.finish_reason, FinishReason::ContentFilter);
}

#[tokio::test]
async fn unreachable_upstream_is_network_error() {
    let err = client_with("http://127.0.0.1:1/v1beta", "test-key", 2_000)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Network(_)));
}

#[tokio::test]
async fn slow_upstream_hits_client_timeout() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(text_response("late"))
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    let err = client_with(&format!("{}/v1beta", server.uri()), "test-key", 100)
        .generate(MODEL, "Hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Network(_)));
}

#[tokio::test]
async fn health_check_lists_models_with_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageSize", "1"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).health_check().await.unwrap();
}

#[tokio::test]
async fn health_check_reports_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = client_for(&server).health_check().await.unwrap_err();
    assert!(matches!(err, ProviderError::Unauthorized(_)));
}

#[tokio::test]
async fn health_check_without_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_with(&format!("{}/v1beta", server.uri()), "", 5_000)
        .health_check()
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotConfigured(_)));
}
