//! Gateway (chat completions) provider against a mock server.

use serde_json::json;
use std::time::Duration;
use weld::error::ProviderError;
use weld::provider::{
    GatewayProvider, GenerateOptions, GlobalDefaults, ModelProvider, ProviderConfig,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> GatewayProvider {
    let mut config = ProviderConfig::gateway(server.uri(), "test-key");
    config.default_model = Some("gpt-4o-mini".to_string());
    GatewayProvider::new("remote", config, GlobalDefaults::default()).unwrap()
}

#[tokio::test]
async fn returns_message_content_and_sends_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "choices": [{
                "message": { "role": "assistant", "content": "export class AImpl {}" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = provider(&server)
        .generate("Implement A", &GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "export class AImpl {}");
}

#[tokio::test]
async fn concatenates_streamed_deltas() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"export \"}}]}\n\n\
                data: {\"choices\":[{\"delta\":{\"content\":\"class AImpl {}\"}}]}\n\n\
                data: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let text = provider(&server)
        .generate("Implement A", &GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "export class AImpl {}");
}

#[tokio::test]
async fn server_error_is_a_transport_failure_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("Implement A", &GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Transport {
            status: Some(500),
            ..
        }
    ));
    assert!(err.is_transport());
    assert!(err.to_string().contains("status 500"));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({ "choices": [{ "message": { "content": "late" } }] })),
        )
        .mount(&server)
        .await;

    let options = GenerateOptions {
        timeout: Some(Duration::from_millis(200)),
        ..GenerateOptions::default()
    };
    let err = provider(&server)
        .generate("Implement A", &options)
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{:?}", err);
}

#[tokio::test]
async fn lists_models_and_validates_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "gpt-4o-mini" }, { "id": "claude-haiku" }]
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    provider.validate_connection().await.unwrap();
    assert_eq!(
        provider.list_models().await.unwrap(),
        Some(vec!["gpt-4o-mini".to_string(), "claude-haiku".to_string()])
    );
}

#[test]
fn missing_api_key_fails_before_any_request() {
    let mut config = ProviderConfig::gateway("https://gateway.example.com/v1", "");
    config.default_model = Some("m".to_string());
    let err = GatewayProvider::new("remote", config, GlobalDefaults::default())
        .err()
        .unwrap();
    assert!(matches!(err, ProviderError::Config(_)));
}
