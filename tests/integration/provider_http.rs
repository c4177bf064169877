//! Local HTTP JSON provider against a mock server.

use serde_json::json;
use weld::cli::test_provider;
use weld::provider::{
    GenerateOptions, GlobalDefaults, HttpJsonProvider, ModelProvider, ProviderConfig,
    ProviderRegistry,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn generate_posts_prompt_and_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "codellama",
            "prompt": "Implement Greeter",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "codellama",
            "response": "export class GreeterImpl {}",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpJsonProvider::new(
        "default",
        ProviderConfig::http(server.uri()),
        GlobalDefaults::default(),
    )
    .unwrap();
    let options = GenerateOptions {
        model: Some("codellama".to_string()),
        ..GenerateOptions::default()
    };
    let text = provider.generate("Implement Greeter", &options).await.unwrap();
    assert_eq!(text, "export class GreeterImpl {}");
}

#[tokio::test]
async fn malformed_body_is_an_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = HttpJsonProvider::new(
        "default",
        ProviderConfig::http(server.uri()),
        GlobalDefaults::default(),
    )
    .unwrap();
    let err = provider
        .generate("Implement Greeter", &GenerateOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "provider_invalid_response");
}

#[tokio::test]
async fn provider_test_reports_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "llama3" }, { "name": "codellama" }]
        })))
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new(GlobalDefaults::default());
    registry.insert("default", ProviderConfig::http(server.uri()));
    let report = test_provider(&registry, None).await.unwrap();
    assert_eq!(report.name, "default");
    assert!(report.connected);
    assert_eq!(
        report.models,
        Some(vec!["llama3".to_string(), "codellama".to_string()])
    );
}

#[tokio::test]
async fn provider_test_reports_unreachable_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new(GlobalDefaults::default());
    registry.insert("local", ProviderConfig::http(server.uri()));
    let report = test_provider(&registry, Some("local")).await.unwrap();
    assert!(!report.connected);
    assert!(report.error.unwrap().contains("503"));
    assert!(report.models.is_none());
}
