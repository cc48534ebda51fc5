
use super::*;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(url: String) -> AiConfig {
    AiConfig {
        enabled: true,
        api_key: "test-key".to_string(),
        api_url: url,
        model: "gpt-3.5-turbo".to_string(),
        proxy_url: None,
        timeout_secs: 2,
    }
}

#[tokio::test]
async fn test_diagnose_returns_trimmed_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-3.5-turbo"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "  Add an index on orders.customer_id  "}}]
        })))
        .mount(&server)
        .await;

    let client =
        AdvisorClient::new(&config_for(format!("{}/v1/chat/completions", server.uri()))).unwrap();
    let text = client.diagnose("CPU at 92%").await.unwrap();
    assert_eq!(text, "Add an index on orders.customer_id");
}

#[tokio::test]
async fn test_diagnose_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = AdvisorClient::new(&config_for(server.uri())).unwrap();
    let result = client.diagnose("context").await;
    assert!(matches!(
        result,
        Err(AdvisorError::Api { status: 429, .. })
    ));
}

#[tokio::test]
async fn test_diagnose_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
        )
        .mount(&server)
        .await;

    let client = AdvisorClient::new(&config_for(server.uri())).unwrap();
    let result = client.diagnose("context").await;
    assert!(matches!(result, Err(AdvisorError::EmptyResponse)));
}

#[tokio::test]
async fn test_diagnose_network_error() {
    // Nothing listens here.
    let client =
        AdvisorClient::new(&config_for("http://127.0.0.1:1/v1/chat".to_string())).unwrap();
    let result = client.diagnose("context").await;
    assert!(matches!(result, Err(AdvisorError::Network(_))));
}

#[test]
fn test_invalid_proxy_url_fails_at_build() {
    let mut config = config_for("http://example.com".to_string());
    config.proxy_url = Some("not a url".to_string());
    assert!(matches!(
        AdvisorClient::new(&config),
        Err(AdvisorError::Build(_))
    ));
}

#[test]
fn test_socks_proxy_is_accepted() {
    let mut config = config_for("http://example.com".to_string());
    config.proxy_url = Some("socks5h://127.0.0.1:1080".to_string());
    assert!(AdvisorClient::new(&config).is_ok());
}
