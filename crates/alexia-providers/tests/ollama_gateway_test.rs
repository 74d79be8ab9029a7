//! HTTP-level tests for the Ollama gateway against a local mock server.

use alexia_providers::{ChatRequest, GatewayError, Message, ModelGateway, OllamaGateway};
use futures_util::StreamExt;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn collect_stream(
    gateway: &OllamaGateway,
    request: ChatRequest,
) -> Result<Vec<Result<String, GatewayError>>, GatewayError> {
    let stream = gateway.stream_chat(request).await?;
    Ok(stream.collect().await)
}

#[tokio::test]
async fn health_check_requires_banner() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
        .mount(&server)
        .await;

    let gateway = OllamaGateway::new(&server.uri()).unwrap();
    assert!(gateway.check_health().await);
}

#[tokio::test]
async fn health_check_rejects_other_servers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("nginx welcome page"))
        .mount(&server)
        .await;

    let gateway = OllamaGateway::new(&server.uri()).unwrap();
    assert!(!gateway.check_health().await);
}

#[tokio::test]
async fn health_check_false_when_unreachable() {
    // nothing listens on port 9 locally
    let gateway = OllamaGateway::new("http://127.0.0.1:9").unwrap();
    assert!(!gateway.check_health().await);
}

#[tokio::test]
async fn list_models_parses_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                {"name": "llama3:latest", "size": 4661224676u64, "modified_at": "2024-05-01T10:00:00Z"},
                {"name": "qwen2:7b"}
            ]
        })))
        .mount(&server)
        .await;

    let gateway = OllamaGateway::new(&server.uri()).unwrap();
    let models = gateway.list_models().await.unwrap();

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "llama3:latest");
    assert!(models[0].size_gb() > 4.0);
    assert_eq!(models[1].size, 0);
}

#[tokio::test]
async fn list_models_unreachable_is_connectivity_error() {
    let gateway = OllamaGateway::new("http://127.0.0.1:9").unwrap();
    let err = gateway.list_models().await.unwrap_err();
    assert!(err.is_connectivity(), "got {:?}", err);
}

#[tokio::test]
async fn stream_chat_yields_fragments_in_order() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":"lo"},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true}"#,
        "\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3",
            "stream": true,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = OllamaGateway::new(&server.uri()).unwrap();
    let request = ChatRequest::new("llama3", vec![Message::user("hi")]).with_system_prompt("be brief");
    let items = collect_stream(&gateway, request).await.unwrap();

    let fragments: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(fragments, vec!["Hel", "lo"]);
}

#[tokio::test]
async fn stream_chat_reports_in_band_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("{\"error\":\"model 'ghost' not found\"}\n"),
        )
        .mount(&server)
        .await;

    let gateway = OllamaGateway::new(&server.uri()).unwrap();
    let items = collect_stream(&gateway, ChatRequest::new("ghost", vec![Message::user("hi")]))
        .await
        .unwrap();

    match items.as_slice() {
        [Err(GatewayError::Protocol(msg))] => assert!(msg.contains("not found")),
        other => panic!("expected a single protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn stream_chat_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"model not found"}"#))
        .mount(&server)
        .await;

    let gateway = OllamaGateway::new(&server.uri()).unwrap();
    let err = gateway
        .stream_chat(ChatRequest::new("ghost", vec![]))
        .await
        .unwrap_err();

    match err {
        GatewayError::Protocol(msg) => {
            assert!(msg.contains("404"));
            assert!(msg.contains("model not found"));
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn stream_chat_unreachable_is_connectivity_error() {
    let gateway = OllamaGateway::new("http://127.0.0.1:9")
        .unwrap()
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(1), Duration::from_secs(1));

    let err = gateway
        .stream_chat(ChatRequest::new("llama3", vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert!(err.is_connectivity(), "got {:?}", err);
}
