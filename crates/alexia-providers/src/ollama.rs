use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

use crate::streaming::NdjsonLineBuffer;
use crate::{ChatRequest, ChatStream, GatewayError, Message, MessageRole, ModelGateway, ModelInfo};

/// Substring of the body served by `GET /` on a healthy Ollama server.
const HEALTH_BANNER: &str = "Ollama is running";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MODELS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct OllamaGateway {
    client: Client,
    host: String,
    request_timeout: Duration,
    health_timeout: Duration,
    models_timeout: Duration,
}

impl OllamaGateway {
    pub fn new(host: &str) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_HEALTH_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            models_timeout: DEFAULT_MODELS_TIMEOUT,
        })
    }

    /// Override the network timeouts. `request` bounds the wait for each
    /// piece of a streamed chat response, not the whole response.
    pub fn with_timeouts(mut self, request: Duration, health: Duration, models: Duration) -> Self {
        self.request_timeout = request;
        self.health_timeout = health;
        self.models_timeout = models;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn create_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        json!({
            "model": request.model,
            "messages": convert_messages(&request.wire_messages()),
            "stream": true,
        })
    }

    async fn parse_streaming_response(
        mut stream: impl futures_util::Stream<Item = reqwest::Result<Bytes>> + Unpin,
        tx: mpsc::Sender<Result<String, GatewayError>>,
        idle_timeout: Duration,
    ) {
        let mut buffer = NdjsonLineBuffer::new();
        let mut fragments = 0usize;

        loop {
            let next = match tokio::time::timeout(idle_timeout, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("Chat stream idle for {:?}, giving up", idle_timeout);
                    let _ = tx
                        .send(Err(GatewayError::Connectivity(format!(
                            "no data from model backend for {} seconds",
                            idle_timeout.as_secs()
                        ))))
                        .await;
                    return;
                }
            };

            let (lines, finished) = match next {
                Some(Ok(chunk)) => (buffer.push(&chunk), false),
                Some(Err(e)) => {
                    error!("Network error during chat stream: {}", e);
                    let _ = tx
                        .send(Err(GatewayError::Connectivity(format!(
                            "network error during chat stream: {}",
                            e
                        ))))
                        .await;
                    return;
                }
                None => (buffer.finish().into_iter().collect(), true),
            };

            for line in lines {
                match decode_chunk(&line) {
                    Ok(Some(content)) => {
                        fragments += 1;
                        if tx.send(Ok(content)).await.is_err() {
                            debug!("Chat stream receiver dropped");
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }

            if finished {
                break;
            }
        }

        debug!("Chat stream closed after {} fragments", fragments);
    }
}

/// Decode one NDJSON line into its text fragment, if it carries one.
fn decode_chunk(line: &str) -> Result<Option<String>, GatewayError> {
    let chunk: OllamaChunk = serde_json::from_str(line)
        .map_err(|e| GatewayError::Decode(format!("{} in line: {}", e, line)))?;

    if let Some(error) = chunk.error {
        return Err(GatewayError::Protocol(error));
    }

    if chunk.done {
        debug!("Backend reported done");
    }

    Ok(chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty()))
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError> {
        debug!(
            "Processing Ollama chat request: model={}, {} messages",
            request.model,
            request.messages.len()
        );

        let body = self.create_request_body(&request);

        let response = tokio::time::timeout(
            self.request_timeout,
            self.client
                .post(format!("{}/api/chat", self.host))
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| {
            GatewayError::Connectivity(format!(
                "connection to {} timed out. Please ensure Ollama is running and accessible",
                self.host
            ))
        })??;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<OllamaChunk>(&error_text)
                .ok()
                .and_then(|c| c.error)
                .unwrap_or(error_text);
            return Err(GatewayError::Protocol(format!("HTTP {}: {}", status, message)));
        }

        let stream = response.bytes_stream();
        let (tx, rx) = mpsc::channel(100);
        let idle_timeout = self.request_timeout;

        tokio::spawn(async move {
            Self::parse_streaming_response(stream, tx, idle_timeout).await;
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn check_health(&self) -> bool {
        let result = self
            .client
            .get(&self.host)
            .timeout(self.health_timeout)
            .send()
            .await;

        match result {
            Ok(response) => {
                let ok = response.status().is_success();
                let body = response.text().await.unwrap_or_default();
                ok && body.contains(HEALTH_BANNER)
            }
            Err(e) => {
                debug!("Health check against {} failed: {}", self.host, e);
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .timeout(self.models_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Connectivity(format!(
                        "connection to {} timed out. Please ensure Ollama is running and accessible",
                        self.host
                    ))
                } else {
                    GatewayError::Connectivity(format!(
                        "could not fetch models from {}: {}",
                        self.host, e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Protocol(format!(
                "HTTP {} from {}/api/tags",
                status, self.host
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|msg| {
            json!({
                "role": match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                "content": msg.content,
            })
        })
        .collect()
}

// Ollama API response structures
#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_chunk() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        assert_eq!(decode_chunk(line).unwrap().as_deref(), Some("Hel"));
    }

    #[test]
    fn test_decode_final_chunk_has_no_content() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true}"#;
        assert!(decode_chunk(line).unwrap().is_none());
    }

    #[test]
    fn test_decode_in_band_error() {
        let line = r#"{"error":"model 'nope' not found"}"#;
        match decode_chunk(line) {
            Err(GatewayError::Protocol(msg)) => assert!(msg.contains("not found")),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage_line() {
        assert!(matches!(decode_chunk("not json"), Err(GatewayError::Decode(_))));
    }

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let gateway = OllamaGateway::new("http://localhost:11434/").unwrap();
        assert_eq!(gateway.host(), "http://localhost:11434");
    }

    #[test]
    fn test_request_body_shape() {
        let gateway = OllamaGateway::new("http://localhost:11434").unwrap();
        let request = ChatRequest::new("llama3", vec![Message::user("hi")]).with_system_prompt("sys");
        let body = gateway.create_request_body(&request);

        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }
}
