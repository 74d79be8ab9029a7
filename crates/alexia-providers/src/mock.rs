//! Mock model gateway for testing
//!
//! Replays a queue of scripted responses and records every request, so the
//! session loop can be exercised without a running backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use alexia_providers::mock::{MockGateway, MockResponse};
//!
//! let gateway = MockGateway::new()
//!     .with_response(MockResponse::text("Hello, world!"))
//!     .with_response(MockResponse::streaming(vec!["Hel", "lo"]));
//! ```

use crate::{ChatRequest, ChatStream, GatewayError, ModelGateway, ModelInfo};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Scripted failure, turned into a [`GatewayError`] when replayed.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Connectivity(String),
    Protocol(String),
}

impl MockFailure {
    fn to_error(&self) -> GatewayError {
        match self {
            Self::Connectivity(msg) => GatewayError::Connectivity(msg.clone()),
            Self::Protocol(msg) => GatewayError::Protocol(msg.clone()),
        }
    }
}

/// A single item in a mock streaming response
#[derive(Debug, Clone)]
pub enum MockChunk {
    Content(String),
    Failure(MockFailure),
}

/// A mock response that can be configured for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub chunks: Vec<MockChunk>,
    /// When set, `stream_chat` itself fails instead of streaming.
    pub connect_failure: Option<MockFailure>,
}

impl MockResponse {
    /// Create a simple text-only response
    pub fn text(content: &str) -> Self {
        Self::streaming(vec![content])
    }

    /// Create a streaming text response with multiple chunks
    pub fn streaming(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks
                .into_iter()
                .map(|c| MockChunk::Content(c.to_string()))
                .collect(),
            connect_failure: None,
        }
    }

    /// Create a response carrying a tool call in the JSON wire format
    pub fn tool_call(tool: &str, args: serde_json::Value) -> Self {
        let body = serde_json::json!({ "tool_name": tool, "arguments": args });
        Self::text(&body.to_string())
    }

    /// Create a response carrying a plan in the JSON wire format
    pub fn plan(steps: Vec<(&str, serde_json::Value)>) -> Self {
        let steps: Vec<serde_json::Value> = steps
            .into_iter()
            .map(|(tool, args)| serde_json::json!({ "tool_name": tool, "arguments": args }))
            .collect();
        Self::text(&serde_json::json!({ "plan": steps }).to_string())
    }

    /// Create a response whose stream reports an in-band backend error
    pub fn protocol_error(message: &str) -> Self {
        Self {
            chunks: vec![MockChunk::Failure(MockFailure::Protocol(message.to_string()))],
            connect_failure: None,
        }
    }

    /// Create a response where the backend cannot be reached at all
    pub fn unreachable(message: &str) -> Self {
        Self {
            chunks: Vec::new(),
            connect_failure: Some(MockFailure::Connectivity(message.to_string())),
        }
    }
}

/// A mock gateway for testing
///
/// Responses are returned in FIFO order. All requests are kept for
/// verification.
pub struct MockGateway {
    name: String,
    healthy: bool,
    models: Vec<ModelInfo>,
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    default_response: Option<MockResponse>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            healthy: true,
            models: vec![ModelInfo {
                name: "mock-model".to_string(),
                size: 0,
                modified_at: String::new(),
            }],
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: None,
        }
    }

    /// Set whether `check_health` succeeds
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// Set the models reported by `list_models`
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    /// Add a response to the queue
    pub fn with_response(self, response: MockResponse) -> Self {
        self.lock_responses().push_back(response);
        self
    }

    /// Add multiple responses to the queue
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.lock_responses().extend(responses);
        self
    }

    /// Set a default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Get all requests that were made to this gateway
    pub fn get_requests(&self) -> Vec<ChatRequest> {
        self.lock_requests().clone()
    }

    /// Get the number of requests made
    pub fn request_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// Number of scripted responses not yet consumed
    pub fn remaining_responses(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<MockResponse>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<ChatRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_response(&self) -> MockResponse {
        self.lock_responses().pop_front().unwrap_or_else(|| {
            self.default_response
                .clone()
                .unwrap_or_else(|| MockResponse::text("Mock response (no responses configured)"))
        })
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ModelGateway for MockGateway {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError> {
        self.lock_requests().push(request);

        let response = self.next_response();
        if let Some(failure) = &response.connect_failure {
            return Err(failure.to_error());
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            for chunk in response.chunks {
                let item = match chunk {
                    MockChunk::Content(text) => Ok(text),
                    MockChunk::Failure(failure) => Err(failure.to_error()),
                };
                let is_err = item.is_err();
                if tx.send(item).await.is_err() || is_err {
                    break;
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn check_health(&self) -> bool {
        self.healthy
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, GatewayError> {
        if !self.healthy {
            return Err(GatewayError::Connectivity("mock backend is down".to_string()));
        }
        Ok(self.models.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
