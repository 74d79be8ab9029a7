//! Model gateway abstractions for Alexia.
//!
//! The session loop talks to the language model exclusively through the
//! [`ModelGateway`] trait. [`OllamaGateway`] speaks the Ollama HTTP protocol;
//! [`mock::MockGateway`] replays scripted responses for tests.

mod error;
pub mod mock;
mod ollama;
mod streaming;

pub use error::GatewayError;
pub use mock::{MockGateway, MockResponse};
pub use ollama::OllamaGateway;
pub use streaming::NdjsonLineBuffer;

use serde::{Deserialize, Serialize};

/// Stream of text fragments produced by a chat completion.
pub type ChatStream = tokio_stream::wrappers::ReceiverStream<Result<String, GatewayError>>;

/// Trait for chat backends
#[async_trait::async_trait]
pub trait ModelGateway: Send + Sync {
    /// Stream a chat completion. Fragments arrive in order; the stream ends
    /// when the backend closes the connection.
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError>;

    /// Best-effort reachability probe. Never fails, only answers `false`.
    async fn check_health(&self) -> bool;

    /// List the models the backend can serve.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, GatewayError>;

    /// Get the gateway name
    fn name(&self) -> &str;
}

/// A single chat request: model, conversation, optional system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        let prompt = system_prompt.into();
        self.system_prompt = if prompt.is_empty() { None } else { Some(prompt) };
        self
    }

    /// Messages as sent on the wire: the system prompt (if any) first.
    pub fn wire_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::new(MessageRole::System, prompt.clone()));
        }
        messages.extend(self.messages.iter().cloned());
        messages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A model advertised by the backend (`GET /api/tags`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

impl ModelInfo {
    /// Size in gigabytes, for display.
    pub fn size_gb(&self) -> f64 {
        self.size as f64 / 1024f64.powi(3)
    }
}
