use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::transport::{ChatReply, ChatRequest, ChatTransport};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Deserialize, Default)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
}

impl From<ChatResponse> for ChatReply {
    fn from(response: ChatResponse) -> Self {
        ChatReply {
            content: response.message.and_then(|m| m.content),
        }
    }
}

/// Result of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub loaded: bool,
}

#[derive(Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// HTTP client for the chat backend.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::info!(%url, messages = request.messages.len(), "sending chat request");

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat request failed with status {}: {}", status, text));
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response.into())
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/api/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Health check failed: {}", response.status()));
        }

        Ok(response.json().await?)
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/chat/models", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to list models: {}", response.status()));
        }

        let models_response: ModelsResponse = response.json().await?;
        Ok(models_response.models)
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat(request).await
    }
}
