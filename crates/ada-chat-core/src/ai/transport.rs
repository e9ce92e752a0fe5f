use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::state::ChatMessage;

pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>, options: GenerationOptions) -> Self {
        Self {
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

/// What came back from the backend. `content` is `None` when the reply had
/// no `message.content` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub content: Option<String>,
}

impl ChatReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }
}

/// Anything that can carry a chat request to a model.
///
/// Every failure, whether network, status or decoding, is one error kind to
/// callers.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply>;
}
