//! Chat payloads and the per-turn model call against an Ollama-compatible
//! `/api/chat` endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::Config;

pub const ROLE_USER: &str = "user";

#[derive(Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize)]
pub struct ChatResponseMessage {
    pub content: String,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub message: ChatResponseMessage,
}

pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url(),
            model: config.model().to_string(),
        }
    }

    /// One stateless turn: a single user message, no history, no system
    /// prompt. Failures propagate to the turn boundary in the chat loop.
    pub async fn chat(&self, query: &str) -> Result<String, String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(query)],
            stream: false,
        };

        debug!(model = %self.model, base_url = %self.base_url, "Sending chat request");
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| err.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Chat request failed ({status}): {body}"));
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|err| err.to_string())?;
        Ok(parsed.message.content)
    }
}
