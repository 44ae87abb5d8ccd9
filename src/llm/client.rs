use super::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::{Result, config::LlmConfig, error::Error};
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String>;
}

pub struct OllamaChatClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaChatClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::chat(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
        })
    }
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        debug!("Sending chat request with {} messages to {}", messages.len(), url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
        };

        let response = self.http_client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Error::chat(format!(
                "Ollama API returned HTTP {}",
                response.status()
            )));
        }

        let chat_response: ChatResponse = response.json().await?;

        debug!(
            "Received reply of {} bytes from model {}",
            chat_response.message.content.len(),
            chat_response.model
        );

        Ok(chat_response.message.content)
    }
}
