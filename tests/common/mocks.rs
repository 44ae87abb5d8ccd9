use async_trait::async_trait;
use ollama_relay::{
    Error, Result,
    llm::{ChatClient, ChatMessage},
};
use std::sync::{Arc, Mutex};

/// Chat client stub that replies with "echo:" plus the last message content
/// and records every request it receives.
pub struct EchoChatClient {
    pub requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl EchoChatClient {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn received_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for EchoChatClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let reply = messages
            .last()
            .map(|m| format!("echo:{}", m.content))
            .unwrap_or_default();
        self.requests.lock().unwrap().push(messages);
        Ok(reply)
    }
}

/// Chat client stub that always fails, standing in for an unreachable
/// model runtime.
pub struct FailingChatClient;

#[async_trait]
impl ChatClient for FailingChatClient {
    async fn chat(&self, _messages: Vec<ChatMessage>) -> Result<String> {
        Err(Error::chat("model runtime unreachable"))
    }
}
