mod client;
mod types;

pub use client::{ChatClient, OllamaChatClient};
pub use types::{ChatMessage, ChatRequest, ChatResponse};
