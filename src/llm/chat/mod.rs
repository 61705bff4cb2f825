pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use super::{ GenerationConfig, LlmConfig };
use self::gemini::GeminiChatClient;
use crate::models::chat::Turn;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway returned status {status}: {body}")]
    Provider {
        status: u16,
        body: String,
    },
    #[error("gateway returned an invalid payload: {0}")]
    InvalidPayload(String),
    #[error("gateway returned no text (reason: {0})")]
    EmptyResponse(String),
    #[error("gateway is misconfigured: {0}")]
    Config(String),
}

/// A conversation seeded with prior turns. Each successful `send` extends the
/// session with the prompt and the generated answer.
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, prompt: &str) -> Result<String, GatewayError>;
}

pub trait ChatGateway: Send + Sync {
    fn start_session(&self, config: &GenerationConfig, history: &[Turn]) -> Box<dyn ChatSession>;

    fn get_model(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatGateway>, GatewayError> {
    let client = GeminiChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
