use crate::history::{ HistoryStore, PersistenceError };
use crate::llm::chat::{ ChatGateway, GatewayError };
use crate::llm::GenerationConfig;
use crate::models::chat::ConversationLog;

use log::{ error, info };
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AskError {
    #[error("prompt is missing")]
    MissingPrompt,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    History(#[from] PersistenceError),
}

/// Runs one prompt/answer cycle against the gateway and records it in the history store.
#[derive(Clone)]
pub struct ChatAgent {
    gateway: Arc<dyn ChatGateway>,
    history_store: Arc<dyn HistoryStore>,
    generation: GenerationConfig,
}

impl ChatAgent {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        history_store: Arc<dyn HistoryStore>,
        generation: GenerationConfig
    ) -> Self {
        Self { gateway, history_store, generation }
    }

    pub async fn ask(&self, prompt: Option<&str>) -> Result<String, AskError> {
        let prompt = match prompt {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                return Err(AskError::MissingPrompt);
            }
        };

        let history = self.history_store.load().await;
        info!(
            "Asking {} with {} prior turns",
            self.gateway.get_model(),
            history.len()
        );

        let mut session = self.gateway.start_session(&self.generation, &history);
        let answer = session.send(prompt).await.map_err(|e| {
            error!("Error calling AI API: {}", e);
            e
        })?;
        info!("AI answer received ({} chars)", answer.chars().count());

        self.history_store.append_exchange(prompt, &answer).await;
        Ok(answer)
    }

    pub async fn history(&self) -> Result<ConversationLog, AskError> {
        self.history_store.try_load().await.map_err(|e| {
            error!("Failed to load history: {}", e);
            AskError::from(e)
        })
    }
}
