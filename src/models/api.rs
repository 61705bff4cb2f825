use serde::{ Serialize, Deserialize };
use crate::history::StoredTurn;

#[derive(Deserialize, Debug, Default)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HistoryResponse {
    pub history: Vec<StoredTurn>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}
