mod file;

pub use file::JsonFileHistoryStore;

use async_trait::async_trait;
use log::{ debug, error, info };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use crate::cli::Args;
use crate::models::chat::{ ConversationLog, Role, Turn };

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read history file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse history file {path}: {message}")]
    Parse {
        path: String,
        message: String,
    },
    #[error("failed to write history file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A turn as it is laid out on disk: `{ "role": "user", "content": "..." }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTurn {
    pub role: Role,
    pub content: String,
}

impl From<&Turn> for StoredTurn {
    fn from(turn: &Turn) -> Self {
        Self { role: turn.role, content: turn.text.clone() }
    }
}

impl From<StoredTurn> for Turn {
    fn from(stored: StoredTurn) -> Self {
        Self { role: stored.role, text: stored.content }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn try_load(&self) -> Result<ConversationLog, PersistenceError>;

    async fn try_save(&self, log: &ConversationLog) -> Result<(), PersistenceError>;

    /// Appends a user turn and a model turn to the persisted log and returns the result.
    /// Implementations must make the reload-append-save cycle atomic with respect to
    /// other callers of this method.
    async fn append_exchange(&self, prompt: &str, answer: &str) -> ConversationLog;

    /// Like `try_load`, but any failure degrades to an empty log.
    async fn load(&self) -> ConversationLog {
        match self.try_load().await {
            Ok(log) => log,
            Err(e) => {
                error!("History load failed, starting from an empty log: {}", e);
                Vec::new()
            }
        }
    }

    async fn save(&self, log: &ConversationLog) {
        if let Err(e) = self.try_save(log).await {
            error!("History save failed: {}", e);
        }
    }
}

pub fn initialize_history_store(args: &Args) -> Arc<dyn HistoryStore> {
    if args.max_history == 0 {
        info!("Chat history will be stored in: {} (unbounded)", args.history_file);
    } else {
        info!(
            "Chat history will be stored in: {} (last {} exchanges)",
            args.history_file,
            args.max_history
        );
    }
    Arc::new(JsonFileHistoryStore::new(&args.history_file, args.max_history))
}

/// Drops the oldest turns so that at most `max_pairs` prompt/answer pairs remain.
/// `max_pairs == 0` means no limit.
pub fn apply_retention(log: &mut ConversationLog, max_pairs: usize) {
    if max_pairs == 0 {
        return;
    }
    let max_turns = max_pairs.saturating_mul(2);
    if log.len() > max_turns {
        let excess = log.len() - max_turns;
        log.drain(..excess);
    }
}

pub fn encode_log(log: &ConversationLog) -> Vec<StoredTurn> {
    log.iter().map(StoredTurn::from).collect()
}

/// Decodes the persisted JSON array. Individual records that do not carry a usable
/// role and text are skipped rather than failing the whole log.
pub fn decode_log(raw: &str) -> Result<ConversationLog, String> {
    let value: JsonValue = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let records = match value {
        JsonValue::Array(records) => records,
        other => {
            return Err(format!("expected a JSON array, found {}", json_kind(&other)));
        }
    };

    let mut log = Vec::with_capacity(records.len());
    for record in &records {
        decode_record(record, &mut log);
    }
    Ok(log)
}

fn decode_record(record: &JsonValue, log: &mut ConversationLog) {
    let obj = match record.as_object() {
        Some(obj) => obj,
        None => {
            debug!("Skipping non-object history record: {}", record);
            return;
        }
    };

    // {prompt, answer} pairs were written by earlier versions.
    if let (Some(prompt), Some(answer)) = (
        obj.get("prompt").and_then(JsonValue::as_str),
        obj.get("answer").and_then(JsonValue::as_str),
    ) {
        log.push(Turn::user(prompt));
        log.push(Turn::model(answer));
        return;
    }

    let role = obj.get("role").and_then(JsonValue::as_str);
    let text = obj
        .get("content")
        .and_then(JsonValue::as_str)
        .or_else(|| obj.get("text").and_then(JsonValue::as_str));

    match (role, text) {
        (Some(role), Some(text)) =>
            match role.parse::<Role>() {
                Ok(role) => log.push(Turn { role, text: text.to_string() }),
                Err(e) => debug!("Skipping history record: {}", e),
            }
        _ => debug!("Skipping incomplete history record: {}", record),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
