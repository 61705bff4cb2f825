use async_trait::async_trait;
use log::{ debug, info };
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use tokio::fs;
use tokio::sync::Mutex;
use crate::history::{ apply_retention, decode_log, encode_log, HistoryStore, PersistenceError };
use crate::models::chat::{ ConversationLog, Turn };

/// Keeps the whole conversation in one pretty-printed JSON file. Every read goes to
/// disk, so the file is the only source of truth.
pub struct JsonFileHistoryStore {
    path: PathBuf,
    max_history: usize,
    write_lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_history: usize) -> Self {
        Self {
            path: path.into(),
            max_history,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn write_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write { path: self.display_path(), source }
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn try_load(&self) -> Result<ConversationLog, PersistenceError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history file at {}, starting fresh", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PersistenceError::Read { path: self.display_path(), source });
            }
        };

        decode_log(&raw).map_err(|message| PersistenceError::Parse {
            path: self.display_path(),
            message,
        })
    }

    async fn try_save(&self, log: &ConversationLog) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&encode_log(log))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| self.write_error(e))?;
            }
        }

        // Write the full log next to the target, then swap it in.
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).await.map_err(|e| self.write_error(e))?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| self.write_error(e))?;

        debug!("Saved {} turns to {}", log.len(), self.path.display());
        Ok(())
    }

    async fn append_exchange(&self, prompt: &str, answer: &str) -> ConversationLog {
        let _guard = self.write_lock.lock().await;

        let mut log = self.load().await;
        log.push(Turn::user(prompt));
        log.push(Turn::model(answer));

        let before = log.len();
        apply_retention(&mut log, self.max_history);
        if log.len() < before {
            info!("History limit reached, evicted {} oldest turns", before - log.len());
        }

        self.save(&log).await;
        log
    }
}
