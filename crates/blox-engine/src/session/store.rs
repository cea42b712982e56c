use std::fs;
use std::path::Path;

use super::types::{ChatSession, SESSION_SCHEMA_0_0_1};

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported session schema `{0}`")]
    Schema(String),
}

pub fn encode_session_json(session: &ChatSession) -> serde_json::Result<String> {
    serde_json::to_string_pretty(session)
}

pub fn decode_session_json(input: &str) -> Result<ChatSession, SessionStoreError> {
    let session = serde_json::from_str::<ChatSession>(input)?;
    if session.schema != SESSION_SCHEMA_0_0_1 {
        return Err(SessionStoreError::Schema(session.schema));
    }
    Ok(session)
}

pub fn save_session_to_path(path: impl AsRef<Path>, session: &ChatSession) -> Result<(), SessionStoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let encoded = encode_session_json(session)?;
    fs::write(path, encoded)?;
    Ok(())
}

pub fn load_session_from_path(path: impl AsRef<Path>) -> Result<ChatSession, SessionStoreError> {
    let contents = fs::read_to_string(path)?;
    decode_session_json(&contents)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
