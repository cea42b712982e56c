use blox_core::stable_hash_of;
use blox_graph::GraphDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::title::{derive_title, TitleOptions};

pub const SESSION_SCHEMA_0_0_1: &str = "blox-session/0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Graph,
    Text,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Text => "text",
        }
    }
}

/// Program state as a session stores it: a graph document or a raw text buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProgramSnapshot {
    Graph { graph: GraphDocument },
    Text { text: String },
}

impl ProgramSnapshot {
    pub fn empty(mode: SessionMode) -> Self {
        match mode {
            SessionMode::Graph => Self::Graph {
                graph: GraphDocument::default(),
            },
            SessionMode::Text => Self::Text { text: String::new() },
        }
    }

    pub fn mode(&self) -> SessionMode {
        match self {
            Self::Graph { .. } => SessionMode::Graph,
            Self::Text { .. } => SessionMode::Text,
        }
    }

    pub fn hash(&self) -> Result<String, SessionError> {
        stable_hash_of(self).map_err(|err| SessionError::Encode(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    InputAvailable,
    OutputAvailable,
    OutputError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    ToolInvocation {
        tool_call_id: String,
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        state: ToolState,
    },
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::ToolInvocation { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub created_at: String,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    /// Display number, never reused within a session.
    pub number: u64,
    pub message_id: String,
    pub snapshot: ProgramSnapshot,
    pub snapshot_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    ArchivedFrom { checkpoint_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("message `{0}` does not exist in this session")]
    MessageNotFound(String),
    #[error("checkpoint `{0}` does not exist in this session")]
    CheckpointNotFound(String),
    #[error("snapshot mode {found} does not match session mode {expected}")]
    ModeMismatch { expected: &'static str, found: &'static str },
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
    #[error("session is busy with another turn")]
    Busy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub schema: String,
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub title_derived: bool,
    pub mode: SessionMode,
    pub message_count: u64,
    pub last_snapshot: ProgramSnapshot,
    pub created_at: String,
    pub updated_at: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub next_message_seq: u64,
    #[serde(default)]
    pub next_checkpoint_number: u64,
    /// Seq of the next engine event, so a reopened session keeps its event log gap-free.
    #[serde(default)]
    pub next_event_seq: u64,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, mode: SessionMode, titles: &TitleOptions, ts: &str) -> Self {
        Self {
            schema: SESSION_SCHEMA_0_0_1.to_string(),
            id: id.into(),
            title: titles.placeholder.clone(),
            title_derived: false,
            mode,
            message_count: 0,
            last_snapshot: ProgramSnapshot::empty(mode),
            created_at: ts.to_string(),
            updated_at: ts.to_string(),
            status: SessionStatus::Active,
            messages: Vec::new(),
            checkpoints: Vec::new(),
            next_message_seq: 0,
            next_checkpoint_number: 0,
            next_event_seq: 0,
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn checkpoint(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|checkpoint| checkpoint.id == id)
    }

    /// Most recent surviving checkpoint.
    pub fn current_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    pub fn is_archived(&self) -> bool {
        matches!(self.status, SessionStatus::ArchivedFrom { .. })
    }

    /// Appends a message and returns its id. Program state is left alone.
    pub fn add_message(&mut self, role: Role, parts: Vec<MessagePart>, ts: &str, titles: &TitleOptions) -> String {
        self.next_message_seq += 1;
        let id = format!("msg-{}", self.next_message_seq);

        if role == Role::User && !self.title_derived {
            let derived = parts
                .iter()
                .filter_map(MessagePart::as_text)
                .find_map(|text| derive_title(text, titles.max_chars));
            if let Some(title) = derived {
                self.title = title;
                self.title_derived = true;
            }
        }

        self.messages.push(Message {
            id: id.clone(),
            role,
            created_at: ts.to_string(),
            parts,
        });
        self.message_count = self.messages.len() as u64;
        self.status = SessionStatus::Active;
        self.updated_at = ts.to_string();
        id
    }

    pub fn record_snapshot(&mut self, snapshot: ProgramSnapshot, ts: &str) -> Result<(), SessionError> {
        self.ensure_mode(&snapshot)?;
        self.last_snapshot = snapshot;
        self.updated_at = ts.to_string();
        Ok(())
    }

    pub fn create_checkpoint(
        &mut self,
        after_message_id: &str,
        snapshot: ProgramSnapshot,
        summary: Option<String>,
        ts: &str,
    ) -> Result<Checkpoint, SessionError> {
        if self.message(after_message_id).is_none() {
            return Err(SessionError::MessageNotFound(after_message_id.to_string()));
        }
        self.ensure_mode(&snapshot)?;
        let snapshot_hash = snapshot.hash()?;

        self.next_checkpoint_number += 1;
        let number = self.next_checkpoint_number;
        let checkpoint = Checkpoint {
            id: format!("cp-{number}"),
            number,
            message_id: after_message_id.to_string(),
            snapshot,
            snapshot_hash,
            summary,
            created_at: ts.to_string(),
        };
        self.checkpoints.push(checkpoint.clone());
        self.updated_at = ts.to_string();
        Ok(checkpoint)
    }

    /// Drops everything after the checkpoint's message and every later
    /// checkpoint, then restores the checkpoint's snapshot. Irreversible.
    pub fn rollback_to(&mut self, checkpoint_id: &str, ts: &str) -> Result<&ProgramSnapshot, SessionError> {
        let Some(checkpoint_index) = self.checkpoints.iter().position(|cp| cp.id == checkpoint_id) else {
            return Err(SessionError::CheckpointNotFound(checkpoint_id.to_string()));
        };
        let message_id = self.checkpoints[checkpoint_index].message_id.clone();
        let Some(message_index) = self.messages.iter().position(|message| message.id == message_id) else {
            return Err(SessionError::MessageNotFound(message_id));
        };

        self.messages.truncate(message_index + 1);
        self.checkpoints.truncate(checkpoint_index + 1);
        self.last_snapshot = self.checkpoints[checkpoint_index].snapshot.clone();
        self.message_count = self.messages.len() as u64;
        self.status = SessionStatus::ArchivedFrom {
            checkpoint_id: checkpoint_id.to_string(),
        };
        self.updated_at = ts.to_string();
        Ok(&self.last_snapshot)
    }

    fn ensure_mode(&self, snapshot: &ProgramSnapshot) -> Result<(), SessionError> {
        if snapshot.mode() != self.mode {
            return Err(SessionError::ModeMismatch {
                expected: self.mode.as_str(),
                found: snapshot.mode().as_str(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
