use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ENGINE_EVENT_SCHEMA_0_0_1: &str = "blox-engine-event/0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineEventType {
    TurnStarted,
    TurnFinished,
    TurnAbandoned,
    CommandAccepted,
    CommandCommitted,
    CommandRejected,
    DirectEditCommitted,
    DirectEditRejected,
    MessageAdded,
    CheckpointCreated,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineEvent {
    #[serde(rename = "type")]
    pub event_type: EngineEventType,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl EngineEvent {
    pub fn new(event_type: EngineEventType) -> Self {
        Self {
            event_type,
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineEventRecord {
    pub schema: String,
    pub session_id: String,
    pub seq: u64,
    pub ts: String,
    pub event: EngineEvent,
}

impl EngineEventRecord {
    pub fn new(session_id: impl Into<String>, seq: u64, ts: impl Into<String>, event: EngineEvent) -> Self {
        Self {
            schema: ENGINE_EVENT_SCHEMA_0_0_1.to_string(),
            session_id: session_id.into(),
            seq,
            ts: ts.into(),
            event,
        }
    }
}

/// Hands out records with a gap-free `seq` for one session.
#[derive(Debug, Clone)]
pub struct EngineEventStream {
    session_id: String,
    next_seq: u64,
}

impl EngineEventStream {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_start_seq(session_id, 0)
    }

    pub fn with_start_seq(session_id: impl Into<String>, start_seq: u64) -> Self {
        Self {
            session_id: session_id.into(),
            next_seq: start_seq,
        }
    }

    pub fn next_record(&mut self, ts: impl Into<String>, event: EngineEvent) -> EngineEventRecord {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        EngineEventRecord::new(self.session_id.clone(), seq, ts, event)
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineEventSequenceError {
    #[error("sequence is empty")]
    Empty,
    #[error("sequence is not monotonic at index {index}: expected {expected}, got {actual}")]
    NonMonotonic { index: usize, expected: u64, actual: u64 },
}

/// Checks that `seq` increases by exactly one; the first record may start anywhere
/// so that a resumed stream validates too.
pub fn ensure_monotonic_sequence(records: &[EngineEventRecord]) -> Result<(), EngineEventSequenceError> {
    let Some(first) = records.first() else {
        return Err(EngineEventSequenceError::Empty);
    };
    let mut expected = first.seq;
    for (index, record) in records.iter().enumerate() {
        if record.seq != expected {
            return Err(EngineEventSequenceError::NonMonotonic {
                index,
                expected,
                actual: record.seq,
            });
        }
        expected = expected.saturating_add(1);
    }
    Ok(())
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
