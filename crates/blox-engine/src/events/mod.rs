mod jsonl;
mod types;

pub use jsonl::{encode_event_jsonl_line, parse_event_jsonl_line};
pub use types::{
    ensure_monotonic_sequence, EngineEvent, EngineEventRecord, EngineEventSequenceError, EngineEventStream,
    EngineEventType, ENGINE_EVENT_SCHEMA_0_0_1,
};
