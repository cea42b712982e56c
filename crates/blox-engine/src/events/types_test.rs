use super::{
    ensure_monotonic_sequence, EngineEvent, EngineEventRecord, EngineEventSequenceError, EngineEventStream,
    EngineEventType, ENGINE_EVENT_SCHEMA_0_0_1,
};
use crate::events::{encode_event_jsonl_line, parse_event_jsonl_line};
use serde_json::json;

#[test]
fn jsonl_line_decodes_back_to_record() {
    let event = EngineEvent::new(EngineEventType::CommandCommitted)
        .with("command", "str_replace")
        .with("blocks", 4);
    let record = EngineEventRecord::new("session-1", 0, "2026-10-16T09:00:00.000Z", event);

    let line = encode_event_jsonl_line(&record).expect("must encode");
    assert!(line.ends_with('\n'));
    let decoded = parse_event_jsonl_line(&line).expect("must decode");
    assert_eq!(decoded.schema, ENGINE_EVENT_SCHEMA_0_0_1);
    assert_eq!(decoded.event.event_type, EngineEventType::CommandCommitted);
    assert_eq!(decoded.event.data.get("blocks"), Some(&json!(4)));
}

#[test]
fn event_type_uses_snake_case_on_the_wire() {
    let encoded = serde_json::to_value(EngineEvent::new(EngineEventType::RolledBack)).expect("encode");
    assert_eq!(encoded, json!({"type": "rolled_back", "data": {}}));
}

#[test]
fn stream_resumes_from_start_seq() {
    let mut stream = EngineEventStream::with_start_seq("session-2", 7);
    let first = stream.next_record("t0", EngineEvent::new(EngineEventType::TurnStarted));
    let second = stream.next_record("t1", EngineEvent::new(EngineEventType::TurnFinished));
    assert_eq!((first.seq, second.seq), (7, 8));
    assert_eq!(stream.next_seq(), 9);
    ensure_monotonic_sequence(&[first, second]).expect("must be monotonic");
}

#[test]
fn sequence_validator_rejects_gap_and_empty() {
    let records = vec![
        EngineEventRecord::new("session-3", 0, "t0", EngineEvent::new(EngineEventType::MessageAdded)),
        EngineEventRecord::new("session-3", 2, "t1", EngineEvent::new(EngineEventType::MessageAdded)),
    ];
    assert_eq!(
        ensure_monotonic_sequence(&records).expect_err("must fail"),
        EngineEventSequenceError::NonMonotonic {
            index: 1,
            expected: 1,
            actual: 2,
        }
    );
    assert_eq!(ensure_monotonic_sequence(&[]), Err(EngineEventSequenceError::Empty));
}

#[test]
fn unknown_fields_are_rejected() {
    let line = r#"{"schema":"blox-engine-event/0.0.1","session_id":"s","seq":0,"ts":"t","event":{"type":"turn_started"},"extra":1}"#;
    assert!(parse_event_jsonl_line(line).is_err());
}
