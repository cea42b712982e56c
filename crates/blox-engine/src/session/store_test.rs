use super::{decode_session_json, load_session_from_path, save_session_to_path, SessionStoreError};
use crate::session::{ChatSession, MessagePart, ProgramSnapshot, Role, SessionMode, TitleOptions};
use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn saves_and_loads_session_file() {
    let titles = TitleOptions::default();
    let mut session = ChatSession::new("s-store", SessionMode::Text, &titles, "2026-10-16T09:00:00.000Z");
    let id = session.add_message(Role::User, vec![MessagePart::text("draw grass")], "t1", &titles);
    session
        .create_checkpoint(&id, ProgramSnapshot::Text { text: "fill(0);".to_string() }, None, "t2")
        .expect("checkpoint");

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let path = std::env::temp_dir().join(format!("blox-session-store-{nanos}.json"));
    save_session_to_path(&path, &session).expect("save");
    let loaded = load_session_from_path(&path).expect("load");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, session);
    assert_eq!(loaded.title, "draw grass");
}

#[test]
fn rejects_foreign_schema_tag() {
    let titles = TitleOptions::default();
    let mut session = ChatSession::new("s", SessionMode::Graph, &titles, "t0");
    session.schema = "blox-session/9.9.9".to_string();
    let encoded = serde_json::to_string(&session).expect("encode");
    let err = decode_session_json(&encoded).expect_err("must reject");
    assert!(matches!(err, SessionStoreError::Schema(tag) if tag == "blox-session/9.9.9"));
}

#[test]
fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join("blox-session-store-does-not-exist.json");
    assert!(matches!(load_session_from_path(path), Err(SessionStoreError::Io(_))));
}
