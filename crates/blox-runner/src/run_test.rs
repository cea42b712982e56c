use super::{
    execute_generate, execute_kinds, execute_session_apply, execute_session_checkpoint, execute_session_new,
    execute_session_rollback, execute_session_show, resolve_config, RunnerError,
};
use crate::cli::{
    GenerateCommand, KindsCommand, ModeArg, OutputFormat, SessionApplyCommand, SessionCheckpointCommand,
    SessionNewCommand, SessionRollbackCommand, SessionShowCommand,
};
use crate::config::RunnerConfig;
use blox_engine::{
    ensure_monotonic_sequence, load_session_from_path, parse_event_jsonl_line, EngineEventType, SessionStatus,
};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const CIRCLE_GRAPH: &str = r#"{
  "entry_points": ["s"],
  "blocks": {
    "s": {"kind": "on_start", "slots": {"DO": "c"}},
    "c": {"kind": "draw_circle", "sockets": {
      "X": {"literal": 10}, "Y": {"literal": 10}, "DIAMETER": {"literal": 5}
    }}
  }
}"#;

#[test]
fn generate_prints_code_for_graph_file() {
    let graph = write_temp_file("graph.json", CIRCLE_GRAPH);
    let output = execute_generate(
        &GenerateCommand {
            graph,
            format: OutputFormat::Text,
        },
        &RunnerConfig::default(),
    )
    .expect("generate");
    assert!(output.contains("function setup() {"));
    assert!(output.contains("circle(10, 10, 5)"));
}

#[test]
fn generate_json_wraps_code_and_diagnostics() {
    let graph = write_temp_file("graph-json.json", CIRCLE_GRAPH);
    let output = execute_generate(
        &GenerateCommand {
            graph,
            format: OutputFormat::Json,
        },
        &RunnerConfig::default(),
    )
    .expect("generate");
    let value: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(value["schema"], json!("blox-runner-generate/0.0.1"));
    assert!(value["code"].as_str().unwrap_or_default().contains("circle("));
    assert_eq!(value["diagnostics"], json!([]));
}

#[test]
fn generate_rejects_unknown_kind() {
    let graph = write_temp_file(
        "graph-unknown.json",
        r#"{"entry_points": ["s"], "blocks": {"s": {"kind": "on_sunrise"}}}"#,
    );
    let err = execute_generate(
        &GenerateCommand {
            graph,
            format: OutputFormat::Text,
        },
        &RunnerConfig::default(),
    )
    .expect_err("unknown kind");
    assert!(matches!(err, RunnerError::Graph(_)));
}

#[test]
fn kinds_lists_categories() {
    let output = execute_kinds(
        &KindsCommand {
            format: OutputFormat::Text,
        },
        &RunnerConfig::default(),
    )
    .expect("kinds");
    assert!(output.contains("draw_circle"));
    assert!(output.lines().all(|line| line.contains(": ")));
}

#[test]
fn missing_config_path_falls_back_to_defaults() {
    assert_eq!(resolve_config(None).expect("defaults"), RunnerConfig::default());
}

#[test]
fn session_new_apply_checkpoint_rollback_show() {
    let config = RunnerConfig::default();
    let session = temp_path("session.json");
    let created = execute_session_new(
        &SessionNewCommand {
            mode: ModeArg::Graph,
            out: session.clone(),
            id: Some("s-cli".to_string()),
            format: OutputFormat::Text,
        },
        &config,
    )
    .expect("new");
    assert_eq!(created, "created graph session s-cli");

    let create = write_temp_file(
        "create.json",
        &json!({"command": "create", "graph": serde_json::from_str::<Value>(CIRCLE_GRAPH).expect("graph")})
            .to_string(),
    );
    let applied = execute_session_apply(&apply(&session, create, Some("draw a circle")), &config).expect("apply");
    assert!(applied.contains("recorded msg-1"));
    assert!(applied.contains("ok create"));
    assert!(applied.contains("circle(10, 10, 5)"));

    let checkpoint = execute_session_checkpoint(
        &SessionCheckpointCommand {
            session: session.clone(),
            message: "msg-1".to_string(),
            summary: Some("circle".to_string()),
            format: OutputFormat::Text,
        },
        &config,
    )
    .expect("checkpoint");
    assert!(checkpoint.starts_with("checkpoint cp-1"));

    let clear = write_temp_file(
        "clear.json",
        r#"{"command": "create", "graph": {"entry_points": [], "blocks": {}}}"#,
    );
    let cleared = execute_session_apply(&apply(&session, clear, Some("clear it")), &config).expect("clear");
    assert!(!cleared.contains("circle("));

    let rolled = execute_session_rollback(
        &SessionRollbackCommand {
            session: session.clone(),
            checkpoint: "cp-1".to_string(),
            format: OutputFormat::Text,
        },
        &config,
    )
    .expect("rollback");
    assert_eq!(rolled, "rolled back to cp-1; 1 message(s) remain");

    let stored = load_session_from_path(&session).expect("load");
    assert_eq!(stored.title, "draw a circle");
    assert_eq!(
        stored.status,
        SessionStatus::ArchivedFrom {
            checkpoint_id: "cp-1".to_string()
        }
    );

    let shown = execute_session_show(
        &SessionShowCommand {
            session,
            format: OutputFormat::Text,
        },
        &config,
    )
    .expect("show");
    assert!(shown.contains("status: archived from cp-1"));
    assert!(shown.contains("circle(10, 10, 5)"));
}

#[test]
fn failed_command_is_reported_and_session_keeps_program() {
    let config = RunnerConfig::default();
    let session = new_session("session-fail.json", ModeArg::Text);
    let patch = write_temp_file(
        "patch.json",
        r#"[{"command": "replace", "text": "noLoop();"}, {"command": "patch", "old_text": "missing", "new_text": "x"}]"#,
    );
    let output = execute_session_apply(&apply(&session, patch, None), &config).expect("apply");
    assert!(output.contains("ok replace"));
    assert!(output.contains("error patch [address_not_found]"));
    assert!(output.ends_with("noLoop();"));
}

#[test]
fn events_are_appended_as_jsonl() {
    let config = RunnerConfig::default();
    let session = new_session("session-events.json", ModeArg::Text);
    let events = temp_path("events.jsonl");
    if let Some(parent) = events.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    let replace = write_temp_file("replace.json", r#"{"command": "replace", "text": "noLoop();"}"#);
    let mut command = apply(&session, replace, None);
    command.events_jsonl = Some(events.display().to_string());
    execute_session_apply(&command, &config).expect("apply");

    let raw = fs::read_to_string(&events).expect("events file");
    let records = raw
        .lines()
        .map(|line| parse_event_jsonl_line(line).expect("record"))
        .collect::<Vec<_>>();
    assert_eq!(records.first().map(|r| r.event.event_type), Some(EngineEventType::TurnStarted));
    assert!(records
        .iter()
        .any(|r| r.event.event_type == EngineEventType::CommandCommitted));
    assert!(records.iter().all(|r| r.session_id == "s-test"));
}

#[test]
fn repeated_applies_keep_one_gap_free_event_log() {
    let config = RunnerConfig::default();
    let session = new_session("session-twice.json", ModeArg::Text);
    let events = temp_path("events-twice.jsonl");
    let replace = write_temp_file("replace-twice.json", r#"{"command": "replace", "text": "noLoop();"}"#);
    let mut command = apply(&session, replace, None);
    command.events_jsonl = Some(events.display().to_string());

    execute_session_apply(&command, &config).expect("first apply");
    execute_session_apply(&command, &config).expect("second apply");

    let records = fs::read_to_string(&events)
        .expect("events file")
        .lines()
        .map(|line| parse_event_jsonl_line(line).expect("record"))
        .collect::<Vec<_>>();
    assert_eq!(records.first().map(|r| r.seq), Some(0));
    assert_eq!(records.len() % 2, 0);
    ensure_monotonic_sequence(&records).expect("seq continues across runs");
    assert_eq!(
        load_session_from_path(&session).expect("load").next_event_seq,
        records.len() as u64
    );
}

#[test]
fn stale_event_log_is_refused() {
    let config = RunnerConfig::default();
    let session = new_session("session-stale.json", ModeArg::Text);
    let replace = write_temp_file("replace-stale.json", r#"{"command": "replace", "text": "noLoop();"}"#);
    let events = temp_path("events-stale.jsonl");
    let mut command = apply(&session, replace, None);
    command.events_jsonl = Some(events.display().to_string());
    execute_session_apply(&command, &config).expect("first apply");
    let first_run = fs::read_to_string(&events).expect("events file");

    let other = new_session("session-stale-copy.json", ModeArg::Text);
    let untouched = fs::read_to_string(&other).expect("session file");
    command.session = other.clone();
    let err = execute_session_apply(&command, &config).expect_err("seq would restart");
    assert!(matches!(err, RunnerError::EventsIo(_)));
    assert_eq!(fs::read_to_string(&events).expect("events file"), first_run);
    assert_eq!(fs::read_to_string(&other).expect("session file"), untouched);
}

#[test]
fn empty_command_file_is_rejected() {
    let session = new_session("session-empty.json", ModeArg::Text);
    let empty = write_temp_file("empty.json", "[]");
    let err = execute_session_apply(&apply(&session, empty, None), &RunnerConfig::default()).expect_err("empty");
    assert!(matches!(err, RunnerError::NoCommands));
}

#[test]
fn missing_session_file_is_a_store_error() {
    let err = execute_session_show(
        &SessionShowCommand {
            session: temp_path("does-not-exist.json"),
            format: OutputFormat::Text,
        },
        &RunnerConfig::default(),
    )
    .expect_err("missing");
    assert!(matches!(err, RunnerError::SessionStore { .. }));
}

fn apply(session: &PathBuf, command: PathBuf, user_message: Option<&str>) -> SessionApplyCommand {
    SessionApplyCommand {
        session: session.clone(),
        command: Some(command),
        commands_stdin_jsonl: false,
        user_message: user_message.map(str::to_string),
        events_jsonl: None,
        format: OutputFormat::Text,
    }
}

fn new_session(name: &str, mode: ModeArg) -> PathBuf {
    let path = temp_path(name);
    execute_session_new(
        &SessionNewCommand {
            mode,
            out: path.clone(),
            id: Some("s-test".to_string()),
            format: OutputFormat::Text,
        },
        &RunnerConfig::default(),
    )
    .expect("new session");
    path
}

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("blox-run-{}-{nanos}", std::process::id()))
        .join(name)
}

fn write_temp_file(name: &str, contents: &str) -> PathBuf {
    let path = temp_path(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(&path, contents).expect("write");
    path
}
