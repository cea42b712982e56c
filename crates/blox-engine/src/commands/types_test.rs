use super::{AgentCommand, CommandResult, ErrorKind, GraphAddress, InterpreterError};
use crate::commands::{decode_command_jsonl_line, encode_command_jsonl_line};
use blox_core::{LineRange, TextPatchError};
use blox_graph::GraphError;
use serde_json::json;

#[test]
fn commands_are_tagged_by_name() {
    let command: AgentCommand = serde_json::from_value(json!({
        "command": "str_replace",
        "target": {"type": "slot", "block": "b1", "slot": "DO"},
        "fragment": {"head": "a", "blocks": {"a": {"kind": "draw_fill"}}}
    }))
    .expect("decode");
    let AgentCommand::StrReplace { target, fragment } = &command else {
        panic!("expected str_replace, got {command:?}");
    };
    assert_eq!(
        target,
        &GraphAddress::Slot {
            block: "b1".to_string(),
            slot: "DO".to_string()
        }
    );
    assert_eq!(fragment.head.as_deref(), Some("a"));
    assert_eq!(command.name(), "str_replace");
    assert!(!command.is_read_only());
}

#[test]
fn view_range_is_optional() {
    let bare: AgentCommand = serde_json::from_value(json!({"command": "view"})).expect("decode");
    assert_eq!(bare, AgentCommand::View { range: None });
    let ranged: AgentCommand =
        serde_json::from_value(json!({"command": "view", "range": {"start": 2, "end": 4}})).expect("decode");
    assert_eq!(
        ranged,
        AgentCommand::View {
            range: Some(LineRange::new(2, Some(4)))
        }
    );
}

#[test]
fn jsonl_lines_carry_one_command_each() {
    let command = AgentCommand::Patch {
        old_text: "fill(0);".to_string(),
        new_text: "fill(255);".to_string(),
    };
    let line = encode_command_jsonl_line(&command).expect("encode");
    assert_eq!(line.matches('\n').count(), 1);
    assert_eq!(decode_command_jsonl_line(&line).expect("decode"), command);
}

#[test]
fn errors_map_onto_the_agent_taxonomy() {
    let cases = [
        (InterpreterError::Graph(GraphError::UnknownKind("x".to_string())), ErrorKind::UnknownKind),
        (
            InterpreterError::Graph(GraphError::TypeMismatch {
                location: "b1.X".to_string(),
                expected: "number".to_string(),
                found: "boolean".to_string(),
            }),
            ErrorKind::TypeMismatch,
        ),
        (InterpreterError::Graph(GraphError::Structure("cycle".to_string())), ErrorKind::StructureError),
        (InterpreterError::AddressNotFound("b9".to_string()), ErrorKind::AddressNotFound),
        (InterpreterError::TextPatch(TextPatchError::EmptyPattern), ErrorKind::StructureError),
        (
            InterpreterError::TextPatch(TextPatchError::NotFound {
                snippet: "x".to_string(),
            }),
            ErrorKind::AddressNotFound,
        ),
        (InterpreterError::Busy, ErrorKind::Busy),
    ];
    for (err, kind) in cases {
        assert_eq!(err.kind(), kind, "{err}");
    }
}

#[test]
fn failure_result_serializes_camel_case() {
    let result = CommandResult::failure(&InterpreterError::AddressNotFound("no block `b9`".to_string()));
    let encoded = serde_json::to_value(&result).expect("encode");
    assert_eq!(
        encoded,
        json!({
            "success": false,
            "message": "address not found: no block `b9`",
            "error": "address_not_found",
            "diagnostics": []
        })
    );
}
