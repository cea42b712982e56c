use super::Interpreter;
use crate::commands::{AgentCommand, CommandEffect, ErrorKind, GraphAddress, GraphFragment, InterpreterError};
use crate::session::ProgramSnapshot;
use blox_codegen::GeneratorOptions;
use blox_core::LineRange;
use blox_graph::GraphDocument;
use blox_schema::KindRegistry;
use serde_json::{json, Value};
use std::sync::Arc;

fn interpreter() -> Interpreter {
    Interpreter::new(Arc::new(KindRegistry::with_builtin_kinds()), GeneratorOptions::default())
}

fn start_graph() -> Value {
    json!({
        "schema": "blox-graph/0.0.1",
        "entry_points": ["s"],
        "blocks": {
            "s": {"kind": "on_start", "slots": {"DO": "bg"}},
            "bg": {"kind": "draw_background", "next": "c"},
            "c": {"kind": "draw_circle", "next": null, "sockets": {
                "X": {"literal": 10}, "Y": {"literal": 10}, "DIAMETER": {"literal": 5}
            }}
        }
    })
}

fn empty_graph() -> ProgramSnapshot {
    ProgramSnapshot::Graph {
        graph: GraphDocument::default(),
    }
}

fn committed(effect: CommandEffect) -> (ProgramSnapshot, crate::commands::CommandResult) {
    match effect {
        CommandEffect::Commit { snapshot, result } => (snapshot, result),
        CommandEffect::View(result) => panic!("expected a commit, got view {result:?}"),
    }
}

#[test]
fn create_generates_setup_with_background_and_circle() {
    let effect = interpreter()
        .apply(&empty_graph(), &AgentCommand::Create { graph: start_graph() })
        .expect("create");
    let (snapshot, result) = committed(effect);

    assert!(result.success);
    assert!(result.diagnostics.is_empty());
    let code = result.code.expect("code");
    let setup = code.find("function setup() {").expect("setup section");
    let background = code.find("background(").expect("background call");
    let circle = code.find("circle(10, 10, 5)").expect("circle call");
    assert!(setup < background && background < circle);

    let ProgramSnapshot::Graph { graph } = snapshot else {
        panic!("graph snapshot expected");
    };
    assert_eq!(graph.entry_points, vec!["b1".to_string()]);
    assert_eq!(result.new_graph, Some(graph));
}

#[test]
fn view_returns_current_graph_without_commit() {
    let interpreter = interpreter();
    let (snapshot, _) = committed(
        interpreter
            .apply(&empty_graph(), &AgentCommand::Create { graph: start_graph() })
            .expect("create"),
    );
    let effect = interpreter
        .apply(&snapshot, &AgentCommand::View { range: None })
        .expect("view");
    let CommandEffect::View(result) = effect else {
        panic!("view must not commit");
    };
    let ProgramSnapshot::Graph { graph } = &snapshot else {
        panic!("graph snapshot expected");
    };
    assert_eq!(result.new_graph.as_ref(), Some(graph));
}

#[test]
fn str_replace_renumbers_and_regenerates() {
    let interpreter = interpreter();
    let (snapshot, _) = committed(
        interpreter
            .apply(&empty_graph(), &AgentCommand::Create { graph: start_graph() })
            .expect("create"),
    );
    let fragment: GraphFragment = serde_json::from_value(json!({
        "head": "fill",
        "blocks": {"fill": {"kind": "draw_fill", "sockets": {"COLOR": {"literal": "#00ff00"}}}}
    }))
    .expect("fragment");
    let (next, result) = committed(
        interpreter
            .apply(
                &snapshot,
                &AgentCommand::StrReplace {
                    target: GraphAddress::Block { block: "b2".to_string() },
                    fragment,
                },
            )
            .expect("str_replace"),
    );

    let code = result.code.expect("code");
    assert!(code.contains("fill(\"#00ff00\");"));
    assert!(!code.contains("background("));
    assert!(code.contains("circle(10, 10, 5);"));
    let ProgramSnapshot::Graph { graph } = next else {
        panic!("graph snapshot expected");
    };
    assert!(graph.blocks.keys().all(|id| id.starts_with('b')));
}

#[test]
fn failed_str_replace_reports_taxonomy() {
    let interpreter = interpreter();
    let (snapshot, _) = committed(
        interpreter
            .apply(&empty_graph(), &AgentCommand::Create { graph: start_graph() })
            .expect("create"),
    );
    let unknown: GraphFragment =
        serde_json::from_value(json!({"head": "a", "blocks": {"a": {"kind": "draw_unicorn"}}})).expect("fragment");
    let err = interpreter
        .apply(
            &snapshot,
            &AgentCommand::StrReplace {
                target: GraphAddress::Block { block: "b2".to_string() },
                fragment: unknown,
            },
        )
        .expect_err("unknown kind");
    assert_eq!(err.kind(), ErrorKind::UnknownKind);

    let mismatched: GraphFragment = serde_json::from_value(json!({
        "head": "c",
        "blocks": {
            "c": {"kind": "draw_circle", "sockets": {"X": {"block": "t"}}},
            "t": {"kind": "logic_boolean"}
        }
    }))
    .expect("fragment");
    let err = interpreter
        .apply(
            &snapshot,
            &AgentCommand::StrReplace {
                target: GraphAddress::Block { block: "b3".to_string() },
                fragment: mismatched,
            },
        )
        .expect_err("type mismatch");
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn schema_violations_in_create_are_structure_errors() {
    let err = interpreter()
        .apply(
            &empty_graph(),
            &AgentCommand::Create {
                graph: json!({"entry_points": [], "blocks": {}, "colour": "red"}),
            },
        )
        .expect_err("schema");
    assert_eq!(err.kind(), ErrorKind::StructureError);
    assert!(!err.issues().is_empty());
}

#[test]
fn commands_from_the_other_mode_are_structure_errors() {
    let interpreter = interpreter();
    let text = ProgramSnapshot::Text {
        text: "background(0);".to_string(),
    };
    let err = interpreter
        .apply(&text, &AgentCommand::Create { graph: start_graph() })
        .expect_err("graph command on text");
    assert!(matches!(err, InterpreterError::Structure(_)));

    let err = interpreter
        .apply(
            &empty_graph(),
            &AgentCommand::Replace {
                text: "x".to_string(),
            },
        )
        .expect_err("text command on graph");
    assert!(matches!(err, InterpreterError::Structure(_)));

    let err = interpreter
        .apply(
            &empty_graph(),
            &AgentCommand::View {
                range: Some(LineRange::new(1, None)),
            },
        )
        .expect_err("range on graph");
    assert_eq!(err.kind(), ErrorKind::StructureError);
}

#[test]
fn text_mode_replace_patch_and_view() {
    let interpreter = interpreter();
    let empty = ProgramSnapshot::Text { text: String::new() };
    let (buffer, result) = committed(
        interpreter
            .apply(
                &empty,
                &AgentCommand::Replace {
                    text: "function setup() {\n  fill(0);\n}\n".to_string(),
                },
            )
            .expect("replace"),
    );
    assert_eq!(result.code.as_deref(), Some("function setup() {\n  fill(0);\n}\n"));

    let (patched, result) = committed(
        interpreter
            .apply(
                &buffer,
                &AgentCommand::Patch {
                    old_text: "fill(0);".to_string(),
                    new_text: "fill(255);".to_string(),
                },
            )
            .expect("patch"),
    );
    assert_eq!(result.new_text.as_deref(), Some("function setup() {\n  fill(255);\n}\n"));

    let CommandEffect::View(view) = interpreter
        .apply(
            &patched,
            &AgentCommand::View {
                range: Some(LineRange::new(2, Some(2))),
            },
        )
        .expect("view")
    else {
        panic!("view must not commit");
    };
    assert_eq!(view.new_text.as_deref(), Some("  2 |   fill(255);\n"));

    let err = interpreter
        .apply(
            &patched,
            &AgentCommand::Patch {
                old_text: "stroke(1);".to_string(),
                new_text: String::new(),
            },
        )
        .expect_err("missing text");
    assert_eq!(err.kind(), ErrorKind::AddressNotFound);
}

#[test]
fn render_matches_commit_output() {
    let interpreter = interpreter();
    let (snapshot, result) = committed(
        interpreter
            .apply(&empty_graph(), &AgentCommand::Create { graph: start_graph() })
            .expect("create"),
    );
    let (code, diagnostics) = interpreter.render(&snapshot).expect("render");
    assert_eq!(Some(code), result.code);
    assert!(diagnostics.is_empty());
}
