use super::splice_fragment;
use crate::commands::{GraphAddress, GraphFragment, InterpreterError};
use blox_graph::{BlockEntry, GraphDocument, ProgramGraph, SocketEntry};
use blox_schema::KindRegistry;
use serde_json::json;
use std::sync::Arc;

fn registry() -> Arc<KindRegistry> {
    Arc::new(KindRegistry::with_builtin_kinds())
}

fn document() -> GraphDocument {
    serde_json::from_value(json!({
        "schema": "blox-graph/0.0.1",
        "entry_points": ["b1"],
        "blocks": {
            "b1": {"kind": "on_start", "slots": {"DO": "b2"}},
            "b2": {"kind": "draw_background", "next": "b3"},
            "b3": {"kind": "draw_circle", "sockets": {"X": {"literal": 10}, "DIAMETER": {"block": "b4"}}},
            "b4": {"kind": "math_number", "fields": {"NUM": 5}}
        }
    }))
    .expect("fixture")
}

fn fragment(value: serde_json::Value) -> GraphFragment {
    serde_json::from_value(value).expect("fragment")
}

fn assert_loads(document: &GraphDocument) {
    ProgramGraph::deserialize(registry(), document).expect("spliced document must validate");
}

#[test]
fn entry_point_body_is_replaced_wholesale() {
    let spliced = splice_fragment(
        &registry(),
        &document(),
        &GraphAddress::EntryPoint {
            kind: "on_start".to_string(),
        },
        &fragment(json!({"head": "a", "blocks": {"a": {"kind": "draw_rect"}}})),
    )
    .expect("splice");

    assert_loads(&spliced);
    assert_eq!(spliced.blocks["b1"].slots.get("DO").map(String::as_str), Some("f.a"));
    for gone in ["b2", "b3", "b4"] {
        assert!(!spliced.blocks.contains_key(gone), "{gone} should be removed");
    }
}

#[test]
fn statement_replacement_keeps_successor_at_fragment_tail() {
    let spliced = splice_fragment(
        &registry(),
        &document(),
        &GraphAddress::Block {
            block: "b2".to_string(),
        },
        &fragment(json!({
            "head": "a",
            "blocks": {"a": {"kind": "draw_fill", "next": "c"}, "c": {"kind": "draw_stroke"}}
        })),
    )
    .expect("splice");

    assert_loads(&spliced);
    assert_eq!(spliced.blocks["b1"].slots.get("DO").map(String::as_str), Some("f.a"));
    assert_eq!(spliced.blocks["f.c"].next.as_deref(), Some("b3"));
    assert!(!spliced.blocks.contains_key("b2"));
    assert!(spliced.blocks.contains_key("b4"));
}

#[test]
fn value_replacement_keeps_socket_position() {
    let spliced = splice_fragment(
        &registry(),
        &document(),
        &GraphAddress::Block {
            block: "b4".to_string(),
        },
        &fragment(json!({
            "head": "sum",
            "blocks": {"sum": {"kind": "math_add", "sockets": {"A": {"literal": 2}, "B": {"literal": 3}}}}
        })),
    )
    .expect("splice");

    assert_loads(&spliced);
    assert_eq!(
        spliced.blocks["b3"].sockets.get("DIAMETER"),
        Some(&SocketEntry::Block("f.sum".to_string()))
    );
    assert!(!spliced.blocks.contains_key("b4"));
}

#[test]
fn entry_point_replacement_keeps_list_position() {
    let mut base = document();
    base.entry_points.push("b5".to_string());
    base.blocks.insert("b5".to_string(), BlockEntry::new("on_frame"));

    let spliced = splice_fragment(
        &registry(),
        &base,
        &GraphAddress::Block {
            block: "b1".to_string(),
        },
        &fragment(json!({"head": "e", "blocks": {"e": {"kind": "on_key_pressed"}}})),
    )
    .expect("splice");

    assert_loads(&spliced);
    assert_eq!(spliced.entry_points, vec!["f.e".to_string(), "b5".to_string()]);
    assert_eq!(spliced.blocks.len(), 2);
}

#[test]
fn empty_fragment_unlinks_a_statement() {
    let spliced = splice_fragment(
        &registry(),
        &document(),
        &GraphAddress::Block {
            block: "b2".to_string(),
        },
        &GraphFragment::default(),
    )
    .expect("splice");

    assert_loads(&spliced);
    assert_eq!(spliced.blocks["b1"].slots.get("DO").map(String::as_str), Some("b3"));
}

#[test]
fn missing_addresses_are_reported() {
    let registry = registry();
    let base = document();
    let cases = [
        GraphAddress::EntryPoint {
            kind: "on_frame".to_string(),
        },
        GraphAddress::Block {
            block: "b9".to_string(),
        },
        GraphAddress::Slot {
            block: "b1".to_string(),
            slot: "ELSE".to_string(),
        },
    ];
    for target in cases {
        let err = splice_fragment(&registry, &base, &target, &GraphFragment::default()).expect_err("must fail");
        assert!(matches!(err, InterpreterError::AddressNotFound(_)), "{target}: {err}");
    }
}

#[test]
fn fragment_head_must_be_one_of_its_blocks() {
    let err = splice_fragment(
        &registry(),
        &document(),
        &GraphAddress::Block {
            block: "b2".to_string(),
        },
        &fragment(json!({"head": "zz", "blocks": {"a": {"kind": "draw_fill"}}})),
    )
    .expect_err("must fail");
    assert!(matches!(err, InterpreterError::Structure(_)));
}

#[test]
fn fragment_ids_never_collide_with_document_ids() {
    let mut base = document();
    let moved = base.blocks.remove("b4").expect("b4");
    base.blocks.insert("f.n".to_string(), moved);
    if let Some(entry) = base.blocks.get_mut("b3") {
        entry.sockets.insert("DIAMETER".to_string(), SocketEntry::Block("f.n".to_string()));
    }

    let spliced = splice_fragment(
        &registry(),
        &base,
        &GraphAddress::Slot {
            block: "b1".to_string(),
            slot: "DO".to_string(),
        },
        &fragment(json!({"head": "n", "blocks": {"n": {"kind": "draw_no_fill"}}})),
    )
    .expect("splice");

    assert_loads(&spliced);
    assert_eq!(spliced.blocks["b1"].slots.get("DO").map(String::as_str), Some("f.n_"));
}

#[test]
fn fragment_with_blank_kind_fails_schema_check() {
    let err = splice_fragment(
        &registry(),
        &document(),
        &GraphAddress::Block {
            block: "b2".to_string(),
        },
        &fragment(json!({"head": "a", "blocks": {"a": {"kind": ""}}})),
    )
    .expect_err("blank kind");
    assert!(matches!(err, InterpreterError::Graph(blox_graph::GraphError::Document(_))));
    assert_eq!(err.kind().as_str(), "structure_error");
}
