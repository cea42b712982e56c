use super::{BlockKind, BlockShape, FieldType, Literal, SocketDefault, ValueType};
use crate::template::CodeTemplate;
use serde_json::json;

#[test]
fn any_accepts_everything_in_both_directions() {
    assert!(ValueType::Any.accepts(ValueType::Vector));
    assert!(ValueType::Number.accepts(ValueType::Any));
    assert!(ValueType::Number.accepts(ValueType::Number));
    assert!(!ValueType::Number.accepts(ValueType::Boolean));
}

#[test]
fn literal_acceptance_follows_socket_type() {
    assert!(ValueType::Color.accepts_literal(&Literal::Text("#00ff00".to_string())));
    assert!(ValueType::Color.accepts_literal(&Literal::Number(128.0)));
    assert!(!ValueType::Boolean.accepts_literal(&Literal::Number(1.0)));
    assert!(!ValueType::Vector.accepts_literal(&Literal::Number(0.0)));
}

#[test]
fn literal_decodes_untagged() {
    let decoded: Vec<Literal> = serde_json::from_value(json!([true, 3, "hi"])).expect("decode");
    assert_eq!(
        decoded,
        vec![Literal::Boolean(true), Literal::Number(3.0), Literal::Text("hi".to_string())]
    );
}

#[test]
fn dropdown_check_lists_options() {
    let field = FieldType::Dropdown {
        options: vec!["LT".to_string(), "GT".to_string()],
        default: "LT".to_string(),
    };
    assert!(field.check(&Literal::Text("GT".to_string())).is_ok());
    let expected = field.check(&Literal::Text("EQ".to_string())).expect_err("must reject");
    assert_eq!(expected, "one of [LT, GT]");
}

#[test]
fn number_field_rejects_non_finite() {
    let field = FieldType::Number { default: 0.0 };
    assert!(field.check(&Literal::Number(f64::NAN)).is_err());
    assert_eq!(field.default_literal(), Literal::Number(0.0));
}

#[test]
fn kind_definition_decodes_from_json() {
    let kind: BlockKind = serde_json::from_value(json!({
        "id": "draw_square",
        "category": "drawing",
        "shape": "statement",
        "sockets": [{"name": "SIZE", "type": "number", "default": {"literal": 5}}],
        "fields": [{"name": "MODE", "type": "dropdown", "options": ["CENTER", "CORNER"], "default": "CENTER"}],
        "template": {"op": "call", "function": "square", "args": [{"socket": "SIZE"}]}
    }))
    .expect("decode");

    assert_eq!(kind.shape, BlockShape::Statement);
    assert!(kind.is_statement());
    assert_eq!(kind.socket("SIZE").map(|socket| &socket.default), Some(&SocketDefault::Literal(Literal::Number(5.0))));
    assert!(matches!(kind.field("MODE").map(|field| &field.field_type), Some(FieldType::Dropdown { .. })));
    assert_eq!(kind.template, CodeTemplate::call("square", &["SIZE"]));
}

#[test]
fn shape_helpers_report_callback_and_output() {
    let entry = BlockKind::entry_point("on_start", "setup", CodeTemplate::Body { slot: "DO".to_string() });
    assert_eq!(entry.callback(), Some("setup"));
    assert!(entry.is_entry_point());
    assert_eq!(entry.output_type(), None);

    let value = BlockKind::value("input_pointer_x", "input", ValueType::Number, CodeTemplate::atom("mouseX"));
    assert_eq!(value.output_type(), Some(ValueType::Number));
    assert!(!value.is_statement());
}
