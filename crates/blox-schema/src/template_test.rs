use super::{BinaryOperator, CodeTemplate, Operand};
use serde_json::json;
use std::collections::BTreeMap;

#[test]
fn call_helper_binds_sockets_in_order() {
    let template = CodeTemplate::call("circle", &["X", "Y", "DIAMETER"]);
    let CodeTemplate::Call { function, args } = template else {
        panic!("expected call template");
    };
    assert_eq!(function, "circle");
    assert_eq!(
        args,
        vec![
            Operand::Socket("X".to_string()),
            Operand::Socket("Y".to_string()),
            Operand::Socket("DIAMETER".to_string()),
        ]
    );
}

#[test]
fn value_and_statement_roles() {
    assert!(CodeTemplate::call("noStroke", &[]).renders_statement());
    assert!(CodeTemplate::call("random", &[]).renders_value());
    assert!(CodeTemplate::binary(BinaryOperator::Add, "A", "B").renders_value());
    assert!(!CodeTemplate::binary(BinaryOperator::Add, "A", "B").renders_statement());
    assert!(!CodeTemplate::Body { slot: "DO".to_string() }.renders_value());
}

#[test]
fn switch_role_requires_every_case() {
    let mixed = CodeTemplate::Switch {
        field: "OP".to_string(),
        cases: BTreeMap::from([
            ("A".to_string(), CodeTemplate::atom("a")),
            ("B".to_string(), CodeTemplate::Repeat { count: Operand::Socket("N".to_string()), body: "DO".to_string() }),
        ]),
    };
    assert!(!mixed.renders_value());
    assert!(!mixed.renders_statement());
}

#[test]
fn operator_symbols_use_strict_equality() {
    assert_eq!(BinaryOperator::Equal.symbol(), "===");
    assert_eq!(BinaryOperator::NotEqual.symbol(), "!==");
    assert_eq!(BinaryOperator::Or.symbol(), "||");
}

#[test]
fn template_json_is_tagged_by_op() {
    let encoded = serde_json::to_value(CodeTemplate::binary(BinaryOperator::Subtract, "A", "B")).expect("encode");
    assert_eq!(
        encoded,
        json!({"op": "binary", "operator": "subtract", "left": {"socket": "A"}, "right": {"socket": "B"}})
    );
}
