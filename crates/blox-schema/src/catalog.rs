use std::collections::BTreeMap;

use crate::kind::{BlockKind, FieldType, ValueType};
use crate::template::{AssignOperator, BinaryOperator, CodeTemplate, Operand, PrefixOperator};

/// Palette shipped with every registry built by `KindRegistry::with_builtin_kinds`.
pub fn builtin_kinds() -> Vec<BlockKind> {
    let mut kinds = Vec::new();
    kinds.extend(event_kinds());
    kinds.extend(drawing_kinds());
    kinds.extend(control_kinds());
    kinds.extend(variable_kinds());
    kinds.extend(math_kinds());
    kinds.extend(logic_kinds());
    kinds.extend(text_kinds());
    kinds.extend(input_kinds());
    kinds.extend(color_kinds());
    kinds.extend(vector_kinds());
    kinds
}

fn body() -> CodeTemplate {
    CodeTemplate::Body { slot: "DO".to_string() }
}

fn socket(name: &str) -> Operand {
    Operand::Socket(name.to_string())
}

fn number_field(default: f64) -> FieldType {
    FieldType::Number { default }
}

fn text_field(default: &str) -> FieldType {
    FieldType::Text {
        default: default.to_string(),
    }
}

fn dropdown(options: &[&str]) -> FieldType {
    FieldType::Dropdown {
        options: options.iter().map(|option| option.to_string()).collect(),
        default: options.first().map(|option| option.to_string()).unwrap_or_default(),
    }
}

fn event_kinds() -> Vec<BlockKind> {
    [
        ("on_start", "setup"),
        ("on_frame", "draw"),
        ("on_pointer_pressed", "mousePressed"),
        ("on_pointer_released", "mouseReleased"),
        ("on_key_pressed", "keyPressed"),
        ("on_key_released", "keyReleased"),
    ]
    .into_iter()
    .map(|(id, callback)| BlockKind::entry_point(id, callback, body()).with_slot("DO"))
    .collect()
}

fn drawing_kinds() -> Vec<BlockKind> {
    use ValueType::{Any, Color, Number};
    vec![
        BlockKind::statement("draw_background", "drawing", CodeTemplate::call("background", &["COLOR"]))
            .with_socket("COLOR", Color, "#ffffff"),
        BlockKind::statement("draw_fill", "drawing", CodeTemplate::call("fill", &["COLOR"]))
            .with_socket("COLOR", Color, "#000000"),
        BlockKind::statement("draw_stroke", "drawing", CodeTemplate::call("stroke", &["COLOR"]))
            .with_socket("COLOR", Color, "#000000"),
        BlockKind::statement("draw_no_stroke", "drawing", CodeTemplate::call("noStroke", &[])),
        BlockKind::statement("draw_no_fill", "drawing", CodeTemplate::call("noFill", &[])),
        BlockKind::statement("draw_stroke_weight", "drawing", CodeTemplate::call("strokeWeight", &["WEIGHT"]))
            .with_socket("WEIGHT", Number, 1.0),
        BlockKind::statement("draw_circle", "drawing", CodeTemplate::call("circle", &["X", "Y", "DIAMETER"]))
            .with_socket("X", Number, 0.0)
            .with_socket("Y", Number, 0.0)
            .with_socket("DIAMETER", Number, 10.0),
        BlockKind::statement(
            "draw_ellipse",
            "drawing",
            CodeTemplate::call("ellipse", &["X", "Y", "WIDTH", "HEIGHT"]),
        )
        .with_socket("X", Number, 0.0)
        .with_socket("Y", Number, 0.0)
        .with_socket("WIDTH", Number, 20.0)
        .with_socket("HEIGHT", Number, 10.0),
        BlockKind::statement("draw_rect", "drawing", CodeTemplate::call("rect", &["X", "Y", "WIDTH", "HEIGHT"]))
            .with_socket("X", Number, 0.0)
            .with_socket("Y", Number, 0.0)
            .with_socket("WIDTH", Number, 10.0)
            .with_socket("HEIGHT", Number, 10.0),
        BlockKind::statement("draw_line", "drawing", CodeTemplate::call("line", &["X1", "Y1", "X2", "Y2"]))
            .with_socket("X1", Number, 0.0)
            .with_socket("Y1", Number, 0.0)
            .with_socket("X2", Number, 10.0)
            .with_socket("Y2", Number, 10.0),
        BlockKind::statement("draw_text", "drawing", CodeTemplate::call("text", &["TEXT", "X", "Y"]))
            .with_socket("TEXT", Any, "")
            .with_socket("X", Number, 0.0)
            .with_socket("Y", Number, 0.0),
        BlockKind::statement("text_print", "text", CodeTemplate::call("print", &["TEXT"])).with_socket("TEXT", Any, ""),
    ]
}

fn control_kinds() -> Vec<BlockKind> {
    let condition = || socket("CONDITION");
    vec![
        BlockKind::statement(
            "control_if",
            "control",
            CodeTemplate::If {
                condition: condition(),
                then_slot: "DO".to_string(),
                else_slot: None,
            },
        )
        .with_socket("CONDITION", ValueType::Boolean, false)
        .with_slot("DO"),
        BlockKind::statement(
            "control_if_else",
            "control",
            CodeTemplate::If {
                condition: condition(),
                then_slot: "DO".to_string(),
                else_slot: Some("ELSE".to_string()),
            },
        )
        .with_socket("CONDITION", ValueType::Boolean, false)
        .with_slot("DO")
        .with_slot("ELSE"),
        BlockKind::statement(
            "control_repeat",
            "control",
            CodeTemplate::Repeat {
                count: socket("TIMES"),
                body: "DO".to_string(),
            },
        )
        .with_socket("TIMES", ValueType::Number, 10.0)
        .with_slot("DO"),
        BlockKind::statement(
            "control_while",
            "control",
            CodeTemplate::While {
                condition: condition(),
                body: "DO".to_string(),
            },
        )
        .with_socket("CONDITION", ValueType::Boolean, false)
        .with_slot("DO"),
    ]
}

fn variable_kinds() -> Vec<BlockKind> {
    vec![
        BlockKind::statement(
            "variables_set",
            "variables",
            CodeTemplate::Assign {
                field: "VAR".to_string(),
                operator: AssignOperator::Set,
                value: socket("VALUE"),
            },
        )
        .with_field("VAR", text_field("score"))
        .with_socket("VALUE", ValueType::Any, 0.0),
        BlockKind::statement(
            "variables_change",
            "variables",
            CodeTemplate::Assign {
                field: "VAR".to_string(),
                operator: AssignOperator::Add,
                value: socket("DELTA"),
            },
        )
        .with_field("VAR", text_field("score"))
        .with_socket("DELTA", ValueType::Number, 1.0),
        BlockKind::value(
            "variables_get",
            "variables",
            ValueType::Any,
            CodeTemplate::Variable { field: "VAR".to_string() },
        )
        .with_field("VAR", text_field("score")),
    ]
}

fn math_kinds() -> Vec<BlockKind> {
    use ValueType::Number;
    let arithmetic = |id: &str, operator: BinaryOperator| {
        BlockKind::value(id, "math", Number, CodeTemplate::binary(operator, "A", "B"))
            .with_socket("A", Number, 0.0)
            .with_socket("B", Number, 0.0)
    };
    vec![
        BlockKind::value("math_number", "math", Number, CodeTemplate::Literal { field: "NUM".to_string() })
            .with_field("NUM", number_field(0.0)),
        arithmetic("math_add", BinaryOperator::Add),
        arithmetic("math_subtract", BinaryOperator::Subtract),
        arithmetic("math_multiply", BinaryOperator::Multiply),
        arithmetic("math_divide", BinaryOperator::Divide),
        arithmetic("math_modulo", BinaryOperator::Modulo),
        BlockKind::value(
            "math_negate",
            "math",
            Number,
            CodeTemplate::Prefix {
                operator: PrefixOperator::Negate,
                operand: socket("VALUE"),
            },
        )
        .with_socket("VALUE", Number, 0.0),
        BlockKind::value("math_power", "math", Number, CodeTemplate::call("pow", &["BASE", "EXPONENT"]))
            .with_socket("BASE", Number, 0.0)
            .with_socket("EXPONENT", Number, 2.0),
        BlockKind::value("math_random", "math", Number, CodeTemplate::call("random", &["MIN", "MAX"]))
            .with_socket("MIN", Number, 0.0)
            .with_socket("MAX", Number, 1.0),
        BlockKind::value("math_round", "math", Number, CodeTemplate::call("round", &["VALUE"]))
            .with_socket("VALUE", Number, 0.0),
    ]
}

fn logic_kinds() -> Vec<BlockKind> {
    use ValueType::{Any, Boolean};
    let compare_cases = [
        ("EQ", BinaryOperator::Equal),
        ("NEQ", BinaryOperator::NotEqual),
        ("LT", BinaryOperator::Less),
        ("LTE", BinaryOperator::LessEqual),
        ("GT", BinaryOperator::Greater),
        ("GTE", BinaryOperator::GreaterEqual),
    ]
    .into_iter()
    .map(|(case, operator)| (case.to_string(), CodeTemplate::binary(operator, "A", "B")))
    .collect::<BTreeMap<_, _>>();
    let boolean_cases = BTreeMap::from([
        ("TRUE".to_string(), CodeTemplate::atom("true")),
        ("FALSE".to_string(), CodeTemplate::atom("false")),
    ]);

    vec![
        BlockKind::value(
            "logic_boolean",
            "logic",
            Boolean,
            CodeTemplate::Switch {
                field: "BOOL".to_string(),
                cases: boolean_cases,
            },
        )
        .with_field("BOOL", dropdown(&["TRUE", "FALSE"])),
        BlockKind::value(
            "logic_compare",
            "logic",
            Boolean,
            CodeTemplate::Switch {
                field: "OP".to_string(),
                cases: compare_cases,
            },
        )
        .with_field("OP", dropdown(&["EQ", "NEQ", "LT", "LTE", "GT", "GTE"]))
        .with_socket("A", Any, 0.0)
        .with_socket("B", Any, 0.0),
        BlockKind::value("logic_and", "logic", Boolean, CodeTemplate::binary(BinaryOperator::And, "A", "B"))
            .with_socket("A", Boolean, false)
            .with_socket("B", Boolean, false),
        BlockKind::value("logic_or", "logic", Boolean, CodeTemplate::binary(BinaryOperator::Or, "A", "B"))
            .with_socket("A", Boolean, false)
            .with_socket("B", Boolean, false),
        BlockKind::value(
            "logic_not",
            "logic",
            Boolean,
            CodeTemplate::Prefix {
                operator: PrefixOperator::Not,
                operand: socket("VALUE"),
            },
        )
        .with_socket("VALUE", Boolean, false),
        BlockKind::value(
            "logic_ternary",
            "logic",
            Any,
            CodeTemplate::Conditional {
                condition: socket("IF"),
                then: socket("THEN"),
                otherwise: socket("ELSE"),
            },
        )
        .with_socket("IF", Boolean, false)
        .with_socket("THEN", Any, 0.0)
        .with_socket("ELSE", Any, 0.0),
    ]
}

fn text_kinds() -> Vec<BlockKind> {
    vec![
        BlockKind::value(
            "text_string",
            "text",
            ValueType::String,
            CodeTemplate::Literal { field: "TEXT".to_string() },
        )
        .with_field("TEXT", text_field("")),
        BlockKind::value(
            "text_join",
            "text",
            ValueType::String,
            CodeTemplate::binary(BinaryOperator::Add, "A", "B"),
        )
        .with_socket("A", ValueType::Any, "")
        .with_socket("B", ValueType::Any, ""),
    ]
}

fn input_kinds() -> Vec<BlockKind> {
    [
        ("input_pointer_x", "mouseX", ValueType::Number),
        ("input_pointer_y", "mouseY", ValueType::Number),
        ("input_pointer_pressed", "mouseIsPressed", ValueType::Boolean),
        ("input_key_code", "keyCode", ValueType::Number),
        ("input_key", "key", ValueType::String),
        ("input_frame_count", "frameCount", ValueType::Number),
        ("input_canvas_width", "width", ValueType::Number),
        ("input_canvas_height", "height", ValueType::Number),
    ]
    .into_iter()
    .map(|(id, code, output)| BlockKind::value(id, "input", output, CodeTemplate::atom(code)))
    .collect()
}

fn color_kinds() -> Vec<BlockKind> {
    vec![
        BlockKind::value(
            "color_picker",
            "color",
            ValueType::Color,
            CodeTemplate::Literal { field: "COLOR".to_string() },
        )
        .with_field("COLOR", text_field("#ff0000")),
        BlockKind::value("color_rgb", "color", ValueType::Color, CodeTemplate::call("color", &["R", "G", "B"]))
            .with_socket("R", ValueType::Number, 0.0)
            .with_socket("G", ValueType::Number, 0.0)
            .with_socket("B", ValueType::Number, 0.0),
    ]
}

fn vector_kinds() -> Vec<BlockKind> {
    let component = |id: &str, property: &str| {
        BlockKind::value(
            id,
            "vector",
            ValueType::Number,
            CodeTemplate::Member {
                object: socket("VECTOR"),
                property: property.to_string(),
            },
        )
        .with_code_socket("VECTOR", ValueType::Vector, "createVector(0, 0)")
    };
    vec![
        BlockKind::value("vector_create", "vector", ValueType::Vector, CodeTemplate::call("createVector", &["X", "Y"]))
            .with_socket("X", ValueType::Number, 0.0)
            .with_socket("Y", ValueType::Number, 0.0),
        component("vector_x", "x"),
        component("vector_y", "y"),
    ]
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
