use blox_schema::Literal;
use regex::Regex;
use std::sync::OnceLock;

const RESERVED: &[&str] = &[
    "break", "case", "class", "const", "continue", "default", "delete", "do", "else", "false", "for",
    "function", "if", "in", "let", "new", "null", "return", "switch", "this", "true", "typeof", "var",
    "void", "while",
];

/// Integral values print without a fractional part; `-0` prints as `0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    format!("{value}")
}

pub fn format_literal(literal: &Literal) -> String {
    match literal {
        Literal::Boolean(value) => value.to_string(),
        Literal::Number(value) => format_number(*value),
        Literal::Text(value) => serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string()),
    }
}

fn invalid_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_$]+").expect("valid regex"))
}

/// Maps a user-supplied variable name onto a safe identifier.
pub fn sanitize_identifier(name: &str) -> String {
    let mut identifier = invalid_chars().replace_all(name.trim(), "_").into_owned();
    if identifier.is_empty() {
        return "_".to_string();
    }
    if identifier.starts_with(|ch: char| ch.is_ascii_digit()) || RESERVED.contains(&identifier.as_str()) {
        identifier.insert(0, '_');
    }
    identifier
}

#[cfg(test)]
#[path = "literal_test.rs"]
mod tests;
