use serde::{Deserialize, Serialize};
use std::fmt;

use crate::template::CodeTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Number,
    Boolean,
    String,
    Color,
    Vector,
    Any,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Color => "color",
            Self::Vector => "vector",
            Self::Any => "any",
        }
    }

    /// Whether a value block producing `output` may plug into a socket of this type.
    pub fn accepts(self, output: ValueType) -> bool {
        self == Self::Any || output == Self::Any || self == output
    }

    /// Whether an inline literal may sit in a socket of this type.
    /// Colors take CSS strings or grey levels; vectors have no literal form.
    pub fn accepts_literal(self, literal: &Literal) -> bool {
        match (self, literal) {
            (Self::Any, _) => true,
            (Self::Number, Literal::Number(_)) => true,
            (Self::Boolean, Literal::Boolean(_)) => true,
            (Self::String, Literal::Text(_)) => true,
            (Self::Color, Literal::Text(_) | Literal::Number(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Self::Number(value) => value.is_finite(),
            _ => true,
        }
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// What an unbound socket contributes to generated code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDefault {
    Literal(Literal),
    Code(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub default: SocketDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Number {
        #[serde(default)]
        default: f64,
    },
    Text {
        #[serde(default)]
        default: String,
    },
    Dropdown {
        options: Vec<String>,
        default: String,
    },
}

impl FieldType {
    pub fn default_literal(&self) -> Literal {
        match self {
            Self::Number { default } => Literal::Number(*default),
            Self::Text { default } | Self::Dropdown { default, .. } => Literal::Text(default.clone()),
        }
    }

    /// Checks a stored field value; the error describes what was expected.
    pub fn check(&self, value: &Literal) -> Result<(), String> {
        match (self, value) {
            (Self::Number { .. }, Literal::Number(number)) if number.is_finite() => Ok(()),
            (Self::Number { .. }, _) => Err("a finite number".to_string()),
            (Self::Text { .. }, Literal::Text(_)) => Ok(()),
            (Self::Text { .. }, _) => Err("a string".to_string()),
            (Self::Dropdown { options, .. }, Literal::Text(choice)) if options.contains(choice) => Ok(()),
            (Self::Dropdown { options, .. }, _) => Err(format!("one of [{}]", options.join(", "))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum BlockShape {
    /// Top-level handler; `callback` names the generated function.
    EntryPoint { callback: String },
    /// Chainable statement.
    Statement,
    /// Expression block plugged into a socket.
    Value { output: ValueType },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockKind {
    pub id: String,
    pub category: String,
    #[serde(flatten)]
    pub shape: BlockShape,
    #[serde(default)]
    pub sockets: Vec<SocketSpec>,
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    pub template: CodeTemplate,
}

impl BlockKind {
    pub fn entry_point(id: &str, callback: &str, template: CodeTemplate) -> Self {
        Self::with_shape(
            id,
            "events",
            BlockShape::EntryPoint {
                callback: callback.to_string(),
            },
            template,
        )
    }

    pub fn statement(id: &str, category: &str, template: CodeTemplate) -> Self {
        Self::with_shape(id, category, BlockShape::Statement, template)
    }

    pub fn value(id: &str, category: &str, output: ValueType, template: CodeTemplate) -> Self {
        Self::with_shape(id, category, BlockShape::Value { output }, template)
    }

    fn with_shape(id: &str, category: &str, shape: BlockShape, template: CodeTemplate) -> Self {
        Self {
            id: id.to_string(),
            category: category.to_string(),
            shape,
            sockets: Vec::new(),
            slots: Vec::new(),
            fields: Vec::new(),
            template,
        }
    }

    pub fn with_socket(mut self, name: &str, value_type: ValueType, default: impl Into<Literal>) -> Self {
        self.sockets.push(SocketSpec {
            name: name.to_string(),
            value_type,
            default: SocketDefault::Literal(default.into()),
        });
        self
    }

    pub fn with_code_socket(mut self, name: &str, value_type: ValueType, default_code: &str) -> Self {
        self.sockets.push(SocketSpec {
            name: name.to_string(),
            value_type,
            default: SocketDefault::Code(default_code.to_string()),
        });
        self
    }

    pub fn with_slot(mut self, name: &str) -> Self {
        self.slots.push(name.to_string());
        self
    }

    pub fn with_field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            field_type,
        });
        self
    }

    pub fn is_entry_point(&self) -> bool {
        matches!(self.shape, BlockShape::EntryPoint { .. })
    }

    pub fn is_statement(&self) -> bool {
        matches!(self.shape, BlockShape::Statement)
    }

    pub fn callback(&self) -> Option<&str> {
        match &self.shape {
            BlockShape::EntryPoint { callback } => Some(callback),
            _ => None,
        }
    }

    pub fn output_type(&self) -> Option<ValueType> {
        match self.shape {
            BlockShape::Value { output } => Some(output),
            _ => None,
        }
    }

    pub fn socket(&self, name: &str) -> Option<&SocketSpec> {
        self.sockets.iter().find(|socket| socket.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| slot == name)
    }
}

#[cfg(test)]
#[path = "kind_test.rs"]
mod tests;
