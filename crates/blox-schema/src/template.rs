use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a template argument comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// The bound value block, literal, or socket default.
    Socket(String),
    /// The block's own field value rendered as a literal.
    Field(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equal => "===",
            Self::NotEqual => "!==",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixOperator {
    Negate,
    Not,
}

impl PrefixOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOperator {
    Set,
    Add,
}

impl AssignOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Set => "=",
            Self::Add => "+=",
        }
    }
}

/// Declarative code shape of a block kind. Value templates render to an
/// expression with a precedence; statement templates render to lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CodeTemplate {
    /// Entry-point body: the chain held in `slot`.
    Body { slot: String },
    /// `function(args...)`, usable as a value or as a statement.
    Call {
        function: String,
        #[serde(default)]
        args: Vec<Operand>,
    },
    Binary {
        operator: BinaryOperator,
        left: Operand,
        right: Operand,
    },
    Prefix {
        operator: PrefixOperator,
        operand: Operand,
    },
    Conditional {
        condition: Operand,
        then: Operand,
        otherwise: Operand,
    },
    Member { object: Operand, property: String },
    /// Fixed expression text such as `mouseX`.
    Atom { code: String },
    /// Renders the named field as a literal.
    Literal { field: String },
    /// Reads the variable named by a text field.
    Variable { field: String },
    Assign {
        field: String,
        operator: AssignOperator,
        value: Operand,
    },
    If {
        condition: Operand,
        then_slot: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_slot: Option<String>,
    },
    Repeat { count: Operand, body: String },
    While { condition: Operand, body: String },
    /// Picks a nested template by the value of a dropdown field.
    Switch {
        field: String,
        cases: BTreeMap<String, CodeTemplate>,
    },
}

impl CodeTemplate {
    pub fn call(function: &str, sockets: &[&str]) -> Self {
        Self::Call {
            function: function.to_string(),
            args: sockets.iter().map(|name| Operand::Socket(name.to_string())).collect(),
        }
    }

    pub fn binary(operator: BinaryOperator, left: &str, right: &str) -> Self {
        Self::Binary {
            operator,
            left: Operand::Socket(left.to_string()),
            right: Operand::Socket(right.to_string()),
        }
    }

    pub fn atom(code: &str) -> Self {
        Self::Atom {
            code: code.to_string(),
        }
    }

    /// Whether this template can render as a value expression.
    pub fn renders_value(&self) -> bool {
        match self {
            Self::Call { .. }
            | Self::Binary { .. }
            | Self::Prefix { .. }
            | Self::Conditional { .. }
            | Self::Member { .. }
            | Self::Atom { .. }
            | Self::Literal { .. }
            | Self::Variable { .. } => true,
            Self::Switch { cases, .. } => cases.values().all(Self::renders_value),
            _ => false,
        }
    }

    /// Whether this template can render as a chained statement.
    pub fn renders_statement(&self) -> bool {
        match self {
            Self::Call { .. } | Self::Assign { .. } | Self::If { .. } | Self::Repeat { .. } | Self::While { .. } => {
                true
            }
            Self::Switch { cases, .. } => cases.values().all(Self::renders_statement),
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
