use blox_schema::{BinaryOperator, Literal};

/// Binding strength of a generated expression, loosest first. Ranks leave gaps
/// for the levels the block palette never produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Lowest = 0,
    Conditional = 2,
    LogicalOr = 3,
    LogicalAnd = 4,
    Equality = 8,
    Relational = 9,
    Additive = 11,
    Multiplicative = 12,
    Unary = 14,
    Postfix = 17,
    Atomic = 18,
}

impl Precedence {
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Requirement for an operand that must bind strictly tighter than `self`.
    pub fn above(self) -> u8 {
        self.rank() + 1
    }

    pub fn of_binary(operator: BinaryOperator) -> Self {
        match operator {
            BinaryOperator::Or => Self::LogicalOr,
            BinaryOperator::And => Self::LogicalAnd,
            BinaryOperator::Equal | BinaryOperator::NotEqual => Self::Equality,
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => Self::Relational,
            BinaryOperator::Add | BinaryOperator::Subtract => Self::Additive,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => Self::Multiplicative,
        }
    }

    pub fn of_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Number(value) if value.is_sign_negative() && *value != 0.0 => Self::Unary,
            _ => Self::Atomic,
        }
    }
}

/// Generated expression text together with how tightly it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub code: String,
    pub precedence: Precedence,
}

impl Fragment {
    pub fn new(code: impl Into<String>, precedence: Precedence) -> Self {
        Self {
            code: code.into(),
            precedence,
        }
    }

    /// Text for a position requiring at least `min_rank`; looser fragments get parentheses.
    pub fn at_least(self, min_rank: u8) -> String {
        if self.precedence.rank() < min_rank {
            format!("({})", self.code)
        } else {
            self.code
        }
    }
}

#[cfg(test)]
#[path = "precedence_test.rs"]
mod tests;
