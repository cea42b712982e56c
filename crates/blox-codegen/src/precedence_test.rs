use super::{Fragment, Precedence};
use blox_schema::{BinaryOperator, Literal};

#[test]
fn ladder_is_ordered_loosest_first() {
    assert!(Precedence::Conditional < Precedence::LogicalOr);
    assert!(Precedence::LogicalAnd < Precedence::Equality);
    assert!(Precedence::Additive < Precedence::Multiplicative);
    assert!(Precedence::Unary < Precedence::Postfix);
    assert!(Precedence::Postfix < Precedence::Atomic);
}

#[test]
fn looser_fragments_are_parenthesized() {
    let sum = Fragment::new("2 - 3", Precedence::Additive);
    assert_eq!(sum.clone().at_least(Precedence::Additive.rank()), "2 - 3");
    assert_eq!(sum.at_least(Precedence::Additive.above()), "(2 - 3)");
}

#[test]
fn operators_map_onto_ladder() {
    assert_eq!(Precedence::of_binary(BinaryOperator::Modulo), Precedence::Multiplicative);
    assert_eq!(Precedence::of_binary(BinaryOperator::GreaterEqual), Precedence::Relational);
    assert_eq!(Precedence::of_binary(BinaryOperator::NotEqual), Precedence::Equality);
}

#[test]
fn negative_literals_rank_as_unary() {
    assert_eq!(Precedence::of_literal(&Literal::Number(-4.0)), Precedence::Unary);
    assert_eq!(Precedence::of_literal(&Literal::Number(4.0)), Precedence::Atomic);
    assert_eq!(Precedence::of_literal(&Literal::Number(-0.0)), Precedence::Atomic);
}
