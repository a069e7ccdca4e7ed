// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Expression vocabulary
//!
//! Operators and literal kinds shared by the parser (which stores operators
//! as `EnumSqlExpressionOperator` nodes) and the analyzer (which classifies
//! expressions into filters, constants and computations).

use serde::{Deserialize, Serialize};

/// Literal kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Hex,
    Binary,
}

/// Expression operators
///
/// Binary, unary and postfix operators live in one enumeration so that a
/// single tree node tag can carry any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionOperator {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,
    Not,

    // Unary arithmetic
    Neg,

    // Pattern matching
    Like,
    NotLike,
    ILike,
    NotILike,

    // Other predicates
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl ExpressionOperator {
    const ALL: [ExpressionOperator; 26] = [
        ExpressionOperator::Add,
        ExpressionOperator::Sub,
        ExpressionOperator::Mul,
        ExpressionOperator::Div,
        ExpressionOperator::Mod,
        ExpressionOperator::Concat,
        ExpressionOperator::Eq,
        ExpressionOperator::NotEq,
        ExpressionOperator::Lt,
        ExpressionOperator::LtEq,
        ExpressionOperator::Gt,
        ExpressionOperator::GtEq,
        ExpressionOperator::And,
        ExpressionOperator::Or,
        ExpressionOperator::Not,
        ExpressionOperator::Neg,
        ExpressionOperator::Like,
        ExpressionOperator::NotLike,
        ExpressionOperator::ILike,
        ExpressionOperator::NotILike,
        ExpressionOperator::In,
        ExpressionOperator::NotIn,
        ExpressionOperator::Between,
        ExpressionOperator::NotBetween,
        ExpressionOperator::IsNull,
        ExpressionOperator::IsNotNull,
    ];

    /// Decode an operator stored in a tree node
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// `=`, `<>`, `<`, `<=`, `>`, `>=`
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            ExpressionOperator::Eq
                | ExpressionOperator::NotEq
                | ExpressionOperator::Lt
                | ExpressionOperator::LtEq
                | ExpressionOperator::Gt
                | ExpressionOperator::GtEq
        )
    }

    /// `AND`, `OR`, `NOT`
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            ExpressionOperator::And | ExpressionOperator::Or | ExpressionOperator::Not
        )
    }

    /// Operators that restrict a column to a set of values
    pub fn is_restriction(&self) -> bool {
        self.is_comparison()
            || matches!(
                self,
                ExpressionOperator::Like
                    | ExpressionOperator::NotLike
                    | ExpressionOperator::ILike
                    | ExpressionOperator::NotILike
                    | ExpressionOperator::In
                    | ExpressionOperator::NotIn
                    | ExpressionOperator::Between
                    | ExpressionOperator::NotBetween
                    | ExpressionOperator::IsNull
                    | ExpressionOperator::IsNotNull
            )
    }

    /// Operator with its operands swapped, e.g. `3 > a` is `a < 3`
    pub fn mirrored(&self) -> Self {
        match self {
            ExpressionOperator::Lt => ExpressionOperator::Gt,
            ExpressionOperator::LtEq => ExpressionOperator::GtEq,
            ExpressionOperator::Gt => ExpressionOperator::Lt,
            ExpressionOperator::GtEq => ExpressionOperator::LtEq,
            other => *other,
        }
    }

    /// SQL spelling
    pub fn symbol(&self) -> &'static str {
        match self {
            ExpressionOperator::Add => "+",
            ExpressionOperator::Sub => "-",
            ExpressionOperator::Mul => "*",
            ExpressionOperator::Div => "/",
            ExpressionOperator::Mod => "%",
            ExpressionOperator::Concat => "||",
            ExpressionOperator::Eq => "=",
            ExpressionOperator::NotEq => "<>",
            ExpressionOperator::Lt => "<",
            ExpressionOperator::LtEq => "<=",
            ExpressionOperator::Gt => ">",
            ExpressionOperator::GtEq => ">=",
            ExpressionOperator::And => "AND",
            ExpressionOperator::Or => "OR",
            ExpressionOperator::Not => "NOT",
            ExpressionOperator::Neg => "-",
            ExpressionOperator::Like => "LIKE",
            ExpressionOperator::NotLike => "NOT LIKE",
            ExpressionOperator::ILike => "ILIKE",
            ExpressionOperator::NotILike => "NOT ILIKE",
            ExpressionOperator::In => "IN",
            ExpressionOperator::NotIn => "NOT IN",
            ExpressionOperator::Between => "BETWEEN",
            ExpressionOperator::NotBetween => "NOT BETWEEN",
            ExpressionOperator::IsNull => "IS NULL",
            ExpressionOperator::IsNotNull => "IS NOT NULL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trip() {
        for op in ExpressionOperator::ALL {
            assert_eq!(ExpressionOperator::from_u32(op as u32), Some(op));
        }
        assert_eq!(ExpressionOperator::from_u32(1000), None);
    }

    #[test]
    fn test_classification() {
        assert!(ExpressionOperator::Lt.is_comparison());
        assert!(ExpressionOperator::Lt.is_restriction());
        assert!(ExpressionOperator::Between.is_restriction());
        assert!(!ExpressionOperator::Add.is_restriction());
        assert!(ExpressionOperator::And.is_logical());
    }

    #[test]
    fn test_mirrored() {
        assert_eq!(ExpressionOperator::Gt.mirrored(), ExpressionOperator::Lt);
        assert_eq!(ExpressionOperator::Eq.mirrored(), ExpressionOperator::Eq);
    }
}
