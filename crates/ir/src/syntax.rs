// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Syntax tags
//!
//! Tags shared by the scanner, the parser and every consumer of the flat
//! syntax tree. Enumerations stored inside tree nodes are encoded as `u32`
//! and decoded with `from_u32`.

use serde::{Deserialize, Serialize};

/// Token classification produced by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    Keyword,
    Identifier,
    /// `"Quoted"` identifier, case preserved
    QuotedIdentifier,
    Operator,
    /// `(`, `)`, `,`, `;`
    Punctuation,
    LiteralInteger,
    LiteralFloat,
    /// `x'1F'` or `0x1F`
    LiteralHex,
    /// `b'0101'`
    LiteralBinary,
    LiteralBoolean,
    LiteralString,
    /// `-- line` or `/* block */`
    Comment,
    /// `.` followed by more of the same name path
    Dot,
    /// `.` with nothing following, e.g. `select foo.`
    DotTrailing,
}

impl TokenType {
    /// Whether tokens of this type carry a name
    pub fn is_name(&self) -> bool {
        matches!(self, TokenType::Identifier | TokenType::QuotedIdentifier)
    }

    /// Whether tokens of this type are literals
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenType::LiteralInteger
                | TokenType::LiteralFloat
                | TokenType::LiteralHex
                | TokenType::LiteralBinary
                | TokenType::LiteralBoolean
                | TokenType::LiteralString
        )
    }
}

/// Node classification in the flat syntax tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    None,
    Bool,
    Ui32,
    /// Identifier; the node value is the name id
    Name,
    /// Uninterpreted text such as a type name
    StringRef,
    /// Ordered list of children
    Array,

    LiteralNull,
    LiteralInteger,
    LiteralFloat,
    LiteralString,
    LiteralHex,
    LiteralBinary,
    LiteralBoolean,

    EnumSqlExpressionOperator,
    EnumSqlJoinType,
    EnumSqlOrderDirection,
    EnumSqlCombineOperation,
    EnumSqlObjectKind,

    ObjectSqlSelect,
    ObjectSqlResultTarget,
    ObjectSqlTableref,
    ObjectSqlJoinedTable,
    ObjectSqlColumnRef,
    ObjectSqlNaryExpression,
    ObjectSqlFunctionExpression,
    ObjectSqlCase,
    ObjectSqlCaseClause,
    ObjectSqlTypecast,
    ObjectSqlSubqueryExpression,
    ObjectSqlCte,
    ObjectSqlOrder,
    ObjectSqlCreateTable,
    ObjectSqlColumnDef,
    ObjectSqlColumnConstraint,
    ObjectSqlTableConstraint,
    ObjectSqlCreateView,
    ObjectSqlInsert,
    ObjectSqlDelete,
    ObjectSqlDrop,
}

impl NodeType {
    /// Whether the node is an object with attribute children
    pub fn is_object(&self) -> bool {
        (*self as u32) >= (NodeType::ObjectSqlSelect as u32)
    }

    /// Whether the node is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeType::LiteralNull
                | NodeType::LiteralInteger
                | NodeType::LiteralFloat
                | NodeType::LiteralString
                | NodeType::LiteralHex
                | NodeType::LiteralBinary
                | NodeType::LiteralBoolean
        )
    }
}

/// Role of a node inside its parent object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeKey {
    None,

    SqlSelectWithCtes,
    SqlSelectDistinct,
    SqlSelectTargets,
    SqlSelectFrom,
    SqlSelectWhere,
    SqlSelectGroups,
    SqlSelectHaving,
    SqlSelectOrder,
    SqlSelectLimit,
    SqlSelectOffset,
    SqlSelectCombineOperation,
    SqlSelectCombineInput,

    SqlResultTargetValue,
    SqlResultTargetName,
    SqlResultTargetStar,

    SqlTablerefName,
    SqlTablerefAlias,
    SqlTablerefTable,

    SqlJoinedTableType,
    SqlJoinedTableInput,
    SqlJoinedTableQualifier,
    SqlJoinedTableUsing,

    SqlColumnRefPath,
    SqlColumnRefTrailingDot,
    SqlColumnRefStar,

    SqlExpressionOperator,
    SqlExpressionArgs,

    SqlFunctionName,
    SqlFunctionArguments,
    SqlFunctionDistinct,
    SqlFunctionStar,

    SqlCaseArgument,
    SqlCaseClauses,
    SqlCaseClauseWhen,
    SqlCaseClauseThen,
    SqlCaseDefault,

    SqlTypecastValue,
    SqlTypecastType,

    SqlSubqueryStatement,
    SqlSubqueryExists,

    SqlCteName,
    SqlCteColumns,
    SqlCteStatement,

    SqlOrderValue,
    SqlOrderDirection,

    SqlCreateTableName,
    SqlCreateTableTemp,
    SqlCreateTableIfNotExists,
    SqlCreateTableElements,
    SqlCreateTableAs,

    SqlColumnDefName,
    SqlColumnDefType,
    SqlColumnDefConstraints,
    SqlTableConstraintColumns,

    SqlViewName,
    SqlViewColumns,
    SqlViewStatement,
    SqlViewOrReplace,

    SqlInsertTarget,
    SqlInsertColumns,
    SqlInsertValues,
    SqlInsertStatement,

    SqlDeleteTarget,
    SqlDeleteWhere,

    SqlDropObjectKind,
    SqlDropTargets,
    SqlDropIfExists,
}

/// Join flavour stored in `SqlJoinedTableType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Natural,
}

impl JoinType {
    const ALL: [JoinType; 6] = [
        JoinType::Inner,
        JoinType::Left,
        JoinType::Right,
        JoinType::Full,
        JoinType::Cross,
        JoinType::Natural,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// Sort direction stored in `SqlOrderDirection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(OrderDirection::Ascending),
            1 => Some(OrderDirection::Descending),
            _ => None,
        }
    }
}

/// Set operation stored in `SqlSelectCombineOperation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombineOperation {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl CombineOperation {
    const ALL: [CombineOperation; 4] = [
        CombineOperation::Union,
        CombineOperation::UnionAll,
        CombineOperation::Intersect,
        CombineOperation::Except,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// Object kind stored in `SqlDropObjectKind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ObjectKind::Table),
            1 => Some(ObjectKind::View),
            _ => None,
        }
    }
}
