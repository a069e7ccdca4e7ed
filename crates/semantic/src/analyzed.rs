// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Analyzed scripts
//!
//! The analyzer output is a bundle of flat arrays that reference each other
//! by index. Column filters point into `expressions`, column references
//! point into `table_references`, and every resolved reference records the
//! catalog version it was resolved against.

use crate::error::{SemanticError, SemanticResult};
use serde::Serialize;
use sqlscript_catalog::{QualifiedTableName, TableDeclaration};
use sqlscript_grammar::{ParsedScript, StatementType};
use sqlscript_ir::{
    CatalogEntryId, Diagnostic, ExpressionId, ExpressionOperator, ExternalObjectId,
    FunctionMetadata, LiteralKind, Location, NameTags, NodeId, StatementId, TableReferenceId,
};
use std::sync::Arc;

/// A table resolved against the catalog or the script's own declarations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTable {
    pub catalog_entry_id: CatalogEntryId,
    pub catalog_database_id: u32,
    pub catalog_schema_id: u32,
    pub catalog_table_id: ExternalObjectId,
    pub referenced_catalog_version: u32,
    /// Fully qualified name of the resolved table
    pub table_name: QualifiedTableName,
}

/// What a table reference points to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableSource {
    Unresolved,
    /// Catalog table or a table declared earlier in the script
    Table(ResolvedTable),
    /// Common table expression of the statement
    Cte { name: String },
    /// Subquery in FROM
    Derived,
}

/// A table in a FROM clause, DML target or DROP target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReference {
    pub table_reference_id: TableReferenceId,
    pub statement_id: StatementId,
    pub node_id: NodeId,
    pub location: Location,
    /// Name as written, `None` for derived tables
    pub table_name: Option<QualifiedTableName>,
    pub alias: Option<String>,
    pub source: TableSource,
    /// Visible column names, column ids are indices
    pub column_names: Vec<String>,
}

impl TableReference {
    pub fn resolved_table(&self) -> Option<&ResolvedTable> {
        match &self.source {
            TableSource::Table(resolved) => Some(resolved),
            _ => None,
        }
    }

    /// Name used to qualify columns of this reference
    pub fn visible_name(&self) -> Option<&str> {
        self.alias
            .as_deref()
            .or_else(|| self.table_name.as_ref().map(|n| n.table.as_str()))
    }
}

/// A column resolved to a table reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub table_reference_id: TableReferenceId,
    /// Null for columns of CTEs and derived tables
    pub catalog_table_id: ExternalObjectId,
    pub column_id: u32,
    pub referenced_catalog_version: u32,
}

/// A column reference inside an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRefExpression {
    /// Qualifiers as written, e.g. `["t"]` for `t.a`
    pub qualifier: Vec<String>,
    pub column_name: String,
    pub resolved: Option<ResolvedColumn>,
    /// Index of the result column named by an ORDER BY, GROUP BY or HAVING
    /// reference that no table column answers
    pub result_target: Option<u32>,
}

impl ColumnRefExpression {
    /// Resolved to a table column or to a result column
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some() || self.result_target.is_some()
    }
}

/// Expression subtypes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionKind {
    ColumnRef(ColumnRefExpression),
    Literal {
        literal: LiteralKind,
    },
    /// Comparisons and pattern matches with two operands
    Comparison {
        operator: ExpressionOperator,
        left: ExpressionId,
        right: ExpressionId,
    },
    /// Arithmetic and logical operators, `AND`/`OR` chains are n-ary
    Binary {
        operator: ExpressionOperator,
        args: Vec<ExpressionId>,
    },
    Unary {
        operator: ExpressionOperator,
        operand: ExpressionId,
    },
    FunctionCall {
        function_reference_id: u32,
        args: Vec<ExpressionId>,
    },
    Between {
        operator: ExpressionOperator,
        value: ExpressionId,
        low: ExpressionId,
        high: ExpressionId,
    },
    InList {
        operator: ExpressionOperator,
        value: ExpressionId,
        list: Vec<ExpressionId>,
    },
    IsNull {
        operator: ExpressionOperator,
        operand: ExpressionId,
    },
    /// `CASE`, casts, subqueries and other expressions
    Other {
        children: Vec<ExpressionId>,
    },
}

/// An expression of the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expression {
    pub expression_id: ExpressionId,
    pub statement_id: StatementId,
    pub node_id: NodeId,
    pub location: Location,
    pub kind: ExpressionKind,
    /// Whether the value is known without reading any table
    pub is_constant: bool,
}

impl Expression {
    /// Direct child expressions
    pub fn children(&self) -> Vec<ExpressionId> {
        match &self.kind {
            ExpressionKind::ColumnRef(_) | ExpressionKind::Literal { .. } => Vec::new(),
            ExpressionKind::Comparison { left, right, .. } => vec![*left, *right],
            ExpressionKind::Binary { args, .. } | ExpressionKind::FunctionCall { args, .. } => {
                args.clone()
            }
            ExpressionKind::Unary { operand, .. } | ExpressionKind::IsNull { operand, .. } => {
                vec![*operand]
            }
            ExpressionKind::Between {
                value, low, high, ..
            } => vec![*value, *low, *high],
            ExpressionKind::InList { value, list, .. } => {
                let mut children = vec![*value];
                children.extend(list);
                children
            }
            ExpressionKind::Other { children } => children.clone(),
        }
    }

    pub fn column_ref(&self) -> Option<&ColumnRefExpression> {
        match &self.kind {
            ExpressionKind::ColumnRef(column) => Some(column),
            _ => None,
        }
    }
}

/// Column reference expressions in the subtree under `root`, in id order
pub(crate) fn column_refs_under(expressions: &[Expression], root: ExpressionId) -> Vec<ExpressionId> {
    let mut found = Vec::new();
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        let Some(expression) = expressions.get(id as usize) else {
            continue;
        };
        if expression.column_ref().is_some() {
            found.push(id);
        }
        pending.extend(expression.children());
    }
    found.sort_unstable();
    found
}

/// `column <op> constant` reachable from a WHERE, HAVING or ON clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnFilter {
    pub root_expression_id: ExpressionId,
    pub column_reference_expression_id: ExpressionId,
}

/// A computed result column reading a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnComputation {
    pub root_expression_id: ExpressionId,
    pub column_reference_expression_id: ExpressionId,
}

/// A function call target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionReference {
    pub function_reference_id: u32,
    pub statement_id: StatementId,
    pub node_id: NodeId,
    pub location: Location,
    pub schema: Option<String>,
    pub function_name: String,
    pub resolved: Option<FunctionMetadata>,
}

/// Per-statement analysis summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementInfo {
    pub statement_id: StatementId,
    pub statement_type: StatementType,
    /// Index into `table_declarations` for `CREATE` statements
    pub declared_table: Option<u32>,
    /// Later statements that read the declared table
    pub consumed_by: Vec<StatementId>,
    /// Whether the statement has an effect or its output is used
    pub is_live: bool,
}

/// Output of the analyzer
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedScript {
    #[serde(skip)]
    pub parsed: Arc<ParsedScript>,
    pub catalog_entry_id: CatalogEntryId,
    /// Catalog version the script was analyzed against
    pub catalog_version: u32,
    pub table_declarations: Vec<TableDeclaration>,
    pub table_references: Vec<TableReference>,
    pub expressions: Vec<Expression>,
    pub column_filters: Vec<ColumnFilter>,
    pub column_computations: Vec<ColumnComputation>,
    /// Roots of maximal constant subtrees
    pub constant_expressions: Vec<ExpressionId>,
    pub function_references: Vec<FunctionReference>,
    pub statements: Vec<StatementInfo>,
    /// Tags per scanned name id
    pub name_tags: Vec<NameTags>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalyzedScript {
    pub fn expression(&self, id: ExpressionId) -> SemanticResult<&Expression> {
        self.expressions
            .get(id as usize)
            .ok_or(SemanticError::InvalidExpressionId(id))
    }

    pub fn table_reference(&self, id: TableReferenceId) -> SemanticResult<&TableReference> {
        self.table_references
            .get(id as usize)
            .ok_or(SemanticError::InvalidTableReferenceId(id))
    }

    /// Table references of one statement
    pub fn table_references_of(
        &self,
        statement_id: StatementId,
    ) -> impl Iterator<Item = &TableReference> {
        self.table_references
            .iter()
            .filter(move |t| t.statement_id == statement_id)
    }

    /// Column reference expressions in the subtree under `root`
    pub fn column_refs_under(&self, root: ExpressionId) -> Vec<ExpressionId> {
        column_refs_under(&self.expressions, root)
    }

    /// Source text of an expression
    pub fn expression_text(&self, id: ExpressionId) -> &str {
        self.expressions
            .get(id as usize)
            .map(|e| self.parsed.scanned.text_at(e.location))
            .unwrap_or_default()
    }
}
