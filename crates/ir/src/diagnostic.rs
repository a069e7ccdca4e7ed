// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Diagnostics
//!
//! Problems with the SQL itself are data, not errors. The scanner, parser
//! and analyzer append [`Diagnostic`]s to the buffer they produce and keep
//! going, so a broken statement never hides results for the rest of a script.

use crate::{Location, NodeId, StatementId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic code identifying the kind of problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// String, quoted identifier or block comment runs into end of input
    UnterminatedLiteral,
    UnterminatedComment,
    /// Byte that does not start any token
    InvalidCharacter,
    UnexpectedToken,
    UnexpectedEndOfInput,
    UnsupportedStatement,
    /// Expression or query nesting beyond the parser limit
    NestingTooDeep,
    UnresolvedTable,
    AmbiguousTable,
    UnresolvedColumn,
    AmbiguousColumn,
    UnresolvedFunction,
    DuplicateTableDeclaration,
    DuplicateTableAlias,
}

impl DiagnosticCode {
    /// Stable string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnterminatedLiteral => "SCAN-001",
            DiagnosticCode::UnterminatedComment => "SCAN-002",
            DiagnosticCode::InvalidCharacter => "SCAN-003",
            DiagnosticCode::UnexpectedToken => "SYNTAX-001",
            DiagnosticCode::UnexpectedEndOfInput => "SYNTAX-002",
            DiagnosticCode::UnsupportedStatement => "SYNTAX-003",
            DiagnosticCode::NestingTooDeep => "SYNTAX-004",
            DiagnosticCode::UnresolvedTable => "SEMANTIC-001",
            DiagnosticCode::AmbiguousTable => "SEMANTIC-002",
            DiagnosticCode::UnresolvedColumn => "SEMANTIC-003",
            DiagnosticCode::AmbiguousColumn => "SEMANTIC-004",
            DiagnosticCode::UnresolvedFunction => "SEMANTIC-005",
            DiagnosticCode::DuplicateTableDeclaration => "SEMANTIC-006",
            DiagnosticCode::DuplicateTableAlias => "SEMANTIC-007",
        }
    }

    /// Default severity for this code
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::UnresolvedFunction | DiagnosticCode::DuplicateTableDeclaration => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A problem attached to a location in the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    /// Statement the problem belongs to, if known
    pub statement_id: Option<StatementId>,
    /// Innermost syntax node, if known
    pub node_id: Option<NodeId>,
}

impl Diagnostic {
    /// Create a diagnostic with the code's default severity
    pub fn new(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            location,
            statement_id: None,
            node_id: None,
        }
    }

    /// Builder method: attach the statement
    pub fn with_statement(mut self, statement_id: StatementId) -> Self {
        self.statement_id = Some(statement_id);
        self
    }

    /// Builder method: attach the syntax node
    pub fn with_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}..{}",
            self.code,
            self.message,
            self.location.offset,
            self.location.end()
        )
    }
}
