// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Script Engine - Shared Vocabulary
//!
//! This crate holds the flat types every stage of the engine agrees on:
//! - integer identifiers and the packed [`ExternalObjectId`]
//! - source [`Location`]s
//! - token, node and attribute tags of the flat syntax tree
//! - [`NameTags`] describing the roles a name plays
//! - expression operators and literal kinds
//! - [`Diagnostic`]s, the data representation of bad SQL

pub mod diagnostic;
pub mod expr;
pub mod ids;
pub mod location;
pub mod metadata;
pub mod names;
pub mod syntax;

// Re-export commonly used types
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use expr::{ExpressionOperator, LiteralKind};
pub use ids::{
    CatalogEntryId, ExpressionId, ExternalObjectId, NULL_OBJECT_ID, NameId, NodeId,
    RESERVED_CONTEXT_ID, StatementId, SymbolId, TableReferenceId,
};
pub use location::Location;
pub use metadata::{DataType, FunctionMetadata, FunctionParameter, FunctionType};
pub use names::NameTags;
pub use syntax::{AttributeKey, CombineOperation, JoinType, NodeType, ObjectKind, OrderDirection, TokenType};
