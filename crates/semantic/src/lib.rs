// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # SQL Script Semantic Layer
//!
//! Turns a parsed script into an [`AnalyzedScript`]: resolved tables and
//! columns, classified expressions, column filters, function references and
//! statement liveness.
//!
//! ## Overview
//!
//! - **Analyzer**: resolves names against CTEs, earlier declarations of the
//!   same script and the catalog
//! - **Scopes**: tables visible from nested queries
//! - **Registry**: indexes the resolved columns of many scripts
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlscript_catalog::Catalog;
//! use sqlscript_function_registry::FunctionRegistry;
//! use sqlscript_grammar::{parse, scan};
//! use sqlscript_semantic::Analyzer;
//!
//! let parsed = Arc::new(parse(Arc::new(scan("select 1", 0))));
//! let analyzed = Analyzer::analyze(parsed, &Catalog::new(), 1, &FunctionRegistry::new());
//! assert_eq!(analyzed.constant_expressions.len(), 1);
//! ```

pub mod analyzed;
pub mod analyzer;
pub mod error;
pub mod registry;
pub mod resolution;
pub mod scope;

pub use analyzed::{
    AnalyzedScript, ColumnComputation, ColumnFilter, ColumnRefExpression, Expression,
    ExpressionKind, FunctionReference, ResolvedColumn, ResolvedTable, StatementInfo,
    TableReference, TableSource,
};
pub use analyzer::Analyzer;
pub use error::{SemanticError, SemanticResult};
pub use registry::{ColumnInfo, ColumnSnippet, ScriptRegistry, SnippetTemplate};
pub use resolution::{ColumnResolution, ColumnResolver};
pub use scope::{Scope, ScopeManager, ScopeType};
