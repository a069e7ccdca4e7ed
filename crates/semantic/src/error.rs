// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error types for semantic analysis
//!
//! Unresolved names are diagnostics, not errors. These errors cover misuse
//! of analysis results, such as dangling ids.

use sqlscript_ir::CatalogEntryId;
use thiserror::Error;

/// Result type alias for semantic operations
pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors that can occur when reading or registering analysis results
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    /// Expression id outside the expression array
    #[error("Invalid expression id: {0}")]
    InvalidExpressionId(u32),

    /// Table reference id outside the table reference array
    #[error("Invalid table reference id: {0}")]
    InvalidTableReferenceId(u32),

    /// The entry id is reserved and cannot name a script
    #[error("Catalog entry id {0} is reserved")]
    ReservedEntryId(CatalogEntryId),
}
