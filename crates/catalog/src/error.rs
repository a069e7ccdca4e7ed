// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for Catalog operations
//!
//! A failed catalog call never leaves partial state behind.

use serde::Serialize;
use sqlscript_ir::CatalogEntryId;
use thiserror::Error;

/// Result type alias for Catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur during Catalog operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum CatalogError {
    /// The entry id is already claimed by another pool or script
    #[error("Catalog entry id {entry_id} is already in use")]
    IdentifierCollision { entry_id: CatalogEntryId },

    /// Two tables of one descriptor pool carry the same table id
    #[error("Table id {table_id} is already in use in descriptor pool {pool_id}")]
    TableIdCollision { pool_id: CatalogEntryId, table_id: u32 },

    /// The entry id is reserved for objects outside any entry
    #[error("Catalog entry id {0} is reserved")]
    ReservedEntryId(CatalogEntryId),

    /// The table id would name the null object
    #[error("Table id {table_id} in descriptor pool {pool_id} is reserved")]
    ReservedTableId { pool_id: CatalogEntryId, table_id: u32 },

    /// No descriptor pool with this id
    #[error("Unknown descriptor pool: {0}")]
    UnknownDescriptorPool(CatalogEntryId),

    /// The entry exists but is not a script
    #[error("Catalog entry {0} is not a script")]
    NotAScript(CatalogEntryId),

    /// Failed to deserialize schema descriptors
    #[error("Invalid schema descriptor: {0}")]
    InvalidDescriptor(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::InvalidDescriptor(err.to_string())
    }
}
