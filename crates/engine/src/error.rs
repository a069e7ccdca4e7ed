// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Engine errors
//!
//! Only misuse of the API is an error. Broken SQL is reported through the
//! diagnostics of the scanned, parsed and analyzed buffers.

use crate::config::ConfigError;
use crate::memory::MemoryKind;
use sqlscript_catalog::CatalogError;
use sqlscript_grammar::TextError;
use sqlscript_ir::CatalogEntryId;
use thiserror::Error;

/// Result type alias for engine calls
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by engine calls
#[derive(Debug, Error)]
pub enum EngineError {
    /// The handle was destroyed, dropped or swept
    #[error("Use after free: {kind} handle is no longer alive")]
    UseAfterFree { kind: MemoryKind },

    /// An external catalog entry id is claimed twice
    #[error("Identifier collision: catalog entry id {entry_id} is already in use")]
    IdentifierCollision { entry_id: CatalogEntryId },

    /// Malformed call arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A buffer could not be serialized
    #[error("Failed to encode buffer: {0}")]
    Encode(#[from] serde_json::Error),
}

impl EngineError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        EngineError::InvalidArgument(message.into())
    }

    /// Whether this error reports use of a released handle
    pub fn is_use_after_free(&self) -> bool {
        matches!(self, EngineError::UseAfterFree { .. })
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::IdentifierCollision { entry_id } => {
                EngineError::IdentifierCollision { entry_id }
            }
            CatalogError::InvalidDescriptor(message) => EngineError::InvalidArgument(message),
            reserved @ (CatalogError::ReservedEntryId(_) | CatalogError::ReservedTableId { .. }) => {
                EngineError::InvalidArgument(reserved.to_string())
            }
            other => EngineError::Catalog(other),
        }
    }
}

impl From<TextError> for EngineError {
    fn from(err: TextError) -> Self {
        EngineError::InvalidArgument(err.to_string())
    }
}
