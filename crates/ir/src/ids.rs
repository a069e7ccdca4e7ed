// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Identifiers
//!
//! Every cross reference in the engine is an integer. Indices into flat
//! arrays (`NodeId`, `ExpressionId`, ...) are only meaningful within the
//! buffer that produced them. Objects that outlive a single buffer, such as
//! catalog tables, are addressed with an [`ExternalObjectId`] that packs the
//! owning catalog entry and the object index into one `u64`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a catalog entry (a script or a descriptor pool)
///
/// Scripts and descriptor pools share one id space.
pub type CatalogEntryId = u32;

/// Index of a token in a scanned script
pub type SymbolId = u32;

/// Index of a node in a parsed script
pub type NodeId = u32;

/// Index of a statement in a parsed script
pub type StatementId = u32;

/// Index of an interned name in a scanned script
pub type NameId = u32;

/// Index of an expression in an analyzed script
pub type ExpressionId = u32;

/// Index of a table reference in an analyzed script
pub type TableReferenceId = u32;

/// Object index marking "no object"
pub const NULL_OBJECT_ID: u32 = 0xFFFF_FFFF;

/// Context id reserved by the engine, never handed out to callers
pub const RESERVED_CONTEXT_ID: u32 = 0xFFFF_FFFF;

/// A `(context, object)` pair packed into a `u64`
///
/// The context is the catalog entry that owns the object, the object is an
/// index local to that entry. For example, the second table declared by
/// script `7` is `ExternalObjectId::new(7, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalObjectId(u64);

impl ExternalObjectId {
    /// Create an id from its context and object halves
    pub const fn new(context: u32, object: u32) -> Self {
        Self(((context as u64) << 32) | object as u64)
    }

    /// The null id
    pub const fn null() -> Self {
        Self::new(RESERVED_CONTEXT_ID, NULL_OBJECT_ID)
    }

    /// Rebuild an id from its packed representation
    pub const fn from_packed(packed: u64) -> Self {
        Self(packed)
    }

    /// Packed representation
    pub const fn packed(self) -> u64 {
        self.0
    }

    /// Owning catalog entry
    pub const fn context(self) -> CatalogEntryId {
        (self.0 >> 32) as u32
    }

    /// Object index within the owning entry
    pub const fn object(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    /// Whether the object half is the null object
    pub const fn is_null(self) -> bool {
        self.object() == NULL_OBJECT_ID
    }
}

impl Default for ExternalObjectId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for ExternalObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}.{}", self.context(), self.object())
        }
    }
}
