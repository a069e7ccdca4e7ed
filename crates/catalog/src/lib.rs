// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Script Engine - Catalog
//!
//! The catalog answers "which table does this name refer to" for the
//! analyzer and lists databases, schemas, tables and columns for completion.
//!
//! ## Entries
//!
//! - **Descriptor pools** hold tables fed from [`SchemaDescriptor`]s, for
//!   example the schema of a connected database.
//! - **Scripts** hold the tables declared by an analyzed script.
//!
//! Both kinds share one id space and carry a rank. Lookups prefer lower
//! ranks, so a script can shadow a pool by loading with a lower rank.
//!
//! ## Usage
//!
//! ```rust
//! use sqlscript_catalog::{Catalog, ColumnDescriptor, QualifiedTableName, SchemaDescriptor, TableDescriptor};
//!
//! let mut catalog = Catalog::with_defaults("db", "public");
//! catalog.add_descriptor_pool(1, 10).unwrap();
//! catalog
//!     .add_schema_descriptor(
//!         1,
//!         &SchemaDescriptor::new("db", "public").with_tables(vec![
//!             TableDescriptor::new("nation").with_columns(vec![ColumnDescriptor::new("n_name")]),
//!         ]),
//!     )
//!     .unwrap();
//!
//! let matches = catalog.resolve_table(&QualifiedTableName::new("nation"), None);
//! assert_eq!(matches.best().unwrap().table.declaration.columns.len(), 1);
//! ```

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod snapshot;
pub mod table;

pub use catalog::{
    Catalog, CatalogEntry, CatalogEntryDescription, CatalogEntryKind, CatalogEntryStatistics,
    CatalogStatistics, CatalogTable, Rank, SchemaName, TableMatch, TableMatches,
};
pub use descriptor::{ColumnDescriptor, SchemaDescriptor, TableDescriptor};
pub use error::{CatalogError, CatalogResult};
pub use snapshot::{CatalogSnapshot, CatalogSnapshotReader, FlatCatalogEntry};
pub use table::{ColumnDeclaration, QualifiedTableName, TableDeclaration, names_match};
