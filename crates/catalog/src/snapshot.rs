// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Catalog snapshots
//!
//! A snapshot flattens the catalog into four arrays, one per level
//! (databases, schemas, tables, columns). Each level is sorted by name
//! within its parent, and the children of a node occupy the contiguous range
//! `child_begin..child_begin + child_count` of the next level.
//!
//! When two entries declare the same table in the same schema, the entry
//! that comes first in ranked order wins. Columns keep declaration order.
//! Names are interned into one deduplicated dictionary.

use crate::catalog::{Catalog, CatalogTable};
use serde::Serialize;
use sqlscript_ir::{ExternalObjectId, NULL_OBJECT_ID};
use std::collections::{BTreeMap, HashMap};

/// A node of the flattened catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlatCatalogEntry {
    /// Index within its own level
    pub flat_entry_idx: u32,
    /// Index of the parent in the previous level, null for databases
    pub flat_parent_idx: u32,
    /// Database id, schema id, packed table id or column index
    pub catalog_object_id: u64,
    pub name_id: u32,
    pub child_begin: u32,
    pub child_count: u32,
}

/// Flat, immutable view of a catalog version
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogSnapshot {
    pub catalog_version: u32,
    pub databases: Vec<FlatCatalogEntry>,
    pub schemas: Vec<FlatCatalogEntry>,
    pub tables: Vec<FlatCatalogEntry>,
    pub columns: Vec<FlatCatalogEntry>,
    /// Deduplicated names in first-use order
    pub names: Vec<String>,
    /// `(packed table id, flat table index)`, sorted by id
    pub tables_by_id: Vec<(u64, u32)>,
}

#[derive(Default)]
struct NameDictionary {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl NameDictionary {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }
}

type TableTree<'a> = BTreeMap<&'a str, &'a CatalogTable>;
type SchemaTree<'a> = BTreeMap<&'a str, (u32, TableTree<'a>)>;
type DatabaseTree<'a> = BTreeMap<&'a str, (u32, SchemaTree<'a>)>;

impl CatalogSnapshot {
    pub(crate) fn build(catalog: &Catalog) -> Self {
        // Sorted tree, first ranked declaration of a table wins
        let mut tree: DatabaseTree<'_> = BTreeMap::new();
        for entry in catalog.ranked_entries() {
            for ((database, schema), (database_id, schema_id)) in entry.schemas() {
                tree.entry(database.as_str())
                    .or_insert_with(|| (*database_id, BTreeMap::new()))
                    .1
                    .entry(schema.as_str())
                    .or_insert_with(|| (*schema_id, BTreeMap::new()));
            }
            for table in entry.tables() {
                let d = &table.declaration;
                let tables = tree
                    .get_mut(d.database_name.as_str())
                    .and_then(|(_, schemas)| schemas.get_mut(d.schema_name.as_str()));
                if let Some((_, tables)) = tables {
                    tables.entry(d.table_name.as_str()).or_insert(table);
                }
            }
        }

        let mut snapshot = CatalogSnapshot {
            catalog_version: catalog.version(),
            ..Default::default()
        };
        let mut names = NameDictionary::default();
        for (database_name, (database_id, schemas)) in &tree {
            let database_idx = snapshot.databases.len() as u32;
            snapshot.databases.push(FlatCatalogEntry {
                flat_entry_idx: database_idx,
                flat_parent_idx: NULL_OBJECT_ID,
                catalog_object_id: *database_id as u64,
                name_id: names.intern(database_name),
                child_begin: snapshot.schemas.len() as u32,
                child_count: schemas.len() as u32,
            });
            for (schema_name, (schema_id, tables)) in schemas {
                let schema_idx = snapshot.schemas.len() as u32;
                snapshot.schemas.push(FlatCatalogEntry {
                    flat_entry_idx: schema_idx,
                    flat_parent_idx: database_idx,
                    catalog_object_id: *schema_id as u64,
                    name_id: names.intern(schema_name),
                    child_begin: snapshot.tables.len() as u32,
                    child_count: tables.len() as u32,
                });
                for (table_name, table) in tables {
                    let table_idx = snapshot.tables.len() as u32;
                    let columns = &table.declaration.columns;
                    let table_id = table.declaration.table_id.packed();
                    snapshot.tables.push(FlatCatalogEntry {
                        flat_entry_idx: table_idx,
                        flat_parent_idx: schema_idx,
                        catalog_object_id: table_id,
                        name_id: names.intern(table_name),
                        child_begin: snapshot.columns.len() as u32,
                        child_count: columns.len() as u32,
                    });
                    snapshot.tables_by_id.push((table_id, table_idx));
                    for (column_idx, column) in columns.iter().enumerate() {
                        snapshot.columns.push(FlatCatalogEntry {
                            flat_entry_idx: snapshot.columns.len() as u32,
                            flat_parent_idx: table_idx,
                            catalog_object_id: column_idx as u64,
                            name_id: names.intern(&column.name),
                            child_begin: 0,
                            child_count: 0,
                        });
                    }
                }
            }
        }
        snapshot.tables_by_id.sort_unstable();
        snapshot.names = names.names;
        snapshot
    }

    pub fn reader(&self) -> CatalogSnapshotReader<'_> {
        CatalogSnapshotReader::new(self)
    }
}

/// Read helpers over a [`CatalogSnapshot`]
#[derive(Debug, Clone, Copy)]
pub struct CatalogSnapshotReader<'a> {
    snapshot: &'a CatalogSnapshot,
}

fn children<'a>(level: &'a [FlatCatalogEntry], parent: &FlatCatalogEntry) -> &'a [FlatCatalogEntry] {
    let begin = parent.child_begin as usize;
    let end = begin + parent.child_count as usize;
    level.get(begin..end).unwrap_or_default()
}

impl<'a> CatalogSnapshotReader<'a> {
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn name(&self, name_id: u32) -> &'a str {
        self.snapshot
            .names
            .get(name_id as usize)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn databases(&self) -> &'a [FlatCatalogEntry] {
        &self.snapshot.databases
    }

    pub fn schemas_of(&self, database: &FlatCatalogEntry) -> &'a [FlatCatalogEntry] {
        children(&self.snapshot.schemas, database)
    }

    pub fn tables_of(&self, schema: &FlatCatalogEntry) -> &'a [FlatCatalogEntry] {
        children(&self.snapshot.tables, schema)
    }

    pub fn columns_of(&self, table: &FlatCatalogEntry) -> &'a [FlatCatalogEntry] {
        children(&self.snapshot.columns, table)
    }

    /// Flat table entry of a table id
    pub fn find_table(&self, table_id: ExternalObjectId) -> Option<&'a FlatCatalogEntry> {
        let ids = &self.snapshot.tables_by_id;
        let pos = ids
            .binary_search_by_key(&table_id.packed(), |(id, _)| *id)
            .ok()?;
        self.snapshot.tables.get(ids[pos].1 as usize)
    }

    /// `(database, schema, table)` names of a flat table entry
    pub fn table_path(&self, table: &FlatCatalogEntry) -> (&'a str, &'a str, &'a str) {
        let schema = self.snapshot.schemas.get(table.flat_parent_idx as usize);
        let database =
            schema.and_then(|s| self.snapshot.databases.get(s.flat_parent_idx as usize));
        (
            database.map(|d| self.name(d.name_id)).unwrap_or_default(),
            schema.map(|s| self.name(s.name_id)).unwrap_or_default(),
            self.name(table.name_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnDescriptor, SchemaDescriptor, TableDescriptor};

    #[test]
    fn test_empty_snapshot() {
        let catalog = Catalog::new();
        let snapshot = catalog.create_snapshot();
        assert!(snapshot.databases.is_empty());
        assert!(snapshot.names.is_empty());
        assert_eq!(snapshot.catalog_version, catalog.version());
    }

    #[test]
    fn test_reader_walks_children() {
        let mut catalog = Catalog::new();
        catalog.add_descriptor_pool(1, 10).unwrap();
        catalog
            .add_schema_descriptor(
                1,
                &SchemaDescriptor::new("db", "s").with_tables(vec![
                    TableDescriptor::new("b").with_columns(vec![ColumnDescriptor::new("y")]),
                    TableDescriptor::new("a").with_columns(vec![
                        ColumnDescriptor::new("x2"),
                        ColumnDescriptor::new("x1"),
                    ]),
                ]),
            )
            .unwrap();
        let snapshot = catalog.create_snapshot();
        let reader = snapshot.reader();
        let database = &reader.databases()[0];
        let schema = &reader.schemas_of(database)[0];
        let tables = reader.tables_of(schema);
        let table_names: Vec<_> = tables.iter().map(|t| reader.name(t.name_id)).collect();
        assert_eq!(table_names, vec!["a", "b"]);
        let column_names: Vec<_> = reader
            .columns_of(&tables[0])
            .iter()
            .map(|c| reader.name(c.name_id))
            .collect();
        assert_eq!(column_names, vec!["x2", "x1"]);

        let b = reader.find_table(ExternalObjectId::new(1, 0)).unwrap();
        assert_eq!(reader.table_path(b), ("db", "s", "b"));
    }

    #[test]
    fn test_snapshot_cached_until_mutation() {
        let mut catalog = Catalog::new();
        let first = catalog.create_snapshot();
        assert!(std::sync::Arc::ptr_eq(&first, &catalog.create_snapshot()));
        catalog.add_descriptor_pool(1, 1).unwrap();
        let second = catalog.create_snapshot();
        assert!(!std::sync::Arc::ptr_eq(&first, &second));
        assert!(second.catalog_version > first.catalog_version);
    }
}
