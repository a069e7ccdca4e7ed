// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Catalog
//!
//! The catalog is a ranked collection of entries. An entry is either a
//! descriptor pool, fed with [`SchemaDescriptor`]s, or the table
//! declarations of an analyzed script. Entries share one id space.
//!
//! Lookups visit entries in ranked order: lower rank first, then lower
//! entry id. Database and schema ids are allocated once per name and shared
//! by every entry that mentions the name.

use crate::descriptor::SchemaDescriptor;
use crate::error::{CatalogError, CatalogResult};
use crate::snapshot::CatalogSnapshot;
use crate::table::{ColumnDeclaration, QualifiedTableName, TableDeclaration, names_match};
use serde::Serialize;
use sqlscript_ir::{CatalogEntryId, DataType, ExternalObjectId, NULL_OBJECT_ID, RESERVED_CONTEXT_ID};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};

/// Lookup priority of an entry, lower ranks win
pub type Rank = u32;

/// Kind of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogEntryKind {
    DescriptorPool,
    Script,
}

/// A table registered in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogTable {
    pub database_id: u32,
    pub schema_id: u32,
    pub declaration: TableDeclaration,
}

/// `(database, schema)` name pair
pub type SchemaKey = (String, String);

/// A descriptor pool or a loaded script
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub entry_id: CatalogEntryId,
    pub kind: CatalogEntryKind,
    pub rank: Rank,
    /// Identity of the script that loaded the entry
    pub script_instance: Option<u64>,
    schemas: BTreeMap<SchemaKey, (u32, u32)>,
    tables: Vec<CatalogTable>,
    tables_by_object: HashMap<u32, usize>,
    next_table_id: u32,
}

impl CatalogEntry {
    fn new(entry_id: CatalogEntryId, kind: CatalogEntryKind, rank: Rank) -> Self {
        Self {
            entry_id,
            kind,
            rank,
            script_instance: None,
            schemas: BTreeMap::new(),
            tables: Vec::new(),
            tables_by_object: HashMap::new(),
            next_table_id: 0,
        }
    }

    /// Tables in declaration order
    pub fn tables(&self) -> &[CatalogTable] {
        &self.tables
    }

    /// Table by its object index
    pub fn table(&self, object: u32) -> Option<&CatalogTable> {
        self.tables_by_object
            .get(&object)
            .map(|index| &self.tables[*index])
    }

    /// Schemas mentioned by the entry, with their database and schema ids
    pub(crate) fn schemas(&self) -> &BTreeMap<SchemaKey, (u32, u32)> {
        &self.schemas
    }

    fn push_table(&mut self, table: CatalogTable) {
        self.tables_by_object
            .insert(table.declaration.table_id.object(), self.tables.len());
        self.tables.push(table);
    }

    fn statistics(&self) -> CatalogEntryStatistics {
        let databases: HashSet<&str> = self.schemas.keys().map(|(db, _)| db.as_str()).collect();
        CatalogEntryStatistics {
            entry_id: self.entry_id,
            kind: self.kind,
            rank: self.rank,
            database_count: databases.len(),
            schema_count: self.schemas.len(),
            table_count: self.tables.len(),
            column_count: self.tables.iter().map(|t| t.declaration.columns.len()).sum(),
        }
    }

    fn describe(&self) -> CatalogEntryDescription {
        CatalogEntryDescription {
            entry_id: self.entry_id,
            kind: self.kind,
            rank: self.rank,
            schemas: self
                .schemas
                .keys()
                .map(|(database_name, schema_name)| SchemaName {
                    database_name: database_name.clone(),
                    schema_name: schema_name.clone(),
                })
                .collect(),
            table_count: self.tables.len(),
            column_count: self
                .tables
                .iter()
                .map(|t| t.declaration.columns.len())
                .sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaName {
    pub database_name: String,
    pub schema_name: String,
}

/// Summary of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntryDescription {
    pub entry_id: CatalogEntryId,
    pub kind: CatalogEntryKind,
    pub rank: Rank,
    pub schemas: Vec<SchemaName>,
    pub table_count: usize,
    pub column_count: usize,
}

/// Content counts of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntryStatistics {
    pub entry_id: CatalogEntryId,
    pub kind: CatalogEntryKind,
    pub rank: Rank,
    pub database_count: usize,
    pub schema_count: usize,
    pub table_count: usize,
    pub column_count: usize,
}

/// Content counts of the whole catalog
///
/// Databases and schemas shared by several entries are counted once in the
/// totals and once per entry in `entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatistics {
    pub version: u32,
    pub descriptor_pool_count: usize,
    pub script_count: usize,
    pub database_count: usize,
    pub schema_count: usize,
    pub table_count: usize,
    pub column_count: usize,
    pub entries: Vec<CatalogEntryStatistics>,
}

/// A table found by [`Catalog::resolve_table`]
#[derive(Debug, Clone, Copy)]
pub struct TableMatch<'a> {
    pub entry_id: CatalogEntryId,
    pub rank: Rank,
    pub table: &'a CatalogTable,
}

/// Result of a table lookup, best candidate first
#[derive(Debug, Clone, Default)]
pub struct TableMatches<'a> {
    pub candidates: Vec<TableMatch<'a>>,
    /// Candidates live in more than one schema
    pub ambiguous: bool,
}

impl<'a> TableMatches<'a> {
    pub fn best(&self) -> Option<&TableMatch<'a>> {
        self.candidates.first()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Reference counted ids per name
#[derive(Debug)]
struct IdAllocator<K> {
    ids: HashMap<K, (u32, usize)>,
    next: u32,
}

impl<K> Default for IdAllocator<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            next: 0,
        }
    }
}

impl<K: Eq + Hash> IdAllocator<K> {
    fn acquire(&mut self, key: K) -> u32 {
        let next = &mut self.next;
        let slot = self.ids.entry(key).or_insert_with(|| {
            let id = *next;
            *next += 1;
            (id, 0)
        });
        slot.1 += 1;
        slot.0
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn get(&self, key: &K) -> Option<u32> {
        self.ids.get(key).map(|(id, _)| *id)
    }

    fn release(&mut self, key: &K) {
        if let Some(slot) = self.ids.get_mut(key) {
            slot.1 -= 1;
            if slot.1 == 0 {
                self.ids.remove(key);
            }
        }
    }
}

/// The catalog
#[derive(Debug)]
pub struct Catalog {
    default_database: String,
    default_schema: String,
    entries: BTreeMap<CatalogEntryId, CatalogEntry>,
    database_ids: IdAllocator<String>,
    schema_ids: IdAllocator<SchemaKey>,
    version: u32,
    snapshot: OnceLock<Arc<CatalogSnapshot>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create an empty catalog with empty default names
    pub fn new() -> Self {
        Self::with_defaults("", "")
    }

    /// Create an empty catalog with default database and schema names
    pub fn with_defaults(
        default_database: impl Into<String>,
        default_schema: impl Into<String>,
    ) -> Self {
        Self {
            default_database: default_database.into(),
            default_schema: default_schema.into(),
            entries: BTreeMap::new(),
            database_ids: IdAllocator::default(),
            schema_ids: IdAllocator::default(),
            version: 1,
            snapshot: OnceLock::new(),
        }
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Version, bumped by every mutation
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn contains_entry_id(&self, entry_id: CatalogEntryId) -> bool {
        self.entries.contains_key(&entry_id)
    }

    pub fn entry(&self, entry_id: CatalogEntryId) -> Option<&CatalogEntry> {
        self.entries.get(&entry_id)
    }

    /// Entries ordered by rank, then entry id
    pub fn ranked_entries(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<&CatalogEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| (e.rank, e.entry_id));
        entries
    }

    /// All tables in ranked entry order
    pub fn ranked_tables(&self) -> impl Iterator<Item = (&CatalogEntry, &CatalogTable)> + '_ {
        self.ranked_entries()
            .into_iter()
            .flat_map(|entry| entry.tables.iter().map(move |table| (entry, table)))
    }

    /// Id of a database name known to the catalog
    pub fn database_id(&self, database_name: &str) -> Option<u32> {
        self.database_ids.get(&database_name.to_string())
    }

    /// Id of a schema name known to the catalog
    pub fn schema_id(&self, database_name: &str, schema_name: &str) -> Option<u32> {
        self.schema_ids
            .get(&(database_name.to_string(), schema_name.to_string()))
    }

    /// Table by its external id
    pub fn table_by_id(&self, table_id: ExternalObjectId) -> Option<&CatalogTable> {
        self.entries
            .get(&table_id.context())?
            .table(table_id.object())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.snapshot = OnceLock::new();
    }

    fn register_schema(&mut self, entry_id: CatalogEntryId, key: SchemaKey) -> (u32, u32) {
        let Some(entry) = self.entries.get_mut(&entry_id) else {
            return (0, 0);
        };
        if let Some(ids) = entry.schemas.get(&key) {
            return *ids;
        }
        let ids = (
            self.database_ids.acquire(key.0.clone()),
            self.schema_ids.acquire(key.clone()),
        );
        entry.schemas.insert(key, ids);
        ids
    }

    fn release_entry(&mut self, entry: &CatalogEntry) {
        for key in entry.schemas.keys() {
            self.database_ids.release(&key.0);
            self.schema_ids.release(key);
        }
    }

    /// Register an empty descriptor pool
    pub fn add_descriptor_pool(&mut self, pool_id: CatalogEntryId, rank: Rank) -> CatalogResult<()> {
        self.add_descriptor_pool_with_capacity(pool_id, rank, 0)
    }

    /// Register an empty descriptor pool, reserving room for tables
    pub fn add_descriptor_pool_with_capacity(
        &mut self,
        pool_id: CatalogEntryId,
        rank: Rank,
        estimated_entry_count: usize,
    ) -> CatalogResult<()> {
        if pool_id == RESERVED_CONTEXT_ID {
            return Err(CatalogError::ReservedEntryId(pool_id));
        }
        if self.entries.contains_key(&pool_id) {
            return Err(CatalogError::IdentifierCollision { entry_id: pool_id });
        }
        let mut pool = CatalogEntry::new(pool_id, CatalogEntryKind::DescriptorPool, rank);
        pool.tables.reserve(estimated_entry_count);
        self.entries.insert(pool_id, pool);
        self.touch();
        debug!(pool_id, rank, "Added descriptor pool");
        Ok(())
    }

    /// Remove a descriptor pool with all its tables
    ///
    /// Dropping an unknown pool does nothing.
    pub fn drop_descriptor_pool(&mut self, pool_id: CatalogEntryId) -> CatalogResult<()> {
        match self.entries.get(&pool_id) {
            None => {
                warn!(pool_id, "Dropping unknown descriptor pool");
                Ok(())
            }
            Some(entry) if entry.kind != CatalogEntryKind::DescriptorPool => {
                Err(CatalogError::UnknownDescriptorPool(pool_id))
            }
            Some(_) => {
                if let Some(pool) = self.entries.remove(&pool_id) {
                    self.release_entry(&pool);
                }
                self.touch();
                debug!(pool_id, "Dropped descriptor pool");
                Ok(())
            }
        }
    }

    /// Add the tables of one descriptor to a pool
    pub fn add_schema_descriptor(
        &mut self,
        pool_id: CatalogEntryId,
        descriptor: &SchemaDescriptor,
    ) -> CatalogResult<()> {
        self.add_schema_descriptors(pool_id, std::slice::from_ref(descriptor))
    }

    /// Add the tables of several descriptors to a pool
    ///
    /// Either all tables are added or none.
    pub fn add_schema_descriptors(
        &mut self,
        pool_id: CatalogEntryId,
        descriptors: &[SchemaDescriptor],
    ) -> CatalogResult<()> {
        let pool = match self.entries.get(&pool_id) {
            Some(entry) if entry.kind == CatalogEntryKind::DescriptorPool => entry,
            _ => {
                warn!(pool_id, "Adding schema descriptor to unknown pool");
                return Err(CatalogError::UnknownDescriptorPool(pool_id));
            }
        };

        // Assign table ids before touching any state
        let mut used: HashSet<u32> = pool.tables_by_object.keys().copied().collect();
        let mut next_table_id = pool.next_table_id;
        let mut planned = Vec::new();
        for descriptor in descriptors {
            for table in &descriptor.tables {
                let table_id = table.table_id.unwrap_or(next_table_id);
                if table_id == NULL_OBJECT_ID {
                    return Err(CatalogError::ReservedTableId { pool_id, table_id });
                }
                if !used.insert(table_id) {
                    return Err(CatalogError::TableIdCollision { pool_id, table_id });
                }
                next_table_id = next_table_id.max(table_id.saturating_add(1));
                planned.push((descriptor, table, table_id));
            }
        }

        for descriptor in descriptors {
            self.register_schema(
                pool_id,
                (
                    descriptor.database_name.clone(),
                    descriptor.schema_name.clone(),
                ),
            );
        }
        let mut table_count = 0;
        for (descriptor, table, table_id) in planned {
            let (database_id, schema_id) = self.register_schema(
                pool_id,
                (
                    descriptor.database_name.clone(),
                    descriptor.schema_name.clone(),
                ),
            );
            let columns = table
                .columns
                .iter()
                .map(|c| {
                    let column = ColumnDeclaration::new(c.column_name.clone());
                    match &c.data_type {
                        Some(t) => column.with_type(DataType::from_sql_name(t)),
                        None => column,
                    }
                })
                .collect();
            let declaration = TableDeclaration::new(
                ExternalObjectId::new(pool_id, table_id),
                table.table_name.clone(),
            )
            .with_qualifiers(
                descriptor.database_name.clone(),
                descriptor.schema_name.clone(),
            )
            .with_columns(columns);
            if let Some(pool) = self.entries.get_mut(&pool_id) {
                pool.push_table(CatalogTable {
                    database_id,
                    schema_id,
                    declaration,
                });
            }
            table_count += 1;
        }
        if let Some(pool) = self.entries.get_mut(&pool_id) {
            pool.next_table_id = next_table_id;
        }
        self.touch();
        debug!(pool_id, table_count, "Added schema descriptors");
        Ok(())
    }

    /// Add descriptors from JSON, either one object or an array
    pub fn add_schema_descriptor_json(
        &mut self,
        pool_id: CatalogEntryId,
        json: &[u8],
    ) -> CatalogResult<()> {
        let descriptors = SchemaDescriptor::list_from_json(json)?;
        self.add_schema_descriptors(pool_id, &descriptors)
    }

    /// Load the table declarations of a script
    ///
    /// Loading again from the same script instance replaces the entry.
    pub fn load_script(
        &mut self,
        entry_id: CatalogEntryId,
        script_instance: u64,
        rank: Rank,
        tables: Vec<TableDeclaration>,
    ) -> CatalogResult<()> {
        if entry_id == RESERVED_CONTEXT_ID {
            return Err(CatalogError::ReservedEntryId(entry_id));
        }
        match self.entries.get(&entry_id) {
            Some(entry)
                if entry.kind == CatalogEntryKind::Script
                    && entry.script_instance == Some(script_instance) =>
            {
                if let Some(previous) = self.entries.remove(&entry_id) {
                    self.release_entry(&previous);
                }
            }
            Some(_) => return Err(CatalogError::IdentifierCollision { entry_id }),
            None => {}
        }

        let mut entry = CatalogEntry::new(entry_id, CatalogEntryKind::Script, rank);
        entry.script_instance = Some(script_instance);
        self.entries.insert(entry_id, entry);

        let table_count = tables.len();
        for declaration in tables {
            let (database_id, schema_id) = self.register_schema(
                entry_id,
                (
                    declaration.database_name.clone(),
                    declaration.schema_name.clone(),
                ),
            );
            if let Some(entry) = self.entries.get_mut(&entry_id) {
                entry.push_table(CatalogTable {
                    database_id,
                    schema_id,
                    declaration,
                });
            }
        }
        self.touch();
        debug!(entry_id, table_count, "Loaded script into catalog");
        Ok(())
    }

    /// Remove a script entry, returns whether it was present
    pub fn unload_script(&mut self, entry_id: CatalogEntryId) -> CatalogResult<bool> {
        match self.entries.get(&entry_id) {
            None => Ok(false),
            Some(entry) if entry.kind != CatalogEntryKind::Script => {
                Err(CatalogError::NotAScript(entry_id))
            }
            Some(_) => {
                if let Some(entry) = self.entries.remove(&entry_id) {
                    self.release_entry(&entry);
                }
                self.touch();
                debug!(entry_id, "Unloaded script from catalog");
                Ok(true)
            }
        }
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.database_ids = IdAllocator::default();
        self.schema_ids = IdAllocator::default();
        self.touch();
    }

    /// Describe all entries, ordered by entry id
    pub fn describe_entries(&self) -> Vec<CatalogEntryDescription> {
        self.entries.values().map(CatalogEntry::describe).collect()
    }

    pub fn describe_entries_of(&self, entry_id: CatalogEntryId) -> Option<CatalogEntryDescription> {
        self.entries.get(&entry_id).map(CatalogEntry::describe)
    }

    /// Count the contents of every entry and of the catalog as a whole
    pub fn statistics(&self) -> CatalogStatistics {
        let entries: Vec<CatalogEntryStatistics> =
            self.entries.values().map(CatalogEntry::statistics).collect();
        let count_kind = |kind| entries.iter().filter(|e| e.kind == kind).count();
        CatalogStatistics {
            version: self.version,
            descriptor_pool_count: count_kind(CatalogEntryKind::DescriptorPool),
            script_count: count_kind(CatalogEntryKind::Script),
            database_count: self.database_ids.len(),
            schema_count: self.schema_ids.len(),
            table_count: entries.iter().map(|e| e.table_count).sum(),
            column_count: entries.iter().map(|e| e.column_count).sum(),
            entries,
        }
    }

    /// Find tables matching a possibly partial name
    ///
    /// Missing qualifiers match any name. When several schemas match, tables
    /// in the default database and schema are preferred. Candidates are
    /// ordered by rank, then entry id, then declaration order.
    pub fn resolve_table(
        &self,
        name: &QualifiedTableName,
        ignore_entry: Option<CatalogEntryId>,
    ) -> TableMatches<'_> {
        let qualifier_matches = |declared: &str, requested: &Option<String>| {
            requested.as_deref().is_none_or(|r| names_match(declared, r))
        };
        let mut candidates: Vec<TableMatch<'_>> = self
            .ranked_tables()
            .filter(|(entry, _)| Some(entry.entry_id) != ignore_entry)
            .filter(|(_, table)| {
                let d = &table.declaration;
                names_match(&d.table_name, &name.table)
                    && qualifier_matches(&d.schema_name, &name.schema)
                    && qualifier_matches(&d.database_name, &name.database)
            })
            .map(|(entry, table)| TableMatch {
                entry_id: entry.entry_id,
                rank: entry.rank,
                table,
            })
            .collect();

        if name.database.is_none() || name.schema.is_none() {
            let in_defaults: Vec<TableMatch<'_>> = candidates
                .iter()
                .filter(|c| {
                    let d = &c.table.declaration;
                    (name.database.is_some() || d.database_name == self.default_database)
                        && (name.schema.is_some() || d.schema_name == self.default_schema)
                })
                .copied()
                .collect();
            if !in_defaults.is_empty() {
                candidates = in_defaults;
            }
        }

        let schemas: HashSet<(u32, u32)> = candidates
            .iter()
            .map(|c| (c.table.database_id, c.table.schema_id))
            .collect();
        trace!(table = %name, candidates = candidates.len(), "Resolved table name");
        TableMatches {
            ambiguous: schemas.len() > 1,
            candidates,
        }
    }

    /// Flat snapshot of the current state, cached until the next mutation
    pub fn create_snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot
            .get_or_init(|| Arc::new(CatalogSnapshot::build(self)))
            .clone()
    }
}
