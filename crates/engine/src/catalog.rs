// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Catalog handle.

use crate::buffer::{FlatBuffer, Handle};
use crate::error::{EngineError, EngineResult};
use crate::memory::MemoryKind;
use crate::script::ScriptHandle;
use sqlscript_catalog::{
    Catalog, CatalogEntryDescription, CatalogSnapshot, CatalogStatistics, Rank, SchemaDescriptor,
};
use sqlscript_ir::CatalogEntryId;
use std::sync::Arc;
use tracing::debug;

/// Handle to a catalog
#[derive(Debug)]
pub struct CatalogHandle {
    handle: Handle,
}

impl CatalogHandle {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> EngineResult<R> {
        let memory = self.handle.shared.memory();
        Ok(f(memory.catalog(self.handle.key)?))
    }

    fn with_catalog_mut<R>(
        &self,
        f: impl FnOnce(&mut Catalog) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut memory = self.handle.shared.memory();
        f(memory.catalog_mut(self.handle.key)?)
    }

    pub fn add_descriptor_pool(&self, pool_id: CatalogEntryId, rank: Rank) -> EngineResult<()> {
        self.with_catalog_mut(|catalog| Ok(catalog.add_descriptor_pool(pool_id, rank)?))
    }

    /// Register a pool, reserving room for `estimated_entry_count` tables
    pub fn add_descriptor_pool_with_capacity(
        &self,
        pool_id: CatalogEntryId,
        rank: Rank,
        estimated_entry_count: usize,
    ) -> EngineResult<()> {
        self.with_catalog_mut(|catalog| {
            Ok(catalog.add_descriptor_pool_with_capacity(pool_id, rank, estimated_entry_count)?)
        })
    }

    pub fn drop_descriptor_pool(&self, pool_id: CatalogEntryId) -> EngineResult<()> {
        self.with_catalog_mut(|catalog| Ok(catalog.drop_descriptor_pool(pool_id)?))
    }

    pub fn add_schema_descriptor(
        &self,
        pool_id: CatalogEntryId,
        descriptor: &SchemaDescriptor,
    ) -> EngineResult<()> {
        self.with_catalog_mut(|catalog| Ok(catalog.add_schema_descriptor(pool_id, descriptor)?))
    }

    pub fn add_schema_descriptors(
        &self,
        pool_id: CatalogEntryId,
        descriptors: &[SchemaDescriptor],
    ) -> EngineResult<()> {
        self.with_catalog_mut(|catalog| Ok(catalog.add_schema_descriptors(pool_id, descriptors)?))
    }

    /// Add descriptors given as JSON, one object or an array
    pub fn add_schema_descriptor_json(&self, pool_id: CatalogEntryId, json: &[u8]) -> EngineResult<()> {
        self.with_catalog_mut(|catalog| Ok(catalog.add_schema_descriptor_json(pool_id, json)?))
    }

    /// Expose the tables declared by an analyzed script
    ///
    /// The script must belong to this catalog. Loading the same script again
    /// replaces its previous tables.
    pub fn load_script(&self, script: &ScriptHandle, rank: Rank) -> EngineResult<()> {
        if !script.handle().belongs_to(&self.handle.shared) {
            return Err(EngineError::invalid_argument("script belongs to another engine"));
        }
        let script_key = script.handle().key;
        let mut memory = self.handle.shared.memory();
        let state = memory.script(script_key)?;
        if state.catalog != self.handle.key {
            return Err(EngineError::invalid_argument(
                "script was created for another catalog",
            ));
        }
        let analyzed = state
            .analyzed
            .clone()
            .ok_or_else(|| EngineError::invalid_argument("script must be analyzed before loading"))?;
        let entry_id = state.entry_id;
        memory.catalog_mut(self.handle.key)?.load_script(
            entry_id,
            script_key.packed(),
            rank,
            analyzed.table_declarations.clone(),
        )?;
        debug!(entry_id, rank, "Loaded script through handle");
        Ok(())
    }

    /// Remove a script entry, returns whether it was loaded
    pub fn unload_script(&self, entry_id: CatalogEntryId) -> EngineResult<bool> {
        self.with_catalog_mut(|catalog| Ok(catalog.unload_script(entry_id)?))
    }

    pub fn contains_entry_id(&self, entry_id: CatalogEntryId) -> EngineResult<bool> {
        self.with_catalog(|catalog| catalog.contains_entry_id(entry_id))
    }

    pub fn clear(&self) -> EngineResult<()> {
        self.with_catalog_mut(|catalog| {
            catalog.clear();
            Ok(())
        })
    }

    pub fn version(&self) -> EngineResult<u32> {
        self.with_catalog(Catalog::version)
    }

    pub fn describe_entries(&self) -> EngineResult<FlatBuffer<Vec<CatalogEntryDescription>>> {
        let entries = self.with_catalog(Catalog::describe_entries)?;
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::CatalogEntries,
            Arc::new(entries),
        ))
    }

    /// Content counts per entry and in total
    pub fn statistics(&self) -> EngineResult<FlatBuffer<CatalogStatistics>> {
        let statistics = self.with_catalog(Catalog::statistics)?;
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::CatalogStatistics,
            Arc::new(statistics),
        ))
    }

    /// Immutable view of the current catalog version
    pub fn create_snapshot(&self) -> EngineResult<FlatBuffer<CatalogSnapshot>> {
        let snapshot = self.with_catalog(Catalog::create_snapshot)?;
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::CatalogSnapshot,
            snapshot,
        ))
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Release the catalog, repeated calls do nothing
    ///
    /// Scripts created for it fail to analyze afterwards.
    pub fn destroy(&self) {
        self.handle.destroy();
    }

    pub fn mark_alive_in_epoch(&self, epoch: u32) -> EngineResult<()> {
        self.handle.mark_alive_in_epoch(epoch)
    }
}
