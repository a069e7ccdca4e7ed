// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Script registry handle.

use crate::buffer::{FlatBuffer, Handle};
use crate::error::{EngineError, EngineResult};
use crate::memory::MemoryKind;
use crate::script::ScriptHandle;
use sqlscript_ir::{CatalogEntryId, ExternalObjectId};
use sqlscript_semantic::ColumnInfo;
use std::sync::Arc;

/// Handle to a registry of analyzed scripts
#[derive(Debug)]
pub struct ScriptRegistryHandle {
    handle: Handle,
}

impl ScriptRegistryHandle {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Register the current analysis of a script
    ///
    /// Adding a script again replaces its earlier contributions.
    pub fn add_script(&self, script: &ScriptHandle) -> EngineResult<()> {
        if !script.handle().belongs_to(&self.handle.shared) {
            return Err(EngineError::invalid_argument("script belongs to another engine"));
        }
        let mut memory = self.handle.shared.memory();
        let analyzed = memory
            .script(script.handle().key)?
            .analyzed
            .clone()
            .ok_or_else(|| EngineError::invalid_argument("script must be analyzed before registering"))?;
        memory
            .script_registry_mut(self.handle.key)?
            .add_script(analyzed);
        Ok(())
    }

    /// Retract a script, returns whether it was registered
    pub fn remove_script(&self, entry_id: CatalogEntryId) -> EngineResult<bool> {
        let mut memory = self.handle.shared.memory();
        Ok(memory
            .script_registry_mut(self.handle.key)?
            .remove_script(entry_id))
    }

    pub fn clear(&self) -> EngineResult<()> {
        let mut memory = self.handle.shared.memory();
        memory.script_registry_mut(self.handle.key)?.clear();
        Ok(())
    }

    pub fn contains_script(&self, entry_id: CatalogEntryId) -> EngineResult<bool> {
        let memory = self.handle.shared.memory();
        Ok(memory
            .script_registry(self.handle.key)?
            .contains_script(entry_id))
    }

    pub fn script_count(&self) -> EngineResult<usize> {
        let memory = self.handle.shared.memory();
        Ok(memory.script_registry(self.handle.key)?.script_count())
    }

    /// Everything the registered scripts know about a column
    ///
    /// With `strictRegistryVersions` configured and a version given, only
    /// contributions resolved against that catalog version count. Returns
    /// `None` when no registered script references the column.
    pub fn find_column_info(
        &self,
        table_id: ExternalObjectId,
        column_id: u32,
        catalog_version: Option<u32>,
    ) -> EngineResult<Option<FlatBuffer<ColumnInfo>>> {
        let shared = &self.handle.shared;
        let info = {
            let memory = shared.memory();
            let registry = memory.script_registry(self.handle.key)?;
            match catalog_version {
                Some(version) if shared.config.strict_registry_versions => {
                    registry.find_column_info_strict(table_id, column_id, version)
                }
                _ => registry.find_column_info(table_id, column_id, catalog_version),
            }
        };
        Ok(info.map(|info| FlatBuffer::allocate(shared, MemoryKind::ColumnInfo, Arc::new(info))))
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Release the registry, repeated calls do nothing
    pub fn destroy(&self) {
        self.handle.destroy();
    }

    pub fn mark_alive_in_epoch(&self, epoch: u32) -> EngineResult<()> {
        self.handle.mark_alive_in_epoch(epoch)
    }
}
