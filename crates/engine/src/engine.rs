// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Engine
//!
//! Entry point of the handle API. An [`Engine`] owns the memory registry
//! every catalog, script, registry and result buffer lives in.

use crate::buffer::Handle;
use crate::catalog::CatalogHandle;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::memory::{MemoryKind, MemoryLiveness, MemoryObject, MemoryRegistry};
use crate::registry::ScriptRegistryHandle;
use crate::script::{ScriptHandle, ScriptState};
use sqlscript_catalog::Catalog;
use sqlscript_function_registry::FunctionRegistry;
use sqlscript_ir::{CatalogEntryId, RESERVED_CONTEXT_ID};
use sqlscript_semantic::ScriptRegistry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// State shared by the engine and all of its handles
pub(crate) struct EngineShared {
    memory: Mutex<MemoryRegistry>,
    pub(crate) functions: FunctionRegistry,
    pub(crate) config: EngineConfig,
}

impl EngineShared {
    pub(crate) fn memory(&self) -> MutexGuard<'_, MemoryRegistry> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner of all engine memory
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    /// Create an engine with a validated configuration
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: EngineConfig) -> Self {
        info!(version = %crate::get_version_text(), "Creating engine");
        Self {
            shared: Arc::new(EngineShared {
                memory: Mutex::new(MemoryRegistry::default()),
                functions: FunctionRegistry::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.shared.functions
    }

    /// Create an empty catalog with the configured default names
    pub fn create_catalog(&self) -> CatalogHandle {
        let catalog = Catalog::with_defaults(
            self.shared.config.default_database_name.clone(),
            self.shared.config.default_schema_name.clone(),
        );
        let handle = Handle::allocate(
            &self.shared,
            MemoryKind::Catalog,
            MemoryObject::Catalog(Box::new(catalog)),
        );
        debug!(slot = handle.key.index, "Created catalog");
        CatalogHandle::new(handle)
    }

    /// Create an empty script bound to `catalog`
    ///
    /// `entry_id` names the script when it is loaded into the catalog or
    /// added to a registry.
    pub fn create_script(
        &self,
        catalog: &CatalogHandle,
        entry_id: CatalogEntryId,
    ) -> EngineResult<ScriptHandle> {
        if entry_id == RESERVED_CONTEXT_ID {
            return Err(EngineError::invalid_argument(format!(
                "entry id {entry_id} is reserved"
            )));
        }
        if !catalog.handle().belongs_to(&self.shared) {
            return Err(EngineError::invalid_argument(
                "catalog belongs to another engine",
            ));
        }
        let catalog_key = catalog.handle().key;
        let key = {
            let mut memory = self.shared.memory();
            memory.catalog(catalog_key)?;
            memory.allocate(
                MemoryKind::Script,
                MemoryObject::Script(Box::new(ScriptState::new(catalog_key, entry_id))),
            )
        };
        debug!(entry_id, slot = key.index, "Created script");
        Ok(ScriptHandle::new(Handle::new(
            self.shared.clone(),
            key,
            MemoryKind::Script,
        )))
    }

    pub fn create_script_registry(&self) -> ScriptRegistryHandle {
        let handle = Handle::allocate(
            &self.shared,
            MemoryKind::ScriptRegistry,
            MemoryObject::ScriptRegistry(Box::new(ScriptRegistry::new())),
        );
        ScriptRegistryHandle::new(handle)
    }

    /// Start a new liveness epoch
    pub fn acquire_liveness_epoch(&self) -> u32 {
        self.shared.memory().acquire_epoch()
    }

    /// Split live allocations by whether they were marked in `epoch`
    pub fn check_memory_liveness(&self, epoch: u32) -> MemoryLiveness {
        self.shared.memory().check_liveness(epoch)
    }

    /// Release every allocation not marked in `epoch`, returns how many
    pub fn sweep(&self, epoch: u32) -> usize {
        let released = self.shared.memory().sweep(epoch);
        released.len()
    }

    /// Number of slots currently holding an object
    pub fn live_allocations(&self) -> usize {
        self.shared.memory().live_count()
    }

    pub fn version_text(&self) -> String {
        crate::get_version_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_entry_id_rejected() {
        let engine = Engine::new();
        let catalog = engine.create_catalog();
        let err = engine.create_script(&catalog, RESERVED_CONTEXT_ID).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn test_script_on_destroyed_catalog() {
        let engine = Engine::new();
        let catalog = engine.create_catalog();
        catalog.destroy();
        let err = engine.create_script(&catalog, 1).unwrap_err();
        assert!(err.is_use_after_free());
    }

    #[test]
    fn test_foreign_catalog_rejected() {
        let engine = Engine::new();
        let other = Engine::new();
        let catalog = other.create_catalog();
        assert!(matches!(
            engine.create_script(&catalog, 1),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_drop_releases_slot() {
        let engine = Engine::new();
        {
            let _catalog = engine.create_catalog();
            let _registry = engine.create_script_registry();
            assert_eq!(engine.live_allocations(), 2);
        }
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig::default().with_max_completion_candidates(0);
        assert!(matches!(
            Engine::with_config(config),
            Err(EngineError::Config(_))
        ));
    }
}
