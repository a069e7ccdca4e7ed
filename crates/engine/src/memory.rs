// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Memory registry
//!
//! Every object handed across the engine boundary lives in a slot of one
//! arena. A handle names its slot by index and generation; releasing a slot
//! bumps the generation, so stale handles fail with
//! [`EngineError::UseAfterFree`] instead of reaching a reused slot.
//!
//! ## Liveness epochs
//!
//! The embedder drives reachability explicitly:
//!
//! ```text
//! epoch = acquire_liveness_epoch()
//! for every handle still reachable: handle.mark_alive_in_epoch(epoch)
//! check_memory_liveness(epoch)   -> alive / dead
//! sweep(epoch)                   -> release everything dead
//! ```
//!
//! Epochs start at 1, allocations start in epoch 0, so an allocation counts
//! as dead until it is marked in the current epoch.

use crate::error::{EngineError, EngineResult};
use crate::script::ScriptState;
use serde::Serialize;
use sqlscript_catalog::Catalog;
use sqlscript_semantic::ScriptRegistry;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Kind of object held by a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryKind {
    Catalog,
    Script,
    ScriptRegistry,
    ScannedScript,
    ParsedScript,
    AnalyzedScript,
    ScriptCursor,
    Completion,
    ScriptStatistics,
    CatalogSnapshot,
    CatalogEntries,
    CatalogStatistics,
    ColumnInfo,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Catalog => "CATALOG",
            MemoryKind::Script => "SCRIPT",
            MemoryKind::ScriptRegistry => "SCRIPT_REGISTRY",
            MemoryKind::ScannedScript => "SCANNED_SCRIPT",
            MemoryKind::ParsedScript => "PARSED_SCRIPT",
            MemoryKind::AnalyzedScript => "ANALYZED_SCRIPT",
            MemoryKind::ScriptCursor => "SCRIPT_CURSOR",
            MemoryKind::Completion => "COMPLETION",
            MemoryKind::ScriptStatistics => "SCRIPT_STATISTICS",
            MemoryKind::CatalogSnapshot => "CATALOG_SNAPSHOT",
            MemoryKind::CatalogEntries => "CATALOG_ENTRIES",
            MemoryKind::CatalogStatistics => "CATALOG_STATISTICS",
            MemoryKind::ColumnInfo => "COLUMN_INFO",
        }
    }

    /// Whether the slot holds a read-only result buffer
    pub fn is_buffer(&self) -> bool {
        !matches!(
            self,
            MemoryKind::Catalog | MemoryKind::Script | MemoryKind::ScriptRegistry
        )
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arena index plus generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SlotKey {
    pub index: u32,
    pub generation: u32,
}

impl SlotKey {
    /// `(generation << 32) | index`, unique over the engine's lifetime
    pub fn packed(&self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }
}

/// Object owned by a slot
pub(crate) enum MemoryObject {
    Catalog(Box<Catalog>),
    Script(Box<ScriptState>),
    ScriptRegistry(Box<ScriptRegistry>),
    Buffer(Arc<dyn Any + Send + Sync>),
}

struct Occupant {
    kind: MemoryKind,
    epoch: u32,
    object: MemoryObject,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    occupant: Option<Occupant>,
}

/// A live allocation as reported by [`MemoryRegistry::check_liveness`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryEntry {
    pub key: SlotKey,
    pub kind: MemoryKind,
    /// Last epoch the allocation was marked alive in
    pub epoch: u32,
}

/// Allocations split by whether they were marked in an epoch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryLiveness {
    pub alive: Vec<MemoryEntry>,
    pub dead: Vec<MemoryEntry>,
}

/// Slot arena behind all engine handles
pub(crate) struct MemoryRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_epoch: u32,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_epoch: 1,
        }
    }
}

impl MemoryRegistry {
    pub(crate) fn allocate(&mut self, kind: MemoryKind, object: MemoryObject) -> SlotKey {
        let occupant = Occupant {
            kind,
            epoch: 0,
            object,
        };
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.occupant = Some(occupant);
        let key = SlotKey {
            index,
            generation: slot.generation,
        };
        trace!(%kind, index, generation = key.generation, "Allocated slot");
        key
    }

    /// Release a slot, returns false if it was already released
    pub(crate) fn release(&mut self, key: SlotKey) -> bool {
        let Some(slot) = self.slots.get_mut(key.index as usize) else {
            return false;
        };
        if slot.generation != key.generation || slot.occupant.is_none() {
            return false;
        }
        slot.occupant = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        trace!(index = key.index, "Released slot");
        true
    }

    fn occupant(&self, key: SlotKey, kind: MemoryKind) -> EngineResult<&Occupant> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.occupant.as_ref())
            .filter(|occupant| occupant.kind == kind)
            .ok_or(EngineError::UseAfterFree { kind })
    }

    fn occupant_mut(&mut self, key: SlotKey, kind: MemoryKind) -> EngineResult<&mut Occupant> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.occupant.as_mut())
            .filter(|occupant| occupant.kind == kind)
            .ok_or(EngineError::UseAfterFree { kind })
    }

    pub(crate) fn is_alive(&self, key: SlotKey, kind: MemoryKind) -> bool {
        self.occupant(key, kind).is_ok()
    }

    pub(crate) fn catalog(&self, key: SlotKey) -> EngineResult<&Catalog> {
        match &self.occupant(key, MemoryKind::Catalog)?.object {
            MemoryObject::Catalog(catalog) => Ok(catalog),
            _ => Err(EngineError::UseAfterFree {
                kind: MemoryKind::Catalog,
            }),
        }
    }

    pub(crate) fn catalog_mut(&mut self, key: SlotKey) -> EngineResult<&mut Catalog> {
        match &mut self.occupant_mut(key, MemoryKind::Catalog)?.object {
            MemoryObject::Catalog(catalog) => Ok(catalog),
            _ => Err(EngineError::UseAfterFree {
                kind: MemoryKind::Catalog,
            }),
        }
    }

    pub(crate) fn script(&self, key: SlotKey) -> EngineResult<&ScriptState> {
        match &self.occupant(key, MemoryKind::Script)?.object {
            MemoryObject::Script(script) => Ok(script),
            _ => Err(EngineError::UseAfterFree {
                kind: MemoryKind::Script,
            }),
        }
    }

    pub(crate) fn script_mut(&mut self, key: SlotKey) -> EngineResult<&mut ScriptState> {
        match &mut self.occupant_mut(key, MemoryKind::Script)?.object {
            MemoryObject::Script(script) => Ok(script),
            _ => Err(EngineError::UseAfterFree {
                kind: MemoryKind::Script,
            }),
        }
    }

    pub(crate) fn script_registry(&self, key: SlotKey) -> EngineResult<&ScriptRegistry> {
        match &self.occupant(key, MemoryKind::ScriptRegistry)?.object {
            MemoryObject::ScriptRegistry(registry) => Ok(registry),
            _ => Err(EngineError::UseAfterFree {
                kind: MemoryKind::ScriptRegistry,
            }),
        }
    }

    pub(crate) fn script_registry_mut(&mut self, key: SlotKey) -> EngineResult<&mut ScriptRegistry> {
        match &mut self.occupant_mut(key, MemoryKind::ScriptRegistry)?.object {
            MemoryObject::ScriptRegistry(registry) => Ok(registry),
            _ => Err(EngineError::UseAfterFree {
                kind: MemoryKind::ScriptRegistry,
            }),
        }
    }

    /// Shared pointer to a result buffer
    pub(crate) fn buffer<T: Any + Send + Sync>(
        &self,
        key: SlotKey,
        kind: MemoryKind,
    ) -> EngineResult<Arc<T>> {
        match &self.occupant(key, kind)?.object {
            MemoryObject::Buffer(buffer) => buffer
                .clone()
                .downcast::<T>()
                .map_err(|_| EngineError::invalid_argument(format!("{kind} buffer has another type"))),
            _ => Err(EngineError::UseAfterFree { kind }),
        }
    }

    pub(crate) fn mark_alive(&mut self, key: SlotKey, kind: MemoryKind, epoch: u32) -> EngineResult<()> {
        self.occupant_mut(key, kind)?.epoch = epoch;
        Ok(())
    }

    pub(crate) fn acquire_epoch(&mut self) -> u32 {
        let epoch = self.next_epoch;
        self.next_epoch = self.next_epoch.wrapping_add(1).max(1);
        epoch
    }

    fn entries(&self) -> impl Iterator<Item = MemoryEntry> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.occupant.as_ref().map(|occupant| MemoryEntry {
                key: SlotKey {
                    index: index as u32,
                    generation: slot.generation,
                },
                kind: occupant.kind,
                epoch: occupant.epoch,
            })
        })
    }

    pub(crate) fn check_liveness(&self, epoch: u32) -> MemoryLiveness {
        let (alive, dead) = self.entries().partition(|entry| entry.epoch == epoch);
        MemoryLiveness { alive, dead }
    }

    /// Release every allocation not marked in `epoch`
    pub(crate) fn sweep(&mut self, epoch: u32) -> Vec<MemoryEntry> {
        let dead: Vec<MemoryEntry> = self.entries().filter(|entry| entry.epoch != epoch).collect();
        for entry in &dead {
            self.release(entry.key);
        }
        debug!(epoch, released = dead.len(), "Swept memory registry");
        dead
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.occupant.is_some()).count()
    }
}
