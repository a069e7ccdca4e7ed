// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Handles and read-only result buffers.

use crate::engine::EngineShared;
use crate::error::EngineResult;
use crate::memory::{MemoryKind, MemoryObject, SlotKey};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Ownership of one memory slot
///
/// Released on [`Handle::destroy`] or when dropped, whichever comes first.
pub(crate) struct Handle {
    pub(crate) shared: Arc<EngineShared>,
    pub(crate) key: SlotKey,
    pub(crate) kind: MemoryKind,
}

impl Handle {
    pub(crate) fn new(shared: Arc<EngineShared>, key: SlotKey, kind: MemoryKind) -> Self {
        Self { shared, key, kind }
    }

    /// Allocate a slot and wrap it
    pub(crate) fn allocate(shared: &Arc<EngineShared>, kind: MemoryKind, object: MemoryObject) -> Self {
        let key = shared.memory().allocate(kind, object);
        Self::new(shared.clone(), key, kind)
    }

    pub(crate) fn destroy(&self) {
        self.shared.memory().release(self.key);
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.shared.memory().is_alive(self.key, self.kind)
    }

    pub(crate) fn mark_alive_in_epoch(&self, epoch: u32) -> EngineResult<()> {
        self.shared.memory().mark_alive(self.key, self.kind, epoch)
    }

    pub(crate) fn belongs_to(&self, shared: &Arc<EngineShared>) -> bool {
        Arc::ptr_eq(&self.shared, shared)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .finish()
    }
}

/// Read-only result of an engine call
///
/// The value lives in the engine's memory registry. Reading after
/// [`FlatBuffer::destroy`] or after the slot was swept fails with
/// `UseAfterFree`.
pub struct FlatBuffer<T> {
    handle: Handle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FlatBuffer<T>
where
    T: Serialize + Send + Sync + 'static,
{
    pub(crate) fn allocate(shared: &Arc<EngineShared>, kind: MemoryKind, value: Arc<T>) -> Self {
        let object: Arc<dyn Any + Send + Sync> = value;
        Self {
            handle: Handle::allocate(shared, kind, MemoryObject::Buffer(object)),
            _marker: PhantomData,
        }
    }

    pub fn kind(&self) -> MemoryKind {
        self.handle.kind
    }

    pub fn read(&self) -> EngineResult<Arc<T>> {
        self.handle.shared.memory().buffer::<T>(self.handle.key, self.handle.kind)
    }

    /// Serialize the buffer as JSON
    pub fn encode(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self.read()?.as_ref())?)
    }

    pub fn encode_pretty(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self.read()?.as_ref())?)
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Release the buffer, repeated calls do nothing
    pub fn destroy(&self) {
        self.handle.destroy();
    }

    pub fn mark_alive_in_epoch(&self, epoch: u32) -> EngineResult<()> {
        self.handle.mark_alive_in_epoch(epoch)
    }
}

impl<T> fmt::Debug for FlatBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlatBuffer").field(&self.handle).finish()
    }
}
