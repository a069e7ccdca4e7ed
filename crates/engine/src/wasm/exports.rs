// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # WASM exports
//!
//! ```text
//! JavaScript → WasmEngine / WasmCatalog / WasmScript → engine handles
//! ```
//!
//! Pipeline calls return the JSON encoding of their buffer and release the
//! buffer right away, so only catalogs, scripts and registries hold engine
//! memory on the JavaScript side.
//!
//! ```javascript
//! const engine = new WasmEngine();
//! const catalog = engine.createCatalog();
//! const script = engine.createScript(catalog, 1);
//! script.insertTextAt(0, "select * from foo");
//! script.analyze();
//! script.moveCursor(17);
//! const completion = JSON.parse(script.completeAtCursor(10));
//! script.free();
//! ```

use crate::{
    CatalogHandle, Engine, EngineConfig, EngineError, ScriptHandle, ScriptRegistryHandle,
    get_version_text,
};
use sqlscript_context::Completion;
use sqlscript_ir::ExternalObjectId;
use std::cell::RefCell;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

fn to_js(err: EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen(js_name = getVersionText)]
pub fn version_text() -> String {
    get_version_text()
}

#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
        }
    }

    /// Create an engine from a JSON configuration
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<WasmEngine, JsValue> {
        let config = EngineConfig::from_json_str(config_json)
            .map_err(|e| to_js(EngineError::from(e)))?;
        let engine = Engine::with_config(config).map_err(to_js)?;
        Ok(Self { engine })
    }

    #[wasm_bindgen(js_name = createCatalog)]
    pub fn create_catalog(&self) -> WasmCatalog {
        WasmCatalog {
            handle: self.engine.create_catalog(),
        }
    }

    #[wasm_bindgen(js_name = createScript)]
    pub fn create_script(&self, catalog: &WasmCatalog, entry_id: u32) -> Result<WasmScript, JsValue> {
        let handle = self
            .engine
            .create_script(&catalog.handle, entry_id)
            .map_err(to_js)?;
        Ok(WasmScript {
            handle,
            last_completion: RefCell::new(None),
        })
    }

    #[wasm_bindgen(js_name = createScriptRegistry)]
    pub fn create_script_registry(&self) -> WasmScriptRegistry {
        WasmScriptRegistry {
            handle: self.engine.create_script_registry(),
        }
    }

    #[wasm_bindgen(js_name = acquireLivenessEpoch)]
    pub fn acquire_liveness_epoch(&self) -> u32 {
        self.engine.acquire_liveness_epoch()
    }

    #[wasm_bindgen(js_name = checkMemoryLiveness)]
    pub fn check_memory_liveness(&self, epoch: u32) -> Result<String, JsValue> {
        let liveness = self.engine.check_memory_liveness(epoch);
        serde_json::to_string(&liveness).map_err(|e| to_js(EngineError::from(e)))
    }

    pub fn sweep(&self, epoch: u32) -> usize {
        self.engine.sweep(epoch)
    }
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
pub struct WasmCatalog {
    handle: CatalogHandle,
}

#[wasm_bindgen]
impl WasmCatalog {
    #[wasm_bindgen(js_name = addDescriptorPool)]
    pub fn add_descriptor_pool(&self, pool_id: u32, rank: u32) -> Result<(), JsValue> {
        self.handle.add_descriptor_pool(pool_id, rank).map_err(to_js)
    }

    #[wasm_bindgen(js_name = dropDescriptorPool)]
    pub fn drop_descriptor_pool(&self, pool_id: u32) -> Result<(), JsValue> {
        self.handle.drop_descriptor_pool(pool_id).map_err(to_js)
    }

    /// Add descriptors given as JSON, one object or an array
    #[wasm_bindgen(js_name = addSchemaDescriptor)]
    pub fn add_schema_descriptor(&self, pool_id: u32, json: &str) -> Result<(), JsValue> {
        self.handle
            .add_schema_descriptor_json(pool_id, json.as_bytes())
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = loadScript)]
    pub fn load_script(&self, script: &WasmScript, rank: u32) -> Result<(), JsValue> {
        self.handle.load_script(&script.handle, rank).map_err(to_js)
    }

    #[wasm_bindgen(js_name = unloadScript)]
    pub fn unload_script(&self, entry_id: u32) -> Result<bool, JsValue> {
        self.handle.unload_script(entry_id).map_err(to_js)
    }

    #[wasm_bindgen(js_name = containsEntryId)]
    pub fn contains_entry_id(&self, entry_id: u32) -> Result<bool, JsValue> {
        self.handle.contains_entry_id(entry_id).map_err(to_js)
    }

    pub fn clear(&self) -> Result<(), JsValue> {
        self.handle.clear().map_err(to_js)
    }

    pub fn version(&self) -> Result<u32, JsValue> {
        self.handle.version().map_err(to_js)
    }

    #[wasm_bindgen(js_name = describeEntries)]
    pub fn describe_entries(&self) -> Result<String, JsValue> {
        self.handle
            .describe_entries()
            .and_then(|buffer| buffer.encode())
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = getStatistics)]
    pub fn statistics(&self) -> Result<String, JsValue> {
        self.handle
            .statistics()
            .and_then(|buffer| buffer.encode())
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = createSnapshot)]
    pub fn create_snapshot(&self) -> Result<String, JsValue> {
        self.handle
            .create_snapshot()
            .and_then(|buffer| buffer.encode())
            .map_err(to_js)
    }

    pub fn destroy(&self) {
        self.handle.destroy();
    }

    #[wasm_bindgen(js_name = markAliveInEpoch)]
    pub fn mark_alive_in_epoch(&self, epoch: u32) -> Result<(), JsValue> {
        self.handle.mark_alive_in_epoch(epoch).map_err(to_js)
    }
}

#[wasm_bindgen]
pub struct WasmScript {
    handle: ScriptHandle,
    /// Completion the selection calls apply to
    last_completion: RefCell<Option<Arc<Completion>>>,
}

#[wasm_bindgen]
impl WasmScript {
    #[wasm_bindgen(js_name = insertTextAt)]
    pub fn insert_text_at(&self, offset: u32, text: &str) -> Result<(), JsValue> {
        self.handle.insert_text_at(offset, text).map_err(to_js)
    }

    #[wasm_bindgen(js_name = insertCharAt)]
    pub fn insert_char_at(&self, offset: u32, ch: char) -> Result<(), JsValue> {
        self.handle.insert_char_at(offset, ch).map_err(to_js)
    }

    #[wasm_bindgen(js_name = eraseTextRange)]
    pub fn erase_text_range(&self, offset: u32, length: u32) -> Result<(), JsValue> {
        self.handle.erase_text_range(offset, length).map_err(to_js)
    }

    #[wasm_bindgen(js_name = replaceText)]
    pub fn replace_text(&self, text: &str) -> Result<(), JsValue> {
        self.handle.replace_text(text).map_err(to_js)
    }

    #[wasm_bindgen(js_name = toString)]
    pub fn text(&self) -> Result<String, JsValue> {
        self.handle.to_string().map_err(to_js)
    }

    pub fn scan(&self) -> Result<String, JsValue> {
        self.handle.scan().and_then(|b| b.encode()).map_err(to_js)
    }

    pub fn parse(&self) -> Result<String, JsValue> {
        self.handle.parse().and_then(|b| b.encode()).map_err(to_js)
    }

    pub fn analyze(&self) -> Result<String, JsValue> {
        self.handle.analyze().and_then(|b| b.encode()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = moveCursor)]
    pub fn move_cursor(&self, offset: u32) -> Result<String, JsValue> {
        self.handle
            .move_cursor(offset)
            .and_then(|b| b.encode())
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = completeAtCursor)]
    pub fn complete_at_cursor(&self, limit: usize) -> Result<String, JsValue> {
        self.complete(limit, None)
    }

    /// Complete with snippet templates from a registry
    #[wasm_bindgen(js_name = completeAtCursorWithRegistry)]
    pub fn complete_at_cursor_with_registry(
        &self,
        limit: usize,
        registry: &WasmScriptRegistry,
    ) -> Result<String, JsValue> {
        self.complete(limit, Some(&registry.handle))
    }

    /// Select a candidate of the last completion
    #[wasm_bindgen(js_name = selectCompletionCandidate)]
    pub fn select_completion_candidate(&self, candidate_id: usize) -> Result<String, JsValue> {
        let completion = self.last_completion()?;
        self.handle
            .select_completion_candidate(&completion, candidate_id)
            .and_then(|b| b.encode())
            .map_err(to_js)
    }

    /// Select one catalog object behind a candidate of the last completion
    #[wasm_bindgen(js_name = selectCompletionCatalogObject)]
    pub fn select_completion_catalog_object(
        &self,
        candidate_id: usize,
        object_id: usize,
    ) -> Result<String, JsValue> {
        let completion = self.last_completion()?;
        self.handle
            .select_completion_catalog_object(&completion, candidate_id, object_id)
            .and_then(|b| b.encode())
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = isAnalysisOutdated)]
    pub fn is_analysis_outdated(&self) -> Result<bool, JsValue> {
        self.handle.is_analysis_outdated().map_err(to_js)
    }

    pub fn statistics(&self) -> Result<String, JsValue> {
        self.handle.statistics().and_then(|b| b.encode()).map_err(to_js)
    }

    pub fn destroy(&self) {
        self.handle.destroy();
    }

    #[wasm_bindgen(js_name = markAliveInEpoch)]
    pub fn mark_alive_in_epoch(&self, epoch: u32) -> Result<(), JsValue> {
        self.handle.mark_alive_in_epoch(epoch).map_err(to_js)
    }
}

impl WasmScript {
    fn complete(
        &self,
        limit: usize,
        registry: Option<&ScriptRegistryHandle>,
    ) -> Result<String, JsValue> {
        let buffer = self
            .handle
            .complete_at_cursor(limit, registry)
            .map_err(to_js)?;
        let completion = buffer.read().map_err(to_js)?;
        let text = buffer.encode().map_err(to_js)?;
        *self.last_completion.borrow_mut() = Some(completion);
        Ok(text)
    }

    fn last_completion(&self) -> Result<Arc<Completion>, JsValue> {
        self.last_completion
            .borrow()
            .clone()
            .ok_or_else(|| to_js(EngineError::invalid_argument("no completion to select from")))
    }
}

#[wasm_bindgen]
pub struct WasmScriptRegistry {
    handle: ScriptRegistryHandle,
}

#[wasm_bindgen]
impl WasmScriptRegistry {
    #[wasm_bindgen(js_name = addScript)]
    pub fn add_script(&self, script: &WasmScript) -> Result<(), JsValue> {
        self.handle.add_script(&script.handle).map_err(to_js)
    }

    #[wasm_bindgen(js_name = removeScript)]
    pub fn remove_script(&self, entry_id: u32) -> Result<bool, JsValue> {
        self.handle.remove_script(entry_id).map_err(to_js)
    }

    pub fn clear(&self) -> Result<(), JsValue> {
        self.handle.clear().map_err(to_js)
    }

    /// JSON column info, or `null` when no registered script uses the column
    #[wasm_bindgen(js_name = findColumnInfo)]
    pub fn find_column_info(
        &self,
        table_id: u64,
        column_id: u32,
        catalog_version: Option<u32>,
    ) -> Result<String, JsValue> {
        let info = self
            .handle
            .find_column_info(ExternalObjectId::from_packed(table_id), column_id, catalog_version)
            .map_err(to_js)?;
        match info {
            Some(buffer) => buffer.encode().map_err(to_js),
            None => Ok("null".to_string()),
        }
    }

    pub fn destroy(&self) {
        self.handle.destroy();
    }

    #[wasm_bindgen(js_name = markAliveInEpoch)]
    pub fn mark_alive_in_epoch(&self, epoch: u32) -> Result<(), JsValue> {
        self.handle.mark_alive_in_epoch(epoch).map_err(to_js)
    }
}
