// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Script handle
//!
//! A script owns a text buffer and caches the outputs of the last scan,
//! parse and analysis. Every text mutation drops all cached outputs, so the
//! script falls back to [`ScriptStage::Empty`].
//!
//! ```text
//! Empty --scan--> Scanned --parse--> Parsed --analyze--> Analyzed
//!   ^                                                        |
//!   +-------------------- any text edit ---------------------+
//! ```
//!
//! Buffers handed out by earlier calls stay readable until destroyed; they
//! are snapshots, not views.

use crate::buffer::{FlatBuffer, Handle};
use crate::error::{EngineError, EngineResult};
use crate::memory::{MemoryKind, SlotKey};
use crate::registry::ScriptRegistryHandle;
use serde::Serialize;
use sqlscript_context::{Completion, CompletionSources, ScriptCursor, complete_at_cursor};
use sqlscript_grammar::{ParsedScript, ScannedScript, TextBuffer, parse, scan};
use sqlscript_ir::CatalogEntryId;
use sqlscript_semantic::{AnalyzedScript, Analyzer};
use std::sync::Arc;
use tracing::debug;

/// Furthest pipeline stage with a current output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptStage {
    Empty,
    Scanned,
    Parsed,
    Analyzed,
}

/// Sizes of the current pipeline outputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStatistics {
    pub entry_id: CatalogEntryId,
    pub stage: Option<ScriptStage>,
    pub text_version: u64,
    pub text_bytes: usize,
    pub line_count: usize,
    pub token_count: usize,
    pub name_count: usize,
    pub node_count: usize,
    pub statement_count: usize,
    pub table_reference_count: usize,
    pub expression_count: usize,
    pub column_filter_count: usize,
    pub column_computation_count: usize,
    pub function_reference_count: usize,
    pub diagnostic_count: usize,
}

/// Script data held in the memory registry
pub(crate) struct ScriptState {
    pub(crate) catalog: SlotKey,
    pub(crate) entry_id: CatalogEntryId,
    text: TextBuffer,
    scanned: Option<Arc<ScannedScript>>,
    parsed: Option<Arc<ParsedScript>>,
    pub(crate) analyzed: Option<Arc<AnalyzedScript>>,
    cursor: Option<Arc<ScriptCursor>>,
}

impl ScriptState {
    pub(crate) fn new(catalog: SlotKey, entry_id: CatalogEntryId) -> Self {
        Self {
            catalog,
            entry_id,
            text: TextBuffer::new(),
            scanned: None,
            parsed: None,
            analyzed: None,
            cursor: None,
        }
    }

    fn invalidate(&mut self) {
        self.scanned = None;
        self.parsed = None;
        self.analyzed = None;
        self.cursor = None;
    }

    fn stage(&self) -> ScriptStage {
        if self.analyzed.is_some() {
            ScriptStage::Analyzed
        } else if self.parsed.is_some() {
            ScriptStage::Parsed
        } else if self.scanned.is_some() {
            ScriptStage::Scanned
        } else {
            ScriptStage::Empty
        }
    }

    fn ensure_scanned(&mut self) -> Arc<ScannedScript> {
        if let Some(scanned) = &self.scanned {
            return scanned.clone();
        }
        let scanned = Arc::new(scan(&self.text.to_string(), self.text.version()));
        self.scanned = Some(scanned.clone());
        scanned
    }

    fn ensure_parsed(&mut self) -> Arc<ParsedScript> {
        if let Some(parsed) = &self.parsed {
            return parsed.clone();
        }
        let parsed = Arc::new(parse(self.ensure_scanned()));
        self.parsed = Some(parsed.clone());
        parsed
    }

    fn statistics(&self) -> ScriptStatistics {
        let mut stats = ScriptStatistics {
            entry_id: self.entry_id,
            stage: Some(self.stage()),
            text_version: self.text.version(),
            text_bytes: self.text.len_bytes(),
            line_count: self.text.line_count(),
            ..Default::default()
        };
        if let Some(scanned) = &self.scanned {
            stats.token_count = scanned.tokens.len();
            stats.name_count = scanned.names.iter().count();
            stats.diagnostic_count += scanned.diagnostics.len();
        }
        if let Some(parsed) = &self.parsed {
            stats.node_count = parsed.nodes.len();
            stats.statement_count = parsed.statements.len();
            stats.diagnostic_count += parsed.diagnostics.len();
        }
        if let Some(analyzed) = &self.analyzed {
            stats.table_reference_count = analyzed.table_references.len();
            stats.expression_count = analyzed.expressions.len();
            stats.column_filter_count = analyzed.column_filters.len();
            stats.column_computation_count = analyzed.column_computations.len();
            stats.function_reference_count = analyzed.function_references.len();
            stats.diagnostic_count += analyzed.diagnostics.len();
        }
        stats
    }
}

/// Handle to a script
#[derive(Debug)]
pub struct ScriptHandle {
    handle: Handle,
}

impl ScriptHandle {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Apply a text edit and drop cached outputs on success
    fn edit(&self, apply: impl FnOnce(&mut TextBuffer) -> EngineResult<()>) -> EngineResult<()> {
        let mut memory = self.handle.shared.memory();
        let state = memory.script_mut(self.handle.key)?;
        apply(&mut state.text)?;
        state.invalidate();
        Ok(())
    }

    pub fn insert_text_at(&self, offset: u32, text: &str) -> EngineResult<()> {
        self.edit(|buffer| Ok(buffer.insert_text_at(offset as usize, text)?))
    }

    pub fn insert_char_at(&self, offset: u32, ch: char) -> EngineResult<()> {
        self.edit(|buffer| Ok(buffer.insert_char_at(offset as usize, ch)?))
    }

    pub fn erase_text_range(&self, offset: u32, length: u32) -> EngineResult<()> {
        self.edit(|buffer| Ok(buffer.erase_text_range(offset as usize, length as usize)?))
    }

    /// Replace the whole text
    pub fn replace_text(&self, text: &str) -> EngineResult<()> {
        self.edit(|buffer| {
            buffer.replace_text(text);
            Ok(())
        })
    }

    /// Current text of the script
    pub fn to_string(&self) -> EngineResult<String> {
        let memory = self.handle.shared.memory();
        Ok(memory.script(self.handle.key)?.text.to_string())
    }

    pub fn text_version(&self) -> EngineResult<u64> {
        let memory = self.handle.shared.memory();
        Ok(memory.script(self.handle.key)?.text.version())
    }

    /// Tokenize the current text
    pub fn scan(&self) -> EngineResult<FlatBuffer<ScannedScript>> {
        let scanned = {
            let mut memory = self.handle.shared.memory();
            memory.script_mut(self.handle.key)?.ensure_scanned()
        };
        debug!(tokens = scanned.tokens.len(), "Scanned script");
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::ScannedScript,
            scanned,
        ))
    }

    /// Parse the current text, scanning first if needed
    pub fn parse(&self) -> EngineResult<FlatBuffer<ParsedScript>> {
        let parsed = {
            let mut memory = self.handle.shared.memory();
            memory.script_mut(self.handle.key)?.ensure_parsed()
        };
        debug!(
            nodes = parsed.nodes.len(),
            statements = parsed.statements.len(),
            "Parsed script"
        );
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::ParsedScript,
            parsed,
        ))
    }

    /// Analyze against the current catalog version
    ///
    /// Always re-runs, since the catalog may have changed without a text
    /// edit. Scans and parses first if needed.
    pub fn analyze(&self) -> EngineResult<FlatBuffer<AnalyzedScript>> {
        let shared = &self.handle.shared;
        let analyzed = {
            let mut memory = shared.memory();
            let state = memory.script_mut(self.handle.key)?;
            let parsed = state.ensure_parsed();
            let (catalog_key, entry_id) = (state.catalog, state.entry_id);
            let catalog = memory.catalog(catalog_key)?;
            let analyzed = Arc::new(Analyzer::analyze(
                parsed,
                catalog,
                entry_id,
                &shared.functions,
            ));
            let state = memory.script_mut(self.handle.key)?;
            state.analyzed = Some(analyzed.clone());
            state.cursor = None;
            analyzed
        };
        Ok(FlatBuffer::allocate(
            shared,
            MemoryKind::AnalyzedScript,
            analyzed,
        ))
    }

    /// Place the cursor at a byte offset
    ///
    /// The offset must lie on a character boundary within the text. Scans
    /// and parses first if needed; the analysis is used when current.
    pub fn move_cursor(&self, offset: u32) -> EngineResult<FlatBuffer<ScriptCursor>> {
        let cursor = {
            let mut memory = self.handle.shared.memory();
            let state = memory.script_mut(self.handle.key)?;
            let scanned = state.ensure_scanned();
            if !scanned.text.is_char_boundary(offset as usize) {
                return Err(EngineError::invalid_argument(format!(
                    "cursor offset {offset} is not a character boundary of a {} byte text",
                    scanned.text.len()
                )));
            }
            let parsed = state.ensure_parsed();
            let cursor = Arc::new(ScriptCursor::place(
                &scanned,
                Some(parsed.as_ref()),
                state.analyzed.as_deref(),
                offset,
            ));
            state.cursor = Some(cursor.clone());
            cursor
        };
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::ScriptCursor,
            cursor,
        ))
    }

    /// Complete at the last cursor position
    ///
    /// `limit` is capped by the configured maximum. Snippet templates are
    /// taken from `registry` when given.
    pub fn complete_at_cursor(
        &self,
        limit: usize,
        registry: Option<&ScriptRegistryHandle>,
    ) -> EngineResult<FlatBuffer<Completion>> {
        let shared = &self.handle.shared;
        if limit == 0 {
            return Err(EngineError::invalid_argument(
                "completion limit must be at least 1",
            ));
        }
        if registry.is_some_and(|r| !r.handle().belongs_to(shared)) {
            return Err(EngineError::invalid_argument(
                "script registry belongs to another engine",
            ));
        }
        let limit = limit.min(shared.config.max_completion_candidates);
        let completion = {
            let memory = shared.memory();
            let state = memory.script(self.handle.key)?;
            let cursor = state.cursor.clone().ok_or_else(|| {
                EngineError::invalid_argument("no cursor, call move_cursor first")
            })?;
            let registry = match registry {
                Some(registry) => Some(memory.script_registry(registry.handle().key)?),
                None => None,
            };
            let sources = CompletionSources {
                analyzed: state.analyzed.as_deref(),
                catalog: memory.catalog(state.catalog)?,
                registry,
                functions: &shared.functions,
            };
            Arc::new(complete_at_cursor(&cursor, &sources, limit))
        };
        debug!(
            candidates = completion.candidates.len(),
            strategy = ?completion.strategy,
            "Completed at cursor"
        );
        Ok(FlatBuffer::allocate(
            shared,
            MemoryKind::Completion,
            completion,
        ))
    }

    /// Derive the edit for a candidate of an earlier completion
    ///
    /// The completion must stem from the current cursor position.
    pub fn select_completion_candidate(
        &self,
        completion: &Completion,
        candidate_id: usize,
    ) -> EngineResult<FlatBuffer<Completion>> {
        self.check_completion(completion)?;
        let selected = completion.select_candidate(candidate_id).ok_or_else(|| {
            EngineError::invalid_argument(format!("unknown completion candidate {candidate_id}"))
        })?;
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::Completion,
            Arc::new(selected),
        ))
    }

    /// Derive the edit for one catalog object behind a candidate
    pub fn select_completion_catalog_object(
        &self,
        completion: &Completion,
        candidate_id: usize,
        catalog_object_id: usize,
    ) -> EngineResult<FlatBuffer<Completion>> {
        self.check_completion(completion)?;
        let selected = completion
            .select_catalog_object(candidate_id, catalog_object_id)
            .ok_or_else(|| {
                EngineError::invalid_argument(format!(
                    "unknown catalog object {catalog_object_id} of completion candidate {candidate_id}"
                ))
            })?;
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::Completion,
            Arc::new(selected),
        ))
    }

    fn check_completion(&self, completion: &Completion) -> EngineResult<()> {
        let memory = self.handle.shared.memory();
        let state = memory.script(self.handle.key)?;
        match &state.cursor {
            Some(cursor) if cursor.text_offset == completion.text_offset => Ok(()),
            Some(_) => Err(EngineError::invalid_argument(
                "completion was computed at another cursor position",
            )),
            None => Err(EngineError::invalid_argument("no cursor, call move_cursor first")),
        }
    }

    pub fn stage(&self) -> EngineResult<ScriptStage> {
        let memory = self.handle.shared.memory();
        Ok(memory.script(self.handle.key)?.stage())
    }

    /// Whether the analysis is missing or older than the catalog
    pub fn is_analysis_outdated(&self) -> EngineResult<bool> {
        let memory = self.handle.shared.memory();
        let state = memory.script(self.handle.key)?;
        let Some(analyzed) = &state.analyzed else {
            return Ok(true);
        };
        let catalog = memory.catalog(state.catalog)?;
        Ok(analyzed.catalog_version != catalog.version())
    }

    pub fn statistics(&self) -> EngineResult<FlatBuffer<ScriptStatistics>> {
        let stats = {
            let memory = self.handle.shared.memory();
            memory.script(self.handle.key)?.statistics()
        };
        Ok(FlatBuffer::allocate(
            &self.handle.shared,
            MemoryKind::ScriptStatistics,
            Arc::new(stats),
        ))
    }

    pub fn entry_id(&self) -> EngineResult<CatalogEntryId> {
        let memory = self.handle.shared.memory();
        Ok(memory.script(self.handle.key)?.entry_id)
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Release the script, repeated calls do nothing
    ///
    /// Buffers produced earlier stay readable.
    pub fn destroy(&self) {
        self.handle.destroy();
    }

    pub fn mark_alive_in_epoch(&self, epoch: u32) -> EngineResult<()> {
        self.handle.mark_alive_in_epoch(epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;

    fn script(text: &str) -> (Engine, crate::CatalogHandle, ScriptHandle) {
        let engine = Engine::new();
        let catalog = engine.create_catalog();
        let script = engine.create_script(&catalog, 1).unwrap();
        script.insert_text_at(0, text).unwrap();
        (engine, catalog, script)
    }

    #[test]
    fn test_stage_transitions() {
        let (_engine, _catalog, script) = script("select 1");
        assert_eq!(script.stage().unwrap(), ScriptStage::Empty);
        script.scan().unwrap();
        assert_eq!(script.stage().unwrap(), ScriptStage::Scanned);
        script.parse().unwrap();
        assert_eq!(script.stage().unwrap(), ScriptStage::Parsed);
        script.analyze().unwrap();
        assert_eq!(script.stage().unwrap(), ScriptStage::Analyzed);

        script.insert_char_at(8, ' ').unwrap();
        assert_eq!(script.stage().unwrap(), ScriptStage::Empty);
    }

    #[test]
    fn test_failed_edit_keeps_outputs() {
        let (_engine, _catalog, script) = script("select 1");
        script.analyze().unwrap();
        assert!(script.erase_text_range(4, 100).is_err());
        assert_eq!(script.stage().unwrap(), ScriptStage::Analyzed);
    }

    #[test]
    fn test_old_buffers_survive_edits() {
        let (_engine, _catalog, script) = script("select 1");
        let scanned = script.scan().unwrap();
        script.replace_text("select 1, 2").unwrap();
        assert_eq!(scanned.read().unwrap().text, "select 1");
    }

    #[test]
    fn test_cursor_offset_must_be_char_boundary() {
        let (_engine, _catalog, script) = script("select 'é'");
        assert!(script.move_cursor(9).is_err());
        assert!(script.move_cursor(100).is_err());
        assert!(script.move_cursor(8).is_ok());
    }

    #[test]
    fn test_completion_requires_cursor() {
        let (_engine, _catalog, script) = script("select 1");
        assert!(matches!(
            script.complete_at_cursor(5, None),
            Err(EngineError::InvalidArgument(_))
        ));
        script.move_cursor(3).unwrap();
        assert!(matches!(
            script.complete_at_cursor(0, None),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(script.complete_at_cursor(5, None).is_ok());
    }

    #[test]
    fn test_statistics_counts() {
        let (_engine, _catalog, script) = script("select a from t;\nselect 1");
        script.analyze().unwrap();
        let stats = script.statistics().unwrap().read().unwrap();
        assert_eq!(stats.stage, Some(ScriptStage::Analyzed));
        assert_eq!(stats.statement_count, 2);
        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.table_reference_count, 1);
        assert!(stats.token_count > 0);
    }
}
