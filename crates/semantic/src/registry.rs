// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Script registry
//!
//! Indexes the resolved columns of analyzed scripts by catalog table id and
//! column id. Each script contributes the filters and computations that
//! read a column. The index is rebuilt per script: adding a script under an
//! entry id that is already registered replaces all of its contributions,
//! and removing it retracts them.

use crate::analyzed::{AnalyzedScript, Expression};
use serde::Serialize;
use sqlscript_ir::{CatalogEntryId, ExpressionId, ExternalObjectId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

/// Placeholder substituted for literals in snippet templates
pub const TEMPLATE_PLACEHOLDER: &str = "?";

/// One occurrence of a template in a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSnippet {
    pub entry_id: CatalogEntryId,
    pub expression_id: ExpressionId,
    /// Expression text as written
    pub text: String,
}

/// Expressions that share a shape once literals are replaced by `?`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetTemplate {
    pub signature: u64,
    pub template_text: String,
    pub snippets: Vec<ColumnSnippet>,
}

/// Everything the registered scripts know about one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub table_id: ExternalObjectId,
    pub column_id: u32,
    /// Newest catalog version any contribution was resolved against
    pub catalog_version: u32,
    pub filter_templates: Vec<SnippetTemplate>,
    pub computation_templates: Vec<SnippetTemplate>,
}

impl ColumnInfo {
    pub fn is_empty(&self) -> bool {
        self.filter_templates.is_empty() && self.computation_templates.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnippetKind {
    Filter,
    Computation,
}

#[derive(Debug, Clone)]
struct Contribution {
    kind: SnippetKind,
    catalog_version: u32,
    template_text: String,
    snippet: ColumnSnippet,
}

type ColumnKey = (u64, u32);

/// Cross-script index of column usages
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<CatalogEntryId, Arc<AnalyzedScript>>,
    /// Contributions per column, grouped by the contributing script
    columns: HashMap<ColumnKey, BTreeMap<CatalogEntryId, Vec<Contribution>>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    /// Number of columns with at least one contribution
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn contains_script(&self, entry_id: CatalogEntryId) -> bool {
        self.scripts.contains_key(&entry_id)
    }

    /// Register an analyzed script, replacing an earlier analysis of the same entry
    pub fn add_script(&mut self, analyzed: Arc<AnalyzedScript>) {
        let entry_id = analyzed.catalog_entry_id;
        if self.scripts.contains_key(&entry_id) {
            self.retract(entry_id);
        }

        let mut added = 0usize;
        let filters = analyzed
            .column_filters
            .iter()
            .map(|f| (SnippetKind::Filter, f.root_expression_id, f.column_reference_expression_id));
        let computations = analyzed.column_computations.iter().map(|c| {
            (
                SnippetKind::Computation,
                c.root_expression_id,
                c.column_reference_expression_id,
            )
        });
        for (kind, root, column) in filters.chain(computations) {
            let (Ok(root), Ok(column)) = (analyzed.expression(root), analyzed.expression(column))
            else {
                continue;
            };
            let Some(resolved) = column.column_ref().and_then(|c| c.resolved) else {
                continue;
            };
            if resolved.catalog_table_id.is_null() {
                continue;
            }
            let contribution = Contribution {
                kind,
                catalog_version: resolved.referenced_catalog_version,
                template_text: template_text(&analyzed, root),
                snippet: ColumnSnippet {
                    entry_id,
                    expression_id: root.expression_id,
                    text: analyzed.expression_text(root.expression_id).to_string(),
                },
            };
            self.columns
                .entry((resolved.catalog_table_id.packed(), resolved.column_id))
                .or_default()
                .entry(entry_id)
                .or_default()
                .push(contribution);
            added += 1;
        }
        debug!(entry_id, contributions = added, "Added script to registry");
        self.scripts.insert(entry_id, analyzed);
    }

    /// Remove a script and every contribution it made, returns whether it was registered
    pub fn remove_script(&mut self, entry_id: CatalogEntryId) -> bool {
        if self.scripts.remove(&entry_id).is_none() {
            return false;
        }
        self.retract(entry_id);
        debug!(entry_id, "Removed script from registry");
        true
    }

    pub fn clear(&mut self) {
        self.scripts.clear();
        self.columns.clear();
    }

    fn retract(&mut self, entry_id: CatalogEntryId) {
        self.columns.retain(|_, by_script| {
            by_script.remove(&entry_id);
            !by_script.is_empty()
        });
    }

    /// Look up a column, ignoring the catalog version of the contributions
    ///
    /// The version is informational: a caller holding an older version still
    /// finds the column as long as its identity is unchanged.
    pub fn find_column_info(
        &self,
        table_id: ExternalObjectId,
        column_id: u32,
        catalog_version: Option<u32>,
    ) -> Option<ColumnInfo> {
        trace!(table_id = table_id.packed(), column_id, ?catalog_version, "Finding column info");
        self.collect(table_id, column_id, |_| true)
    }

    /// Look up a column, keeping only contributions resolved against `catalog_version`
    pub fn find_column_info_strict(
        &self,
        table_id: ExternalObjectId,
        column_id: u32,
        catalog_version: u32,
    ) -> Option<ColumnInfo> {
        self.collect(table_id, column_id, |c| c.catalog_version == catalog_version)
    }

    fn collect(
        &self,
        table_id: ExternalObjectId,
        column_id: u32,
        keep: impl Fn(&Contribution) -> bool,
    ) -> Option<ColumnInfo> {
        let by_script = self.columns.get(&(table_id.packed(), column_id))?;
        let mut info = ColumnInfo {
            table_id,
            column_id,
            catalog_version: 0,
            filter_templates: Vec::new(),
            computation_templates: Vec::new(),
        };
        for contribution in by_script.values().flatten().filter(|c| keep(c)) {
            info.catalog_version = info.catalog_version.max(contribution.catalog_version);
            let templates = match contribution.kind {
                SnippetKind::Filter => &mut info.filter_templates,
                SnippetKind::Computation => &mut info.computation_templates,
            };
            let signature = signature_of(&contribution.template_text);
            match templates.iter_mut().find(|t| t.signature == signature) {
                Some(template) => template.snippets.push(contribution.snippet.clone()),
                None => templates.push(SnippetTemplate {
                    signature,
                    template_text: contribution.template_text.clone(),
                    snippets: vec![contribution.snippet.clone()],
                }),
            }
        }
        (!info.is_empty()).then_some(info)
    }
}

/// Expression text with literals replaced by `?` and whitespace collapsed
fn template_text(analyzed: &AnalyzedScript, root: &Expression) -> String {
    let scanned = &analyzed.parsed.scanned;
    let mut text = String::new();
    for token in &scanned.tokens[scanned.tokens_in(root.location)] {
        if token.token_type == sqlscript_ir::TokenType::Comment {
            continue;
        }
        let piece = if token.token_type.is_literal() {
            TEMPLATE_PLACEHOLDER
        } else {
            scanned.text_at(token.location)
        };
        let glued = matches!(piece, "." | ")" | ",") || text.ends_with(['.', '(']);
        if !text.is_empty() && !glued {
            text.push(' ');
        }
        text.push_str(piece);
    }
    text
}

/// FNV-1a over the template text, stable across runs
fn signature_of(template: &str) -> u64 {
    template.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
