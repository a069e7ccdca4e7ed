// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion
//!
//! Produces ranked candidates for the token under a [`ScriptCursor`].
//!
//! ## Ranking
//!
//! ```text
//! score = 100 * tier + category + proximity + usage
//! ```
//!
//! - `tier`: 3 for an exact prefix, 2 for a case-insensitive prefix, 1 for a
//!   fuzzy match
//! - `category`: up to 30 for the kind of name the position expects
//! - `proximity`: 40 for names of the cursor's statement or script
//! - `usage`: 10 for columns other scripts filter on
//!
//! The bonuses never add up to a full tier, so a better match always ranks
//! first. Ties are broken by the candidate text.
//!
//! ## Selection
//!
//! Candidates list the catalog and script objects they name. Selecting a
//! candidate, or one of its objects, derives the edit that applies it: a
//! plain name, or the qualified name of the object when nothing qualifies
//! the cursor yet.

use crate::cursor::{CursorContext, ScriptCursor};
use crate::keywords::KeywordProvider;
use crate::matching::{MatchTier, match_tier};
use serde::Serialize;
use sqlscript_catalog::{Catalog, QualifiedTableName, TableDeclaration, names_match};
use sqlscript_function_registry::FunctionRegistry;
use sqlscript_grammar::{KeywordCategory, keyword_category};
use sqlscript_ir::{CatalogEntryId, Location, NameTags, TokenType};
use sqlscript_semantic::resolution::matches_qualifier;
use sqlscript_semantic::{AnalyzedScript, ScriptRegistry, TableReference};
use std::collections::HashMap;
use tracing::debug;

const TIER_WEIGHT: u32 = 100;
const PROXIMITY_BONUS: u32 = 40;
const USAGE_BONUS: u32 = 10;

/// Kind of names a position expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStrategy {
    /// Keywords and any known name
    Default,
    /// Table name in FROM, DML or DROP targets
    TableRef,
    /// Unqualified column reference
    ColumnRef,
    /// Column after `qualifier.`
    QualifiedColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateKind {
    Keyword,
    Database,
    Schema,
    Table,
    TableAlias,
    Column,
    Function,
    /// Name seen in the script
    Name,
}

/// Kind of object a candidate names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateObjectKind {
    Database,
    Schema,
    Table,
    Column,
}

/// A catalog or script object behind a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateObject {
    pub object_kind: CandidateObjectKind,
    /// Catalog entry declaring the object, `None` for objects of the script
    pub catalog_entry_id: Option<CatalogEntryId>,
    /// Outermost name first, e.g. database, schema, table
    pub qualified_name: Vec<String>,
}

impl CandidateObject {
    fn new(
        object_kind: CandidateObjectKind,
        catalog_entry_id: Option<CatalogEntryId>,
        qualified_name: &[impl AsRef<str>],
    ) -> Self {
        Self {
            object_kind,
            catalog_entry_id,
            qualified_name: qualified_name.iter().map(|n| n.as_ref().to_string()).collect(),
        }
    }

    fn table(catalog_entry_id: Option<CatalogEntryId>, declaration: &TableDeclaration) -> Self {
        Self::new(
            CandidateObjectKind::Table,
            catalog_entry_id,
            &[
                &declaration.database_name,
                &declaration.schema_name,
                &declaration.table_name,
            ],
        )
    }
}

/// A ranked completion candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
    pub completion_text: String,
    pub kind: CandidateKind,
    /// Union of the tags of every source that produced this text
    pub combined_name_tags: NameTags,
    pub score: u32,
    pub match_tier: MatchTier,
    /// Whether the name belongs to the cursor's statement or script
    pub near_cursor: bool,
    /// Text range the completion replaces
    pub replace_text_at: Location,
    /// Filter templates registered scripts apply to this column
    pub filter_templates: Vec<String>,
    /// Objects with this name, in ranked catalog order
    pub catalog_objects: Vec<CandidateObject>,
}

/// The edit derived from a selected candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionSelection {
    pub candidate_id: usize,
    pub catalog_object_id: Option<usize>,
    /// Text replacing `replace_text_at`
    pub insert_text: String,
    pub replace_text_at: Location,
    /// Cursor offset once the edit is applied
    pub cursor_after: u32,
}

/// Result of a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub strategy: CompletionStrategy,
    pub text_offset: u32,
    /// Text typed before the cursor
    pub prefix: String,
    /// Names typed before the one under the cursor, e.g. `["t"]` for `t.a`
    pub qualifier: Vec<String>,
    pub candidates: Vec<CompletionCandidate>,
    pub selection: Option<CompletionSelection>,
}

impl Completion {
    fn empty(strategy: CompletionStrategy, text_offset: u32, qualifier: Vec<String>) -> Self {
        Self {
            strategy,
            text_offset,
            prefix: String::new(),
            qualifier,
            candidates: Vec::new(),
            selection: None,
        }
    }

    /// Select a candidate by its position
    ///
    /// Names are quoted when they would not scan back unchanged. Returns
    /// `None` for an unknown candidate.
    pub fn select_candidate(&self, candidate_id: usize) -> Option<Completion> {
        let candidate = self.candidates.get(candidate_id)?;
        let insert_text = match candidate.kind {
            CandidateKind::Keyword | CandidateKind::Function => candidate.completion_text.clone(),
            _ => quote_name(&candidate.completion_text),
        };
        Some(self.with_selection(candidate_id, None, insert_text))
    }

    /// Select one of the objects behind a candidate
    ///
    /// Without a typed qualifier the object is inserted with its qualified
    /// name, skipping empty qualifiers. After a qualifier only the name is
    /// inserted.
    pub fn select_catalog_object(&self, candidate_id: usize, object_id: usize) -> Option<Completion> {
        let candidate = self.candidates.get(candidate_id)?;
        let object = candidate.catalog_objects.get(object_id)?;
        let insert_text = if self.qualifier.is_empty() {
            object
                .qualified_name
                .iter()
                .filter(|name| !name.is_empty())
                .map(|name| quote_name(name))
                .collect::<Vec<_>>()
                .join(".")
        } else {
            quote_name(&candidate.completion_text)
        };
        Some(self.with_selection(candidate_id, Some(object_id), insert_text))
    }

    fn with_selection(
        &self,
        candidate_id: usize,
        catalog_object_id: Option<usize>,
        insert_text: String,
    ) -> Completion {
        let replace_text_at = self.candidates[candidate_id].replace_text_at;
        let cursor_after = replace_text_at.offset + insert_text.len() as u32;
        debug!(candidate_id, ?catalog_object_id, insert = %insert_text, "Selected completion candidate");
        Completion {
            selection: Some(CompletionSelection {
                candidate_id,
                catalog_object_id,
                insert_text,
                replace_text_at,
                cursor_after,
            }),
            ..self.clone()
        }
    }
}

/// Quote a name that would not scan back as the same identifier
pub fn quote_name(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain && keyword_category(name) != Some(KeywordCategory::Reserved) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Inputs shared by all candidate sources
pub struct CompletionSources<'a> {
    pub analyzed: Option<&'a AnalyzedScript>,
    pub catalog: &'a Catalog,
    pub registry: Option<&'a ScriptRegistry>,
    pub functions: &'a FunctionRegistry,
}

/// Complete the token under the cursor
///
/// Returns an empty result when the cursor sits in whitespace or on a token
/// that cannot start a name.
pub fn complete_at_cursor(
    cursor: &ScriptCursor,
    sources: &CompletionSources<'_>,
    limit: usize,
) -> Completion {
    let qualifier = match &cursor.context {
        CursorContext::TableRef { qualifier, .. } | CursorContext::ColumnRef { qualifier, .. } => {
            qualifier.clone()
        }
        CursorContext::None => Vec::new(),
    };
    let strategy = match &cursor.context {
        CursorContext::TableRef { .. } => CompletionStrategy::TableRef,
        CursorContext::ColumnRef { qualifier, .. } if !qualifier.is_empty() => {
            CompletionStrategy::QualifiedColumn
        }
        CursorContext::ColumnRef { .. } => CompletionStrategy::ColumnRef,
        CursorContext::None => CompletionStrategy::Default,
    };
    let Some((prefix, replace_text_at)) = typed_prefix(cursor) else {
        return Completion::empty(strategy, cursor.text_offset, qualifier);
    };

    let mut collector = CandidateCollector::new(strategy, &prefix, replace_text_at);
    match &cursor.context {
        CursorContext::None => collect_default(&mut collector, cursor, sources),
        CursorContext::TableRef { qualifier, .. } => {
            collect_tables(&mut collector, cursor, sources, qualifier)
        }
        CursorContext::ColumnRef { qualifier, .. } if qualifier.is_empty() => {
            collect_columns(&mut collector, cursor, sources)
        }
        CursorContext::ColumnRef { qualifier, .. } => {
            collect_qualified_columns(&mut collector, cursor, sources, qualifier)
        }
    }

    let mut candidates = collector.finish();
    let total = candidates.len();
    candidates.truncate(limit);
    debug!(
        ?strategy,
        prefix = %prefix,
        total,
        returned = candidates.len(),
        "Completed at cursor"
    );
    Completion {
        strategy,
        text_offset: cursor.text_offset,
        prefix,
        qualifier,
        candidates,
        selection: None,
    }
}

/// Typed prefix and replacement range, `None` if nothing can be completed here
fn typed_prefix(cursor: &ScriptCursor) -> Option<(String, Location)> {
    if !cursor.is_within_symbol() {
        return None;
    }
    let location = cursor.token_location?;
    match cursor.token_type? {
        TokenType::Identifier | TokenType::QuotedIdentifier | TokenType::Keyword => {
            let typed = cursor.text_offset.saturating_sub(location.offset) as usize;
            let prefix = cursor
                .token_text
                .get(..typed)
                .unwrap_or(&cursor.token_text)
                .trim_start_matches(['"', '`']);
            Some((prefix.to_string(), location))
        }
        TokenType::Dot | TokenType::DotTrailing if cursor.text_offset == location.end() => {
            Some((String::new(), Location::new(location.end(), 0)))
        }
        _ => None,
    }
}

struct CandidateCollector<'p> {
    strategy: CompletionStrategy,
    prefix: &'p str,
    replace_text_at: Location,
    by_text: HashMap<String, usize>,
    candidates: Vec<CompletionCandidate>,
}

impl<'p> CandidateCollector<'p> {
    fn new(strategy: CompletionStrategy, prefix: &'p str, replace_text_at: Location) -> Self {
        Self {
            strategy,
            prefix,
            replace_text_at,
            by_text: HashMap::new(),
            candidates: Vec::new(),
        }
    }

    fn category_bonus(&self, kind: CandidateKind) -> u32 {
        use CandidateKind as K;
        use CompletionStrategy as S;
        match (self.strategy, kind) {
            (S::TableRef, K::Table) => 30,
            (S::TableRef, K::Schema | K::Database) => 20,
            (S::ColumnRef | S::QualifiedColumn, K::Column) => 30,
            (S::ColumnRef, K::TableAlias | K::Table) => 20,
            (S::ColumnRef, K::Function) => 10,
            (S::Default, K::Keyword) => 30,
            (S::Default, K::Name) => 20,
            (S::Default, K::Table) => 10,
            _ => 0,
        }
    }

    fn add(&mut self, text: &str, kind: CandidateKind, tags: NameTags, near_cursor: bool) {
        self.add_candidate(text, kind, tags, near_cursor, Vec::new(), None);
    }

    fn add_object(
        &mut self,
        text: &str,
        kind: CandidateKind,
        tags: NameTags,
        near_cursor: bool,
        object: CandidateObject,
    ) {
        self.add_candidate(text, kind, tags, near_cursor, Vec::new(), Some(object));
    }

    fn add_candidate(
        &mut self,
        text: &str,
        kind: CandidateKind,
        tags: NameTags,
        near_cursor: bool,
        filter_templates: Vec<String>,
        object: Option<CandidateObject>,
    ) {
        if text.is_empty() {
            return;
        }
        let Some(tier) = match_tier(text, self.prefix) else {
            return;
        };
        let score = TIER_WEIGHT * tier as u32
            + self.category_bonus(kind)
            + if near_cursor { PROXIMITY_BONUS } else { 0 }
            + if filter_templates.is_empty() { 0 } else { USAGE_BONUS };

        if let Some(index) = self.by_text.get(text) {
            let existing = &mut self.candidates[*index];
            existing.combined_name_tags |= tags;
            existing.near_cursor |= near_cursor;
            if score > existing.score {
                existing.score = score;
                existing.kind = kind;
            }
            for template in filter_templates {
                if !existing.filter_templates.contains(&template) {
                    existing.filter_templates.push(template);
                }
            }
            if let Some(object) = object {
                if !existing.catalog_objects.contains(&object) {
                    existing.catalog_objects.push(object);
                }
            }
            return;
        }
        self.by_text.insert(text.to_string(), self.candidates.len());
        self.candidates.push(CompletionCandidate {
            completion_text: text.to_string(),
            kind,
            combined_name_tags: tags,
            score,
            match_tier: tier,
            near_cursor,
            replace_text_at: self.replace_text_at,
            filter_templates,
            catalog_objects: object.into_iter().collect(),
        });
    }

    fn finish(mut self) -> Vec<CompletionCandidate> {
        self.candidates.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.completion_text.cmp(&b.completion_text))
        });
        self.candidates
    }
}

fn statement_tables<'a>(
    cursor: &ScriptCursor,
    analyzed: Option<&'a AnalyzedScript>,
) -> Vec<&'a TableReference> {
    match (analyzed, cursor.statement_id) {
        (Some(analyzed), Some(statement_id)) => {
            analyzed.table_references_of(statement_id).collect()
        }
        _ => Vec::new(),
    }
}

fn collect_default(
    collector: &mut CandidateCollector<'_>,
    cursor: &ScriptCursor,
    sources: &CompletionSources<'_>,
) {
    for keyword in KeywordProvider::new()
        .keywords_for(cursor.statement_type)
        .keywords
    {
        collector.add(&keyword.label, CandidateKind::Keyword, NameTags::KEYWORD, false);
    }

    if let Some(analyzed) = sources.analyzed {
        let scanned = &analyzed.parsed.scanned;
        let statement = cursor
            .statement_id
            .and_then(|id| analyzed.parsed.statements.get(id as usize));
        for (name_id, entry) in scanned.names.iter() {
            // Skip the partial word being typed
            if entry.occurrences <= 1 && Some(entry.location) == cursor.token_location {
                continue;
            }
            let tags = entry.tags
                | analyzed
                    .name_tags
                    .get(name_id as usize)
                    .copied()
                    .unwrap_or_default();
            if tags == NameTags::KEYWORD {
                continue;
            }
            let near = statement.is_some_and(|s| s.location.contains(entry.location.offset));
            collector.add(&entry.text, CandidateKind::Name, tags, near);
        }
    }

    for (entry, table) in sources.catalog.ranked_tables() {
        collector.add_object(
            &table.declaration.table_name,
            CandidateKind::Table,
            NameTags::TABLE_NAME,
            false,
            CandidateObject::table(Some(entry.entry_id), &table.declaration),
        );
    }
}

fn collect_tables(
    collector: &mut CandidateCollector<'_>,
    cursor: &ScriptCursor,
    sources: &CompletionSources<'_>,
    qualifier: &[String],
) {
    let matches_path = |database: &str, schema: &str| match qualifier {
        [] => true,
        [name] => names_match(schema, name) || names_match(database, name),
        [db, sc] => names_match(database, db) && names_match(schema, sc),
        _ => false,
    };

    for (entry, table) in sources.catalog.ranked_tables() {
        let d = &table.declaration;
        let entry_id = Some(entry.entry_id);
        let database = CandidateObject::new(CandidateObjectKind::Database, entry_id, &[&d.database_name]);
        let schema = CandidateObject::new(
            CandidateObjectKind::Schema,
            entry_id,
            &[&d.database_name, &d.schema_name],
        );
        match qualifier {
            [] => {
                collector.add_object(&d.database_name, CandidateKind::Database, NameTags::DATABASE_NAME, false, database);
                collector.add_object(&d.schema_name, CandidateKind::Schema, NameTags::SCHEMA_NAME, false, schema);
            }
            // `db.` may continue with a schema
            [name] if names_match(&d.database_name, name) => {
                collector.add_object(&d.schema_name, CandidateKind::Schema, NameTags::SCHEMA_NAME, false, schema);
            }
            _ => {}
        }
        if matches_path(&d.database_name, &d.schema_name) {
            collector.add_object(
                &d.table_name,
                CandidateKind::Table,
                NameTags::TABLE_NAME,
                false,
                CandidateObject::table(entry_id, d),
            );
        }
    }

    let Some(analyzed) = sources.analyzed else {
        return;
    };
    // Tables declared by the script itself
    for declaration in &analyzed.table_declarations {
        if matches_path(&declaration.database_name, &declaration.schema_name) {
            collector.add_object(
                &declaration.table_name,
                CandidateKind::Table,
                NameTags::TABLE_NAME,
                true,
                CandidateObject::table(None, declaration),
            );
        }
    }
    if qualifier.is_empty() {
        for table in statement_tables(cursor, Some(analyzed)) {
            if let sqlscript_semantic::TableSource::Cte { name } = &table.source {
                let cte = CandidateObject::new(CandidateObjectKind::Table, None, &[name]);
                collector.add_object(name, CandidateKind::Table, NameTags::TABLE_NAME, true, cte);
            }
        }
    }
}

/// Filter templates other scripts use for a column of a resolved table
fn column_templates(
    sources: &CompletionSources<'_>,
    table: &TableReference,
    column_id: usize,
) -> Vec<String> {
    let (Some(registry), Some(resolved)) = (sources.registry, table.resolved_table()) else {
        return Vec::new();
    };
    registry
        .find_column_info(resolved.catalog_table_id, column_id as u32, None)
        .map(|info| {
            info.filter_templates
                .into_iter()
                .map(|t| t.template_text)
                .collect()
        })
        .unwrap_or_default()
}

fn add_columns_of(
    collector: &mut CandidateCollector<'_>,
    sources: &CompletionSources<'_>,
    table: &TableReference,
) {
    let entry_id = table.resolved_table().map(|r| r.catalog_entry_id);
    for (column_id, column) in table.column_names.iter().enumerate() {
        let templates = column_templates(sources, table, column_id);
        let object = table
            .visible_name()
            .map(|name| CandidateObject::new(CandidateObjectKind::Column, entry_id, &[name, column.as_str()]));
        collector.add_candidate(column, CandidateKind::Column, NameTags::COLUMN_NAME, true, templates, object);
    }
}

fn collect_columns(
    collector: &mut CandidateCollector<'_>,
    cursor: &ScriptCursor,
    sources: &CompletionSources<'_>,
) {
    let tables = statement_tables(cursor, sources.analyzed);
    for table in &tables {
        add_columns_of(collector, sources, table);
        if let Some(name) = table.visible_name() {
            let (kind, tags) = if table.alias.is_some() {
                (CandidateKind::TableAlias, NameTags::TABLE_ALIAS)
            } else {
                (CandidateKind::Table, NameTags::TABLE_NAME)
            };
            collector.add(name, kind, tags, true);
        }
    }
    if tables.is_empty() {
        for (entry, table) in sources.catalog.ranked_tables() {
            collector.add_object(
                &table.declaration.table_name,
                CandidateKind::Table,
                NameTags::TABLE_NAME,
                false,
                CandidateObject::table(Some(entry.entry_id), &table.declaration),
            );
        }
    }
    for function in sources.functions.functions() {
        collector.add(&function.name, CandidateKind::Function, NameTags::FUNCTION_NAME, false);
    }
    for keyword in KeywordProvider::new().expression_keywords().keywords {
        collector.add(&keyword.label, CandidateKind::Keyword, NameTags::KEYWORD, false);
    }
}

fn collect_qualified_columns(
    collector: &mut CandidateCollector<'_>,
    cursor: &ScriptCursor,
    sources: &CompletionSources<'_>,
    qualifier: &[String],
) {
    let tables: Vec<&TableReference> = statement_tables(cursor, sources.analyzed)
        .into_iter()
        .filter(|t| matches_qualifier(t, qualifier))
        .collect();
    if !tables.is_empty() {
        for table in tables {
            add_columns_of(collector, sources, table);
        }
        return;
    }

    // Not a table of the statement, try the catalog
    let Some(name) = QualifiedTableName::from_path(qualifier) else {
        return;
    };
    let matches = sources.catalog.resolve_table(&name, None);
    if let Some(best) = matches.best() {
        let d = &best.table.declaration;
        for column in &d.columns {
            let object = CandidateObject::new(
                CandidateObjectKind::Column,
                Some(best.entry_id),
                &[&d.database_name, &d.schema_name, &d.table_name, &column.name],
            );
            collector.add_object(&column.name, CandidateKind::Column, NameTags::COLUMN_NAME, false, object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonuses_stay_below_one_tier() {
        let collector = CandidateCollector::new(CompletionStrategy::ColumnRef, "", Location::default());
        let best = collector.category_bonus(CandidateKind::Column) + PROXIMITY_BONUS + USAGE_BONUS;
        assert!(best < TIER_WEIGHT);
    }

    #[test]
    fn test_duplicates_merge_tags() {
        let mut collector = CandidateCollector::new(CompletionStrategy::Default, "na", Location::new(0, 2));
        collector.add("name", CandidateKind::Name, NameTags::COLUMN_NAME, true);
        collector.add("name", CandidateKind::Table, NameTags::TABLE_NAME, false);
        collector.add("other", CandidateKind::Name, NameTags::COLUMN_NAME, true);
        let candidates = collector.finish();
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].combined_name_tags,
            NameTags::COLUMN_NAME | NameTags::TABLE_NAME
        );
        assert!(candidates[0].near_cursor);
        assert_eq!(candidates[0].score, 300 + 20 + 40);
    }

    #[test]
    fn test_ordering() {
        let mut collector = CandidateCollector::new(CompletionStrategy::ColumnRef, "Cu", Location::default());
        collector.add("cust", CandidateKind::Column, NameTags::COLUMN_NAME, true);
        collector.add("Cube", CandidateKind::Function, NameTags::FUNCTION_NAME, false);
        collector.add("Curve", CandidateKind::Function, NameTags::FUNCTION_NAME, false);
        collector.add("occur", CandidateKind::Column, NameTags::COLUMN_NAME, true);
        let texts: Vec<_> = collector.finish().into_iter().map(|c| c.completion_text).collect();
        assert_eq!(texts, vec!["Cube", "Curve", "cust", "occur"]);
    }
}
