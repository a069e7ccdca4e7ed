// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Column reference resolution
//!
//! Resolves a possibly qualified column name against the table references
//! visible from a scope:
//! - qualified names pick the table whose alias (or, without alias, name)
//!   matches the qualifier, searching scopes from the innermost outward
//! - unqualified names search every table of a scope in FROM order and only
//!   move to the enclosing scope when nothing matched
//! - names match exactly first, then ASCII case-insensitively
//!
//! Misses come with a "did you mean" suggestion based on edit distance.

use crate::analyzed::{TableReference, TableSource};
use crate::scope::ScopeManager;
use sqlscript_catalog::names_match;
use sqlscript_ir::TableReferenceId;
use std::cmp::{max, min};

/// Maximum edit distance for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 2;
/// Minimum similarity for suggestions
const MIN_SIMILARITY: f64 = 0.5;

/// Outcome of resolving a column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnResolution {
    Found {
        table_reference_id: TableReferenceId,
        column_id: u32,
    },
    /// Column exists in several tables of the nearest matching scope
    Ambiguous { candidates: Vec<TableReferenceId> },
    /// No table in scope has the column
    NotFound { suggestion: Option<String> },
    /// The qualifier names no table in scope
    UnknownQualifier { suggestion: Option<String> },
    /// A table that might hold the column is itself unresolved
    Unknown,
}

/// Index of a column name in a list, exact match first
pub fn find_column_index(columns: &[String], name: &str) -> Option<u32> {
    columns
        .iter()
        .position(|c| c == name)
        .or_else(|| columns.iter().position(|c| names_match(c, name)))
        .map(|i| i as u32)
}

/// Whether a table reference answers to a qualifier path such as `t` or `s.t`
pub fn matches_qualifier(table: &TableReference, qualifier: &[String]) -> bool {
    let Some((last, prefix)) = qualifier.split_last() else {
        return false;
    };
    if let Some(alias) = &table.alias {
        return prefix.is_empty() && names_match(alias, last);
    }
    let written = match &table.table_name {
        Some(name) => name,
        None => return false,
    };
    if !names_match(&written.table, last) {
        return false;
    }
    // Compare the remaining qualifiers against the fully qualified name when known
    let full = table
        .resolved_table()
        .map(|r| &r.table_name)
        .unwrap_or(written);
    let parts = [&full.database, &full.schema];
    match prefix {
        [] => true,
        [schema] => parts[1].as_deref().is_none_or(|s| names_match(s, schema)),
        [database, schema] => {
            parts[0].as_deref().is_none_or(|d| names_match(d, database))
                && parts[1].as_deref().is_none_or(|s| names_match(s, schema))
        }
        _ => false,
    }
}

fn columns_known(table: &TableReference) -> bool {
    !matches!(table.source, TableSource::Unresolved)
}

/// Resolves column names against the scopes of one script
pub struct ColumnResolver<'a> {
    scopes: &'a ScopeManager,
    tables: &'a [TableReference],
}

impl<'a> ColumnResolver<'a> {
    pub fn new(scopes: &'a ScopeManager, tables: &'a [TableReference]) -> Self {
        Self { scopes, tables }
    }

    fn table(&self, id: TableReferenceId) -> Option<&'a TableReference> {
        self.tables.get(id as usize)
    }

    /// Resolve `qualifier.column` from `scope_id`
    pub fn resolve_column(
        &self,
        qualifier: &[String],
        column: &str,
        scope_id: usize,
    ) -> ColumnResolution {
        if qualifier.is_empty() {
            self.resolve_unqualified(column, scope_id)
        } else {
            self.resolve_qualified(qualifier, column, scope_id)
        }
    }

    fn resolve_qualified(
        &self,
        qualifier: &[String],
        column: &str,
        scope_id: usize,
    ) -> ColumnResolution {
        for scope in self.scopes.chain(scope_id) {
            let matching: Vec<&TableReference> = scope
                .tables
                .iter()
                .filter_map(|id| self.table(*id))
                .filter(|t| matches_qualifier(t, qualifier))
                .collect();
            match matching.as_slice() {
                [] => continue,
                [table] => {
                    if !columns_known(table) {
                        return ColumnResolution::Unknown;
                    }
                    return match find_column_index(&table.column_names, column) {
                        Some(column_id) => ColumnResolution::Found {
                            table_reference_id: table.table_reference_id,
                            column_id,
                        },
                        None => ColumnResolution::NotFound {
                            suggestion: suggest(column, table.column_names.iter())
                                .map(str::to_string),
                        },
                    };
                }
                tables => {
                    return ColumnResolution::Ambiguous {
                        candidates: tables.iter().map(|t| t.table_reference_id).collect(),
                    };
                }
            }
        }
        let visible: Vec<&str> = self
            .visible_tables(scope_id)
            .filter_map(|t| t.visible_name())
            .collect();
        let last = qualifier.last().map(String::as_str).unwrap_or_default();
        ColumnResolution::UnknownQualifier {
            suggestion: suggest(last, visible.into_iter()).map(str::to_string),
        }
    }

    fn resolve_unqualified(&self, column: &str, scope_id: usize) -> ColumnResolution {
        for scope in self.scopes.chain(scope_id) {
            let mut found = Vec::new();
            let mut incomplete = false;
            for table in scope.tables.iter().filter_map(|id| self.table(*id)) {
                if !columns_known(table) {
                    incomplete = true;
                    continue;
                }
                if let Some(column_id) = find_column_index(&table.column_names, column) {
                    found.push((table.table_reference_id, column_id));
                }
            }
            match found.as_slice() {
                [(table_reference_id, column_id)] => {
                    return ColumnResolution::Found {
                        table_reference_id: *table_reference_id,
                        column_id: *column_id,
                    };
                }
                [] if incomplete => return ColumnResolution::Unknown,
                [] => continue,
                _ => {
                    return ColumnResolution::Ambiguous {
                        candidates: found.iter().map(|(t, _)| *t).collect(),
                    };
                }
            }
        }
        let columns: Vec<&String> = self
            .visible_tables(scope_id)
            .flat_map(|t| t.column_names.iter())
            .collect();
        ColumnResolution::NotFound {
            suggestion: suggest(column, columns.into_iter()).map(str::to_string),
        }
    }

    /// Table a qualifier such as `t` in `t.*` refers to
    pub fn resolve_qualifier(&self, qualifier: &[String], scope_id: usize) -> Option<TableReferenceId> {
        self.scopes.chain(scope_id).find_map(|scope| {
            let mut matching = scope
                .tables
                .iter()
                .filter_map(|id| self.table(*id))
                .filter(|t| matches_qualifier(t, qualifier));
            matching.next().map(|t| t.table_reference_id)
        })
    }

    /// Tables visible from a scope, innermost scope first
    pub fn visible_tables(&self, scope_id: usize) -> impl Iterator<Item = &'a TableReference> + '_ {
        self.scopes
            .chain(scope_id)
            .flat_map(|scope| scope.tables.iter())
            .filter_map(|id| self.table(*id))
    }
}

/// Closest candidate within the suggestion distance
pub fn suggest<'c, S: AsRef<str> + ?Sized + 'c>(
    name: &str,
    candidates: impl Iterator<Item = &'c S>,
) -> Option<&'c str> {
    let needle = name.to_lowercase();
    candidates
        .map(|candidate: &'c S| -> &'c str { candidate.as_ref() })
        .filter_map(|candidate| {
            let lower = candidate.to_lowercase();
            let distance = levenshtein_distance(&needle, &lower);
            let acceptable = distance <= MAX_SUGGESTION_DISTANCE
                && similarity_score(&needle, &lower) >= MIN_SIMILARITY;
            acceptable.then_some((distance, candidate))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// Levenshtein distance with a single row of state
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m < n {
        return levenshtein_distance(b, a);
    }

    let mut previous: Vec<usize> = (0..=n).collect();
    for (i, &ca) in a_chars.iter().enumerate() {
        let mut current = vec![i + 1];
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current.push(min(
                min(previous[j + 1] + 1, current[j] + 1),
                previous[j] + cost,
            ));
        }
        previous = current;
    }
    previous[n]
}

/// Similarity in `0.0..=1.0` based on edit distance
fn similarity_score(a: &str, b: &str) -> f64 {
    let max_len = max(a.chars().count(), b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(a, b) as f64 / max_len as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzed::ResolvedTable;
    use crate::scope::ScopeType;
    use sqlscript_catalog::QualifiedTableName;
    use sqlscript_ir::{ExternalObjectId, Location};

    fn table(id: u32, name: &str, alias: Option<&str>, columns: &[&str]) -> TableReference {
        let table_name = QualifiedTableName::new(name);
        TableReference {
            table_reference_id: id,
            statement_id: 0,
            node_id: 0,
            location: Location::default(),
            table_name: Some(table_name.clone()),
            alias: alias.map(str::to_string),
            source: TableSource::Table(ResolvedTable {
                catalog_entry_id: 1,
                catalog_database_id: 0,
                catalog_schema_id: 0,
                catalog_table_id: ExternalObjectId::new(1, id),
                referenced_catalog_version: 1,
                table_name: table_name.expand("db", "public"),
            }),
            column_names: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn setup() -> (ScopeManager, Vec<TableReference>, usize, usize) {
        let tables = vec![
            table(0, "users", Some("u"), &["id", "name", "email"]),
            table(1, "orders", None, &["id", "user_id", "total"]),
            table(2, "items", None, &["sku", "order_id"]),
        ];
        let mut scopes = ScopeManager::new();
        let outer = scopes.create_scope(ScopeType::Query, None);
        scopes.get_scope_mut(outer).unwrap().add_table(0);
        scopes.get_scope_mut(outer).unwrap().add_table(1);
        let inner = scopes.create_scope(ScopeType::Subquery, Some(outer));
        scopes.get_scope_mut(inner).unwrap().add_table(2);
        (scopes, tables, outer, inner)
    }

    #[test]
    fn test_unqualified_exact_match() {
        let (scopes, tables, outer, _) = setup();
        let resolver = ColumnResolver::new(&scopes, &tables);
        assert_eq!(
            resolver.resolve_column(&[], "total", outer),
            ColumnResolution::Found {
                table_reference_id: 1,
                column_id: 2
            }
        );
    }

    #[test]
    fn test_ambiguous_column() {
        let (scopes, tables, outer, _) = setup();
        let resolver = ColumnResolver::new(&scopes, &tables);
        assert_eq!(
            resolver.resolve_column(&[], "id", outer),
            ColumnResolution::Ambiguous {
                candidates: vec![0, 1]
            }
        );
    }

    #[test]
    fn test_alias_shadows_table_name() {
        let (scopes, tables, outer, _) = setup();
        let resolver = ColumnResolver::new(&scopes, &tables);
        assert!(matches!(
            resolver.resolve_column(&["u".to_string()], "id", outer),
            ColumnResolution::Found {
                table_reference_id: 0,
                ..
            }
        ));
        assert!(matches!(
            resolver.resolve_column(&["users".to_string()], "id", outer),
            ColumnResolution::UnknownQualifier { .. }
        ));
    }

    #[test]
    fn test_schema_qualified() {
        let (scopes, tables, outer, _) = setup();
        let resolver = ColumnResolver::new(&scopes, &tables);
        let path = vec!["public".to_string(), "orders".to_string()];
        assert!(matches!(
            resolver.resolve_column(&path, "total", outer),
            ColumnResolution::Found { .. }
        ));
        let wrong = vec!["other".to_string(), "orders".to_string()];
        assert!(matches!(
            resolver.resolve_column(&wrong, "total", outer),
            ColumnResolution::UnknownQualifier { .. }
        ));
    }

    #[test]
    fn test_outer_scope_fallback() {
        let (scopes, tables, _, inner) = setup();
        let resolver = ColumnResolver::new(&scopes, &tables);
        assert_eq!(
            resolver.resolve_column(&[], "email", inner),
            ColumnResolution::Found {
                table_reference_id: 0,
                column_id: 2
            }
        );
        // Inner scope wins without ambiguity
        assert!(matches!(
            resolver.resolve_column(&[], "sku", inner),
            ColumnResolution::Found {
                table_reference_id: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_case_insensitive_match() {
        let (scopes, tables, outer, _) = setup();
        let resolver = ColumnResolver::new(&scopes, &tables);
        assert!(matches!(
            resolver.resolve_column(&[], "TOTAL", outer),
            ColumnResolution::Found { column_id: 2, .. }
        ));
    }

    #[test]
    fn test_not_found_with_suggestion() {
        let (scopes, tables, outer, _) = setup();
        let resolver = ColumnResolver::new(&scopes, &tables);
        assert_eq!(
            resolver.resolve_column(&[], "emial", outer),
            ColumnResolution::NotFound {
                suggestion: Some("email".to_string())
            }
        );
        assert_eq!(
            resolver.resolve_column(&[], "completely_wrong", outer),
            ColumnResolution::NotFound { suggestion: None }
        );
    }

    #[test]
    fn test_unresolved_table_suppresses_miss() {
        let (scopes, mut tables, outer, _) = setup();
        tables[1].source = TableSource::Unresolved;
        let resolver = ColumnResolver::new(&scopes, &tables);
        assert_eq!(
            resolver.resolve_column(&[], "missing", outer),
            ColumnResolution::Unknown
        );
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
        assert!((similarity_score("abc", "abd") - 2.0 / 3.0).abs() < 1e-9);
    }
}
