// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Analyzer integration tests

use sqlscript_catalog::{Catalog, ColumnDescriptor, SchemaDescriptor, TableDescriptor};
use sqlscript_function_registry::FunctionRegistry;
use sqlscript_grammar::{parse, scan};
use sqlscript_ir::{
    CatalogEntryId, DiagnosticCode, ExpressionOperator, ExternalObjectId, NameTags, Severity,
};
use sqlscript_semantic::{AnalyzedScript, Analyzer, ExpressionKind, TableSource};
use std::sync::Arc;

fn analyze(catalog: &Catalog, entry_id: CatalogEntryId, text: &str) -> AnalyzedScript {
    let parsed = Arc::new(parse(Arc::new(scan(text, 0))));
    Analyzer::analyze(parsed, catalog, entry_id, &FunctionRegistry::new())
}

/// Catalog with `foo(a, b)` and `bar(a, c)` in a descriptor pool
fn pool_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(100, 10).unwrap();
    let table = |name: &str, columns: &[&str]| {
        TableDescriptor::new(name)
            .with_columns(columns.iter().map(|c| ColumnDescriptor::new(*c)).collect())
    };
    catalog
        .add_schema_descriptor(
            100,
            &SchemaDescriptor::new("", "").with_tables(vec![
                table("foo", &["a", "b"]),
                table("bar", &["a", "c"]),
            ]),
        )
        .unwrap();
    catalog
}

fn codes(analyzed: &AnalyzedScript) -> Vec<DiagnosticCode> {
    analyzed.diagnostics.iter().map(|d| d.code).collect()
}

fn tags_of(analyzed: &AnalyzedScript, name: &str) -> NameTags {
    let id = analyzed.parsed.scanned.names.lookup(name).unwrap();
    analyzed.name_tags[id as usize]
}

#[test]
fn test_resolution_against_loaded_script() {
    let mut catalog = Catalog::new();
    let schema = analyze(&catalog, 1, "create table foo(a int);");
    assert!(schema.diagnostics.is_empty());
    catalog
        .load_script(1, 1, 0, schema.table_declarations.clone())
        .unwrap();

    let analyzed = analyze(&catalog, 2, "select * from foo where a < 3");
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    assert_eq!(analyzed.expressions.len(), 3);
    assert!(matches!(analyzed.expressions[0].kind, ExpressionKind::ColumnRef(_)));
    assert!(matches!(analyzed.expressions[1].kind, ExpressionKind::Literal { .. }));
    assert!(matches!(
        analyzed.expressions[2].kind,
        ExpressionKind::Comparison {
            operator: ExpressionOperator::Lt,
            ..
        }
    ));

    assert_eq!(analyzed.column_filters.len(), 1);
    let filter = analyzed.column_filters[0];
    assert_eq!(filter.root_expression_id, 2);
    let column = analyzed
        .expression(filter.column_reference_expression_id)
        .unwrap()
        .column_ref()
        .unwrap();
    let resolved = column.resolved.unwrap();
    assert_eq!(resolved.catalog_table_id, ExternalObjectId::new(1, 0));
    assert_eq!(resolved.column_id, 0);
    assert_eq!(resolved.referenced_catalog_version, catalog.version());

    let table = analyzed
        .table_reference(resolved.table_reference_id)
        .unwrap()
        .resolved_table()
        .unwrap();
    assert_eq!(table.table_name.table, "foo");
    assert_eq!(table.catalog_entry_id, 1);
}

#[test]
fn test_own_catalog_entry_is_ignored() {
    let mut catalog = Catalog::new();
    let schema = analyze(&catalog, 1, "create table foo(a int)");
    catalog
        .load_script(1, 1, 0, schema.table_declarations.clone())
        .unwrap();

    let analyzed = analyze(&catalog, 1, "select a from foo");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::UnresolvedTable]);
}

#[test]
fn test_local_declaration_shadows_catalog() {
    let catalog = pool_catalog();
    let analyzed = analyze(&catalog, 7, "create table foo (z int); select z from foo");
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    let table = analyzed.table_references[0].resolved_table().unwrap();
    assert_eq!(table.catalog_entry_id, 7);
    assert_eq!(table.catalog_table_id, ExternalObjectId::new(7, 0));
}

#[test]
fn test_unresolved_table_suggestion() {
    let analyzed = analyze(&pool_catalog(), 1, "select a from fooo");
    assert_eq!(analyzed.diagnostics.len(), 1);
    assert_eq!(analyzed.diagnostics[0].code, DiagnosticCode::UnresolvedTable);
    assert!(analyzed.diagnostics[0].message.contains("did you mean 'foo'"));
    assert!(matches!(analyzed.table_references[0].source, TableSource::Unresolved));
}

#[test]
fn test_ambiguous_column() {
    let analyzed = analyze(&pool_catalog(), 1, "select a, b, c from foo, bar");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::AmbiguousColumn]);
}

#[test]
fn test_qualified_columns() {
    let analyzed = analyze(&pool_catalog(), 1, "select foo.a, bar.a from foo, bar");
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    let tables: Vec<_> = analyzed
        .expressions
        .iter()
        .filter_map(|e| e.column_ref()?.resolved)
        .map(|r| r.table_reference_id)
        .collect();
    assert_eq!(tables, vec![0, 1]);
}

#[test]
fn test_alias_hides_table_name() {
    let analyzed = analyze(&pool_catalog(), 1, "select f.a, foo.b from foo f");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::UnresolvedColumn]);
    assert!(analyzed.diagnostics[0].message.contains("missing FROM-clause entry"));
    assert!(tags_of(&analyzed, "f").contains(NameTags::TABLE_ALIAS));
    assert!(tags_of(&analyzed, "foo").contains(NameTags::TABLE_NAME));
    assert!(tags_of(&analyzed, "a").contains(NameTags::COLUMN_NAME));
}

#[test]
fn test_duplicate_alias() {
    let analyzed = analyze(&pool_catalog(), 1, "select 1 from foo x, bar x");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::DuplicateTableAlias]);
}

#[test]
fn test_cte_resolution() {
    let analyzed = analyze(
        &pool_catalog(),
        1,
        "with t (x) as (select a from foo) select x from t where x = 1",
    );
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    let cte_reference = analyzed
        .table_references
        .iter()
        .find(|t| matches!(t.source, TableSource::Cte { .. }))
        .unwrap();
    assert_eq!(cte_reference.column_names, vec!["x".to_string()]);

    let filter = analyzed.column_filters[0];
    let column = analyzed
        .expression(filter.column_reference_expression_id)
        .unwrap()
        .column_ref()
        .unwrap();
    assert!(column.resolved.unwrap().catalog_table_id.is_null());
}

#[test]
fn test_correlated_subquery() {
    let analyzed = analyze(
        &pool_catalog(),
        1,
        "select b from foo where exists (select 1 from bar where bar.c = foo.b)",
    );
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
}

#[test]
fn test_derived_table_columns() {
    let analyzed = analyze(
        &pool_catalog(),
        1,
        "select d.x, y from (select a as x, b + 1 as y from foo) d",
    );
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    let derived = analyzed
        .table_references
        .iter()
        .find(|t| t.source == TableSource::Derived)
        .unwrap();
    assert_eq!(derived.column_names, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(analyzed.column_computations.len(), 1);
}

#[test]
fn test_output_alias_in_order_by() {
    let analyzed = analyze(&pool_catalog(), 1, "select a as k, b as m from foo order by m, k");
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);

    let target_of = |name: &str| {
        analyzed
            .expressions
            .iter()
            .filter_map(|e| e.column_ref())
            .find(|c| c.column_name == name)
            .unwrap()
            .clone()
    };
    let m = target_of("m");
    assert_eq!(m.result_target, Some(1));
    assert!(m.resolved.is_none());
    assert!(m.is_resolved());
    assert_eq!(target_of("k").result_target, Some(0));

    // Table columns still win over result columns
    let a = target_of("a");
    assert!(a.resolved.is_some());
    assert_eq!(a.result_target, None);
}

#[test]
fn test_output_alias_in_group_by() {
    let analyzed = analyze(&pool_catalog(), 1, "select b + 1 as k from foo group by k");
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    let k = analyzed
        .expressions
        .iter()
        .filter_map(|e| e.column_ref())
        .find(|c| c.column_name == "k")
        .unwrap();
    assert_eq!(k.result_target, Some(0));
}

#[test]
fn test_unknown_order_by_name_is_reported() {
    let analyzed = analyze(&pool_catalog(), 1, "select a as k from foo order by z");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::UnresolvedColumn]);
    let z = analyzed
        .expressions
        .iter()
        .filter_map(|e| e.column_ref())
        .find(|c| c.column_name == "z")
        .unwrap();
    assert!(!z.is_resolved());
}

#[test]
fn test_filter_shapes() {
    let analyzed = analyze(
        &pool_catalog(),
        1,
        "select 1 from foo where a between 1 and 2 or b in (1, 2) or a is null \
         or 3 > b or a = b or a like 'x%'",
    );
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    assert_eq!(analyzed.column_filters.len(), 5);
}

#[test]
fn test_function_resolution() {
    let analyzed = analyze(&pool_catalog(), 1, "select coalesce(a, 1), nosuch(b) from foo");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::UnresolvedFunction]);
    assert_eq!(analyzed.diagnostics[0].severity, Severity::Warning);
    assert!(analyzed.function_references[0].resolved.is_some());
    assert!(analyzed.function_references[1].resolved.is_none());
    assert!(tags_of(&analyzed, "coalesce").contains(NameTags::FUNCTION_NAME));
}

#[test]
fn test_constant_expressions() {
    let analyzed = analyze(
        &pool_catalog(),
        1,
        "select a + (1 + 2), upper('x'), count(*) from foo",
    );
    let constants: Vec<&str> = analyzed
        .constant_expressions
        .iter()
        .map(|id| analyzed.expression_text(*id))
        .collect();
    assert_eq!(constants, vec!["1 + 2", "upper('x')"]);
}

#[test]
fn test_statement_liveness() {
    let analyzed = analyze(
        &Catalog::new(),
        1,
        "create table t1 (x int); create table t2 (y int); select x from t1; drop table t2",
    );
    let live: Vec<bool> = analyzed.statements.iter().map(|s| s.is_live).collect();
    assert_eq!(live, vec![true, true, true, true]);
    assert_eq!(analyzed.statements[0].consumed_by, vec![2]);
    assert_eq!(analyzed.statements[1].consumed_by, vec![3]);

    let analyzed = analyze(&Catalog::new(), 1, "create table t1 (x int); select 1");
    assert!(!analyzed.statements[0].is_live);
}

#[test]
fn test_duplicate_declaration() {
    let analyzed = analyze(&Catalog::new(), 1, "create table t (a int); create table t (b int)");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::DuplicateTableDeclaration]);
    assert_eq!(analyzed.diagnostics[0].statement_id, Some(1));
}

#[test]
fn test_view_and_ctas_columns() {
    let analyzed = analyze(
        &pool_catalog(),
        1,
        "create view v (x) as select a, b from foo; create table c as select b, a + 1 as s from foo; \
         select x, b from v; select s from c",
    );
    assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
    let view = &analyzed.table_declarations[0];
    assert!(view.is_view);
    let names: Vec<_> = view.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["x", "b"]);
    let ctas: Vec<_> = analyzed.table_declarations[1]
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(ctas, vec!["b", "s"]);
}

#[test]
fn test_insert_and_delete() {
    let analyzed = analyze(
        &pool_catalog(),
        1,
        "insert into foo (a, zz) values (1, 2); delete from bar where c = 4",
    );
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::UnresolvedColumn]);
    assert_eq!(analyzed.diagnostics[0].statement_id, Some(0));
    assert_eq!(analyzed.column_filters.len(), 1);
}

#[test]
fn test_drop_if_exists() {
    let analyzed = analyze(&Catalog::new(), 1, "drop table if exists missing; drop table gone");
    assert_eq!(codes(&analyzed), vec![DiagnosticCode::UnresolvedTable]);
    assert_eq!(analyzed.diagnostics[0].statement_id, Some(1));
}

#[test]
fn test_serializes_to_json() {
    let analyzed = analyze(&pool_catalog(), 1, "select a from foo where a = 1");
    let json = serde_json::to_value(&analyzed).unwrap();
    assert_eq!(json["column_filters"].as_array().unwrap().len(), 1);
    assert_eq!(json["table_references"][0]["source"]["kind"], "TABLE");
}
