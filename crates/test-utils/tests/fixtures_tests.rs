// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! The shared fixtures analyze the way the other crates' tests expect

use sqlscript_catalog::Catalog;
use sqlscript_ir::{DiagnosticCode, NameTags};
use sqlscript_test_utils::{ScriptAssertions, SqlFixtures, analyze_text, tpch_catalog};

#[test]
fn test_tpch_schema_is_clean() {
    let analyzed = analyze_text(&Catalog::new(), 1, SqlFixtures::tpch_schema());
    ScriptAssertions::assert_clean(&analyzed);
    assert_eq!(analyzed.table_declarations.len(), SqlFixtures::TPCH_TABLE_COUNT);
    assert_eq!(analyzed.table_declarations[5].columns.len(), 16);
}

#[test]
fn test_tpch_queries_resolve() {
    let catalog = tpch_catalog(1);
    for query in [
        SqlFixtures::simple_select(),
        SqlFixtures::select_with_where(),
        SqlFixtures::tpch_q3(),
        SqlFixtures::tpch_q5(),
        SqlFixtures::with_cte(),
    ] {
        let analyzed = analyze_text(&catalog, 2, query);
        ScriptAssertions::assert_clean(&analyzed);
        ScriptAssertions::assert_columns_resolved(&analyzed);
    }
}

#[test]
fn test_aliases_are_tagged() {
    let analyzed = analyze_text(&tpch_catalog(1), 2, SqlFixtures::tpch_q5());
    ScriptAssertions::assert_name_tagged(&analyzed, "c", NameTags::TABLE_ALIAS);
    ScriptAssertions::assert_name_tagged(&analyzed, "nation", NameTags::TABLE_NAME);
    ScriptAssertions::assert_name_tagged(&analyzed, "n_name", NameTags::COLUMN_NAME);
}

#[test]
fn test_unknown_tables_in_cursor_script() {
    let analyzed = analyze_text(&Catalog::new(), 1, SqlFixtures::cursor_script());
    ScriptAssertions::assert_codes(
        &analyzed,
        &[DiagnosticCode::UnresolvedTable, DiagnosticCode::UnresolvedTable],
    );
}
