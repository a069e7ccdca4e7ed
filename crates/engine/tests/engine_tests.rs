// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! End-to-end tests through the handle API

use sqlscript_engine::{
    CatalogHandle, Engine, EngineConfig, EngineError, ScriptHandle, ScriptStage,
    get_version_text,
};
use sqlscript_grammar::StatementType;
use sqlscript_ir::{AttributeKey, ExternalObjectId, NodeType};
use sqlscript_semantic::ExpressionKind;
use sqlscript_test_utils::{SchemaDescriptorBuilder, ScriptAssertions, SqlFixtures};

fn script_with(engine: &Engine, catalog: &CatalogHandle, entry_id: u32, text: &str) -> ScriptHandle {
    let script = engine.create_script(catalog, entry_id).unwrap();
    script.insert_text_at(0, text).unwrap();
    script
}

/// Catalog with `text` loaded as script 1
fn catalog_with_schema(engine: &Engine, text: &str) -> (CatalogHandle, ScriptHandle) {
    let catalog = engine.create_catalog();
    let schema = script_with(engine, &catalog, 1, text);
    schema.analyze().unwrap();
    catalog.load_script(&schema, 0).unwrap();
    (catalog, schema)
}

#[test]
fn test_fresh_script_is_empty() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = engine.create_script(&catalog, 1).unwrap();

    assert_eq!(script.to_string().unwrap(), "");
    assert_eq!(script.stage().unwrap(), ScriptStage::Empty);
    let scanned = script.scan().unwrap().read().unwrap();
    assert!(scanned.tokens.is_empty());
    let parsed = script.parse().unwrap().read().unwrap();
    assert!(parsed.nodes.is_empty());
}

#[test]
fn test_use_after_destroy() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = script_with(&engine, &catalog, 1, "select 1");

    script.destroy();
    script.destroy();

    assert!(script.to_string().unwrap_err().is_use_after_free());
    assert!(script.insert_text_at(0, "x").unwrap_err().is_use_after_free());
    assert!(script.erase_text_range(0, 1).unwrap_err().is_use_after_free());
    assert!(script.scan().unwrap_err().is_use_after_free());
    assert!(!script.is_alive());
}

#[test]
fn test_buffer_use_after_destroy() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = script_with(&engine, &catalog, 1, "select 1");
    let scanned = script.scan().unwrap();

    scanned.destroy();
    scanned.destroy();
    assert!(matches!(
        scanned.read(),
        Err(EngineError::UseAfterFree { .. })
    ));
    assert!(scanned.encode().unwrap_err().is_use_after_free());
}

#[test]
fn test_edits_replay() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = engine.create_script(&catalog, 1).unwrap();

    script.insert_text_at(0, "select from t").unwrap();
    script.insert_text_at(7, "a, b ").unwrap();
    script.erase_text_range(8, 3).unwrap();
    script.insert_char_at(0, ' ').unwrap();
    assert_eq!(script.to_string().unwrap(), " select a from t");

    assert!(matches!(
        script.insert_text_at(100, "x"),
        Err(EngineError::InvalidArgument(_))
    ));
    assert!(matches!(
        script.erase_text_range(10, 100),
        Err(EngineError::InvalidArgument(_))
    ));
    assert_eq!(script.to_string().unwrap(), " select a from t");
}

#[test]
fn test_statement_isolation() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = script_with(&engine, &catalog, 1, "select from where; select 1");

    let parsed = script.parse().unwrap().read().unwrap();
    assert_eq!(parsed.statements.len(), 2);
    assert!(!parsed.diagnostics.is_empty());
    let second = &parsed.statements[1];
    assert_eq!(second.statement_type, StatementType::Select);
    assert_eq!(
        parsed.node(second.root).unwrap().node_type,
        NodeType::ObjectSqlSelect
    );
}

#[test]
fn test_resolution_scenario() {
    let engine = Engine::new();
    let (catalog, _schema) = catalog_with_schema(&engine, "create table foo(a int);");
    let query = script_with(&engine, &catalog, 2, "select * from foo where a < 3");

    let analyzed = query.analyze().unwrap().read().unwrap();
    ScriptAssertions::assert_clean(&analyzed);
    assert_eq!(analyzed.expressions.len(), 3);
    assert_eq!(analyzed.column_filters.len(), 1);

    let filter = analyzed.column_filters[0];
    let column = analyzed
        .expression(filter.column_reference_expression_id)
        .unwrap();
    let ExpressionKind::ColumnRef(column) = &column.kind else {
        panic!("filter column is not a column reference");
    };
    let resolved = column.resolved.unwrap();
    assert_eq!(resolved.catalog_table_id, ExternalObjectId::new(1, 0));
    assert_eq!(resolved.referenced_catalog_version, catalog.version().unwrap());
    let table = analyzed
        .table_reference(resolved.table_reference_id)
        .unwrap()
        .resolved_table()
        .unwrap();
    assert_eq!(table.table_name.table, "foo");
}

#[test]
fn test_registry_retraction() {
    let engine = Engine::new();
    let (catalog, _schema) = catalog_with_schema(&engine, "create table foo(a int, b int);");
    let query = script_with(&engine, &catalog, 2, "select b from foo where a < 3");
    query.analyze().unwrap();

    let registry = engine.create_script_registry();
    registry.add_script(&query).unwrap();
    assert!(registry.contains_script(2).unwrap());

    let table_id = ExternalObjectId::new(1, 0);
    let info = registry
        .find_column_info(table_id, 0, None)
        .unwrap()
        .unwrap()
        .read()
        .unwrap();
    assert_eq!(info.filter_templates.len(), 1);

    assert!(registry.remove_script(2).unwrap());
    assert!(registry.find_column_info(table_id, 0, None).unwrap().is_none());
    assert!(registry.find_column_info(table_id, 1, None).unwrap().is_none());
    assert_eq!(registry.script_count().unwrap(), 0);
}

#[test]
fn test_registry_requires_analysis() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = script_with(&engine, &catalog, 1, "select 1");
    let registry = engine.create_script_registry();
    assert!(matches!(
        registry.add_script(&script),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn test_strict_registry_versions() {
    let config = EngineConfig::default().with_strict_registry_versions(true);
    let engine = Engine::with_config(config).unwrap();
    let (catalog, _schema) = catalog_with_schema(&engine, "create table foo(a int);");
    let query = script_with(&engine, &catalog, 2, "select * from foo where a < 3");
    query.analyze().unwrap();
    let registry = engine.create_script_registry();
    registry.add_script(&query).unwrap();

    let version = catalog.version().unwrap();
    let table_id = ExternalObjectId::new(1, 0);
    assert!(registry.find_column_info(table_id, 0, Some(version)).unwrap().is_some());
    assert!(registry.find_column_info(table_id, 0, Some(version + 1)).unwrap().is_none());
    assert!(registry.find_column_info(table_id, 0, None).unwrap().is_some());
}

#[test]
fn test_cursor_on_select_keyword() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = script_with(&engine, &catalog, 1, SqlFixtures::cursor_script());
    script.analyze().unwrap();

    let cursor = script.move_cursor(0).unwrap().read().unwrap();
    assert_eq!(cursor.token_text, "select");
    assert_eq!(cursor.ast_node_type, Some(NodeType::ObjectSqlSelect));
    assert_eq!(cursor.ast_attribute_key, Some(AttributeKey::None));
}

#[test]
fn test_external_collision() {
    let engine = Engine::new();
    let (catalog, _schema) = catalog_with_schema(&engine, "create table foo(a int);");

    let other = script_with(&engine, &catalog, 1, "create table bar(b int);");
    other.analyze().unwrap();
    let err = catalog.load_script(&other, 0).unwrap_err();
    assert!(matches!(err, EngineError::IdentifierCollision { entry_id: 1 }));

    let err = catalog.add_descriptor_pool(1, 0).unwrap_err();
    assert!(matches!(err, EngineError::IdentifierCollision { entry_id: 1 }));

    // Unrelated ids keep working
    catalog.add_descriptor_pool(50, 1).unwrap();
    catalog
        .add_schema_descriptor(50, &SchemaDescriptorBuilder::new("", "").table("baz", &["c"]).build())
        .unwrap();
    let query = script_with(&engine, &catalog, 2, "select a from foo; select c from baz");
    let analyzed = query.analyze().unwrap().read().unwrap();
    ScriptAssertions::assert_clean(&analyzed);
    assert!(catalog.contains_entry_id(1).unwrap());
    assert!(catalog.contains_entry_id(50).unwrap());
}

#[test]
fn test_reloading_same_script_replaces_entry() {
    let engine = Engine::new();
    let (catalog, schema) = catalog_with_schema(&engine, "create table foo(a int);");
    schema.replace_text("create table foo(a int, b int);").unwrap();
    schema.analyze().unwrap();
    catalog.load_script(&schema, 0).unwrap();

    let query = script_with(&engine, &catalog, 2, "select b from foo");
    ScriptAssertions::assert_clean(&query.analyze().unwrap().read().unwrap());
}

#[test]
fn test_catalog_change_outdates_analysis() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let query = script_with(&engine, &catalog, 2, "select a from foo");
    assert!(query.is_analysis_outdated().unwrap());

    let analyzed = query.analyze().unwrap().read().unwrap();
    ScriptAssertions::assert_codes(&analyzed, &[sqlscript_ir::DiagnosticCode::UnresolvedTable]);
    assert!(!query.is_analysis_outdated().unwrap());

    catalog.add_descriptor_pool(10, 1).unwrap();
    catalog
        .add_schema_descriptor(10, &SchemaDescriptorBuilder::new("", "").table("foo", &["a"]).build())
        .unwrap();
    assert!(query.is_analysis_outdated().unwrap());
    assert_eq!(query.stage().unwrap(), ScriptStage::Analyzed);

    ScriptAssertions::assert_clean(&query.analyze().unwrap().read().unwrap());
    assert!(!query.is_analysis_outdated().unwrap());
}

#[test]
fn test_completion_through_handles() {
    let engine = Engine::new();
    let (catalog, _schema) = catalog_with_schema(&engine, SqlFixtures::tpch_schema());
    let query = script_with(&engine, &catalog, 2, "select * from cu");
    query.analyze().unwrap();
    query.move_cursor(16).unwrap();

    let completion = query.complete_at_cursor(5, None).unwrap().read().unwrap();
    ScriptAssertions::assert_first_candidate(&completion, "customer");
    assert!(completion.candidates.len() <= 5);

    let json = query.complete_at_cursor(5, None).unwrap().encode().unwrap();
    assert!(json.contains("\"customer\""));
}

#[test]
fn test_completion_limit_is_capped() {
    let config = EngineConfig::default().with_max_completion_candidates(3);
    let engine = Engine::with_config(config).unwrap();
    let (catalog, _schema) = catalog_with_schema(&engine, SqlFixtures::tpch_schema());
    let query = script_with(&engine, &catalog, 2, "select l from lineitem");
    query.analyze().unwrap();
    query.move_cursor(8).unwrap();

    let completion = query.complete_at_cursor(100, None).unwrap().read().unwrap();
    assert_eq!(completion.candidates.len(), 3);
}

#[test]
fn test_completion_with_registry_templates() {
    let engine = Engine::new();
    let (catalog, _schema) = catalog_with_schema(&engine, SqlFixtures::tpch_schema());
    let other = script_with(&engine, &catalog, 2, "select * from customer where c_mktsegment = 'BUILDING'");
    other.analyze().unwrap();
    let registry = engine.create_script_registry();
    registry.add_script(&other).unwrap();

    let query = script_with(&engine, &catalog, 3, "select * from customer where c_mk");
    query.analyze().unwrap();
    query.move_cursor(33).unwrap();
    let completion = query
        .complete_at_cursor(5, Some(&registry))
        .unwrap()
        .read()
        .unwrap();
    let first = &completion.candidates[0];
    assert_eq!(first.completion_text, "c_mktsegment");
    assert_eq!(first.filter_templates, vec!["c_mktsegment = ?".to_string()]);
}

#[test]
fn test_descriptor_pool_lifecycle() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let json = SchemaDescriptorBuilder::tpch("tpch", "public").to_json();
    catalog.add_descriptor_pool(10, 1).unwrap();
    catalog.add_schema_descriptor_json(10, json.as_bytes()).unwrap();

    let entries = catalog.describe_entries().unwrap().read().unwrap();
    assert_eq!(entries.len(), 1);
    let snapshot = catalog.create_snapshot().unwrap();
    assert!(snapshot.encode().unwrap().contains("customer"));

    catalog.drop_descriptor_pool(10).unwrap();
    assert!(!catalog.contains_entry_id(10).unwrap());
    // Snapshots are unaffected by later mutations
    assert!(snapshot.encode().unwrap().contains("customer"));

    catalog.drop_descriptor_pool(10).unwrap();
}

#[test]
fn test_unknown_pool() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let descriptor = SchemaDescriptorBuilder::new("", "").table("t", &["a"]).build();
    assert!(matches!(
        catalog.add_schema_descriptor(7, &descriptor),
        Err(EngineError::Catalog(_))
    ));
}

#[test]
fn test_version_text_format() {
    let text = get_version_text();
    let (core, dev) = match text.split_once('-') {
        Some((core, dev)) => (core, Some(dev)),
        None => (text.as_str(), None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    assert_eq!(parts.len(), 3, "{text}");
    assert!(parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())));
    if let Some(dev) = dev {
        let build = dev.strip_prefix("dev.").expect("dev suffix");
        assert!(!build.is_empty() && build.chars().all(|c| c.is_ascii_digit()));
    }
    assert_eq!(Engine::new().version_text(), text);
}

#[test]
fn test_completion_selection_through_handles() {
    let engine = Engine::new();
    let (catalog, _schema) = catalog_with_schema(&engine, SqlFixtures::tpch_schema());
    catalog.add_descriptor_pool(10, 1).unwrap();
    catalog
        .add_schema_descriptor(
            10,
            &SchemaDescriptorBuilder::new("sales", "public")
                .table("customer", &["id"])
                .build(),
        )
        .unwrap();
    let query = script_with(&engine, &catalog, 2, "select * from cu");
    query.analyze().unwrap();
    query.move_cursor(16).unwrap();

    let completion = query.complete_at_cursor(5, None).unwrap().read().unwrap();
    ScriptAssertions::assert_first_candidate(&completion, "customer");
    assert_eq!(completion.candidates[0].catalog_objects.len(), 2);

    let selected = query
        .select_completion_candidate(&completion, 0)
        .unwrap()
        .read()
        .unwrap();
    assert_eq!(selected.selection.as_ref().unwrap().insert_text, "customer");

    let qualified = query
        .select_completion_catalog_object(&completion, 0, 1)
        .unwrap()
        .read()
        .unwrap();
    let selection = qualified.selection.as_ref().unwrap();
    assert_eq!(selection.insert_text, "sales.public.customer");
    assert_eq!(selection.cursor_after, 14 + 21);

    assert!(matches!(
        query.select_completion_candidate(&completion, 99),
        Err(EngineError::InvalidArgument(_))
    ));
    assert!(matches!(
        query.select_completion_catalog_object(&completion, 0, 2),
        Err(EngineError::InvalidArgument(_))
    ));

    // Moving the cursor outdates the completion
    query.move_cursor(15).unwrap();
    assert!(matches!(
        query.select_completion_candidate(&completion, 0),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn test_catalog_statistics() {
    let engine = Engine::new();
    let (catalog, _schema) = catalog_with_schema(&engine, SqlFixtures::tpch_schema());
    catalog.add_descriptor_pool(10, 1).unwrap();

    let stats = catalog.statistics().unwrap().read().unwrap();
    assert_eq!(stats.script_count, 1);
    assert_eq!(stats.descriptor_pool_count, 1);
    assert_eq!(stats.table_count, SqlFixtures::TPCH_TABLE_COUNT);
    assert_eq!(stats.entries[0].entry_id, 1);
    assert_eq!(stats.entries[1].table_count, 0);

    catalog.destroy();
    assert!(catalog.statistics().unwrap_err().is_use_after_free());
}

#[test]
fn test_reserved_pool_id_rejected() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    assert!(matches!(
        catalog.add_descriptor_pool(u32::MAX, 1),
        Err(EngineError::InvalidArgument(_))
    ));
}
