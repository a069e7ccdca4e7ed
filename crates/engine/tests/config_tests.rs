// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Engine configuration tests

use serde_json::json;
use sqlscript_engine::{ConfigError, Engine, EngineConfig, EngineError};
use sqlscript_ir::DiagnosticCode;
use sqlscript_test_utils::{SchemaDescriptorBuilder, ScriptAssertions};

#[test]
fn test_yaml_config() {
    let yaml = r#"
defaultDatabaseName: warehouse
defaultSchemaName: sales
maxCompletionCandidates: 8
strictRegistryVersions: true
logFilter: "sqlscript_engine=debug"
"#;
    let config = EngineConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.default_database_name, "warehouse");
    assert_eq!(config.default_schema_name, "sales");
    assert_eq!(config.max_completion_candidates, 8);
    assert!(config.strict_registry_versions);
    assert_eq!(config.log_filter, "sqlscript_engine=debug");
}

#[test]
fn test_malformed_yaml() {
    assert!(matches!(
        EngineConfig::from_yaml_str("maxCompletionCandidates: [1, 2]"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_json_round_trip_through_settings() {
    let config = EngineConfig::default().with_default_names("db", "public");
    let settings = json!({ "sqlscript": serde_json::to_value(&config).unwrap() });
    assert_eq!(EngineConfig::from_settings(&settings).unwrap(), Some(config));
}

#[test]
fn test_default_schema_disambiguates_tables() {
    let schemas = [
        SchemaDescriptorBuilder::new("", "staging").table("t", &["x"]).build(),
        SchemaDescriptorBuilder::new("", "sales").table("t", &["x"]).build(),
    ];

    let plain = Engine::new();
    let catalog = plain.create_catalog();
    catalog.add_descriptor_pool(10, 1).unwrap();
    catalog.add_schema_descriptors(10, &schemas).unwrap();
    let script = plain.create_script(&catalog, 1).unwrap();
    script.insert_text_at(0, "select x from t").unwrap();
    let analyzed = script.analyze().unwrap().read().unwrap();
    assert!(
        analyzed
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::AmbiguousTable)
    );

    let config = EngineConfig::default().with_default_names("", "sales");
    let engine = Engine::with_config(config).unwrap();
    let catalog = engine.create_catalog();
    catalog.add_descriptor_pool(10, 1).unwrap();
    catalog.add_schema_descriptors(10, &schemas).unwrap();
    let script = engine.create_script(&catalog, 1).unwrap();
    script.insert_text_at(0, "select x from t").unwrap();
    ScriptAssertions::assert_clean(&script.analyze().unwrap().read().unwrap());
}

#[test]
fn test_engine_rejects_invalid_config() {
    let config = EngineConfig::default().with_log_filter("");
    assert!(matches!(
        Engine::with_config(config),
        Err(EngineError::Config(ConfigError::EmptyLogFilter))
    ));
}
