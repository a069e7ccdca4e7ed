// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Cursor placement tests

use sqlscript_catalog::Catalog;
use sqlscript_context::{CursorContext, ScriptCursor};
use sqlscript_function_registry::FunctionRegistry;
use sqlscript_grammar::{RelativePosition, StatementType, parse, scan};
use sqlscript_ir::{AttributeKey, NodeType, TokenType};
use sqlscript_semantic::{AnalyzedScript, Analyzer};
use std::sync::Arc;

const SCRIPT: &str = "select * from A b, C d where b.x = d.y";

fn analyzed(text: &str) -> AnalyzedScript {
    let parsed = Arc::new(parse(Arc::new(scan(text, 0))));
    Analyzer::analyze(parsed, &Catalog::new(), 1, &FunctionRegistry::new())
}

fn place(analyzed: &AnalyzedScript, offset: u32) -> ScriptCursor {
    let parsed = &analyzed.parsed;
    ScriptCursor::place(&parsed.scanned, Some(parsed), Some(analyzed), offset)
}

#[test]
fn test_cursor_at_statement_start() {
    let analyzed = analyzed(SCRIPT);
    let cursor = place(&analyzed, 0);

    assert_eq!(cursor.token_text, "select");
    assert_eq!(cursor.token_type, Some(TokenType::Keyword));
    assert_eq!(cursor.relative_position(), Some(RelativePosition::BeginOfSymbol));
    assert_eq!(cursor.statement_id, Some(0));
    assert_eq!(cursor.statement_type, Some(StatementType::Select));
    assert_eq!(cursor.ast_node_type, Some(NodeType::ObjectSqlSelect));
    assert_eq!(cursor.ast_attribute_key, Some(AttributeKey::None));
    assert_eq!(cursor.context, CursorContext::None);
}

#[test]
fn test_cursor_on_table_name() {
    let analyzed = analyzed(SCRIPT);
    let cursor = place(&analyzed, 14);

    assert_eq!(cursor.token_text, "A");
    match cursor.context {
        CursorContext::TableRef {
            table_reference_id,
            qualifier,
            ..
        } => {
            assert_eq!(table_reference_id, Some(0));
            assert!(qualifier.is_empty());
        }
        other => panic!("unexpected context {other:?}"),
    }
}

#[test]
fn test_cursor_on_qualified_columns() {
    let analyzed = analyzed(SCRIPT);

    let cursor = place(&analyzed, 31);
    assert_eq!(cursor.token_text, "x");
    match &cursor.context {
        CursorContext::ColumnRef {
            expression_id,
            qualifier,
            ..
        } => {
            assert!(expression_id.is_some());
            assert_eq!(qualifier, &vec!["b".to_string()]);
        }
        other => panic!("unexpected context {other:?}"),
    }

    // End of the script still lands on the last column
    let cursor = place(&analyzed, SCRIPT.len() as u32);
    assert_eq!(cursor.token_text, "y");
    assert_eq!(cursor.relative_position(), Some(RelativePosition::EndOfSymbol));
    assert!(matches!(
        cursor.context,
        CursorContext::ColumnRef { ref qualifier, .. } if qualifier == &vec!["d".to_string()]
    ));
}

#[test]
fn test_cursor_on_qualifier_itself() {
    let analyzed = analyzed(SCRIPT);
    let cursor = place(&analyzed, 29);

    assert_eq!(cursor.token_text, "b");
    assert!(matches!(
        cursor.context,
        CursorContext::ColumnRef { ref qualifier, .. } if qualifier.is_empty()
    ));
}

#[test]
fn test_cursor_in_second_statement() {
    let analyzed = analyzed("select 1; select a from t");
    let cursor = place(&analyzed, 17);

    assert_eq!(cursor.statement_id, Some(1));
    assert_eq!(cursor.token_text, "a");
    assert!(matches!(cursor.context, CursorContext::ColumnRef { .. }));
}

#[test]
fn test_cursor_serializes() {
    let analyzed = analyzed(SCRIPT);
    let value = serde_json::to_value(place(&analyzed, 14)).unwrap();
    assert_eq!(value["context"]["kind"], "TABLE_REF");
    assert_eq!(value["token_text"], "A");
}
