// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Scanner and parser integration tests

use sqlscript_grammar::{ParsedScript, RelativePosition, StatementType, TextBuffer, parse, scan};
use sqlscript_ir::{AttributeKey, DiagnosticCode, NodeType, TokenType};
use std::sync::Arc;

fn parse_text(text: &str) -> ParsedScript {
    parse(Arc::new(scan(text, 0)))
}

const CURSOR_SCRIPT: &str = "select * from A b, C d where b.x = d.y";

#[test]
fn test_fresh_buffer_is_empty() {
    let buffer = TextBuffer::new();
    let parsed = parse_text(&buffer.to_string());
    assert_eq!(buffer.to_string(), "");
    assert!(parsed.scanned.tokens.is_empty());
    assert!(parsed.nodes.is_empty());
    assert!(parsed.statements.is_empty());
}

#[test]
fn test_invalid_statement_isolated() {
    let parsed = parse_text("select from where; select a, b from foo where a = 1");
    assert_eq!(parsed.statements.len(), 2);
    assert!(!parsed.diagnostics.is_empty());
    assert!(parsed.diagnostics.iter().all(|d| d.statement_id == Some(0)));

    let second = parsed.statements[1];
    assert_eq!(second.statement_type, StatementType::Select);
    let root = parsed.node(second.root).unwrap();
    assert_eq!(root.node_type, NodeType::ObjectSqlSelect);
    let targets = parsed
        .attribute(second.root, AttributeKey::SqlSelectTargets)
        .unwrap();
    assert_eq!(parsed.node(targets).unwrap().children_count, 2);
    assert!(
        parsed
            .attribute(second.root, AttributeKey::SqlSelectWhere)
            .is_some()
    );
}

#[test]
fn test_unknown_statement_then_valid() {
    let parsed = parse_text("vacuum full; create table foo (a int)");
    assert_eq!(parsed.statements.len(), 2);
    assert_eq!(parsed.statements[0].statement_type, StatementType::Invalid);
    assert_eq!(
        parsed.node(parsed.statements[0].root).unwrap().node_type,
        NodeType::None
    );
    assert_eq!(
        parsed.diagnostics[0].code,
        DiagnosticCode::UnsupportedStatement
    );
    assert_eq!(
        parsed.statements[1].statement_type,
        StatementType::CreateTable
    );
}

#[test]
fn test_node_at_cursor_positions() {
    let parsed = parse_text(CURSOR_SCRIPT);
    assert!(parsed.diagnostics.is_empty());

    let cases = [
        (0, NodeType::ObjectSqlSelect, AttributeKey::None),
        (9, NodeType::Array, AttributeKey::SqlSelectFrom),
        (14, NodeType::Name, AttributeKey::None),
        (16, NodeType::Name, AttributeKey::SqlTablerefAlias),
        (23, NodeType::ObjectSqlSelect, AttributeKey::None),
        (29, NodeType::Name, AttributeKey::None),
        (33, NodeType::Array, AttributeKey::SqlExpressionArgs),
    ];
    for (offset, node_type, attribute_key) in cases {
        let statement = parsed.statement_at(offset).unwrap();
        let node_id = parsed.innermost_node_at(statement, offset).unwrap();
        let node = parsed.node(node_id).unwrap();
        assert_eq!(node.node_type, node_type, "offset {offset}");
        assert_eq!(node.attribute_key, attribute_key, "offset {offset}");
    }
}

#[test]
fn test_symbol_lookup() {
    let scanned = scan(CURSOR_SCRIPT, 0);
    let at = |offset| scanned.find_symbol(offset).unwrap();

    assert_eq!(at(0).symbol_id, 0);
    assert_eq!(at(0).relative_position, RelativePosition::BeginOfSymbol);
    assert_eq!(at(3).relative_position, RelativePosition::MidOfSymbol);
    assert_eq!(at(6).relative_position, RelativePosition::EndOfSymbol);
    assert_eq!(scanned.token_text(at(0).symbol_id), "select");

    let dot = at(30);
    assert_eq!(scanned.tokens[dot.symbol_id as usize].token_type, TokenType::Dot);
}

#[test]
fn test_names_are_deduplicated() {
    let scanned = scan("select a, A, \"A\" from t where t.a = 1", 0);
    let a = scanned.names.lookup("a").unwrap();
    assert_eq!(scanned.names.get(a).unwrap().occurrences, 3);
    assert!(scanned.names.lookup("A").is_some());
    assert!(scanned.names.lookup("t").is_some());
}

#[test]
fn test_every_child_is_covered_by_its_parent() {
    let parsed = parse_text(
        "with x as (select a, count(*) c from t group by a) \
         select x.a, case when x.c > 1 then 'many' end from x join u on u.a = x.a \
         where x.a in (1, 2) order by 1; \
         create table v (a int primary key, b text); \
         insert into v values (1, 'a')",
    );
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    for (id, node) in parsed.nodes.iter().enumerate() {
        let Some(parent) = node.parent else { continue };
        let parent = parsed.node(parent).unwrap();
        assert!(parent.location.covers(&node.location), "node {id}");
    }
    for statement in &parsed.statements {
        let root = parsed.node(statement.root).unwrap();
        assert!(statement.location.covers(&root.location));
        assert!(root.parent.is_none());
    }
}
