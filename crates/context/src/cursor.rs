// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Script cursor
//!
//! Maps a byte offset to the token, statement and innermost syntax node it
//! belongs to. A cursor is derived on demand and never stored with the
//! script.
//!
//! The node lookup starts at the located token rather than at the raw
//! offset, so a cursor at the end of `fo` in `select * from fo` still lands
//! on the table name.

use serde::Serialize;
use sqlscript_grammar::{ParsedScript, RelativePosition, ScannedScript, StatementType, SymbolLocation};
use sqlscript_ir::{
    AttributeKey, ExpressionId, Location, NodeId, NodeType, StatementId, TableReferenceId,
    TokenType,
};
use sqlscript_semantic::AnalyzedScript;
use tracing::trace;

/// What the cursor is completing, derived from the enclosing syntax node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CursorContext {
    None,
    /// Inside the name of a table reference
    TableRef {
        node_id: NodeId,
        table_reference_id: Option<TableReferenceId>,
        /// Names before the one under the cursor
        qualifier: Vec<String>,
    },
    /// Inside a column reference expression
    ColumnRef {
        node_id: NodeId,
        expression_id: Option<ExpressionId>,
        /// Names before the one under the cursor
        qualifier: Vec<String>,
    },
}

/// A byte offset resolved against the pipeline outputs of a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptCursor {
    pub text_offset: u32,
    pub symbol: Option<SymbolLocation>,
    pub token_type: Option<TokenType>,
    pub token_location: Option<Location>,
    /// Raw text of the located token
    pub token_text: String,
    pub statement_id: Option<StatementId>,
    pub statement_type: Option<StatementType>,
    pub ast_node_id: Option<NodeId>,
    pub ast_node_type: Option<NodeType>,
    pub ast_attribute_key: Option<AttributeKey>,
    pub context: CursorContext,
}

impl ScriptCursor {
    /// Place a cursor at `offset`
    ///
    /// Without a parsed script only the token is located. Without an
    /// analyzed script the context carries no table reference or
    /// expression ids.
    pub fn place(
        scanned: &ScannedScript,
        parsed: Option<&ParsedScript>,
        analyzed: Option<&AnalyzedScript>,
        offset: u32,
    ) -> Self {
        let symbol = scanned.find_symbol(offset);
        let token = symbol.and_then(|s| scanned.tokens.get(s.symbol_id as usize));
        let mut cursor = Self {
            text_offset: offset,
            symbol,
            token_type: token.map(|t| t.token_type),
            token_location: token.map(|t| t.location),
            token_text: token
                .map(|t| scanned.text_at(t.location).to_string())
                .unwrap_or_default(),
            statement_id: None,
            statement_type: None,
            ast_node_id: None,
            ast_node_type: None,
            ast_attribute_key: None,
            context: CursorContext::None,
        };
        let Some(parsed) = parsed else {
            return cursor;
        };

        let lookup = match (symbol, token) {
            (Some(s), Some(t)) if s.relative_position.is_within_symbol() => t.location.offset,
            _ => offset,
        };
        cursor.statement_id = parsed.statement_at(lookup);
        let Some(statement_id) = cursor.statement_id else {
            return cursor;
        };
        cursor.statement_type = parsed
            .statements
            .get(statement_id as usize)
            .map(|s| s.statement_type);
        cursor.ast_node_id = parsed.innermost_node_at(statement_id, lookup);
        if let Some(node) = cursor.ast_node_id.and_then(|id| parsed.node(id)) {
            cursor.ast_node_type = Some(node.node_type);
            cursor.ast_attribute_key = Some(node.attribute_key);
        }
        if let Some(node_id) = cursor.ast_node_id {
            cursor.context = derive_context(parsed, analyzed, node_id, lookup);
        }
        trace!(
            offset,
            statement_id,
            node = ?cursor.ast_node_type,
            context = ?cursor.context,
            "Placed cursor"
        );
        cursor
    }

    /// Whether the offset touches the located token
    pub fn is_within_symbol(&self) -> bool {
        self.symbol
            .is_some_and(|s| s.relative_position.is_within_symbol())
    }

    pub fn relative_position(&self) -> Option<RelativePosition> {
        self.symbol.map(|s| s.relative_position)
    }
}

fn derive_context(
    parsed: &ParsedScript,
    analyzed: Option<&AnalyzedScript>,
    node_id: NodeId,
    token_offset: u32,
) -> CursorContext {
    for ancestor in parsed.ancestors(node_id) {
        let Some(node) = parsed.node(ancestor) else {
            continue;
        };
        match node.node_type {
            NodeType::ObjectSqlTableref => {
                let qualifier = parsed
                    .attribute(ancestor, AttributeKey::SqlTablerefName)
                    .map(|path| names_before(parsed, path, token_offset))
                    .unwrap_or_default();
                let table_reference_id = analyzed.and_then(|a| {
                    a.table_references
                        .iter()
                        .find(|t| t.node_id == ancestor)
                        .map(|t| t.table_reference_id)
                });
                return CursorContext::TableRef {
                    node_id: ancestor,
                    table_reference_id,
                    qualifier,
                };
            }
            NodeType::ObjectSqlColumnRef => {
                let qualifier = parsed
                    .attribute(ancestor, AttributeKey::SqlColumnRefPath)
                    .map(|path| names_before(parsed, path, token_offset))
                    .unwrap_or_default();
                let expression_id = analyzed.and_then(|a| {
                    a.expressions
                        .iter()
                        .find(|e| e.node_id == ancestor)
                        .map(|e| e.expression_id)
                });
                return CursorContext::ColumnRef {
                    node_id: ancestor,
                    expression_id,
                    qualifier,
                };
            }
            // Aliases and other names stop the search
            NodeType::ObjectSqlResultTarget | NodeType::ObjectSqlSelect => break,
            _ => {}
        }
    }
    CursorContext::None
}

/// Names of a path that end before the token under the cursor
fn names_before(parsed: &ParsedScript, path: NodeId, token_offset: u32) -> Vec<String> {
    let names: Vec<NodeId> = match parsed.node(path) {
        Some(node) if node.node_type == NodeType::Name => vec![path],
        Some(node) => node.child_ids().collect(),
        None => Vec::new(),
    };
    names
        .into_iter()
        .filter(|id| {
            parsed
                .node(*id)
                .is_some_and(|n| n.node_type == NodeType::Name && n.location.end() <= token_offset)
        })
        .map(|id| parsed.name_text(id).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscript_grammar::{parse, scan};
    use std::sync::Arc;

    fn place(text: &str, offset: u32) -> ScriptCursor {
        let scanned = Arc::new(scan(text, 0));
        let parsed = parse(scanned.clone());
        ScriptCursor::place(&scanned, Some(&parsed), None, offset)
    }

    #[test]
    fn test_place_without_parse() {
        let scanned = scan("select 1", 0);
        let cursor = ScriptCursor::place(&scanned, None, None, 3);
        assert_eq!(cursor.token_text, "select");
        assert_eq!(cursor.relative_position(), Some(RelativePosition::MidOfSymbol));
        assert!(cursor.statement_id.is_none());
    }

    #[test]
    fn test_empty_script() {
        let cursor = place("", 0);
        assert!(cursor.symbol.is_none());
        assert_eq!(cursor.context, CursorContext::None);
    }

    #[test]
    fn test_table_name_at_end() {
        let cursor = place("select * from fo", 16);
        assert_eq!(cursor.relative_position(), Some(RelativePosition::EndOfSymbol));
        assert!(matches!(cursor.context, CursorContext::TableRef { ref qualifier, .. } if qualifier.is_empty()));
    }

    #[test]
    fn test_trailing_dot_qualifier() {
        let cursor = place("select b. from a b", 9);
        assert_eq!(cursor.token_type, Some(TokenType::DotTrailing));
        match cursor.context {
            CursorContext::ColumnRef { qualifier, .. } => assert_eq!(qualifier, vec!["b".to_string()]),
            other => panic!("unexpected context {other:?}"),
        }
    }

    #[test]
    fn test_whitespace_position() {
        let cursor = place("select *  from a", 9);
        assert_eq!(cursor.relative_position(), Some(RelativePosition::NewSymbolAfter));
        assert!(!cursor.is_within_symbol());
    }
}
