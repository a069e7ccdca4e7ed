// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Parser
//!
//! Recursive descent over the scanned token array, producing one flat
//! subtree per statement.
//!
//! ## Error recovery
//!
//! The first syntax error of a statement is recorded as a diagnostic, the
//! productions return whatever partial node they already built, and the
//! statement loop skips ahead to the next `;`. Later statements are parsed
//! as if nothing happened.

mod ddl;
mod expr;
mod query;

use crate::ast::{Node, ParsedScript, PendingId, Statement, StatementType, TreeBuilder};
use crate::keywords::{KeywordCategory, keyword_category};
use crate::scanner::{ScannedScript, Token};
use sqlscript_ir::{
    Diagnostic, DiagnosticCode, Location, NULL_OBJECT_ID, NodeType, StatementId, SymbolId,
    TokenType,
};
use std::sync::Arc;
use tracing::debug;

/// Marker for a syntax error that has already been recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SyntaxError;

pub(crate) type ParseResult<T> = Result<T, SyntaxError>;

/// Deepest expression or query nesting the parser descends into
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a scanned script
pub fn parse(scanned: Arc<ScannedScript>) -> ParsedScript {
    let mut parser = Parser::new(&scanned);
    parser.parse_script();
    let Parser {
        nodes,
        statements,
        diagnostics,
        ..
    } = parser;
    debug!(
        statements = statements.len(),
        nodes = nodes.len(),
        diagnostics = diagnostics.len(),
        "parsed script"
    );
    ParsedScript {
        scanned,
        nodes,
        statements,
        diagnostics,
    }
}

pub(crate) struct Parser<'a> {
    scanned: &'a ScannedScript,
    /// Token ids without comments
    symbols: Vec<SymbolId>,
    pos: usize,
    tree: TreeBuilder,
    nodes: Vec<Node>,
    statements: Vec<Statement>,
    diagnostics: Vec<Diagnostic>,
    statement_id: StatementId,
    statement_failed: bool,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(scanned: &'a ScannedScript) -> Self {
        let symbols = scanned
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.token_type != TokenType::Comment)
            .map(|(i, _)| i as SymbolId)
            .collect();
        Self {
            scanned,
            symbols,
            pos: 0,
            tree: TreeBuilder::default(),
            nodes: Vec::new(),
            statements: Vec::new(),
            diagnostics: Vec::new(),
            statement_id: 0,
            statement_failed: false,
            depth: 0,
        }
    }

    fn parse_script(&mut self) {
        while self.pos < self.symbols.len() {
            if self.accept_punct(";").is_some() {
                continue;
            }
            let begin = self.pos;
            let start = self.current_location();
            self.statement_failed = false;
            self.depth = 0;

            let (statement_type, root) = self.parse_statement();
            if !self.at_statement_end() {
                self.error_expected("end of statement");
                while !self.at_statement_end() {
                    self.pos += 1;
                }
            }
            let end = if self.pos > begin {
                self.token_at(self.pos - 1)
                    .map(|t| t.location)
                    .unwrap_or(start)
            } else {
                start
            };
            let location = start.merge(&end);
            let root = match root {
                Ok(root) => root,
                Err(SyntaxError) => self.tree.leaf(NodeType::None, location, 0),
            };
            let nodes_begin = self.nodes.len() as u32;
            let root = self.tree.flatten(root, &mut self.nodes);
            self.statements.push(Statement {
                statement_type,
                root,
                location: location.merge(&self.nodes[root as usize].location),
                nodes_begin,
                nodes_count: self.nodes.len() as u32 - nodes_begin,
            });
            self.statement_id += 1;
            if self.pos == begin {
                // Guarantee progress on tokens no production accepts
                self.pos += 1;
            }
            self.accept_punct(";");
        }
    }

    fn parse_statement(&mut self) -> (StatementType, ParseResult<PendingId>) {
        if self.is_keyword(0, "select") || self.is_keyword(0, "with") || self.is_punct(0, "(") {
            return (StatementType::Select, self.parse_query());
        }
        if self.is_keyword(0, "create") {
            return self.parse_create();
        }
        if self.is_keyword(0, "insert") {
            return (StatementType::Insert, self.parse_insert());
        }
        if self.is_keyword(0, "delete") {
            return (StatementType::Delete, self.parse_delete());
        }
        if self.is_keyword(0, "drop") {
            return (StatementType::Drop, self.parse_drop());
        }

        let location = self.current_location();
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::UnsupportedStatement,
                format!("unsupported statement starting with '{}'", self.current_text()),
                location,
            )
            .with_statement(self.statement_id),
        );
        self.statement_failed = true;
        (StatementType::Invalid, Err(SyntaxError))
    }

    // Token access

    fn token_at(&self, index: usize) -> Option<Token> {
        let symbol = *self.symbols.get(index)?;
        self.scanned.tokens.get(symbol as usize).copied()
    }

    fn peek(&self, ahead: usize) -> Option<Token> {
        self.token_at(self.pos + ahead)
    }

    fn peek_text(&self, ahead: usize) -> &'a str {
        self.peek(ahead)
            .map(|t| self.scanned.text_at(t.location))
            .unwrap_or_default()
    }

    fn current_text(&self) -> &'a str {
        self.peek_text(0)
    }

    /// Location of the current token, or an empty location at the end
    fn current_location(&self) -> Location {
        match self.peek(0) {
            Some(token) => token.location,
            None => {
                let end = self
                    .token_at(self.pos.saturating_sub(1))
                    .map(|t| t.location.end())
                    .unwrap_or(0);
                Location::new(end, 0)
            }
        }
    }

    fn advance(&mut self) -> Location {
        let location = self.current_location();
        if self.pos < self.symbols.len() {
            self.pos += 1;
        }
        location
    }

    fn peek_type(&self, ahead: usize) -> Option<TokenType> {
        self.peek(ahead).map(|t| t.token_type)
    }

    fn is_keyword(&self, ahead: usize, keyword: &str) -> bool {
        self.peek_type(ahead) == Some(TokenType::Keyword)
            && self.peek_text(ahead).eq_ignore_ascii_case(keyword)
    }

    fn accept_keyword(&mut self, keyword: &str) -> Option<Location> {
        self.is_keyword(0, keyword).then(|| self.advance())
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<Location> {
        match self.accept_keyword(keyword) {
            Some(location) => Ok(location),
            None => Err(self.error_expected(&keyword.to_ascii_uppercase())),
        }
    }

    fn is_punct(&self, ahead: usize, punct: &str) -> bool {
        self.peek_type(ahead) == Some(TokenType::Punctuation) && self.peek_text(ahead) == punct
    }

    fn accept_punct(&mut self, punct: &str) -> Option<Location> {
        self.is_punct(0, punct).then(|| self.advance())
    }

    fn expect_punct(&mut self, punct: &str) -> ParseResult<Location> {
        match self.accept_punct(punct) {
            Some(location) => Ok(location),
            None => Err(self.error_expected(&format!("'{punct}'"))),
        }
    }

    fn is_operator(&self, ahead: usize, operator: &str) -> bool {
        self.peek_type(ahead) == Some(TokenType::Operator) && self.peek_text(ahead) == operator
    }

    fn accept_operator(&mut self, operator: &str) -> Option<Location> {
        self.is_operator(0, operator).then(|| self.advance())
    }

    /// Identifier, quoted identifier or unreserved keyword
    fn is_name(&self, ahead: usize) -> bool {
        match self.peek_type(ahead) {
            Some(TokenType::Identifier | TokenType::QuotedIdentifier) => true,
            Some(TokenType::Keyword) => {
                let lower = self.peek_text(ahead).to_ascii_lowercase();
                keyword_category(&lower) == Some(KeywordCategory::Unreserved)
            }
            _ => false,
        }
    }

    fn at_statement_end(&self) -> bool {
        self.peek(0).is_none() || self.is_punct(0, ";")
    }

    /// Record "expected X" once per statement
    fn error_expected(&mut self, what: &str) -> SyntaxError {
        if !self.statement_failed {
            let location = self.current_location();
            let diagnostic = if self.at_statement_end() {
                Diagnostic::new(
                    DiagnosticCode::UnexpectedEndOfInput,
                    format!("expected {what}"),
                    location,
                )
            } else {
                Diagnostic::new(
                    DiagnosticCode::UnexpectedToken,
                    format!("expected {what}, found '{}'", self.current_text()),
                    location,
                )
            };
            self.diagnostics
                .push(diagnostic.with_statement(self.statement_id));
            self.statement_failed = true;
        }
        SyntaxError
    }

    /// Run a production one nesting level deeper
    ///
    /// Past `MAX_NESTING_DEPTH` the statement fails with a diagnostic and the
    /// rest of it is skipped.
    fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            if !self.statement_failed {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::NestingTooDeep,
                        format!("nesting exceeds {MAX_NESTING_DEPTH} levels"),
                        self.current_location(),
                    )
                    .with_statement(self.statement_id),
                );
                self.statement_failed = true;
            }
            return Err(SyntaxError);
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    // Shared productions

    fn parse_name(&mut self) -> ParseResult<PendingId> {
        if !self.is_name(0) {
            return Err(self.error_expected("name"));
        }
        let symbol = self.symbols[self.pos];
        let location = self.advance();
        let name_id = self.scanned.token_name(symbol).unwrap_or(NULL_OBJECT_ID);
        Ok(self.tree.leaf(NodeType::Name, location, name_id))
    }

    /// `name ('.' name)*`, optionally ending in a trailing dot
    fn parse_name_path(&mut self) -> ParseResult<PendingId> {
        let first = self.parse_name()?;
        let mut location = self.tree.location(first);
        let mut names = vec![first];
        loop {
            match self.peek_type(0) {
                Some(TokenType::Dot) if self.is_name(1) => {
                    location = location.merge(&self.advance());
                    let name = self.parse_name()?;
                    location = location.merge(&self.tree.location(name));
                    names.push(name);
                }
                Some(TokenType::DotTrailing) => {
                    location = location.merge(&self.advance());
                    break;
                }
                _ => break,
            }
        }
        Ok(self.tree.array(Some(location), names))
    }

    /// `'(' name (',' name)* ')'`
    fn parse_name_list(&mut self) -> ParseResult<PendingId> {
        let open = self.expect_punct("(")?;
        let mut names = vec![self.parse_name()?];
        while self.accept_punct(",").is_some() {
            names.push(self.parse_name()?);
        }
        let close = self.expect_punct(")")?;
        Ok(self.tree.array(Some(open.merge(&close)), names))
    }

    /// `[AS] name` after a table or result target
    fn parse_alias(&mut self) -> ParseResult<Option<PendingId>> {
        if self.accept_keyword("as").is_some() {
            return self.parse_name().map(Some);
        }
        match self.peek_type(0) {
            Some(TokenType::Identifier | TokenType::QuotedIdentifier) => {
                self.parse_name().map(Some)
            }
            _ => Ok(None),
        }
    }

    fn flag(&mut self, location: Location) -> PendingId {
        self.tree.leaf(NodeType::Bool, location, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use sqlscript_ir::AttributeKey;

    pub(crate) fn parse_text(text: &str) -> ParsedScript {
        parse(Arc::new(scan(text, 0)))
    }

    fn assert_tree_invariants(parsed: &ParsedScript) {
        for (i, node) in parsed.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                let parent = &parsed.nodes[parent as usize];
                assert!(
                    parent.location.covers(&node.location),
                    "node {i} escapes its parent"
                );
                assert!(parent.child_ids().contains(&(i as u32)));
            }
        }
    }

    #[test]
    fn test_empty_script() {
        let parsed = parse_text("");
        assert!(parsed.statements.is_empty());
        assert!(parsed.nodes.is_empty());
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_statement_split() {
        let parsed = parse_text("select 1; select 2;; select 3");
        assert_eq!(parsed.statements.len(), 3);
        assert!(parsed.diagnostics.is_empty());
        for statement in &parsed.statements {
            assert_eq!(statement.statement_type, StatementType::Select);
            assert_eq!(
                parsed.nodes[statement.root as usize].node_type,
                NodeType::ObjectSqlSelect
            );
        }
        assert_tree_invariants(&parsed);
    }

    #[test]
    fn test_invalid_statement_does_not_hide_the_next() {
        let parsed = parse_text("selec 1 from; select a from b");
        assert_eq!(parsed.statements.len(), 2);
        assert_eq!(parsed.statements[0].statement_type, StatementType::Invalid);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(
            parsed.diagnostics[0].code,
            DiagnosticCode::UnsupportedStatement
        );

        let second = parsed.statements[1];
        assert_eq!(second.statement_type, StatementType::Select);
        let root = second.root;
        assert_eq!(parsed.nodes[root as usize].node_type, NodeType::ObjectSqlSelect);
        assert!(parsed.attribute(root, AttributeKey::SqlSelectFrom).is_some());
    }

    #[test]
    fn test_broken_select_keeps_earlier_clauses() {
        let parsed = parse_text("select a from b where");
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(
            parsed.diagnostics[0].code,
            DiagnosticCode::UnexpectedEndOfInput
        );
        let root = parsed.statements[0].root;
        assert!(parsed.attribute(root, AttributeKey::SqlSelectTargets).is_some());
        assert!(parsed.attribute(root, AttributeKey::SqlSelectFrom).is_some());
        assert!(parsed.attribute(root, AttributeKey::SqlSelectWhere).is_none());
    }

    #[test]
    fn test_trailing_garbage_is_reported() {
        let parsed = parse_text("select 1 2; select 3");
        assert_eq!(parsed.statements.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].statement_id, Some(0));
    }

    #[test]
    fn test_comments_are_ignored() {
        let parsed = parse_text("select /* hi */ 1 -- trailing");
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.statements.len(), 1);
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let depth = 100;
        let text = format!("select {}1{}", "(".repeat(depth), ")".repeat(depth));
        let parsed = parse_text(&text);
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.statements[0].statement_type, StatementType::Select);
    }

    #[test]
    fn test_deep_nesting_is_reported() {
        let depth = 1000;
        let text = format!(
            "select {}1{}; select a from b",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let parsed = parse_text(&text);
        assert_eq!(parsed.statements.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].code, DiagnosticCode::NestingTooDeep);
        assert_eq!(parsed.diagnostics[0].statement_id, Some(0));

        let second = parsed.statements[1].root;
        assert!(parsed.attribute(second, AttributeKey::SqlSelectFrom).is_some());
        assert_tree_invariants(&parsed);
    }

    #[test]
    fn test_deep_subqueries_and_negation_are_reported() {
        let subqueries = format!(
            "select * from {}t{}",
            "(select * from ".repeat(MAX_NESTING_DEPTH + 1),
            ")".repeat(MAX_NESTING_DEPTH + 1)
        );
        let negations = format!("select {}1", "- ".repeat(MAX_NESTING_DEPTH * 2));
        for text in [subqueries, negations] {
            let parsed = parse_text(&text);
            assert_eq!(parsed.diagnostics.len(), 1);
            assert_eq!(parsed.diagnostics[0].code, DiagnosticCode::NestingTooDeep);
        }
    }

    #[test]
    fn test_statement_nodes_are_contiguous() {
        let parsed = parse_text("select 1; create table t (a int)");
        let first = parsed.statements[0];
        let second = parsed.statements[1];
        assert_eq!(first.nodes_begin, 0);
        assert_eq!(second.nodes_begin, first.nodes_count);
        assert_eq!(
            (second.nodes_begin + second.nodes_count) as usize,
            parsed.nodes.len()
        );
        assert_eq!(parsed.statement_of(second.root), Some(1));
    }
}
