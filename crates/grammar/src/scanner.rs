// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Scanner
//!
//! Turns script text into a flat, ordered token array.
//!
//! The scanner never fails. Unterminated strings, quoted identifiers and
//! block comments produce a token reaching the end of input plus a
//! diagnostic, and stray bytes are reported and skipped.
//!
//! Besides the tokens, the scanner interns every name it sees into a
//! [`NameRegistry`]. Unquoted names fold to lowercase, quoted names keep
//! their case.

use crate::keywords::{KeywordCategory, keyword_category};
use serde::Serialize;
use sqlscript_ir::{Diagnostic, DiagnosticCode, Location, NameId, NameTags, SymbolId, TokenType};
use std::collections::HashMap;
use tracing::debug;

/// A token in the scanned script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub location: Location,
    pub token_type: TokenType,
}

/// An interned name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameEntry {
    /// Normalized text
    pub text: String,
    /// First occurrence
    pub location: Location,
    /// Number of occurrences in the script
    pub occurrences: u32,
    /// Tags known at scan time (`KEYWORD` for unreserved keywords)
    pub tags: NameTags,
}

/// Deduplicated names of one script
#[derive(Debug, Clone, Default, Serialize)]
pub struct NameRegistry {
    entries: Vec<NameEntry>,
    #[serde(skip)]
    index: HashMap<String, NameId>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `text`, counting the occurrence
    pub fn register(&mut self, text: &str, location: Location, tags: NameTags) -> NameId {
        if let Some(&id) = self.index.get(text) {
            let entry = &mut self.entries[id as usize];
            entry.occurrences += 1;
            entry.tags |= tags;
            return id;
        }
        let id = self.entries.len() as NameId;
        self.entries.push(NameEntry {
            text: text.to_string(),
            location,
            occurrences: 1,
            tags,
        });
        self.index.insert(text.to_string(), id);
        id
    }

    /// Find the id of a normalized name
    pub fn lookup(&self, text: &str) -> Option<NameId> {
        self.index.get(text).copied()
    }

    pub fn get(&self, id: NameId) -> Option<&NameEntry> {
        self.entries.get(id as usize)
    }

    /// Text of a name, empty if the id is unknown
    pub fn text(&self, id: NameId) -> &str {
        self.get(id).map(|e| e.text.as_str()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NameId, &NameEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as NameId, e))
    }
}

/// Where an offset lies relative to the nearest token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelativePosition {
    /// Before the first token
    NewSymbolBefore,
    BeginOfSymbol,
    MidOfSymbol,
    EndOfSymbol,
    /// In whitespace after the token
    NewSymbolAfter,
}

impl RelativePosition {
    /// Whether the offset touches the token itself
    pub fn is_within_symbol(&self) -> bool {
        matches!(
            self,
            RelativePosition::BeginOfSymbol
                | RelativePosition::MidOfSymbol
                | RelativePosition::EndOfSymbol
        )
    }
}

/// Token located for an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SymbolLocation {
    pub symbol_id: SymbolId,
    pub relative_position: RelativePosition,
}

/// Output of [`scan`]
#[derive(Debug, Clone, Serialize)]
pub struct ScannedScript {
    /// Text the tokens refer to
    pub text: String,
    /// Buffer version the text was taken from
    pub text_version: u64,
    pub tokens: Vec<Token>,
    pub names: NameRegistry,
    /// Byte offsets of every `\n`
    pub line_breaks: Vec<u32>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScannedScript {
    /// Text at a location, empty if the location is out of bounds
    pub fn text_at(&self, location: Location) -> &str {
        self.text
            .get(location.offset as usize..location.end() as usize)
            .unwrap_or_default()
    }

    /// Raw text of a token
    pub fn token_text(&self, symbol_id: SymbolId) -> &str {
        self.tokens
            .get(symbol_id as usize)
            .map(|t| self.text_at(t.location))
            .unwrap_or_default()
    }

    /// Normalized name of an identifier token
    pub fn token_name(&self, symbol_id: SymbolId) -> Option<NameId> {
        let token = self.tokens.get(symbol_id as usize)?;
        self.names.lookup(&normalize_name(
            self.text_at(token.location),
            token.token_type,
        ))
    }

    /// Locate the token an offset belongs to
    ///
    /// Picks the last token starting at or before `offset`. Offsets past the
    /// end of the text behave like the end of the text. Returns `None` for a
    /// script without tokens.
    pub fn find_symbol(&self, offset: u32) -> Option<SymbolLocation> {
        if self.tokens.is_empty() {
            return None;
        }
        let following = self
            .tokens
            .partition_point(|t| t.location.offset <= offset);
        if following == 0 {
            return Some(SymbolLocation {
                symbol_id: 0,
                relative_position: RelativePosition::NewSymbolBefore,
            });
        }
        let symbol_id = (following - 1) as SymbolId;
        let location = self.tokens[following - 1].location;
        let text_end = self.text.len() as u32;
        let relative_position = if offset == location.offset {
            RelativePosition::BeginOfSymbol
        } else if offset < location.end() {
            RelativePosition::MidOfSymbol
        } else if offset == location.end() || location.end() >= text_end {
            RelativePosition::EndOfSymbol
        } else {
            RelativePosition::NewSymbolAfter
        };
        Some(SymbolLocation {
            symbol_id,
            relative_position,
        })
    }

    /// Range of tokens inside a location
    pub fn tokens_in(&self, location: Location) -> std::ops::Range<usize> {
        let begin = self
            .tokens
            .partition_point(|t| t.location.offset < location.offset);
        let end = self
            .tokens
            .partition_point(|t| t.location.end() <= location.end());
        begin..end.max(begin)
    }
}

/// Normalize the text of a name token
///
/// Unquoted names fold to lowercase. Quoted names drop their quotes and
/// unescape doubled quote characters.
pub fn normalize_name(raw: &str, token_type: TokenType) -> String {
    match token_type {
        TokenType::QuotedIdentifier => {
            let quote = raw.chars().next().unwrap_or('"');
            let inner = raw.strip_prefix(quote).unwrap_or(raw);
            let inner = inner.strip_suffix(quote).unwrap_or(inner);
            let doubled: String = [quote, quote].iter().collect();
            inner.replace(&doubled, &quote.to_string())
        }
        _ => raw.to_lowercase(),
    }
}

/// Scan `text` into tokens
pub fn scan(text: &str, text_version: u64) -> ScannedScript {
    let mut scanner = Scanner::new(text);
    scanner.run();
    debug!(
        tokens = scanner.tokens.len(),
        names = scanner.names.len(),
        diagnostics = scanner.diagnostics.len(),
        "scanned script"
    );
    ScannedScript {
        text: text.to_string(),
        text_version,
        tokens: scanner.tokens,
        names: scanner.names,
        line_breaks: scanner.line_breaks,
        diagnostics: scanner.diagnostics,
    }
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    names: NameRegistry,
    line_breaks: Vec<u32>,
    diagnostics: Vec<Diagnostic>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            names: NameRegistry::new(),
            line_breaks: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, begin: usize, token_type: TokenType) {
        self.tokens.push(Token {
            location: Location::from_range(begin as u32, self.pos as u32),
            token_type,
        });
    }

    fn report(&mut self, code: DiagnosticCode, message: &str, begin: usize) {
        self.diagnostics.push(Diagnostic::new(
            code,
            message,
            Location::from_range(begin as u32, self.pos as u32),
        ));
    }

    fn run(&mut self) {
        while let Some(b) = self.peek(0) {
            let begin = self.pos;
            match b {
                b'\n' => {
                    self.line_breaks.push(self.pos as u32);
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' | 0x0c => self.pos += 1,
                b'-' if self.peek(1) == Some(b'-') => {
                    while self.peek(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                    self.push(begin, TokenType::Comment);
                }
                b'/' if self.peek(1) == Some(b'*') => self.scan_block_comment(begin),
                b'\'' => {
                    self.scan_quoted(begin, b'\'', TokenType::LiteralString);
                }
                b'x' | b'X' if self.peek(1) == Some(b'\'') => {
                    self.pos += 1;
                    self.scan_quoted(begin, b'\'', TokenType::LiteralHex);
                }
                b'b' | b'B' if self.peek(1) == Some(b'\'') => {
                    self.pos += 1;
                    self.scan_quoted(begin, b'\'', TokenType::LiteralBinary);
                }
                b'e' | b'E' if self.peek(1) == Some(b'\'') => {
                    self.pos += 1;
                    self.scan_quoted(begin, b'\'', TokenType::LiteralString);
                }
                b'"' | b'`' => {
                    if self.scan_quoted(begin, b, TokenType::QuotedIdentifier) {
                        let raw = &self.text[begin..self.pos];
                        let name = normalize_name(raw, TokenType::QuotedIdentifier);
                        let location = Location::from_range(begin as u32, self.pos as u32);
                        self.names.register(&name, location, NameTags::empty());
                    }
                }
                b'0'..=b'9' => self.scan_number(begin),
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit())
                    && !self.follows_name() =>
                {
                    self.scan_number(begin)
                }
                b'.' => {
                    self.pos += 1;
                    let continues = self
                        .peek(0)
                        .is_some_and(|c| is_ident_start(c) || c == b'"' || c == b'`' || c == b'*');
                    let token_type = if continues {
                        TokenType::Dot
                    } else {
                        TokenType::DotTrailing
                    };
                    self.push(begin, token_type);
                }
                c if is_ident_start(c) => self.scan_word(begin),
                b'(' | b')' | b',' | b';' | b'[' | b']' => {
                    self.pos += 1;
                    self.push(begin, TokenType::Punctuation);
                }
                _ => self.scan_operator(begin),
            }
        }
    }

    /// Whether the previous token ends exactly here and carries a name
    fn follows_name(&self) -> bool {
        self.tokens.last().is_some_and(|t| {
            t.location.end() as usize == self.pos && t.token_type.is_name()
        })
    }

    fn scan_block_comment(&mut self, begin: usize) {
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => {
                    self.push(begin, TokenType::Comment);
                    self.report(
                        DiagnosticCode::UnterminatedComment,
                        "unterminated block comment",
                        begin,
                    );
                    return;
                }
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.pos += 2;
                    self.push(begin, TokenType::Comment);
                    return;
                }
                Some(b'\n') => {
                    self.line_breaks.push(self.pos as u32);
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Scan a quoted token starting at the current quote character
    ///
    /// Doubled quotes escape themselves. Returns false when the token runs
    /// into the end of input.
    fn scan_quoted(&mut self, begin: usize, quote: u8, token_type: TokenType) -> bool {
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => {
                    self.push(begin, token_type);
                    let what = if token_type == TokenType::QuotedIdentifier {
                        "unterminated quoted identifier"
                    } else {
                        "unterminated literal"
                    };
                    self.report(DiagnosticCode::UnterminatedLiteral, what, begin);
                    return false;
                }
                Some(c) if c == quote => {
                    if self.peek(1) == Some(quote) {
                        self.pos += 2;
                        continue;
                    }
                    self.pos += 1;
                    self.push(begin, token_type);
                    return true;
                }
                Some(b'\n') => {
                    self.line_breaks.push(self.pos as u32);
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_number(&mut self, begin: usize) {
        if self.peek(0) == Some(b'0')
            && matches!(self.peek(1), Some(b'x' | b'X'))
            && self.peek(2).is_some_and(|c| c.is_ascii_hexdigit())
        {
            self.pos += 2;
            while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            self.push(begin, TokenType::LiteralHex);
            return;
        }

        let mut is_float = false;
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek(0) == Some(b'.') && !self.peek(1).is_some_and(is_ident_start) {
            is_float = true;
            self.pos += 1;
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            let digits_at = match self.peek(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if self.peek(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += digits_at;
                while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let token_type = if is_float {
            TokenType::LiteralFloat
        } else {
            TokenType::LiteralInteger
        };
        self.push(begin, token_type);
    }

    fn scan_word(&mut self, begin: usize) {
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        // Multi-byte characters are consumed byte by byte above, the end is
        // always a char boundary because ASCII bytes never continue one.
        let raw = &self.text[begin..self.pos];
        let lower = raw.to_lowercase();
        let location = Location::from_range(begin as u32, self.pos as u32);
        if lower == "true" || lower == "false" {
            self.push(begin, TokenType::LiteralBoolean);
            return;
        }
        match keyword_category(&lower) {
            Some(KeywordCategory::Reserved) => self.push(begin, TokenType::Keyword),
            Some(KeywordCategory::Unreserved) => {
                // May still be used as a name by the parser
                self.names.register(&lower, location, NameTags::KEYWORD);
                self.push(begin, TokenType::Keyword);
            }
            None => {
                self.names.register(&lower, location, NameTags::empty());
                self.push(begin, TokenType::Identifier);
            }
        }
    }

    fn scan_operator(&mut self, begin: usize) {
        let two = (self.peek(0), self.peek(1));
        let width = match two {
            (Some(b'<'), Some(b'=' | b'>'))
            | (Some(b'>'), Some(b'='))
            | (Some(b'!'), Some(b'='))
            | (Some(b'|'), Some(b'|'))
            | (Some(b':'), Some(b':')) => 2,
            (
                Some(
                    b'+' | b'-' | b'*' | b'/' | b'%' | b'=' | b'<' | b'>' | b'~' | b'!' | b'^'
                    | b'&' | b'|',
                ),
                _,
            ) => 1,
            _ => 0,
        };
        if width > 0 {
            self.pos += width;
            self.push(begin, TokenType::Operator);
            return;
        }

        // Skip one whole character
        let len = self.text[self.pos..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        self.pos += len;
        self.report(
            DiagnosticCode::InvalidCharacter,
            "invalid character",
            begin,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(text: &str) -> Vec<TokenType> {
        scan(text, 0).tokens.iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_keyword_vs_identifier() {
        assert_eq!(token_types("selec"), vec![TokenType::Identifier]);
        assert_eq!(token_types("select"), vec![TokenType::Keyword]);
        assert_eq!(token_types("SeLeCt"), vec![TokenType::Keyword]);
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            token_types("1 1.5 .5 1e3 0x1F x'AB' b'01' 'str' true"),
            vec![
                TokenType::LiteralInteger,
                TokenType::LiteralFloat,
                TokenType::LiteralFloat,
                TokenType::LiteralFloat,
                TokenType::LiteralHex,
                TokenType::LiteralHex,
                TokenType::LiteralBinary,
                TokenType::LiteralString,
                TokenType::LiteralBoolean,
            ]
        );
    }

    #[test]
    fn test_dots() {
        assert_eq!(
            token_types("select   foo.bar.  "),
            vec![
                TokenType::Keyword,
                TokenType::Identifier,
                TokenType::Dot,
                TokenType::Identifier,
                TokenType::DotTrailing,
            ]
        );
        assert_eq!(
            token_types("a.*"),
            vec![TokenType::Identifier, TokenType::Dot, TokenType::Operator]
        );
    }

    #[test]
    fn test_trailing_comment_is_a_token() {
        assert_eq!(
            token_types("select 1 --"),
            vec![
                TokenType::Keyword,
                TokenType::LiteralInteger,
                TokenType::Comment
            ]
        );
    }

    #[test]
    fn test_unterminated_tokens_reach_end_of_input() {
        let scanned = scan("select 'abc", 0);
        assert_eq!(scanned.tokens.len(), 2);
        assert_eq!(scanned.tokens[1].location, Location::new(7, 4));
        assert_eq!(
            scanned.diagnostics[0].code,
            DiagnosticCode::UnterminatedLiteral
        );

        let scanned = scan("select /* open", 0);
        assert_eq!(scanned.tokens[1].token_type, TokenType::Comment);
        assert_eq!(
            scanned.diagnostics[0].code,
            DiagnosticCode::UnterminatedComment
        );
    }

    #[test]
    fn test_operators_and_punctuation() {
        assert_eq!(
            token_types("a<=b<>c,(d)||e;"),
            vec![
                TokenType::Identifier,
                TokenType::Operator,
                TokenType::Identifier,
                TokenType::Operator,
                TokenType::Identifier,
                TokenType::Punctuation,
                TokenType::Punctuation,
                TokenType::Identifier,
                TokenType::Punctuation,
                TokenType::Operator,
                TokenType::Identifier,
                TokenType::Punctuation,
            ]
        );
    }

    #[test]
    fn test_invalid_character_is_skipped() {
        let scanned = scan("select @ 1", 0);
        assert_eq!(scanned.tokens.len(), 2);
        assert_eq!(scanned.diagnostics[0].code, DiagnosticCode::InvalidCharacter);
    }

    #[test]
    fn test_names_are_interned() {
        let scanned = scan("select Foo, foo, \"Foo\" from foo", 0);
        let foo = scanned.names.lookup("foo").unwrap();
        assert_eq!(scanned.names.get(foo).unwrap().occurrences, 3);
        let quoted = scanned.names.lookup("Foo").unwrap();
        assert_ne!(foo, quoted);
        assert_eq!(scanned.token_name(1), Some(foo));
    }

    #[test]
    fn test_line_breaks() {
        let scanned = scan("select\n1\n", 0);
        assert_eq!(scanned.line_breaks, vec![6, 8]);
    }

    #[test]
    fn test_find_symbol_empty() {
        assert_eq!(scan("", 0).find_symbol(0), None);
    }

    #[test]
    fn test_find_symbol_adjacent() {
        let scanned = scan("select 1", 0);
        let at = |offset| {
            let loc = scanned.find_symbol(offset).unwrap();
            (loc.symbol_id, loc.relative_position)
        };
        assert_eq!(at(0), (0, RelativePosition::BeginOfSymbol));
        assert_eq!(at(3), (0, RelativePosition::MidOfSymbol));
        assert_eq!(at(6), (0, RelativePosition::EndOfSymbol));
        assert_eq!(at(7), (1, RelativePosition::BeginOfSymbol));
        assert_eq!(at(8), (1, RelativePosition::EndOfSymbol));
        assert_eq!(at(100), (1, RelativePosition::EndOfSymbol));
    }

    #[test]
    fn test_find_symbol_whitespace() {
        let scanned = scan("select   1  ", 0);
        let at = |offset| {
            let loc = scanned.find_symbol(offset).unwrap();
            (loc.symbol_id, loc.relative_position)
        };
        assert_eq!(at(7), (0, RelativePosition::NewSymbolAfter));
        assert_eq!(at(8), (0, RelativePosition::NewSymbolAfter));
        assert_eq!(at(11), (1, RelativePosition::NewSymbolAfter));
        assert_eq!(at(12), (1, RelativePosition::NewSymbolAfter));

        let scanned = scan("  select", 0);
        assert_eq!(
            scanned.find_symbol(0).unwrap().relative_position,
            RelativePosition::NewSymbolBefore
        );
    }

    #[test]
    fn test_find_symbol_dots() {
        let scanned = scan("select   foo.bar.  ", 0);
        let at = |offset| {
            let loc = scanned.find_symbol(offset).unwrap();
            (loc.symbol_id, loc.relative_position)
        };
        assert_eq!(at(12), (2, RelativePosition::BeginOfSymbol));
        assert_eq!(at(16), (4, RelativePosition::BeginOfSymbol));
        assert_eq!(at(17), (4, RelativePosition::EndOfSymbol));
        assert_eq!(at(18), (4, RelativePosition::NewSymbolAfter));
    }

    #[test]
    fn test_tokens_in() {
        let scanned = scan("select a, b from c", 0);
        assert_eq!(scanned.tokens_in(Location::new(7, 4)), 1..4);
    }

    #[test]
    fn test_normalize_quoted() {
        assert_eq!(
            normalize_name("\"Say \"\"Hi\"\"\"", TokenType::QuotedIdentifier),
            "Say \"Hi\""
        );
        assert_eq!(normalize_name("FoO", TokenType::Identifier), "foo");
    }
}
