// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Script-specific test helpers and custom assertions

use sqlscript_context::Completion;
use sqlscript_ir::{Diagnostic, DiagnosticCode, NameTags};
use sqlscript_semantic::{AnalyzedScript, ExpressionKind};

/// Custom assertion helpers for analyzed scripts and completions
pub struct ScriptAssertions;

impl ScriptAssertions {
    /// Diagnostics of every pipeline stage, in stage order
    pub fn all_diagnostics(analyzed: &AnalyzedScript) -> Vec<&Diagnostic> {
        analyzed
            .parsed
            .scanned
            .diagnostics
            .iter()
            .chain(&analyzed.parsed.diagnostics)
            .chain(&analyzed.diagnostics)
            .collect()
    }

    /// Assert that no stage reported a diagnostic
    pub fn assert_clean(analyzed: &AnalyzedScript) {
        let diagnostics = Self::all_diagnostics(analyzed);
        assert!(
            diagnostics.is_empty(),
            "Expected no diagnostics, found {:?}",
            diagnostics
                .iter()
                .map(|d| format!("{}: {}", d.code, d.message))
                .collect::<Vec<_>>()
        );
    }

    /// Assert the exact diagnostic codes of all stages
    pub fn assert_codes(analyzed: &AnalyzedScript, expected: &[DiagnosticCode]) {
        let codes: Vec<DiagnosticCode> = Self::all_diagnostics(analyzed)
            .iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(codes, expected, "Diagnostic codes mismatch");
    }

    /// Assert that every column reference resolved
    pub fn assert_columns_resolved(analyzed: &AnalyzedScript) {
        for expression in &analyzed.expressions {
            if let ExpressionKind::ColumnRef(column) = &expression.kind {
                assert!(
                    column.is_resolved(),
                    "Column '{}' at {} is unresolved",
                    column.column_name,
                    expression.location.offset
                );
            }
        }
    }

    /// Assert that a script name carries `tags`
    pub fn assert_name_tagged(analyzed: &AnalyzedScript, name: &str, tags: NameTags) {
        let Some(id) = analyzed.parsed.scanned.names.lookup(name) else {
            panic!("Name '{name}' does not occur in the script");
        };
        let actual = analyzed.name_tags[id as usize];
        assert!(
            actual.contains(tags),
            "Name '{name}' has tags {actual:?}, expected {tags:?}"
        );
    }

    /// Assert that a completion offers `text`
    pub fn assert_candidate(completion: &Completion, text: &str) {
        assert!(
            completion
                .candidates
                .iter()
                .any(|c| c.completion_text == text),
            "Expected candidate '{}', found {:?}",
            text,
            Self::candidate_texts(completion)
        );
    }

    /// Assert the best candidate of a completion
    pub fn assert_first_candidate(completion: &Completion, text: &str) {
        assert_eq!(
            completion.candidates.first().map(|c| c.completion_text.as_str()),
            Some(text),
            "First candidate mismatch, candidates {:?}",
            Self::candidate_texts(completion)
        );
    }

    pub fn candidate_texts(completion: &Completion) -> Vec<&str> {
        completion
            .candidates
            .iter()
            .map(|c| c.completion_text.as_str())
            .collect()
    }
}
