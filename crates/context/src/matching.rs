// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Prefix and fuzzy matching of completion candidates.

use serde::Serialize;

/// How well a candidate matches the typed prefix, better tiers compare greater
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchTier {
    /// Prefix appears inside the candidate, or its characters in order
    Fuzzy = 1,
    CaseInsensitivePrefix = 2,
    ExactPrefix = 3,
}

/// Match a candidate against the typed prefix
///
/// An empty prefix matches everything exactly.
pub fn match_tier(candidate: &str, prefix: &str) -> Option<MatchTier> {
    if candidate.starts_with(prefix) {
        return Some(MatchTier::ExactPrefix);
    }
    let candidate = candidate.to_lowercase();
    let prefix = prefix.to_lowercase();
    if candidate.starts_with(&prefix) {
        Some(MatchTier::CaseInsensitivePrefix)
    } else if candidate.contains(&prefix) || is_subsequence(&prefix, &candidate) {
        Some(MatchTier::Fuzzy)
    } else {
        None
    }
}

/// Whether the characters of `needle` occur in `haystack` in order
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut remaining = haystack.chars();
    needle.chars().all(|c| remaining.any(|h| h == c))
}
