// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Keyword table shared by the scanner and the parser.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Whether a keyword may double as a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Never a name, e.g. `select`, `from`, `join`
    Reserved,
    /// Usable as a column, table or alias name, e.g. `key`, `view`
    Unreserved,
}

const KEYWORDS: &[(&str, KeywordCategory)] = &[
    ("all", KeywordCategory::Reserved),
    ("and", KeywordCategory::Reserved),
    ("as", KeywordCategory::Reserved),
    ("asc", KeywordCategory::Reserved),
    ("between", KeywordCategory::Reserved),
    ("by", KeywordCategory::Reserved),
    ("case", KeywordCategory::Reserved),
    ("cast", KeywordCategory::Reserved),
    ("check", KeywordCategory::Reserved),
    ("constraint", KeywordCategory::Reserved),
    ("create", KeywordCategory::Reserved),
    ("cross", KeywordCategory::Reserved),
    ("default", KeywordCategory::Reserved),
    ("delete", KeywordCategory::Reserved),
    ("desc", KeywordCategory::Reserved),
    ("distinct", KeywordCategory::Reserved),
    ("drop", KeywordCategory::Reserved),
    ("else", KeywordCategory::Reserved),
    ("end", KeywordCategory::Reserved),
    ("except", KeywordCategory::Reserved),
    ("exists", KeywordCategory::Reserved),
    ("first", KeywordCategory::Unreserved),
    ("foreign", KeywordCategory::Reserved),
    ("from", KeywordCategory::Reserved),
    ("full", KeywordCategory::Reserved),
    ("group", KeywordCategory::Reserved),
    ("having", KeywordCategory::Reserved),
    ("if", KeywordCategory::Unreserved),
    ("ilike", KeywordCategory::Reserved),
    ("in", KeywordCategory::Reserved),
    ("inner", KeywordCategory::Reserved),
    ("insert", KeywordCategory::Reserved),
    ("intersect", KeywordCategory::Reserved),
    ("into", KeywordCategory::Reserved),
    ("is", KeywordCategory::Reserved),
    ("join", KeywordCategory::Reserved),
    ("key", KeywordCategory::Unreserved),
    ("last", KeywordCategory::Unreserved),
    ("left", KeywordCategory::Reserved),
    ("like", KeywordCategory::Reserved),
    ("limit", KeywordCategory::Reserved),
    ("natural", KeywordCategory::Reserved),
    ("not", KeywordCategory::Reserved),
    ("null", KeywordCategory::Reserved),
    ("nulls", KeywordCategory::Unreserved),
    ("offset", KeywordCategory::Reserved),
    ("on", KeywordCategory::Reserved),
    ("or", KeywordCategory::Reserved),
    ("order", KeywordCategory::Reserved),
    ("outer", KeywordCategory::Reserved),
    ("primary", KeywordCategory::Reserved),
    ("recursive", KeywordCategory::Unreserved),
    ("references", KeywordCategory::Reserved),
    ("replace", KeywordCategory::Unreserved),
    ("right", KeywordCategory::Reserved),
    ("select", KeywordCategory::Reserved),
    ("set", KeywordCategory::Unreserved),
    ("table", KeywordCategory::Reserved),
    ("temp", KeywordCategory::Unreserved),
    ("temporary", KeywordCategory::Unreserved),
    ("then", KeywordCategory::Reserved),
    ("union", KeywordCategory::Reserved),
    ("unique", KeywordCategory::Reserved),
    ("using", KeywordCategory::Reserved),
    ("values", KeywordCategory::Reserved),
    ("view", KeywordCategory::Unreserved),
    ("when", KeywordCategory::Reserved),
    ("where", KeywordCategory::Reserved),
    ("with", KeywordCategory::Reserved),
];

fn keyword_index() -> &'static HashMap<&'static str, KeywordCategory> {
    static INDEX: OnceLock<HashMap<&'static str, KeywordCategory>> = OnceLock::new();
    INDEX.get_or_init(|| KEYWORDS.iter().copied().collect())
}

/// Look up a lowercase word in the keyword table
pub fn keyword_category(lowercase: &str) -> Option<KeywordCategory> {
    keyword_index().get(lowercase).copied()
}

/// All keywords with their category
pub fn all_keywords() -> impl Iterator<Item = (&'static str, KeywordCategory)> {
    KEYWORDS.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(keyword_category("select"), Some(KeywordCategory::Reserved));
        assert_eq!(keyword_category("key"), Some(KeywordCategory::Unreserved));
        assert_eq!(keyword_category("selec"), None);
    }

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in KEYWORDS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }
}
