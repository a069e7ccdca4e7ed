// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Keywords for Completion
//!
//! Keyword sets offered by the default completion strategy, grouped by the
//! statement the cursor is in.

use sqlscript_grammar::StatementType;
use std::collections::HashSet;

/// SQL keyword with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SqlKeyword {
    /// Lowercase keyword text, possibly several words
    pub label: String,
    pub description: Option<String>,
    /// Sort order (lower = higher priority)
    pub sort_priority: i32,
}

impl SqlKeyword {
    pub fn new(label: &str, description: Option<&str>, sort_priority: i32) -> Self {
        Self {
            label: label.to_lowercase(),
            description: description.map(|d| d.to_string()),
            sort_priority,
        }
    }

    /// Create a keyword without description
    pub fn simple(label: &str, sort_priority: i32) -> Self {
        Self::new(label, None, sort_priority)
    }
}

/// Keyword set for a specific context
#[derive(Debug, Clone)]
pub struct KeywordSet {
    pub keywords: Vec<SqlKeyword>,
}

impl KeywordSet {
    pub fn new(keywords: Vec<SqlKeyword>) -> Self {
        Self { keywords }
    }

    /// Get all keyword labels as a HashSet for filtering
    pub fn labels(&self) -> HashSet<String> {
        self.keywords.iter().map(|k| k.label.clone()).collect()
    }

    /// Merge another set, keeping the first occurrence of each label
    pub fn merge(mut self, other: KeywordSet) -> Self {
        let labels = self.labels();
        self.keywords
            .extend(other.keywords.into_iter().filter(|k| !labels.contains(&k.label)));
        self
    }
}

/// Keyword provider for the statement kinds the parser understands
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordProvider;

impl KeywordProvider {
    pub fn new() -> Self {
        Self
    }

    /// Keywords that start a statement
    pub fn statement_keywords(&self) -> KeywordSet {
        KeywordSet::new(vec![
            SqlKeyword::new("select", Some("Retrieve data from tables"), 1),
            SqlKeyword::new("with", Some("Common Table Expression (CTE)"), 2),
            SqlKeyword::new("create", Some("Create a table or view"), 3),
            SqlKeyword::new("insert", Some("Insert new rows into a table"), 4),
            SqlKeyword::new("delete", Some("Delete rows from a table"), 5),
            SqlKeyword::new("drop", Some("Remove a table or view"), 6),
        ])
    }

    /// Clause keywords inside SELECT statements
    pub fn select_clause_keywords(&self) -> KeywordSet {
        KeywordSet::new(vec![
            SqlKeyword::new("from", Some("Specify tables to query"), 1),
            SqlKeyword::new("where", Some("Filter rows"), 2),
            SqlKeyword::new("group by", Some("Group rows by values"), 3),
            SqlKeyword::new("having", Some("Filter groups"), 4),
            SqlKeyword::new("order by", Some("Sort result rows"), 5),
            SqlKeyword::new("limit", Some("Limit number of rows"), 6),
            SqlKeyword::new("offset", Some("Skip rows before limiting"), 7),
            SqlKeyword::new("join", Some("Join with another table"), 8),
            SqlKeyword::new("inner join", Some("Inner join with another table"), 9),
            SqlKeyword::new("left join", Some("Left outer join"), 10),
            SqlKeyword::new("right join", Some("Right outer join"), 11),
            SqlKeyword::new("full join", Some("Full outer join"), 12),
            SqlKeyword::new("cross join", Some("Cross join"), 13),
            SqlKeyword::new("on", Some("Join condition"), 14),
            SqlKeyword::new("using", Some("Join columns"), 15),
            SqlKeyword::new("union", Some("Combine result sets"), 16),
            SqlKeyword::new("union all", Some("Combine result sets with duplicates"), 17),
            SqlKeyword::new("intersect", Some("Intersection of result sets"), 18),
            SqlKeyword::new("except", Some("Difference of result sets"), 19),
            SqlKeyword::new("distinct", Some("Remove duplicate rows"), 20),
            SqlKeyword::new("as", Some("Alias for columns or tables"), 21),
            SqlKeyword::new("asc", Some("Ascending order"), 22),
            SqlKeyword::new("desc", Some("Descending order"), 23),
        ])
    }

    /// Operators and literals usable inside expressions
    pub fn expression_keywords(&self) -> KeywordSet {
        KeywordSet::new(vec![
            SqlKeyword::new("and", Some("Logical AND"), 1),
            SqlKeyword::new("or", Some("Logical OR"), 2),
            SqlKeyword::new("not", Some("Logical NOT"), 3),
            SqlKeyword::new("in", Some("Value in list"), 4),
            SqlKeyword::new("exists", Some("Subquery exists"), 5),
            SqlKeyword::new("between", Some("Value between range"), 6),
            SqlKeyword::new("like", Some("Pattern matching"), 7),
            SqlKeyword::new("ilike", Some("Case-insensitive pattern matching"), 8),
            SqlKeyword::new("is null", Some("Check if value is NULL"), 9),
            SqlKeyword::new("is not null", Some("Check if value is not NULL"), 10),
            SqlKeyword::new("case", Some("Conditional expression"), 11),
            SqlKeyword::new("when", Some("CASE WHEN condition"), 12),
            SqlKeyword::new("then", Some("CASE THEN result"), 13),
            SqlKeyword::new("else", Some("CASE ELSE default"), 14),
            SqlKeyword::new("end", Some("END CASE expression"), 15),
            SqlKeyword::new("null", Some("NULL value"), 16),
            SqlKeyword::new("true", Some("Boolean TRUE"), 17),
            SqlKeyword::new("false", Some("Boolean FALSE"), 18),
            SqlKeyword::new("cast", Some("Cast to type"), 19),
        ])
    }

    pub fn create_keywords(&self) -> KeywordSet {
        KeywordSet::new(vec![
            SqlKeyword::new("table", Some("Create table"), 1),
            SqlKeyword::new("view", Some("Create view"), 2),
            SqlKeyword::new("temporary", Some("Temporary table"), 3),
            SqlKeyword::new("or replace", Some("Replace if exists"), 4),
            SqlKeyword::new("if not exists", Some("Skip if the table exists"), 5),
            SqlKeyword::new("as", Some("Create from a query"), 6),
            SqlKeyword::new("primary key", Some("Primary key constraint"), 7),
            SqlKeyword::new("not null", Some("Not null constraint"), 8),
            SqlKeyword::new("unique", Some("Unique constraint"), 9),
            SqlKeyword::new("references", Some("Foreign key reference"), 10),
            SqlKeyword::new("default", Some("Default value"), 11),
            SqlKeyword::new("check", Some("Check constraint"), 12),
        ])
    }

    pub fn drop_keywords(&self) -> KeywordSet {
        KeywordSet::new(vec![
            SqlKeyword::new("table", Some("Drop table"), 1),
            SqlKeyword::new("view", Some("Drop view"), 2),
            SqlKeyword::new("if exists", Some("Drop if exists"), 3),
        ])
    }

    pub fn insert_keywords(&self) -> KeywordSet {
        KeywordSet::new(vec![
            SqlKeyword::new("into", Some("Insert into table"), 1),
            SqlKeyword::new("values", Some("Insert values"), 2),
            SqlKeyword::new("select", Some("Insert query results"), 3),
        ])
    }

    pub fn delete_keywords(&self) -> KeywordSet {
        KeywordSet::new(vec![
            SqlKeyword::new("from", Some("Delete from table"), 1),
            SqlKeyword::new("where", Some("Filter rows to delete"), 2),
        ])
    }

    /// Keywords offered inside a statement of the given type
    ///
    /// `None` means the cursor is not inside any statement.
    pub fn keywords_for(&self, statement_type: Option<StatementType>) -> KeywordSet {
        match statement_type {
            None | Some(StatementType::Invalid) => self
                .statement_keywords()
                .merge(self.select_clause_keywords()),
            Some(StatementType::Select) => self
                .select_clause_keywords()
                .merge(self.expression_keywords()),
            Some(StatementType::CreateTable)
            | Some(StatementType::CreateTableAs)
            | Some(StatementType::CreateView) => self
                .create_keywords()
                .merge(self.select_clause_keywords()),
            Some(StatementType::Insert) => self
                .insert_keywords()
                .merge(self.select_clause_keywords()),
            Some(StatementType::Delete) => self
                .delete_keywords()
                .merge(self.expression_keywords()),
            Some(StatementType::Drop) => self.drop_keywords(),
        }
    }
}
