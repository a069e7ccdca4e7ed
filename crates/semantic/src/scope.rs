// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Scope management for semantic analysis
//!
//! Every SELECT core opens a scope holding the table references of its FROM
//! clause. Subqueries in expressions get the enclosing scope as parent, so
//! correlated column references resolve outward. Derived tables in FROM are
//! parented to the scope *above* their query, which keeps sibling FROM items
//! invisible to them.

use serde::Serialize;
use sqlscript_ir::TableReferenceId;

/// Type of scope in a SQL query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeType {
    /// Top-level query or DML statement
    Query,
    /// Subquery inside an expression
    Subquery,
    /// Subquery in FROM
    Derived,
    /// Body of a common table expression
    Cte,
}

/// A lexical scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub id: usize,
    pub parent_id: Option<usize>,
    pub scope_type: ScopeType,
    /// Table references in FROM order
    pub tables: Vec<TableReferenceId>,
}

impl Scope {
    pub fn new(id: usize, scope_type: ScopeType) -> Self {
        Self {
            id,
            parent_id: None,
            tables: Vec::new(),
            scope_type,
        }
    }

    /// Builder method: set the parent scope
    pub fn with_parent(mut self, parent_id: usize) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn add_table(&mut self, table: TableReferenceId) {
        self.tables.push(table);
    }
}

/// Arena of scopes created while analyzing one script
#[derive(Debug, Clone, Default)]
pub struct ScopeManager {
    scopes: Vec<Scope>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope and return its id
    pub fn create_scope(&mut self, scope_type: ScopeType, parent_id: Option<usize>) -> usize {
        let id = self.scopes.len();
        let mut scope = Scope::new(id, scope_type);
        if let Some(parent) = parent_id {
            scope = scope.with_parent(parent);
        }
        self.scopes.push(scope);
        id
    }

    pub fn get_scope(&self, id: usize) -> Option<&Scope> {
        self.scopes.get(id)
    }

    pub fn get_scope_mut(&mut self, id: usize) -> Option<&mut Scope> {
        self.scopes.get_mut(id)
    }

    pub fn parent_of(&self, id: usize) -> Option<usize> {
        self.get_scope(id).and_then(|s| s.parent_id)
    }

    /// Scopes visible from `id`, innermost first
    pub fn chain(&self, id: usize) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(self.get_scope(id), move |scope| {
            scope.parent_id.and_then(|p| self.get_scope(p))
        })
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}
