// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Semantic Analyzer
//!
//! Walks the statements of a parsed script in order and produces an
//! [`AnalyzedScript`]:
//!
//! 1. Table references are resolved against the CTEs of the statement, then
//!    against tables declared earlier in the same script (most recent first),
//!    then against the catalog, ignoring the script's own catalog entry.
//! 2. Column references are resolved through the scope stack in FROM order.
//! 3. Predicates reachable from WHERE, HAVING and ON roots are classified
//!    into column filters.
//! 4. Statement liveness is derived from which declarations later statements
//!    read.
//!
//! Analysis never fails. Unresolved or ambiguous names become diagnostics.

use crate::analyzed::{
    AnalyzedScript, ColumnComputation, ColumnFilter, ColumnRefExpression, Expression,
    ExpressionKind, FunctionReference, ResolvedColumn, ResolvedTable, StatementInfo,
    TableReference, TableSource, column_refs_under,
};
use crate::resolution::{ColumnResolution, ColumnResolver, find_column_index, suggest};
use crate::scope::{ScopeManager, ScopeType};
use sqlscript_catalog::{
    Catalog, ColumnDeclaration, QualifiedTableName, TableDeclaration, names_match,
};
use sqlscript_function_registry::FunctionRegistry;
use sqlscript_grammar::{ConstraintKind, Node, ParsedScript, Statement, StatementType};
use sqlscript_ir::{
    AttributeKey, CatalogEntryId, DataType, Diagnostic, DiagnosticCode, ExpressionId,
    ExpressionOperator, ExternalObjectId, FunctionType, LiteralKind, NULL_OBJECT_ID, NameTags,
    NodeId, NodeType, StatementId, TableReferenceId,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Roles of the names in a table path, last name first
const TABLE_PATH_TAGS: [NameTags; 3] = [
    NameTags::TABLE_NAME,
    NameTags::SCHEMA_NAME,
    NameTags::DATABASE_NAME,
];

/// Name of result columns without a derivable name
const ANONYMOUS_COLUMN: &str = "?column?";

struct CteDefinition {
    name: String,
    column_names: Vec<String>,
}

/// Semantic analyzer for one parsed script
pub struct Analyzer<'a> {
    parsed: &'a ParsedScript,
    catalog: &'a Catalog,
    functions: &'a FunctionRegistry,
    entry_id: CatalogEntryId,
    catalog_version: u32,

    scopes: ScopeManager,
    /// One frame per WITH clause being analyzed
    ctes: Vec<Vec<CteDefinition>>,
    statement_id: StatementId,
    /// Statement that declared each table declaration
    declared_by: Vec<StatementId>,

    table_declarations: Vec<TableDeclaration>,
    table_references: Vec<TableReference>,
    expressions: Vec<Expression>,
    column_filters: Vec<ColumnFilter>,
    column_computations: Vec<ColumnComputation>,
    function_references: Vec<FunctionReference>,
    statements: Vec<StatementInfo>,
    name_tags: Vec<NameTags>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Analyzer<'a> {
    /// Analyze a parsed script against a catalog
    ///
    /// `entry_id` is the catalog entry the script is (or will be) loaded
    /// under. Its own tables in the catalog are ignored so that a script
    /// never resolves names against a stale copy of itself.
    pub fn analyze(
        parsed: Arc<ParsedScript>,
        catalog: &Catalog,
        entry_id: CatalogEntryId,
        functions: &FunctionRegistry,
    ) -> AnalyzedScript {
        debug!(
            entry_id,
            statements = parsed.statements.len(),
            catalog_version = catalog.version(),
            "Analyzing script"
        );
        let mut analyzer = Analyzer::new(&parsed, catalog, entry_id, functions);
        for (statement_id, statement) in parsed.statements.iter().enumerate() {
            analyzer.analyze_statement(statement_id as StatementId, statement);
        }
        let analyzed = analyzer.finish(parsed.clone());
        debug!(
            entry_id,
            table_references = analyzed.table_references.len(),
            expressions = analyzed.expressions.len(),
            column_filters = analyzed.column_filters.len(),
            diagnostics = analyzed.diagnostics.len(),
            "Analyzed script"
        );
        analyzed
    }

    fn new(
        parsed: &'a ParsedScript,
        catalog: &'a Catalog,
        entry_id: CatalogEntryId,
        functions: &'a FunctionRegistry,
    ) -> Self {
        let name_tags = parsed.scanned.names.iter().map(|(_, e)| e.tags).collect();
        Self {
            parsed,
            catalog,
            functions,
            entry_id,
            catalog_version: catalog.version(),
            scopes: ScopeManager::new(),
            ctes: Vec::new(),
            statement_id: 0,
            declared_by: Vec::new(),
            table_declarations: Vec::new(),
            table_references: Vec::new(),
            expressions: Vec::new(),
            column_filters: Vec::new(),
            column_computations: Vec::new(),
            function_references: Vec::new(),
            statements: Vec::new(),
            name_tags,
            diagnostics: Vec::new(),
        }
    }

    fn finish(mut self, parsed: Arc<ParsedScript>) -> AnalyzedScript {
        for statement in &mut self.statements {
            statement.is_live = match statement.statement_type {
                StatementType::Select
                | StatementType::Insert
                | StatementType::Delete
                | StatementType::Drop => true,
                StatementType::CreateTable
                | StatementType::CreateTableAs
                | StatementType::CreateView => !statement.consumed_by.is_empty(),
                StatementType::Invalid => false,
            };
        }

        // Maximal constant subtrees: constant expressions without a constant parent
        let mut inside_constant = vec![false; self.expressions.len()];
        for expression in self.expressions.iter().filter(|e| e.is_constant) {
            for child in expression.children() {
                if let Some(flag) = inside_constant.get_mut(child as usize) {
                    *flag = true;
                }
            }
        }
        let constant_expressions = self
            .expressions
            .iter()
            .filter(|e| e.is_constant && !inside_constant[e.expression_id as usize])
            .map(|e| e.expression_id)
            .collect();

        AnalyzedScript {
            parsed,
            catalog_entry_id: self.entry_id,
            catalog_version: self.catalog_version,
            table_declarations: self.table_declarations,
            table_references: self.table_references,
            expressions: self.expressions,
            column_filters: self.column_filters,
            column_computations: self.column_computations,
            constant_expressions,
            function_references: self.function_references,
            statements: self.statements,
            name_tags: self.name_tags,
            diagnostics: self.diagnostics,
        }
    }

    // Tree access

    fn node(&self, id: NodeId) -> Option<&'a Node> {
        self.parsed.node(id)
    }

    fn attr(&self, id: NodeId, key: AttributeKey) -> Option<NodeId> {
        self.parsed.attribute(id, key)
    }

    fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|n| n.child_ids().collect()).unwrap_or_default()
    }

    fn name_of(&self, id: NodeId) -> String {
        self.parsed.name_text(id).to_string()
    }

    fn report(&mut self, code: DiagnosticCode, message: String, node_id: NodeId) {
        let location = self.node(node_id).map(|n| n.location).unwrap_or_default();
        trace!(%code, %message, "Semantic diagnostic");
        self.diagnostics.push(
            Diagnostic::new(code, message, location)
                .with_statement(self.statement_id)
                .with_node(node_id),
        );
    }

    // Name tags

    fn tag_name(&mut self, node_id: NodeId, tags: NameTags) {
        let Some(node) = self.node(node_id) else {
            return;
        };
        if node.node_type != NodeType::Name || node.value == NULL_OBJECT_ID {
            return;
        }
        if let Some(slot) = self.name_tags.get_mut(node.value as usize) {
            *slot |= tags;
        }
    }

    /// Tag the names of a path, `roles` starting at the last name
    fn tag_path(&mut self, path: NodeId, roles: &[NameTags]) {
        let names: Vec<NodeId> = match self.node(path) {
            Some(node) if node.node_type == NodeType::Name => vec![path],
            Some(_) => self.child_ids(path),
            None => return,
        };
        for (name, tags) in names.into_iter().rev().zip(roles) {
            self.tag_name(name, *tags);
        }
    }

    fn tag_all(&mut self, array: NodeId, tags: NameTags) {
        for name in self.child_ids(array) {
            self.tag_name(name, tags);
        }
    }

    // Statements

    fn analyze_statement(&mut self, statement_id: StatementId, statement: &Statement) {
        self.statement_id = statement_id;
        self.statements.push(StatementInfo {
            statement_id,
            statement_type: statement.statement_type,
            declared_table: None,
            consumed_by: Vec::new(),
            is_live: false,
        });
        let root = statement.root;
        match statement.statement_type {
            StatementType::Select => {
                self.analyze_query(root, None, ScopeType::Query);
            }
            StatementType::CreateTable => self.analyze_create_table(root),
            StatementType::CreateTableAs => self.analyze_create_table_as(root),
            StatementType::CreateView => self.analyze_create_view(root),
            StatementType::Insert => self.analyze_insert(root),
            StatementType::Delete => self.analyze_delete(root),
            StatementType::Drop => self.analyze_drop(root),
            StatementType::Invalid => {}
        }
    }

    fn analyze_create_table(&mut self, root: NodeId) {
        let Some(name) = self.attr(root, AttributeKey::SqlCreateTableName) else {
            return;
        };
        let mut columns: Vec<ColumnDeclaration> = Vec::new();
        let mut primary_key = Vec::new();
        if let Some(elements) = self.attr(root, AttributeKey::SqlCreateTableElements) {
            for element in self.child_ids(elements) {
                let Some(node) = self.node(element) else {
                    continue;
                };
                match node.node_type {
                    NodeType::ObjectSqlColumnDef => columns.push(self.column_definition(element)),
                    NodeType::ObjectSqlTableConstraint => {
                        let key_columns =
                            self.attr(element, AttributeKey::SqlTableConstraintColumns);
                        if let Some(key_columns) = key_columns {
                            self.tag_all(key_columns, NameTags::COLUMN_NAME);
                            if ConstraintKind::from_u32(node.value) == Some(ConstraintKind::PrimaryKey) {
                                primary_key.extend(self.parsed.name_path(key_columns));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        for key in primary_key {
            if let Some(column) = columns.iter_mut().find(|c| names_match(&c.name, &key)) {
                column.is_primary_key = true;
                column.nullable = false;
            }
        }
        self.declare_table(name, columns, false);
    }

    fn column_definition(&mut self, element: NodeId) -> ColumnDeclaration {
        let name = self.attr(element, AttributeKey::SqlColumnDefName);
        if let Some(name) = name {
            self.tag_name(name, NameTags::COLUMN_NAME);
        }
        let mut column = ColumnDeclaration::new(name.map(|n| self.name_of(n)).unwrap_or_default());
        if let Some(data_type) = self.attr(element, AttributeKey::SqlColumnDefType) {
            column = column.with_type(DataType::from_sql_name(self.parsed.node_text(data_type)));
        }
        if let Some(constraints) = self.attr(element, AttributeKey::SqlColumnDefConstraints) {
            for constraint in self.parsed.children(constraints) {
                column = match ConstraintKind::from_u32(constraint.value) {
                    Some(ConstraintKind::NotNull) => column.with_nullable(false),
                    Some(ConstraintKind::Null) => column.with_nullable(true),
                    Some(ConstraintKind::PrimaryKey) => column.with_primary_key(true),
                    _ => column,
                };
            }
        }
        column
    }

    fn analyze_create_table_as(&mut self, root: NodeId) {
        let outputs = self
            .attr(root, AttributeKey::SqlCreateTableAs)
            .map(|query| self.analyze_query(query, None, ScopeType::Query))
            .unwrap_or_default();
        if let Some(name) = self.attr(root, AttributeKey::SqlCreateTableName) {
            let columns = outputs.into_iter().map(ColumnDeclaration::new).collect();
            self.declare_table(name, columns, false);
        }
    }

    fn analyze_create_view(&mut self, root: NodeId) {
        let mut outputs = self
            .attr(root, AttributeKey::SqlViewStatement)
            .map(|query| self.analyze_query(query, None, ScopeType::Query))
            .unwrap_or_default();
        if let Some(columns) = self.attr(root, AttributeKey::SqlViewColumns) {
            self.tag_all(columns, NameTags::COLUMN_NAME);
            for (i, name) in self.parsed.name_path(columns).into_iter().enumerate() {
                match outputs.get_mut(i) {
                    Some(output) => *output = name,
                    None => outputs.push(name),
                }
            }
        }
        if let Some(name) = self.attr(root, AttributeKey::SqlViewName) {
            let columns = outputs.into_iter().map(ColumnDeclaration::new).collect();
            self.declare_table(name, columns, true);
        }
    }

    /// Record a table declared by the current statement
    fn declare_table(&mut self, name_node: NodeId, columns: Vec<ColumnDeclaration>, is_view: bool) {
        self.tag_path(name_node, &TABLE_PATH_TAGS);
        let path = self.parsed.name_path(name_node);
        let Some(name) = QualifiedTableName::from_path(&path) else {
            self.report(
                DiagnosticCode::UnresolvedTable,
                format!("invalid table name '{}'", path.join(".")),
                name_node,
            );
            return;
        };
        let expanded = name.expand(self.catalog.default_database(), self.catalog.default_schema());
        if self.find_local_declaration(&expanded).is_some() {
            self.report(
                DiagnosticCode::DuplicateTableDeclaration,
                format!("table '{name}' is already declared in this script"),
                name_node,
            );
        }

        let index = self.table_declarations.len() as u32;
        let declaration = TableDeclaration::new(ExternalObjectId::new(self.entry_id, index), expanded.table)
            .with_qualifiers(
                expanded.database.unwrap_or_default(),
                expanded.schema.unwrap_or_default(),
            )
            .with_columns(columns)
            .with_view(is_view);
        trace!(table = %declaration.qualified_name(), columns = declaration.columns.len(), "Declared table");
        self.table_declarations.push(declaration);
        self.declared_by.push(self.statement_id);
        if let Some(statement) = self.statements.last_mut() {
            statement.declared_table = Some(index);
        }
    }

    fn analyze_insert(&mut self, root: NodeId) {
        let scope = self.scopes.create_scope(ScopeType::Query, None);
        let target = self
            .attr(root, AttributeKey::SqlInsertTarget)
            .map(|target| self.analyze_tableref(target, scope, true));
        if let Some(target) = target {
            self.add_to_scope(scope, target);
        }
        if let Some(columns) = self.attr(root, AttributeKey::SqlInsertColumns) {
            self.tag_all(columns, NameTags::COLUMN_NAME);
            let known = target
                .and_then(|t| self.table_references.get(t as usize))
                .filter(|t| !matches!(t.source, TableSource::Unresolved))
                .map(|t| (t.column_names.clone(), t.visible_name().unwrap_or_default().to_string()));
            if let Some((target_columns, table)) = known {
                for column in self.child_ids(columns) {
                    let name = self.name_of(column);
                    if find_column_index(&target_columns, &name).is_none() {
                        self.report(
                            DiagnosticCode::UnresolvedColumn,
                            format!("column '{name}' of table '{table}' does not exist"),
                            column,
                        );
                    }
                }
            }
        }
        if let Some(rows) = self.attr(root, AttributeKey::SqlInsertValues) {
            let values_scope = self.scopes.create_scope(ScopeType::Query, None);
            for row in self.child_ids(rows) {
                for value in self.child_ids(row) {
                    self.analyze_expression(value, values_scope, &[]);
                }
            }
        }
        if let Some(query) = self.attr(root, AttributeKey::SqlInsertStatement) {
            self.analyze_query(query, None, ScopeType::Query);
        }
    }

    fn analyze_delete(&mut self, root: NodeId) {
        let scope = self.scopes.create_scope(ScopeType::Query, None);
        if let Some(target) = self.attr(root, AttributeKey::SqlDeleteTarget) {
            let table = self.analyze_tableref(target, scope, true);
            self.add_to_scope(scope, table);
        }
        if let Some(filter) = self.attr(root, AttributeKey::SqlDeleteWhere) {
            let expression = self.analyze_expression(filter, scope, &[]);
            self.collect_filters(expression);
        }
    }

    fn analyze_drop(&mut self, root: NodeId) {
        let if_exists = self.parsed.flag(root, AttributeKey::SqlDropIfExists);
        let scope = self.scopes.create_scope(ScopeType::Query, None);
        if let Some(targets) = self.attr(root, AttributeKey::SqlDropTargets) {
            for target in self.child_ids(targets) {
                self.analyze_tableref(target, scope, !if_exists);
            }
        }
    }

    // Queries

    /// Analyze a SELECT and return the names of its result columns
    fn analyze_query(&mut self, node_id: NodeId, parent: Option<usize>, scope_type: ScopeType) -> Vec<String> {
        match self.node(node_id) {
            Some(node) if node.node_type == NodeType::ObjectSqlSelect => {}
            _ => return Vec::new(),
        }
        let ctes = self.attr(node_id, AttributeKey::SqlSelectWithCtes);
        if let Some(ctes) = ctes {
            self.ctes.push(Vec::new());
            for cte in self.child_ids(ctes) {
                self.analyze_cte(cte, parent);
            }
        }

        let outputs = match self.attr(node_id, AttributeKey::SqlSelectCombineInput) {
            Some(inputs) => {
                // Set operation: the first input names the result columns
                let mut outputs: Option<Vec<String>> = None;
                for input in self.child_ids(inputs) {
                    let names = self.analyze_query(input, parent, scope_type);
                    outputs.get_or_insert(names);
                }
                let outputs = outputs.unwrap_or_default();
                let scope = self.scopes.create_scope(scope_type, parent);
                self.analyze_query_tail(node_id, scope, &outputs);
                outputs
            }
            None => self.analyze_select_core(node_id, parent, scope_type),
        };

        if ctes.is_some() {
            self.ctes.pop();
        }
        outputs
    }

    fn analyze_cte(&mut self, cte: NodeId, parent: Option<usize>) {
        let Some(name_node) = self.attr(cte, AttributeKey::SqlCteName) else {
            return;
        };
        self.tag_name(name_node, NameTags::TABLE_NAME);
        let name = self.name_of(name_node);
        let declared_columns = match self.attr(cte, AttributeKey::SqlCteColumns) {
            Some(columns) => {
                self.tag_all(columns, NameTags::COLUMN_NAME);
                self.parsed.name_path(columns)
            }
            None => Vec::new(),
        };
        let outputs = self
            .attr(cte, AttributeKey::SqlCteStatement)
            .map(|query| self.analyze_query(query, parent, ScopeType::Cte))
            .unwrap_or_default();
        let column_names = if declared_columns.is_empty() {
            outputs
        } else {
            declared_columns
        };
        if let Some(frame) = self.ctes.last_mut() {
            frame.push(CteDefinition { name, column_names });
        }
    }

    fn analyze_select_core(
        &mut self,
        node_id: NodeId,
        parent: Option<usize>,
        scope_type: ScopeType,
    ) -> Vec<String> {
        let scope = self.scopes.create_scope(scope_type, parent);
        if let Some(from) = self.attr(node_id, AttributeKey::SqlSelectFrom) {
            for item in self.child_ids(from) {
                self.analyze_table_item(item, scope);
            }
        }

        let mut outputs = Vec::new();
        if let Some(targets) = self.attr(node_id, AttributeKey::SqlSelectTargets) {
            for target in self.child_ids(targets) {
                self.analyze_result_target(target, scope, &mut outputs);
            }
        }
        if let Some(filter) = self.attr(node_id, AttributeKey::SqlSelectWhere) {
            let expression = self.analyze_expression(filter, scope, &[]);
            self.collect_filters(expression);
        }
        if let Some(groups) = self.attr(node_id, AttributeKey::SqlSelectGroups) {
            for group in self.child_ids(groups) {
                self.analyze_expression(group, scope, &outputs);
            }
        }
        if let Some(having) = self.attr(node_id, AttributeKey::SqlSelectHaving) {
            let expression = self.analyze_expression(having, scope, &outputs);
            self.collect_filters(expression);
        }
        self.analyze_query_tail(node_id, scope, &outputs);
        outputs
    }

    /// ORDER BY, LIMIT and OFFSET
    fn analyze_query_tail(&mut self, node_id: NodeId, scope: usize, outputs: &[String]) {
        if let Some(order) = self.attr(node_id, AttributeKey::SqlSelectOrder) {
            for item in self.child_ids(order) {
                if let Some(value) = self.attr(item, AttributeKey::SqlOrderValue) {
                    self.analyze_expression(value, scope, outputs);
                }
            }
        }
        for key in [AttributeKey::SqlSelectLimit, AttributeKey::SqlSelectOffset] {
            if let Some(value) = self.attr(node_id, key) {
                self.analyze_expression(value, scope, &[]);
            }
        }
    }

    fn analyze_result_target(&mut self, target: NodeId, scope: usize, outputs: &mut Vec<String>) {
        if self.parsed.flag(target, AttributeKey::SqlResultTargetStar) {
            let tables = self
                .scopes
                .get_scope(scope)
                .map(|s| s.tables.clone())
                .unwrap_or_default();
            for table in tables {
                if let Some(table) = self.table_references.get(table as usize) {
                    outputs.extend(table.column_names.iter().cloned());
                }
            }
            return;
        }
        let Some(value) = self.attr(target, AttributeKey::SqlResultTargetValue) else {
            return;
        };
        let alias = self.attr(target, AttributeKey::SqlResultTargetName).map(|alias| {
            self.tag_name(alias, NameTags::COLUMN_NAME);
            self.name_of(alias)
        });
        let expression = self.analyze_expression(value, scope, &[]);

        // `t.*` expands to the columns of `t`
        if self.parsed.flag(value, AttributeKey::SqlColumnRefStar) {
            let qualifier = self
                .attr(value, AttributeKey::SqlColumnRefPath)
                .map(|path| self.parsed.name_path(path))
                .unwrap_or_default();
            let table = ColumnResolver::new(&self.scopes, &self.table_references)
                .resolve_qualifier(&qualifier, scope);
            match table.and_then(|t| self.table_references.get(t as usize)) {
                Some(table) => outputs.extend(table.column_names.iter().cloned()),
                None => self.report(
                    DiagnosticCode::UnresolvedTable,
                    format!("missing FROM-clause entry for table '{}'", qualifier.join(".")),
                    value,
                ),
            }
            return;
        }

        let name = alias
            .or_else(|| self.derived_column_name(expression))
            .unwrap_or_else(|| ANONYMOUS_COLUMN.to_string());
        outputs.push(name);
        self.collect_computations(expression);
    }

    fn derived_column_name(&self, expression: ExpressionId) -> Option<String> {
        match &self.expressions.get(expression as usize)?.kind {
            ExpressionKind::ColumnRef(column) => Some(column.column_name.clone()),
            ExpressionKind::FunctionCall {
                function_reference_id,
                ..
            } => self
                .function_references
                .get(*function_reference_id as usize)
                .map(|f| f.function_name.clone()),
            _ => None,
        }
    }

    // Table references

    fn analyze_table_item(&mut self, item: NodeId, scope: usize) {
        let Some(node) = self.node(item) else {
            return;
        };
        match node.node_type {
            NodeType::ObjectSqlJoinedTable => {
                if let Some(input) = self.attr(item, AttributeKey::SqlJoinedTableInput) {
                    for child in self.child_ids(input) {
                        self.analyze_table_item(child, scope);
                    }
                }
                if let Some(using) = self.attr(item, AttributeKey::SqlJoinedTableUsing) {
                    self.tag_all(using, NameTags::COLUMN_NAME);
                }
                if let Some(qualifier) = self.attr(item, AttributeKey::SqlJoinedTableQualifier) {
                    let expression = self.analyze_expression(qualifier, scope, &[]);
                    self.collect_filters(expression);
                }
            }
            NodeType::ObjectSqlTableref => {
                let table = self.analyze_tableref(item, scope, true);
                self.add_to_scope(scope, table);
            }
            _ => {}
        }
    }

    fn add_to_scope(&mut self, scope: usize, table: TableReferenceId) {
        let Some(new_table) = self.table_references.get(table as usize) else {
            return;
        };
        let visible = new_table.visible_name().map(str::to_string);
        let node_id = new_table.node_id;
        if let Some(scope) = self.scopes.get_scope_mut(scope) {
            let duplicate = visible.as_ref().is_some_and(|name| {
                scope.tables.iter().any(|t| {
                    self.table_references
                        .get(*t as usize)
                        .and_then(|t| t.visible_name())
                        == Some(name.as_str())
                })
            });
            scope.add_table(table);
            if duplicate {
                let name = visible.unwrap_or_default();
                self.report(
                    DiagnosticCode::DuplicateTableAlias,
                    format!("table name '{name}' specified more than once"),
                    node_id,
                );
            }
        }
    }

    /// Build and resolve the table reference at `item`, without adding it to a scope
    fn analyze_tableref(&mut self, item: NodeId, scope: usize, report_unresolved: bool) -> TableReferenceId {
        let alias = self.attr(item, AttributeKey::SqlTablerefAlias).map(|alias| {
            self.tag_name(alias, NameTags::TABLE_ALIAS);
            self.name_of(alias)
        });

        if let Some(subquery) = self.attr(item, AttributeKey::SqlTablerefTable) {
            let parent = self.scopes.parent_of(scope);
            let outputs = self.analyze_query(subquery, parent, ScopeType::Derived);
            return self.push_table_reference(item, None, alias, TableSource::Derived, outputs);
        }

        let Some(name_node) = self.attr(item, AttributeKey::SqlTablerefName) else {
            return self.push_table_reference(item, None, alias, TableSource::Unresolved, Vec::new());
        };
        self.tag_path(name_node, &TABLE_PATH_TAGS);
        let path = self.parsed.name_path(name_node);
        let Some(name) = QualifiedTableName::from_path(&path) else {
            self.report(
                DiagnosticCode::UnresolvedTable,
                format!("invalid table name '{}'", path.join(".")),
                name_node,
            );
            return self.push_table_reference(item, None, alias, TableSource::Unresolved, Vec::new());
        };
        let (source, columns) = self.resolve_table(&name, name_node, report_unresolved);
        self.push_table_reference(item, Some(name), alias, source, columns)
    }

    fn push_table_reference(
        &mut self,
        node_id: NodeId,
        table_name: Option<QualifiedTableName>,
        alias: Option<String>,
        source: TableSource,
        column_names: Vec<String>,
    ) -> TableReferenceId {
        let table_reference_id = self.table_references.len() as TableReferenceId;
        let location = self.node(node_id).map(|n| n.location).unwrap_or_default();
        self.table_references.push(TableReference {
            table_reference_id,
            statement_id: self.statement_id,
            node_id,
            location,
            table_name,
            alias,
            source,
            column_names,
        });
        table_reference_id
    }

    fn find_cte(&self, name: &str) -> Option<&CteDefinition> {
        self.ctes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|cte| names_match(&cte.name, name))
    }

    /// Most recent local declaration of a fully qualified name
    fn find_local_declaration(&self, expanded: &QualifiedTableName) -> Option<usize> {
        let matches = |declared: &str, requested: &Option<String>| {
            requested.as_deref().is_some_and(|r| names_match(declared, r))
        };
        self.table_declarations.iter().rposition(|d| {
            names_match(&d.table_name, &expanded.table)
                && matches(&d.schema_name, &expanded.schema)
                && matches(&d.database_name, &expanded.database)
        })
    }

    fn mark_consumed(&mut self, declaration: usize) {
        let Some(owner) = self.declared_by.get(declaration).copied() else {
            return;
        };
        if owner == self.statement_id {
            return;
        }
        let current = self.statement_id;
        if let Some(statement) = self.statements.get_mut(owner as usize) {
            if statement.consumed_by.last() != Some(&current) {
                statement.consumed_by.push(current);
            }
        }
    }

    fn resolve_table(
        &mut self,
        name: &QualifiedTableName,
        name_node: NodeId,
        report_unresolved: bool,
    ) -> (TableSource, Vec<String>) {
        if name.database.is_none() && name.schema.is_none() {
            if let Some(cte) = self.find_cte(&name.table) {
                trace!(table = %name, "Resolved table to CTE");
                return (
                    TableSource::Cte {
                        name: cte.name.clone(),
                    },
                    cte.column_names.clone(),
                );
            }
        }

        let catalog = self.catalog;
        let expanded = name.expand(catalog.default_database(), catalog.default_schema());
        if let Some(index) = self.find_local_declaration(&expanded) {
            self.mark_consumed(index);
            let declaration = &self.table_declarations[index];
            let resolved = ResolvedTable {
                catalog_entry_id: self.entry_id,
                catalog_database_id: catalog
                    .database_id(&declaration.database_name)
                    .unwrap_or(NULL_OBJECT_ID),
                catalog_schema_id: catalog
                    .schema_id(&declaration.database_name, &declaration.schema_name)
                    .unwrap_or(NULL_OBJECT_ID),
                catalog_table_id: declaration.table_id,
                referenced_catalog_version: self.catalog_version,
                table_name: declaration.qualified_name(),
            };
            let columns = declaration.columns.iter().map(|c| c.name.clone()).collect();
            trace!(table = %name, "Resolved table to local declaration");
            return (TableSource::Table(resolved), columns);
        }

        let matches = catalog.resolve_table(name, Some(self.entry_id));
        let Some(best) = matches.best() else {
            if report_unresolved {
                let mut known: Vec<String> = catalog
                    .ranked_tables()
                    .map(|(_, t)| t.declaration.table_name.clone())
                    .collect();
                known.extend(self.table_declarations.iter().map(|d| d.table_name.clone()));
                known.extend(self.ctes.iter().flatten().map(|c| c.name.clone()));
                let message = match suggest(&name.table, known.iter()) {
                    Some(hint) => format!("table '{name}' not found, did you mean '{hint}'?"),
                    None => format!("table '{name}' not found"),
                };
                self.report(DiagnosticCode::UnresolvedTable, message, name_node);
            }
            return (TableSource::Unresolved, Vec::new());
        };

        let table = best.table;
        let resolved = ResolvedTable {
            catalog_entry_id: best.entry_id,
            catalog_database_id: table.database_id,
            catalog_schema_id: table.schema_id,
            catalog_table_id: table.declaration.table_id,
            referenced_catalog_version: self.catalog_version,
            table_name: table.declaration.qualified_name(),
        };
        let columns = table.declaration.columns.iter().map(|c| c.name.clone()).collect();
        if matches.ambiguous && report_unresolved {
            let candidates: Vec<String> = matches
                .candidates
                .iter()
                .map(|c| c.table.declaration.qualified_name().to_string())
                .collect();
            self.report(
                DiagnosticCode::AmbiguousTable,
                format!(
                    "table name '{name}' is ambiguous, candidates: {}",
                    candidates.join(", ")
                ),
                name_node,
            );
        }
        trace!(table = %name, entry_id = best.entry_id, "Resolved table in catalog");
        (TableSource::Table(resolved), columns)
    }

    // Expressions

    fn push_expression(&mut self, node_id: NodeId, kind: ExpressionKind, is_constant: bool) -> ExpressionId {
        let expression_id = self.expressions.len() as ExpressionId;
        let location = self.node(node_id).map(|n| n.location).unwrap_or_default();
        self.expressions.push(Expression {
            expression_id,
            statement_id: self.statement_id,
            node_id,
            location,
            kind,
            is_constant,
        });
        expression_id
    }

    fn is_constant(&self, id: ExpressionId) -> bool {
        self.expressions
            .get(id as usize)
            .is_some_and(|e| e.is_constant)
    }

    fn is_column_ref(&self, id: ExpressionId) -> bool {
        self.expressions
            .get(id as usize)
            .is_some_and(|e| e.column_ref().is_some())
    }

    fn all_constant(&self, ids: &[ExpressionId]) -> bool {
        !ids.is_empty() && ids.iter().all(|id| self.is_constant(*id))
    }

    /// Analyze the expression at `node_id`; children get lower ids than parents
    ///
    /// `outputs` lists result column names an unqualified name may refer to.
    fn analyze_expression(&mut self, node_id: NodeId, scope: usize, outputs: &[String]) -> ExpressionId {
        let Some(node) = self.node(node_id) else {
            return self.push_expression(node_id, ExpressionKind::Other { children: Vec::new() }, false);
        };
        let literal = match node.node_type {
            NodeType::LiteralNull => Some(LiteralKind::Null),
            NodeType::LiteralBoolean => Some(LiteralKind::Boolean),
            NodeType::LiteralInteger => Some(LiteralKind::Integer),
            NodeType::LiteralFloat => Some(LiteralKind::Float),
            NodeType::LiteralString => Some(LiteralKind::String),
            NodeType::LiteralHex => Some(LiteralKind::Hex),
            NodeType::LiteralBinary => Some(LiteralKind::Binary),
            _ => None,
        };
        if let Some(literal) = literal {
            return self.push_expression(node_id, ExpressionKind::Literal { literal }, true);
        }

        match node.node_type {
            NodeType::ObjectSqlColumnRef => self.analyze_column_ref(node_id, scope, outputs),
            NodeType::ObjectSqlNaryExpression => self.analyze_nary(node_id, scope, outputs),
            NodeType::ObjectSqlFunctionExpression => self.analyze_function(node_id, scope, outputs),
            NodeType::ObjectSqlSubqueryExpression => {
                if let Some(query) = self.attr(node_id, AttributeKey::SqlSubqueryStatement) {
                    self.analyze_query(query, Some(scope), ScopeType::Subquery);
                }
                self.push_expression(node_id, ExpressionKind::Other { children: Vec::new() }, false)
            }
            NodeType::ObjectSqlCase => {
                let mut children = Vec::new();
                if let Some(argument) = self.attr(node_id, AttributeKey::SqlCaseArgument) {
                    children.push(self.analyze_expression(argument, scope, outputs));
                }
                if let Some(clauses) = self.attr(node_id, AttributeKey::SqlCaseClauses) {
                    for clause in self.child_ids(clauses) {
                        for key in [AttributeKey::SqlCaseClauseWhen, AttributeKey::SqlCaseClauseThen] {
                            if let Some(part) = self.attr(clause, key) {
                                children.push(self.analyze_expression(part, scope, outputs));
                            }
                        }
                    }
                }
                if let Some(default) = self.attr(node_id, AttributeKey::SqlCaseDefault) {
                    children.push(self.analyze_expression(default, scope, outputs));
                }
                let is_constant = self.all_constant(&children);
                self.push_expression(node_id, ExpressionKind::Other { children }, is_constant)
            }
            NodeType::ObjectSqlTypecast => {
                let children: Vec<ExpressionId> = self
                    .attr(node_id, AttributeKey::SqlTypecastValue)
                    .map(|value| self.analyze_expression(value, scope, outputs))
                    .into_iter()
                    .collect();
                let is_constant = self.all_constant(&children);
                self.push_expression(node_id, ExpressionKind::Other { children }, is_constant)
            }
            _ => self.push_expression(node_id, ExpressionKind::Other { children: Vec::new() }, false),
        }
    }

    fn analyze_column_ref(&mut self, node_id: NodeId, scope: usize, outputs: &[String]) -> ExpressionId {
        let path_node = self.attr(node_id, AttributeKey::SqlColumnRefPath);
        let path = path_node.map(|p| self.parsed.name_path(p)).unwrap_or_default();
        let incomplete = self.parsed.flag(node_id, AttributeKey::SqlColumnRefStar)
            || self.parsed.flag(node_id, AttributeKey::SqlColumnRefTrailingDot);
        let Some((column, qualifier)) = path.split_last().filter(|_| !incomplete) else {
            // `t.*` and `t.` name only a table
            if let Some(path_node) = path_node {
                self.tag_path(path_node, &[NameTags::TABLE_NAME, NameTags::SCHEMA_NAME, NameTags::DATABASE_NAME]);
            }
            return self.push_expression(node_id, ExpressionKind::Other { children: Vec::new() }, false);
        };

        let resolution = ColumnResolver::new(&self.scopes, &self.table_references)
            .resolve_column(qualifier, column, scope);
        trace!(column = %path.join("."), ?resolution, "Resolved column");
        // ORDER BY, GROUP BY and HAVING may name a result column
        let result_target = match &resolution {
            ColumnResolution::NotFound { .. } if qualifier.is_empty() => find_column_index(outputs, column),
            _ => None,
        };
        let resolved = match resolution {
            ColumnResolution::Found {
                table_reference_id,
                column_id,
            } => self
                .table_references
                .get(table_reference_id as usize)
                .map(|table| ResolvedColumn {
                    table_reference_id,
                    catalog_table_id: table
                        .resolved_table()
                        .map(|r| r.catalog_table_id)
                        .unwrap_or_else(ExternalObjectId::null),
                    column_id,
                    referenced_catalog_version: self.catalog_version,
                }),
            ColumnResolution::Ambiguous { candidates } => {
                let tables: Vec<&str> = candidates
                    .iter()
                    .filter_map(|t| self.table_references.get(*t as usize))
                    .filter_map(|t| t.visible_name())
                    .collect();
                let message = format!(
                    "column reference '{column}' is ambiguous, candidates: {}",
                    tables.join(", ")
                );
                self.report(DiagnosticCode::AmbiguousColumn, message, node_id);
                None
            }
            ColumnResolution::NotFound { .. } if result_target.is_some() => None,
            ColumnResolution::NotFound { suggestion } => {
                let message = match suggestion {
                    Some(hint) => format!("column '{column}' not found, did you mean '{hint}'?"),
                    None => format!("column '{column}' not found"),
                };
                self.report(DiagnosticCode::UnresolvedColumn, message, node_id);
                None
            }
            ColumnResolution::UnknownQualifier { suggestion } => {
                let table = qualifier.join(".");
                let message = match suggestion {
                    Some(hint) => format!("missing FROM-clause entry for table '{table}', did you mean '{hint}'?"),
                    None => format!("missing FROM-clause entry for table '{table}'"),
                };
                self.report(DiagnosticCode::UnresolvedColumn, message, node_id);
                None
            }
            ColumnResolution::Unknown => None,
        };

        if let Some(path_node) = path_node {
            let via_alias = resolved
                .and_then(|r| self.table_references.get(r.table_reference_id as usize))
                .is_some_and(|t| t.alias.is_some());
            let qualifier_tag = if via_alias {
                NameTags::TABLE_ALIAS
            } else {
                NameTags::TABLE_NAME
            };
            self.tag_path(
                path_node,
                &[
                    NameTags::COLUMN_NAME,
                    qualifier_tag,
                    NameTags::SCHEMA_NAME,
                    NameTags::DATABASE_NAME,
                ],
            );
        }

        let kind = ExpressionKind::ColumnRef(ColumnRefExpression {
            qualifier: qualifier.to_vec(),
            column_name: column.clone(),
            resolved,
            result_target,
        });
        self.push_expression(node_id, kind, false)
    }

    fn analyze_nary(&mut self, node_id: NodeId, scope: usize, outputs: &[String]) -> ExpressionId {
        let operator = self
            .attr(node_id, AttributeKey::SqlExpressionOperator)
            .and_then(|op| self.node(op))
            .and_then(|op| ExpressionOperator::from_u32(op.value));
        let arg_nodes = self
            .attr(node_id, AttributeKey::SqlExpressionArgs)
            .map(|args| self.child_ids(args))
            .unwrap_or_default();
        let args: Vec<ExpressionId> = arg_nodes
            .into_iter()
            .map(|arg| self.analyze_expression(arg, scope, outputs))
            .collect();
        let is_constant = self.all_constant(&args);

        use ExpressionOperator as Op;
        let kind = match (operator, args.as_slice()) {
            (Some(op), [left, right])
                if op.is_comparison()
                    || matches!(op, Op::Like | Op::NotLike | Op::ILike | Op::NotILike) =>
            {
                ExpressionKind::Comparison {
                    operator: op,
                    left: *left,
                    right: *right,
                }
            }
            (Some(op @ (Op::Between | Op::NotBetween)), [value, low, high]) => {
                ExpressionKind::Between {
                    operator: op,
                    value: *value,
                    low: *low,
                    high: *high,
                }
            }
            (Some(op @ (Op::In | Op::NotIn)), [value, list @ ..]) => ExpressionKind::InList {
                operator: op,
                value: *value,
                list: list.to_vec(),
            },
            (Some(op @ (Op::IsNull | Op::IsNotNull)), [operand]) => ExpressionKind::IsNull {
                operator: op,
                operand: *operand,
            },
            (Some(op @ (Op::Not | Op::Neg)), [operand]) => ExpressionKind::Unary {
                operator: op,
                operand: *operand,
            },
            (
                Some(
                    op @ (Op::And
                    | Op::Or
                    | Op::Add
                    | Op::Sub
                    | Op::Mul
                    | Op::Div
                    | Op::Mod
                    | Op::Concat),
                ),
                all,
            ) => ExpressionKind::Binary {
                operator: op,
                args: all.to_vec(),
            },
            (_, all) => ExpressionKind::Other {
                children: all.to_vec(),
            },
        };
        self.push_expression(node_id, kind, is_constant)
    }

    fn analyze_function(&mut self, node_id: NodeId, scope: usize, outputs: &[String]) -> ExpressionId {
        let name_node = self.attr(node_id, AttributeKey::SqlFunctionName);
        let path = name_node.map(|n| self.parsed.name_path(n)).unwrap_or_default();
        if let Some(name_node) = name_node {
            self.tag_path(
                name_node,
                &[NameTags::FUNCTION_NAME, NameTags::SCHEMA_NAME, NameTags::DATABASE_NAME],
            );
        }
        let (function_name, schema) = match path.split_last() {
            Some((name, qualifier)) => (name.clone(), qualifier.last().cloned()),
            None => (String::new(), None),
        };

        let arg_nodes = self
            .attr(node_id, AttributeKey::SqlFunctionArguments)
            .map(|args| self.child_ids(args))
            .unwrap_or_default();
        let args: Vec<ExpressionId> = arg_nodes
            .into_iter()
            .map(|arg| self.analyze_expression(arg, scope, outputs))
            .collect();

        let resolved = self
            .functions
            .resolve(schema.as_deref(), &function_name)
            .cloned();
        if resolved.is_none() {
            let qualified = path.join(".");
            self.report(
                DiagnosticCode::UnresolvedFunction,
                format!("function '{qualified}' not found"),
                node_id,
            );
        }
        let is_scalar = resolved
            .as_ref()
            .is_some_and(|f| f.function_type == FunctionType::Scalar);
        let is_constant = is_scalar
            && !self.parsed.flag(node_id, AttributeKey::SqlFunctionStar)
            && self.all_constant(&args);

        let function_reference_id = self.function_references.len() as u32;
        let location = self.node(node_id).map(|n| n.location).unwrap_or_default();
        self.function_references.push(FunctionReference {
            function_reference_id,
            statement_id: self.statement_id,
            node_id,
            location,
            schema,
            function_name,
            resolved,
        });
        let kind = ExpressionKind::FunctionCall {
            function_reference_id,
            args,
        };
        self.push_expression(node_id, kind, is_constant)
    }

    // Classification

    /// Record column filters under a WHERE, HAVING or ON root
    fn collect_filters(&mut self, root: ExpressionId) {
        let Some(expression) = self.expressions.get(root as usize) else {
            return;
        };
        let column = match expression.kind.clone() {
            ExpressionKind::Binary {
                operator: ExpressionOperator::And | ExpressionOperator::Or,
                args,
            } => {
                for arg in args {
                    self.collect_filters(arg);
                }
                None
            }
            ExpressionKind::Unary {
                operator: ExpressionOperator::Not,
                operand,
            } => {
                self.collect_filters(operand);
                None
            }
            ExpressionKind::Comparison { left, right, .. } => {
                if self.is_column_ref(left) && self.is_constant(right) {
                    Some(left)
                } else if self.is_column_ref(right) && self.is_constant(left) {
                    Some(right)
                } else {
                    None
                }
            }
            ExpressionKind::Between {
                value, low, high, ..
            } => (self.is_column_ref(value) && self.all_constant(&[low, high])).then_some(value),
            ExpressionKind::InList { value, list, .. } => {
                (self.is_column_ref(value) && self.all_constant(&list)).then_some(value)
            }
            ExpressionKind::IsNull { operand, .. } => self.is_column_ref(operand).then_some(operand),
            _ => None,
        };
        if let Some(column) = column {
            self.column_filters.push(ColumnFilter {
                root_expression_id: root,
                column_reference_expression_id: column,
            });
        }
    }

    /// Record the columns read by a computed result column
    fn collect_computations(&mut self, root: ExpressionId) {
        if self.is_column_ref(root) || self.is_constant(root) {
            return;
        }
        for column in column_refs_under(&self.expressions, root) {
            self.column_computations.push(ColumnComputation {
                root_expression_id: root,
                column_reference_expression_id: column,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscript_grammar::{parse, scan};

    fn analyze_text(text: &str) -> AnalyzedScript {
        let parsed = Arc::new(parse(Arc::new(scan(text, 0))));
        Analyzer::analyze(parsed, &Catalog::new(), 1, &FunctionRegistry::new())
    }

    #[test]
    fn test_expression_ids_are_post_order() {
        let analyzed = analyze_text("select 1 + 2 * 3");
        let kinds: Vec<_> = analyzed.expressions.iter().map(|e| &e.kind).collect();
        assert_eq!(kinds.len(), 5);
        assert!(matches!(kinds[4], ExpressionKind::Binary { operator: ExpressionOperator::Add, .. }));
        for expression in &analyzed.expressions {
            for child in expression.children() {
                assert!(child < expression.expression_id);
            }
        }
        assert_eq!(analyzed.constant_expressions, vec![4]);
    }

    #[test]
    fn test_local_declaration_resolves() {
        let analyzed = analyze_text("create table t (a int, b text); select b from t where a = 1");
        assert!(analyzed.diagnostics.is_empty(), "{:?}", analyzed.diagnostics);
        let declaration = &analyzed.table_declarations[0];
        assert_eq!(declaration.table_id, ExternalObjectId::new(1, 0));
        let reference = &analyzed.table_references[0];
        let resolved = reference.resolved_table().unwrap();
        assert_eq!(resolved.catalog_table_id, declaration.table_id);
        assert_eq!(analyzed.column_filters.len(), 1);
        assert!(analyzed.statements[0].is_live);
        assert_eq!(analyzed.statements[0].consumed_by, vec![1]);
    }

    #[test]
    fn test_unconsumed_declaration_is_dead() {
        let analyzed = analyze_text("create table t (a int); select 1");
        assert!(!analyzed.statements[0].is_live);
        assert!(analyzed.statements[1].is_live);
        assert_eq!(analyzed.statements[0].declared_table, Some(0));
    }

    #[test]
    fn test_unresolved_table_suppresses_column_errors() {
        let analyzed = analyze_text("select a, b from missing where c = 1");
        assert_eq!(analyzed.diagnostics.len(), 1);
        assert_eq!(analyzed.diagnostics[0].code, DiagnosticCode::UnresolvedTable);
    }

    #[test]
    fn test_column_constraints() {
        let analyzed = analyze_text(
            "create table t (id int primary key, name varchar(10) not null, note text, \
             k1 int, constraint pk primary key (k1))",
        );
        let columns = &analyzed.table_declarations[0].columns;
        assert!(columns[0].is_primary_key && !columns[0].nullable);
        assert!(!columns[1].nullable && !columns[1].is_primary_key);
        assert!(columns[2].nullable);
        assert!(columns[3].is_primary_key);
        assert_eq!(columns[1].data_type, Some(DataType::from_sql_name("varchar(10)")));
    }
}
