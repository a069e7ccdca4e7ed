// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! CREATE TABLE / VIEW, INSERT, DELETE and DROP.

use super::{ParseResult, Parser, SyntaxError};
use crate::ast::{ConstraintKind, PendingId, StatementType};
use sqlscript_ir::{AttributeKey, Location, NodeType, ObjectKind};

impl<'a> Parser<'a> {
    /// `CREATE [OR REPLACE] [TEMP] (TABLE | VIEW) ...`
    pub(super) fn parse_create(&mut self) -> (StatementType, ParseResult<PendingId>) {
        let create = self.advance();
        let or_replace = if self.accept_keyword("or").is_some() {
            match self.expect_keyword("replace") {
                Ok(location) => Some(location),
                Err(error) => return (StatementType::Invalid, Err(error)),
            }
        } else {
            None
        };
        let temp = self
            .accept_keyword("temporary")
            .or_else(|| self.accept_keyword("temp"));

        if self.accept_keyword("table").is_some() {
            return self.parse_create_table(create, temp);
        }
        if self.accept_keyword("view").is_some() {
            return (
                StatementType::CreateView,
                self.parse_create_view(create, or_replace),
            );
        }
        (
            StatementType::Invalid,
            Err(self.error_expected("TABLE or VIEW")),
        )
    }

    fn parse_create_table(
        &mut self,
        create: Location,
        temp: Option<Location>,
    ) -> (StatementType, ParseResult<PendingId>) {
        let mut attributes = Vec::new();
        if let Some(temp) = temp {
            let flag = self.flag(temp);
            attributes.push((AttributeKey::SqlCreateTableTemp, flag));
        }
        if self.is_keyword(0, "if") {
            let begin = self.advance();
            let end = match self
                .expect_keyword("not")
                .and_then(|_| self.expect_keyword("exists"))
            {
                Ok(end) => end,
                Err(error) => return (StatementType::CreateTable, Err(error)),
            };
            let flag = self.flag(begin.merge(&end));
            attributes.push((AttributeKey::SqlCreateTableIfNotExists, flag));
        }
        let name = match self.parse_name_path() {
            Ok(name) => name,
            Err(error) => return (StatementType::CreateTable, Err(error)),
        };
        attributes.push((AttributeKey::SqlCreateTableName, name));

        if self.accept_keyword("as").is_some() {
            let result = self.parse_query().map(|query| {
                attributes.push((AttributeKey::SqlCreateTableAs, query));
                self.tree
                    .object(NodeType::ObjectSqlCreateTable, create, attributes)
            });
            return (StatementType::CreateTableAs, result);
        }

        // Keep the columns parsed so far when an element is broken
        let mut elements = Vec::new();
        let open = match self.expect_punct("(") {
            Ok(open) => open,
            Err(_) => {
                let table = self
                    .tree
                    .object(NodeType::ObjectSqlCreateTable, create, attributes);
                return (StatementType::CreateTable, Ok(table));
            }
        };
        let mut end = open;
        loop {
            match self.parse_table_element() {
                Ok(element) => {
                    end = self.tree.location(element);
                    elements.push(element);
                }
                Err(SyntaxError) => break,
            }
            if self.accept_punct(",").is_none() {
                if let Ok(close) = self.expect_punct(")") {
                    end = close;
                }
                break;
            }
        }
        let elements = self.tree.array(Some(open.merge(&end)), elements);
        attributes.push((AttributeKey::SqlCreateTableElements, elements));
        let table = self
            .tree
            .object(NodeType::ObjectSqlCreateTable, create, attributes);
        (StatementType::CreateTable, Ok(table))
    }

    fn parse_table_element(&mut self) -> ParseResult<PendingId> {
        let is_table_constraint = ["constraint", "primary", "unique", "foreign", "check"]
            .iter()
            .any(|k| self.is_keyword(0, k));
        if is_table_constraint {
            self.parse_table_constraint()
        } else {
            self.parse_column_def()
        }
    }

    /// `name type constraint*`
    fn parse_column_def(&mut self) -> ParseResult<PendingId> {
        let name = self.parse_name()?;
        let data_type = self.parse_type_name()?;
        let mut constraints = Vec::new();
        while let Some(constraint) = self.parse_column_constraint()? {
            constraints.push(constraint);
        }
        let location = self.tree.location(name);
        let mut attributes = vec![
            (AttributeKey::SqlColumnDefName, name),
            (AttributeKey::SqlColumnDefType, data_type),
        ];
        if !constraints.is_empty() {
            let constraints = self.tree.array(None, constraints);
            attributes.push((AttributeKey::SqlColumnDefConstraints, constraints));
        }
        Ok(self
            .tree
            .object(NodeType::ObjectSqlColumnDef, location, attributes))
    }

    fn parse_column_constraint(&mut self) -> ParseResult<Option<PendingId>> {
        let begin = self.current_location();
        if self.accept_keyword("constraint").is_some() {
            self.parse_name()?;
        }
        let (kind, end) = if self.accept_keyword("not").is_some() {
            (ConstraintKind::NotNull, self.expect_keyword("null")?)
        } else if let Some(null) = self.accept_keyword("null") {
            (ConstraintKind::Null, null)
        } else if self.accept_keyword("primary").is_some() {
            (ConstraintKind::PrimaryKey, self.expect_keyword("key")?)
        } else if let Some(unique) = self.accept_keyword("unique") {
            (ConstraintKind::Unique, unique)
        } else if self.accept_keyword("default").is_some() {
            let value = self.parse_postfix()?;
            (ConstraintKind::Default, self.tree.location(value))
        } else if self.accept_keyword("references").is_some() {
            let target = self.parse_name_path()?;
            let mut end = self.tree.location(target);
            if self.is_punct(0, "(") {
                let columns = self.parse_name_list()?;
                end = self.tree.location(columns);
            }
            (ConstraintKind::References, end)
        } else if self.accept_keyword("check").is_some() {
            self.expect_punct("(")?;
            self.parse_expr()?;
            (ConstraintKind::Check, self.expect_punct(")")?)
        } else if begin != self.current_location() {
            return Err(self.error_expected("column constraint"));
        } else {
            return Ok(None);
        };
        let constraint =
            self.tree
                .leaf(NodeType::ObjectSqlColumnConstraint, begin.merge(&end), kind as u32);
        Ok(Some(constraint))
    }

    /// `[CONSTRAINT name] (PRIMARY KEY | UNIQUE | FOREIGN KEY | CHECK) ...`
    fn parse_table_constraint(&mut self) -> ParseResult<PendingId> {
        let begin = self.current_location();
        if self.accept_keyword("constraint").is_some() {
            self.parse_name()?;
        }
        let mut attributes = Vec::new();
        let (kind, mut end) = if self.accept_keyword("primary").is_some() {
            self.expect_keyword("key")?;
            let columns = self.parse_name_list()?;
            attributes.push((AttributeKey::SqlTableConstraintColumns, columns));
            (ConstraintKind::PrimaryKey, self.tree.location(columns))
        } else if self.accept_keyword("unique").is_some() {
            let columns = self.parse_name_list()?;
            attributes.push((AttributeKey::SqlTableConstraintColumns, columns));
            (ConstraintKind::Unique, self.tree.location(columns))
        } else if self.accept_keyword("foreign").is_some() {
            self.expect_keyword("key")?;
            let columns = self.parse_name_list()?;
            attributes.push((AttributeKey::SqlTableConstraintColumns, columns));
            self.expect_keyword("references")?;
            let target = self.parse_name_path()?;
            (ConstraintKind::References, self.tree.location(target))
        } else if self.accept_keyword("check").is_some() {
            self.expect_punct("(")?;
            self.parse_expr()?;
            (ConstraintKind::Check, self.expect_punct(")")?)
        } else {
            return Err(self.error_expected("table constraint"));
        };
        if kind == ConstraintKind::References && self.is_punct(0, "(") {
            let columns = self.parse_name_list()?;
            end = self.tree.location(columns);
        }
        let constraint = self.tree.object(
            NodeType::ObjectSqlTableConstraint,
            begin.merge(&end),
            attributes,
        );
        self.tree.set_value(constraint, kind as u32);
        Ok(constraint)
    }

    /// `CREATE VIEW name [(columns)] AS query`
    fn parse_create_view(
        &mut self,
        create: Location,
        or_replace: Option<Location>,
    ) -> ParseResult<PendingId> {
        let mut attributes = Vec::new();
        if let Some(location) = or_replace {
            let flag = self.flag(location);
            attributes.push((AttributeKey::SqlViewOrReplace, flag));
        }
        let name = self.parse_name_path()?;
        attributes.push((AttributeKey::SqlViewName, name));
        if self.is_punct(0, "(") {
            let columns = self.parse_name_list()?;
            attributes.push((AttributeKey::SqlViewColumns, columns));
        }
        self.expect_keyword("as")?;
        let query = self.parse_query()?;
        attributes.push((AttributeKey::SqlViewStatement, query));
        Ok(self
            .tree
            .object(NodeType::ObjectSqlCreateView, create, attributes))
    }

    /// `INSERT INTO name [(columns)] (VALUES (..), .. | query)`
    pub(super) fn parse_insert(&mut self) -> ParseResult<PendingId> {
        let insert = self.advance();
        self.expect_keyword("into")?;
        let name = self.parse_name_path()?;
        let location = self.tree.location(name);
        let target = self.tree.object(
            NodeType::ObjectSqlTableref,
            location,
            vec![(AttributeKey::SqlTablerefName, name)],
        );
        let mut attributes = vec![(AttributeKey::SqlInsertTarget, target)];

        if self.is_punct(0, "(") && !self.is_keyword(1, "select") && !self.is_keyword(1, "with") {
            let columns = self.parse_name_list()?;
            attributes.push((AttributeKey::SqlInsertColumns, columns));
        }

        if let Some(values) = self.accept_keyword("values") {
            let mut rows = vec![self.parse_values_row()?];
            while self.accept_punct(",").is_some() {
                rows.push(self.parse_values_row()?);
            }
            let rows = self.tree.array(Some(values), rows);
            attributes.push((AttributeKey::SqlInsertValues, rows));
        } else {
            let query = self.parse_query()?;
            attributes.push((AttributeKey::SqlInsertStatement, query));
        }
        Ok(self
            .tree
            .object(NodeType::ObjectSqlInsert, insert, attributes))
    }

    fn parse_values_row(&mut self) -> ParseResult<PendingId> {
        let open = self.expect_punct("(")?;
        let mut values = vec![self.parse_expr()?];
        while self.accept_punct(",").is_some() {
            values.push(self.parse_expr()?);
        }
        let close = self.expect_punct(")")?;
        Ok(self.tree.array(Some(open.merge(&close)), values))
    }

    /// `DELETE FROM table [WHERE expr]`
    pub(super) fn parse_delete(&mut self) -> ParseResult<PendingId> {
        let delete = self.advance();
        self.expect_keyword("from")?;
        let name = self.parse_name_path()?;
        let location = self.tree.location(name);
        let mut target_attributes = vec![(AttributeKey::SqlTablerefName, name)];
        if let Some(alias) = self.parse_alias()? {
            target_attributes.push((AttributeKey::SqlTablerefAlias, alias));
        }
        let target = self
            .tree
            .object(NodeType::ObjectSqlTableref, location, target_attributes);
        let mut attributes = vec![(AttributeKey::SqlDeleteTarget, target)];
        if self.accept_keyword("where").is_some() {
            // A broken filter still leaves the target analyzable
            if let Ok(filter) = self.parse_expr() {
                attributes.push((AttributeKey::SqlDeleteWhere, filter));
            }
        }
        Ok(self
            .tree
            .object(NodeType::ObjectSqlDelete, delete, attributes))
    }

    /// `DROP (TABLE | VIEW) [IF EXISTS] name, ...`
    pub(super) fn parse_drop(&mut self) -> ParseResult<PendingId> {
        let drop = self.advance();
        let (kind, kind_location) = if let Some(l) = self.accept_keyword("table") {
            (ObjectKind::Table, l)
        } else if let Some(l) = self.accept_keyword("view") {
            (ObjectKind::View, l)
        } else {
            return Err(self.error_expected("TABLE or VIEW"));
        };
        let kind = self
            .tree
            .leaf(NodeType::EnumSqlObjectKind, kind_location, kind as u32);
        let mut attributes = vec![(AttributeKey::SqlDropObjectKind, kind)];
        if self.is_keyword(0, "if") {
            let begin = self.advance();
            let end = self.expect_keyword("exists")?;
            let flag = self.flag(begin.merge(&end));
            attributes.push((AttributeKey::SqlDropIfExists, flag));
        }
        let mut targets = Vec::new();
        loop {
            let name = self.parse_name_path()?;
            let location = self.tree.location(name);
            targets.push(self.tree.object(
                NodeType::ObjectSqlTableref,
                location,
                vec![(AttributeKey::SqlTablerefName, name)],
            ));
            if self.accept_punct(",").is_none() {
                break;
            }
        }
        let targets = self.tree.array(None, targets);
        attributes.push((AttributeKey::SqlDropTargets, targets));
        Ok(self.tree.object(NodeType::ObjectSqlDrop, drop, attributes))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ConstraintKind, StatementType};
    use crate::parser::tests::parse_text;
    use sqlscript_ir::{AttributeKey, NodeType};

    #[test]
    fn test_create_table() {
        let parsed = parse_text(
            "create table if not exists db.s.foo (\
               a int not null primary key, \
               b varchar(25) default 'x', \
               c double precision references bar(id), \
               constraint pk primary key (a, b))",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let statement = parsed.statements[0];
        assert_eq!(statement.statement_type, StatementType::CreateTable);
        let root = statement.root;
        assert!(parsed.flag(root, AttributeKey::SqlCreateTableIfNotExists));
        let name = parsed
            .attribute(root, AttributeKey::SqlCreateTableName)
            .unwrap();
        assert_eq!(parsed.name_path(name), vec!["db", "s", "foo"]);

        let elements = parsed
            .attribute(root, AttributeKey::SqlCreateTableElements)
            .unwrap();
        let children = parsed.children(elements);
        assert_eq!(children.len(), 4);
        assert_eq!(children[0].node_type, NodeType::ObjectSqlColumnDef);
        assert_eq!(children[3].node_type, NodeType::ObjectSqlTableConstraint);
        assert_eq!(
            ConstraintKind::from_u32(children[3].value),
            Some(ConstraintKind::PrimaryKey)
        );

        let first = parsed.nodes[elements as usize].children_begin;
        let constraints = parsed
            .attribute(first, AttributeKey::SqlColumnDefConstraints)
            .unwrap();
        let kinds: Vec<_> = parsed
            .children(constraints)
            .iter()
            .map(|c| ConstraintKind::from_u32(c.value).unwrap())
            .collect();
        assert_eq!(kinds, vec![ConstraintKind::NotNull, ConstraintKind::PrimaryKey]);

        let data_type = parsed
            .attribute(first + 1, AttributeKey::SqlColumnDefType)
            .unwrap();
        assert_eq!(parsed.node_text(data_type), "varchar(25)");
    }

    #[test]
    fn test_create_table_as_and_view() {
        let parsed = parse_text(
            "create temp table t2 as select a from t1; \
             create or replace view v (x) as select a from t2",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(
            parsed.statements[0].statement_type,
            StatementType::CreateTableAs
        );
        assert!(parsed.flag(parsed.statements[0].root, AttributeKey::SqlCreateTableTemp));
        let view = parsed.statements[1];
        assert_eq!(view.statement_type, StatementType::CreateView);
        assert!(parsed.flag(view.root, AttributeKey::SqlViewOrReplace));
        assert!(parsed.attribute(view.root, AttributeKey::SqlViewStatement).is_some());
    }

    #[test]
    fn test_unterminated_create_keeps_columns() {
        let parsed = parse_text("create table foo (a int, b");
        assert_eq!(parsed.diagnostics.len(), 1);
        let root = parsed.statements[0].root;
        let elements = parsed
            .attribute(root, AttributeKey::SqlCreateTableElements)
            .unwrap();
        assert_eq!(parsed.nodes[elements as usize].children_count, 1);
    }

    #[test]
    fn test_insert_delete_drop() {
        let parsed = parse_text(
            "insert into foo (a, b) values (1, 2), (3, 4); \
             insert into foo select * from bar; \
             delete from foo f where f.a = 1; \
             drop table if exists foo, bar",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let types: Vec<_> = parsed.statements.iter().map(|s| s.statement_type).collect();
        assert_eq!(
            types,
            vec![
                StatementType::Insert,
                StatementType::Insert,
                StatementType::Delete,
                StatementType::Drop
            ]
        );
        let values = parsed
            .attribute(parsed.statements[0].root, AttributeKey::SqlInsertValues)
            .unwrap();
        assert_eq!(parsed.nodes[values as usize].children_count, 2);

        let drop = parsed.statements[3].root;
        let targets = parsed
            .attribute(drop, AttributeKey::SqlDropTargets)
            .unwrap();
        assert_eq!(parsed.nodes[targets as usize].children_count, 2);
        assert!(parsed.flag(drop, AttributeKey::SqlDropIfExists));
    }
}
