// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! SELECT queries, table references and joins.

use super::{ParseResult, Parser, SyntaxError};
use crate::ast::PendingId;
use sqlscript_ir::{AttributeKey, CombineOperation, JoinType, Location, NodeType, OrderDirection};

/// Attributes of a SELECT collected so far
struct SelectParts {
    location: Location,
    attributes: Vec<(AttributeKey, PendingId)>,
}

impl SelectParts {
    fn new(location: Location) -> Self {
        Self {
            location,
            attributes: Vec::new(),
        }
    }

    fn push(&mut self, key: AttributeKey, node: PendingId) {
        self.attributes.push((key, node));
    }
}

/// Operand of a set operation
enum QueryTerm {
    Core(SelectParts),
    Nested(PendingId),
}

impl<'a> Parser<'a> {
    /// `[WITH ctes] body [ORDER BY ..] [LIMIT ..] [OFFSET ..]`
    pub(super) fn parse_query(&mut self) -> ParseResult<PendingId> {
        self.nested(Self::parse_query_nested)
    }

    fn parse_query_nested(&mut self) -> ParseResult<PendingId> {
        let begin = self.current_location();
        let mut trailing = Vec::new();
        if let Some(with) = self.accept_keyword("with") {
            self.accept_keyword("recursive");
            let ctes = self.parse_ctes(with)?;
            trailing.push((AttributeKey::SqlSelectWithCtes, ctes));
        }

        let body = self.parse_query_body()?;
        let mut parts = match body {
            QueryTerm::Core(parts) => parts,
            QueryTerm::Nested(query) => {
                if trailing.is_empty() && !self.is_keyword(0, "order") && !self.is_keyword(0, "limit")
                {
                    return Ok(query);
                }
                let input = self.tree.array(None, vec![query]);
                let mut parts = SelectParts::new(begin);
                parts.push(AttributeKey::SqlSelectCombineInput, input);
                parts
            }
        };
        parts.location = parts.location.merge(&begin);
        parts.attributes.extend(trailing);

        if !self.statement_failed {
            self.parse_query_tail(&mut parts);
        }
        Ok(self
            .tree
            .object(NodeType::ObjectSqlSelect, parts.location, parts.attributes))
    }

    /// ORDER BY, LIMIT and OFFSET; stops quietly at the first error
    fn parse_query_tail(&mut self, parts: &mut SelectParts) {
        if self.is_keyword(0, "order") {
            match self.parse_order_by() {
                Ok(order) => parts.push(AttributeKey::SqlSelectOrder, order),
                Err(SyntaxError) => return,
            }
        }
        if self.accept_keyword("limit").is_some() && self.accept_keyword("all").is_none() {
            match self.parse_expr() {
                Ok(limit) => parts.push(AttributeKey::SqlSelectLimit, limit),
                Err(SyntaxError) => return,
            }
        }
        if self.accept_keyword("offset").is_some() {
            if let Ok(offset) = self.parse_expr() {
                parts.push(AttributeKey::SqlSelectOffset, offset);
            }
        }
    }

    fn parse_ctes(&mut self, with: Location) -> ParseResult<PendingId> {
        let mut ctes = vec![self.parse_cte()?];
        while self.accept_punct(",").is_some() {
            ctes.push(self.parse_cte()?);
        }
        Ok(self.tree.array(Some(with), ctes))
    }

    /// `name [(columns)] AS (query)`
    fn parse_cte(&mut self) -> ParseResult<PendingId> {
        let name = self.parse_name()?;
        let mut attributes = vec![(AttributeKey::SqlCteName, name)];
        if self.is_punct(0, "(") {
            let columns = self.parse_name_list()?;
            attributes.push((AttributeKey::SqlCteColumns, columns));
        }
        self.expect_keyword("as")?;
        self.expect_punct("(")?;
        let statement = self.parse_query()?;
        let close = self.expect_punct(")")?;
        attributes.push((AttributeKey::SqlCteStatement, statement));
        let location = self.tree.location(name).merge(&close);
        Ok(self.tree.object(NodeType::ObjectSqlCte, location, attributes))
    }

    /// Set operations over query terms, left associative
    fn parse_query_body(&mut self) -> ParseResult<QueryTerm> {
        let mut left = self.parse_query_term()?;
        loop {
            let (operation, location) = if let Some(l) = self.accept_keyword("union") {
                match self.accept_keyword("all") {
                    Some(all) => (CombineOperation::UnionAll, l.merge(&all)),
                    None => {
                        self.accept_keyword("distinct");
                        (CombineOperation::Union, l)
                    }
                }
            } else if let Some(l) = self.accept_keyword("intersect") {
                (CombineOperation::Intersect, l)
            } else if let Some(l) = self.accept_keyword("except") {
                (CombineOperation::Except, l)
            } else {
                return Ok(left);
            };

            let left_node = self.finish_term(left);
            let right = match self.parse_query_term() {
                Ok(term) => self.finish_term(term),
                Err(SyntaxError) => {
                    // Keep the left input so earlier clauses stay analyzable
                    let input = self.tree.array(None, vec![left_node]);
                    let mut parts = SelectParts::new(location);
                    parts.push(AttributeKey::SqlSelectCombineInput, input);
                    return Ok(QueryTerm::Core(parts));
                }
            };
            let operation = self
                .tree
                .leaf(NodeType::EnumSqlCombineOperation, location, operation as u32);
            let input = self.tree.array(None, vec![left_node, right]);
            let mut parts = SelectParts::new(location);
            parts.push(AttributeKey::SqlSelectCombineOperation, operation);
            parts.push(AttributeKey::SqlSelectCombineInput, input);
            left = QueryTerm::Core(parts);
        }
    }

    fn finish_term(&mut self, term: QueryTerm) -> PendingId {
        match term {
            QueryTerm::Core(parts) => {
                self.tree
                    .object(NodeType::ObjectSqlSelect, parts.location, parts.attributes)
            }
            QueryTerm::Nested(node) => node,
        }
    }

    fn parse_query_term(&mut self) -> ParseResult<QueryTerm> {
        if self.accept_punct("(").is_some() {
            let query = self.parse_query()?;
            self.expect_punct(")")?;
            return Ok(QueryTerm::Nested(query));
        }
        self.parse_select_core().map(QueryTerm::Core)
    }

    /// `SELECT [DISTINCT] targets [FROM ..] [WHERE ..] [GROUP BY ..] [HAVING ..]`
    ///
    /// Once `SELECT` is consumed this never fails; a broken clause ends the
    /// core with the clauses parsed so far.
    fn parse_select_core(&mut self) -> ParseResult<SelectParts> {
        let select = self.expect_keyword("select")?;
        let mut parts = SelectParts::new(select);
        if let Some(distinct) = self.accept_keyword("distinct") {
            let flag = self.flag(distinct);
            parts.push(AttributeKey::SqlSelectDistinct, flag);
        } else {
            self.accept_keyword("all");
        }

        if self.is_keyword(0, "from") {
            // Empty target list
        } else {
            match self.parse_result_targets() {
                Ok(targets) => parts.push(AttributeKey::SqlSelectTargets, targets),
                Err(SyntaxError) => return Ok(parts),
            }
        }

        if let Some(from) = self.accept_keyword("from") {
            match self.parse_from(from) {
                Ok(tables) => parts.push(AttributeKey::SqlSelectFrom, tables),
                Err(SyntaxError) => return Ok(parts),
            }
        }
        if self.accept_keyword("where").is_some() {
            match self.parse_expr() {
                Ok(filter) => parts.push(AttributeKey::SqlSelectWhere, filter),
                Err(SyntaxError) => return Ok(parts),
            }
        }
        if let Some(group) = self.accept_keyword("group") {
            match self.parse_group_by(group) {
                Ok(groups) => parts.push(AttributeKey::SqlSelectGroups, groups),
                Err(SyntaxError) => return Ok(parts),
            }
        }
        if self.accept_keyword("having").is_some() {
            if let Ok(having) = self.parse_expr() {
                parts.push(AttributeKey::SqlSelectHaving, having);
            }
        }
        Ok(parts)
    }

    fn parse_result_targets(&mut self) -> ParseResult<PendingId> {
        let mut targets = vec![self.parse_result_target()?];
        while self.accept_punct(",").is_some() {
            targets.push(self.parse_result_target()?);
        }
        Ok(self.tree.array(None, targets))
    }

    fn parse_result_target(&mut self) -> ParseResult<PendingId> {
        if let Some(star) = self.accept_operator("*") {
            let flag = self.flag(star);
            return Ok(self.tree.object(
                NodeType::ObjectSqlResultTarget,
                star,
                vec![(AttributeKey::SqlResultTargetStar, flag)],
            ));
        }
        let value = self.parse_expr()?;
        let location = self.tree.location(value);
        let mut attributes = vec![(AttributeKey::SqlResultTargetValue, value)];
        if let Some(alias) = self.parse_alias()? {
            attributes.push((AttributeKey::SqlResultTargetName, alias));
        }
        Ok(self
            .tree
            .object(NodeType::ObjectSqlResultTarget, location, attributes))
    }

    /// Comma separated table references, the array covers the `FROM` keyword
    fn parse_from(&mut self, from: Location) -> ParseResult<PendingId> {
        let mut tables = vec![self.parse_table_ref()?];
        while self.accept_punct(",").is_some() {
            tables.push(self.parse_table_ref()?);
        }
        Ok(self.tree.array(Some(from), tables))
    }

    fn parse_group_by(&mut self, group: Location) -> ParseResult<PendingId> {
        self.expect_keyword("by")?;
        let mut groups = vec![self.parse_expr()?];
        while self.accept_punct(",").is_some() {
            groups.push(self.parse_expr()?);
        }
        Ok(self.tree.array(Some(group), groups))
    }

    fn parse_order_by(&mut self) -> ParseResult<PendingId> {
        let order = self.expect_keyword("order")?;
        self.expect_keyword("by")?;
        let mut items = vec![self.parse_order_item()?];
        while self.accept_punct(",").is_some() {
            items.push(self.parse_order_item()?);
        }
        Ok(self.tree.array(Some(order), items))
    }

    /// `expr [ASC|DESC] [NULLS FIRST|LAST]`
    fn parse_order_item(&mut self) -> ParseResult<PendingId> {
        let value = self.parse_expr()?;
        let location = self.tree.location(value);
        let mut attributes = vec![(AttributeKey::SqlOrderValue, value)];
        let direction = if let Some(l) = self.accept_keyword("asc") {
            Some((OrderDirection::Ascending, l))
        } else {
            self.accept_keyword("desc")
                .map(|l| (OrderDirection::Descending, l))
        };
        if let Some((direction, l)) = direction {
            let node = self
                .tree
                .leaf(NodeType::EnumSqlOrderDirection, l, direction as u32);
            attributes.push((AttributeKey::SqlOrderDirection, node));
        }
        if self.accept_keyword("nulls").is_some()
            && self.accept_keyword("first").is_none()
            && self.accept_keyword("last").is_none()
        {
            return Err(self.error_expected("FIRST or LAST"));
        }
        Ok(self.tree.object(NodeType::ObjectSqlOrder, location, attributes))
    }

    fn is_join_start(&self) -> bool {
        ["join", "inner", "left", "right", "full", "cross", "natural"]
            .iter()
            .any(|k| self.is_keyword(0, k))
    }

    /// A table primary followed by any number of joins
    pub(super) fn parse_table_ref(&mut self) -> ParseResult<PendingId> {
        let mut left = self.parse_table_primary()?;
        while self.is_join_start() {
            let begin = self.current_location();
            let natural = self.accept_keyword("natural").is_some();
            let join_type = if self.accept_keyword("left").is_some() {
                self.accept_keyword("outer");
                JoinType::Left
            } else if self.accept_keyword("right").is_some() {
                self.accept_keyword("outer");
                JoinType::Right
            } else if self.accept_keyword("full").is_some() {
                self.accept_keyword("outer");
                JoinType::Full
            } else if self.accept_keyword("cross").is_some() {
                JoinType::Cross
            } else {
                self.accept_keyword("inner");
                if natural {
                    JoinType::Natural
                } else {
                    JoinType::Inner
                }
            };
            let join = self.expect_keyword("join")?;
            let keyword = begin.merge(&join);
            let right = self.parse_table_primary()?;

            let join_type = self
                .tree
                .leaf(NodeType::EnumSqlJoinType, keyword, join_type as u32);
            let input = self.tree.array(None, vec![left, right]);
            let mut attributes = vec![
                (AttributeKey::SqlJoinedTableType, join_type),
                (AttributeKey::SqlJoinedTableInput, input),
            ];
            if self.accept_keyword("on").is_some() {
                let qualifier = self.parse_expr()?;
                attributes.push((AttributeKey::SqlJoinedTableQualifier, qualifier));
            } else if self.accept_keyword("using").is_some() {
                let columns = self.parse_name_list()?;
                attributes.push((AttributeKey::SqlJoinedTableUsing, columns));
            }
            let location = self.tree.location(left);
            left = self
                .tree
                .object(NodeType::ObjectSqlJoinedTable, location, attributes);
        }
        Ok(left)
    }

    /// Named table, derived table or parenthesized join
    fn parse_table_primary(&mut self) -> ParseResult<PendingId> {
        if self.is_punct(0, "(") {
            if self.is_keyword(1, "select") || self.is_keyword(1, "with") {
                let open = self.advance();
                let query = self.parse_query()?;
                let close = self.expect_punct(")")?;
                let mut attributes = vec![(AttributeKey::SqlTablerefTable, query)];
                if let Some(alias) = self.parse_alias()? {
                    attributes.push((AttributeKey::SqlTablerefAlias, alias));
                }
                return Ok(self.tree.object(
                    NodeType::ObjectSqlTableref,
                    open.merge(&close),
                    attributes,
                ));
            }
            self.advance();
            let inner = self.nested(Self::parse_table_ref)?;
            self.expect_punct(")")?;
            return Ok(inner);
        }

        let name = self.parse_name_path()?;
        let location = self.tree.location(name);
        let mut attributes = vec![(AttributeKey::SqlTablerefName, name)];
        if let Some(alias) = self.parse_alias()? {
            attributes.push((AttributeKey::SqlTablerefAlias, alias));
        }
        Ok(self
            .tree
            .object(NodeType::ObjectSqlTableref, location, attributes))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::ParsedScript;
    use crate::parser::tests::parse_text;
    use sqlscript_ir::{AttributeKey, JoinType, NodeId, NodeType};

    fn root(parsed: &ParsedScript) -> NodeId {
        parsed.statements[0].root
    }

    #[test]
    fn test_select_clauses() {
        let parsed = parse_text(
            "select distinct a, b as c from t where a > 1 group by a having count(*) > 2 \
             order by a desc limit 10 offset 5",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let root = root(&parsed);
        for key in [
            AttributeKey::SqlSelectDistinct,
            AttributeKey::SqlSelectTargets,
            AttributeKey::SqlSelectFrom,
            AttributeKey::SqlSelectWhere,
            AttributeKey::SqlSelectGroups,
            AttributeKey::SqlSelectHaving,
            AttributeKey::SqlSelectOrder,
            AttributeKey::SqlSelectLimit,
            AttributeKey::SqlSelectOffset,
        ] {
            assert!(parsed.attribute(root, key).is_some(), "missing {key:?}");
        }
        let targets = parsed
            .attribute(root, AttributeKey::SqlSelectTargets)
            .unwrap();
        let second = parsed.nodes[targets as usize].child_ids().nth(1).unwrap();
        let alias = parsed
            .attribute(second, AttributeKey::SqlResultTargetName)
            .unwrap();
        assert_eq!(parsed.name_text(alias), "c");
    }

    #[test]
    fn test_from_array_covers_keyword() {
        let parsed = parse_text("select * from A b, C d where b.x = d.y");
        let from = parsed
            .attribute(root(&parsed), AttributeKey::SqlSelectFrom)
            .unwrap();
        let node = parsed.nodes[from as usize];
        assert_eq!(node.location.offset, 9);
        assert_eq!(node.children_count, 2);
        let first = parsed.children(from)[0];
        assert_eq!(first.node_type, NodeType::ObjectSqlTableref);
    }

    #[test]
    fn test_joins() {
        let parsed = parse_text(
            "select * from a left outer join b on a.id = b.id natural join c cross join d",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let from = parsed
            .attribute(root(&parsed), AttributeKey::SqlSelectFrom)
            .unwrap();
        let outer = parsed.nodes[from as usize].children_begin;
        assert_eq!(
            parsed.nodes[outer as usize].node_type,
            NodeType::ObjectSqlJoinedTable
        );
        let join_type = parsed
            .attribute(outer, AttributeKey::SqlJoinedTableType)
            .unwrap();
        assert_eq!(parsed.nodes[join_type as usize].value, JoinType::Cross as u32);

        let mut left_join_found = false;
        for node in &parsed.nodes {
            if node.node_type == NodeType::EnumSqlJoinType && node.value == JoinType::Left as u32 {
                left_join_found = true;
            }
        }
        assert!(left_join_found);
    }

    #[test]
    fn test_using_clause() {
        let parsed = parse_text("select * from a join b using (id, k)");
        assert!(parsed.diagnostics.is_empty());
        let joined = parsed
            .nodes
            .iter()
            .position(|n| n.node_type == NodeType::ObjectSqlJoinedTable)
            .unwrap() as NodeId;
        let using = parsed
            .attribute(joined, AttributeKey::SqlJoinedTableUsing)
            .unwrap();
        assert_eq!(parsed.name_path(using), vec!["id", "k"]);
    }

    #[test]
    fn test_ctes_and_set_operations() {
        let parsed = parse_text(
            "with recursive x(a) as (select 1), y as (select 2) \
             select a from x union all select * from y order by 1",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let root = root(&parsed);
        let ctes = parsed
            .attribute(root, AttributeKey::SqlSelectWithCtes)
            .unwrap();
        assert_eq!(parsed.nodes[ctes as usize].children_count, 2);
        assert!(
            parsed
                .attribute(root, AttributeKey::SqlSelectCombineOperation)
                .is_some()
        );
        let input = parsed
            .attribute(root, AttributeKey::SqlSelectCombineInput)
            .unwrap();
        assert_eq!(parsed.nodes[input as usize].children_count, 2);
        assert!(parsed.attribute(root, AttributeKey::SqlSelectOrder).is_some());
    }

    #[test]
    fn test_derived_table() {
        let parsed = parse_text("select s.a from (select a from t) as s");
        assert!(parsed.diagnostics.is_empty());
        let tableref = parsed
            .nodes
            .iter()
            .position(|n| {
                n.node_type == NodeType::ObjectSqlTableref
                    && n.attribute_key == AttributeKey::None
            })
            .unwrap() as NodeId;
        assert!(
            parsed
                .attribute(tableref, AttributeKey::SqlTablerefTable)
                .is_some()
        );
        let alias = parsed
            .attribute(tableref, AttributeKey::SqlTablerefAlias)
            .unwrap();
        assert_eq!(parsed.name_text(alias), "s");
    }

    #[test]
    fn test_qualified_table_name() {
        let parsed = parse_text("select * from db1.Schema1.\"Foo\"");
        let tableref = parsed
            .nodes
            .iter()
            .position(|n| n.node_type == NodeType::ObjectSqlTableref)
            .unwrap() as NodeId;
        let name = parsed
            .attribute(tableref, AttributeKey::SqlTablerefName)
            .unwrap();
        assert_eq!(parsed.name_path(name), vec!["db1", "schema1", "Foo"]);
    }
}
