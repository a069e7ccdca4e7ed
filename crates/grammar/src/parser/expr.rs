// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Expressions.
//!
//! Precedence from loosest to tightest: `OR`, `AND`, `NOT`, predicates
//! (comparison, `IS`, `BETWEEN`, `IN`, `LIKE`), additive and `||`,
//! multiplicative, unary minus, `::` casts, primaries.
//!
//! Operators become `OBJECT_SQL_NARY_EXPRESSION` nodes holding an operator
//! enum and an argument array. `AND`/`OR` chains are flattened into a
//! single node.

use super::{ParseResult, Parser};
use crate::ast::PendingId;
use sqlscript_ir::{AttributeKey, ExpressionOperator, Location, NodeType, TokenType};

impl<'a> Parser<'a> {
    pub(super) fn parse_expr(&mut self) -> ParseResult<PendingId> {
        self.nested(Self::parse_or)
    }

    fn nary(
        &mut self,
        operator: ExpressionOperator,
        location: Location,
        args: Vec<PendingId>,
    ) -> PendingId {
        let operator =
            self.tree
                .leaf(NodeType::EnumSqlExpressionOperator, location, operator as u32);
        let args = self.tree.array(None, args);
        self.tree.object(
            NodeType::ObjectSqlNaryExpression,
            location,
            vec![
                (AttributeKey::SqlExpressionOperator, operator),
                (AttributeKey::SqlExpressionArgs, args),
            ],
        )
    }

    fn parse_or(&mut self) -> ParseResult<PendingId> {
        self.parse_chain("or", ExpressionOperator::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<PendingId> {
        self.parse_chain("and", ExpressionOperator::And, Self::parse_not)
    }

    fn parse_chain(
        &mut self,
        keyword: &str,
        operator: ExpressionOperator,
        operand: fn(&mut Self) -> ParseResult<PendingId>,
    ) -> ParseResult<PendingId> {
        let first = operand(self)?;
        let mut args = vec![first];
        let mut location = None;
        while let Some(l) = self.accept_keyword(keyword) {
            location.get_or_insert(l);
            args.push(operand(self)?);
        }
        Ok(match location {
            Some(location) => self.nary(operator, location, args),
            None => first,
        })
    }

    fn parse_not(&mut self) -> ParseResult<PendingId> {
        if let Some(not) = self.accept_keyword("not") {
            let arg = self.nested(Self::parse_not)?;
            return Ok(self.nary(ExpressionOperator::Not, not, vec![arg]));
        }
        self.parse_predicate()
    }

    fn accept_comparison(&mut self) -> Option<(ExpressionOperator, Location)> {
        let operator = match self.current_text() {
            "=" => ExpressionOperator::Eq,
            "<>" | "!=" => ExpressionOperator::NotEq,
            "<" => ExpressionOperator::Lt,
            "<=" => ExpressionOperator::LtEq,
            ">" => ExpressionOperator::Gt,
            ">=" => ExpressionOperator::GtEq,
            _ => return None,
        };
        if self.peek_type(0) != Some(TokenType::Operator) {
            return None;
        }
        Some((operator, self.advance()))
    }

    fn parse_predicate(&mut self) -> ParseResult<PendingId> {
        let lhs = self.parse_additive()?;

        if let Some((operator, location)) = self.accept_comparison() {
            let rhs = self.parse_additive()?;
            return Ok(self.nary(operator, location, vec![lhs, rhs]));
        }

        if let Some(is) = self.accept_keyword("is") {
            let negated = self.accept_keyword("not").is_some();
            let null = self.expect_keyword("null")?;
            let operator = if negated {
                ExpressionOperator::IsNotNull
            } else {
                ExpressionOperator::IsNull
            };
            return Ok(self.nary(operator, is.merge(&null), vec![lhs]));
        }

        let negated = if self.is_keyword(0, "not")
            && ["between", "in", "like", "ilike"]
                .iter()
                .any(|k| self.is_keyword(1, k))
        {
            Some(self.advance())
        } else {
            None
        };
        let with_not = |location: Location| match negated {
            Some(not) => not.merge(&location),
            None => location,
        };

        if let Some(between) = self.accept_keyword("between") {
            let low = self.parse_additive()?;
            self.expect_keyword("and")?;
            let high = self.parse_additive()?;
            let operator = if negated.is_some() {
                ExpressionOperator::NotBetween
            } else {
                ExpressionOperator::Between
            };
            return Ok(self.nary(operator, with_not(between), vec![lhs, low, high]));
        }

        if let Some(in_keyword) = self.accept_keyword("in") {
            let open = self.expect_punct("(")?;
            let mut args = vec![lhs];
            if self.is_keyword(0, "select") || self.is_keyword(0, "with") {
                let query = self.parse_query()?;
                let close = self.expect_punct(")")?;
                args.push(self.tree.object(
                    NodeType::ObjectSqlSubqueryExpression,
                    open.merge(&close),
                    vec![(AttributeKey::SqlSubqueryStatement, query)],
                ));
            } else {
                args.push(self.parse_expr()?);
                while self.accept_punct(",").is_some() {
                    args.push(self.parse_expr()?);
                }
                self.expect_punct(")")?;
            }
            let operator = if negated.is_some() {
                ExpressionOperator::NotIn
            } else {
                ExpressionOperator::In
            };
            return Ok(self.nary(operator, with_not(in_keyword), args));
        }

        for (keyword, positive, negative) in [
            ("like", ExpressionOperator::Like, ExpressionOperator::NotLike),
            ("ilike", ExpressionOperator::ILike, ExpressionOperator::NotILike),
        ] {
            if let Some(location) = self.accept_keyword(keyword) {
                let pattern = self.parse_additive()?;
                let operator = if negated.is_some() { negative } else { positive };
                return Ok(self.nary(operator, with_not(location), vec![lhs, pattern]));
            }
        }

        Ok(lhs)
    }

    fn parse_binary_level(
        &mut self,
        operators: &[(&str, ExpressionOperator)],
        operand: fn(&mut Self) -> ParseResult<PendingId>,
    ) -> ParseResult<PendingId> {
        let mut left = operand(self)?;
        'outer: loop {
            for (symbol, operator) in operators {
                if let Some(location) = self.accept_operator(symbol) {
                    let right = operand(self)?;
                    left = self.nary(*operator, location, vec![left, right]);
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_additive(&mut self) -> ParseResult<PendingId> {
        self.parse_binary_level(
            &[
                ("+", ExpressionOperator::Add),
                ("-", ExpressionOperator::Sub),
                ("||", ExpressionOperator::Concat),
            ],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> ParseResult<PendingId> {
        self.parse_binary_level(
            &[
                ("*", ExpressionOperator::Mul),
                ("/", ExpressionOperator::Div),
                ("%", ExpressionOperator::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> ParseResult<PendingId> {
        if let Some(minus) = self.accept_operator("-") {
            let arg = self.nested(Self::parse_unary)?;
            return Ok(self.nary(ExpressionOperator::Neg, minus, vec![arg]));
        }
        if self.accept_operator("+").is_some() {
            return self.nested(Self::parse_unary);
        }
        self.parse_postfix()
    }

    /// Primary followed by `::type` casts
    pub(super) fn parse_postfix(&mut self) -> ParseResult<PendingId> {
        let mut value = self.parse_primary()?;
        while self.accept_operator("::").is_some() {
            let data_type = self.parse_type_name()?;
            let location = self.tree.location(value);
            value = self.tree.object(
                NodeType::ObjectSqlTypecast,
                location,
                vec![
                    (AttributeKey::SqlTypecastValue, value),
                    (AttributeKey::SqlTypecastType, data_type),
                ],
            );
        }
        Ok(value)
    }

    fn parse_primary(&mut self) -> ParseResult<PendingId> {
        let Some(token) = self.peek(0) else {
            return Err(self.error_expected("expression"));
        };
        let literal = match token.token_type {
            TokenType::LiteralInteger => Some(NodeType::LiteralInteger),
            TokenType::LiteralFloat => Some(NodeType::LiteralFloat),
            TokenType::LiteralString => Some(NodeType::LiteralString),
            TokenType::LiteralHex => Some(NodeType::LiteralHex),
            TokenType::LiteralBinary => Some(NodeType::LiteralBinary),
            TokenType::LiteralBoolean => Some(NodeType::LiteralBoolean),
            TokenType::Keyword if self.is_keyword(0, "null") => Some(NodeType::LiteralNull),
            _ => None,
        };
        if let Some(node_type) = literal {
            let location = self.advance();
            let value = match node_type {
                NodeType::LiteralBoolean => {
                    u32::from(self.scanned.text_at(location).eq_ignore_ascii_case("true"))
                }
                _ => 0,
            };
            return Ok(self.tree.leaf(node_type, location, value));
        }

        if self.is_keyword(0, "case") {
            return self.parse_case();
        }
        if self.is_keyword(0, "cast") {
            return self.parse_cast();
        }
        if self.is_keyword(0, "exists") {
            let exists = self.advance();
            self.expect_punct("(")?;
            let query = self.parse_query()?;
            let close = self.expect_punct(")")?;
            let flag = self.flag(exists);
            return Ok(self.tree.object(
                NodeType::ObjectSqlSubqueryExpression,
                exists.merge(&close),
                vec![
                    (AttributeKey::SqlSubqueryStatement, query),
                    (AttributeKey::SqlSubqueryExists, flag),
                ],
            ));
        }
        if self.is_punct(0, "(") {
            let open = self.advance();
            if self.is_keyword(0, "select") || self.is_keyword(0, "with") {
                let query = self.parse_query()?;
                let close = self.expect_punct(")")?;
                return Ok(self.tree.object(
                    NodeType::ObjectSqlSubqueryExpression,
                    open.merge(&close),
                    vec![(AttributeKey::SqlSubqueryStatement, query)],
                ));
            }
            let inner = self.parse_expr()?;
            self.expect_punct(")")?;
            return Ok(inner);
        }
        if self.is_name(0) {
            return self.parse_column_ref_or_call();
        }
        Err(self.error_expected("expression"))
    }

    /// `a`, `t.a`, `t.*`, `t.` or `f(args)`
    fn parse_column_ref_or_call(&mut self) -> ParseResult<PendingId> {
        let first = self.parse_name()?;
        let mut path_location = self.tree.location(first);
        let mut names = vec![first];
        let mut star = None;
        let mut trailing_dot = None;
        loop {
            match self.peek_type(0) {
                Some(TokenType::Dot) if self.is_name(1) => {
                    path_location = path_location.merge(&self.advance());
                    let name = self.parse_name()?;
                    path_location = path_location.merge(&self.tree.location(name));
                    names.push(name);
                }
                Some(TokenType::Dot) if self.is_operator(1, "*") => {
                    path_location = path_location.merge(&self.advance());
                    star = Some(self.advance());
                    break;
                }
                Some(TokenType::DotTrailing) => {
                    trailing_dot = Some(self.advance());
                    break;
                }
                _ => break,
            }
        }

        if star.is_none() && trailing_dot.is_none() && self.is_punct(0, "(") {
            let name = self.tree.array(Some(path_location), names);
            return self.parse_call(name);
        }

        let path = self.tree.array(Some(path_location), names);
        let mut attributes = vec![(AttributeKey::SqlColumnRefPath, path)];
        if let Some(star) = star {
            let flag = self.flag(star);
            attributes.push((AttributeKey::SqlColumnRefStar, flag));
        }
        if let Some(dot) = trailing_dot {
            let flag = self.flag(dot);
            attributes.push((AttributeKey::SqlColumnRefTrailingDot, flag));
        }
        Ok(self
            .tree
            .object(NodeType::ObjectSqlColumnRef, path_location, attributes))
    }

    /// `name(...)` with the name path already parsed
    fn parse_call(&mut self, name: PendingId) -> ParseResult<PendingId> {
        self.expect_punct("(")?;
        let mut attributes = vec![(AttributeKey::SqlFunctionName, name)];
        if let Some(star) = self.accept_operator("*") {
            let flag = self.flag(star);
            attributes.push((AttributeKey::SqlFunctionStar, flag));
        } else if !self.is_punct(0, ")") {
            if let Some(distinct) = self.accept_keyword("distinct") {
                let flag = self.flag(distinct);
                attributes.push((AttributeKey::SqlFunctionDistinct, flag));
            } else {
                self.accept_keyword("all");
            }
            let mut args = vec![self.parse_expr()?];
            while self.accept_punct(",").is_some() {
                args.push(self.parse_expr()?);
            }
            let args = self.tree.array(None, args);
            attributes.push((AttributeKey::SqlFunctionArguments, args));
        }
        let close = self.expect_punct(")")?;
        let location = self.tree.location(name).merge(&close);
        Ok(self
            .tree
            .object(NodeType::ObjectSqlFunctionExpression, location, attributes))
    }

    fn parse_case(&mut self) -> ParseResult<PendingId> {
        let case = self.expect_keyword("case")?;
        let mut attributes = Vec::new();
        if !self.is_keyword(0, "when") {
            let argument = self.parse_expr()?;
            attributes.push((AttributeKey::SqlCaseArgument, argument));
        }
        let mut clauses = Vec::new();
        while let Some(when) = self.accept_keyword("when") {
            let condition = self.parse_expr()?;
            self.expect_keyword("then")?;
            let result = self.parse_expr()?;
            clauses.push(self.tree.object(
                NodeType::ObjectSqlCaseClause,
                when,
                vec![
                    (AttributeKey::SqlCaseClauseWhen, condition),
                    (AttributeKey::SqlCaseClauseThen, result),
                ],
            ));
        }
        if clauses.is_empty() {
            return Err(self.error_expected("WHEN"));
        }
        let clauses = self.tree.array(None, clauses);
        attributes.push((AttributeKey::SqlCaseClauses, clauses));
        if self.accept_keyword("else").is_some() {
            let default = self.parse_expr()?;
            attributes.push((AttributeKey::SqlCaseDefault, default));
        }
        let end = self.expect_keyword("end")?;
        Ok(self
            .tree
            .object(NodeType::ObjectSqlCase, case.merge(&end), attributes))
    }

    /// `CAST(expr AS type)`
    fn parse_cast(&mut self) -> ParseResult<PendingId> {
        let cast = self.expect_keyword("cast")?;
        self.expect_punct("(")?;
        let value = self.parse_expr()?;
        self.expect_keyword("as")?;
        let data_type = self.parse_type_name()?;
        let close = self.expect_punct(")")?;
        Ok(self.tree.object(
            NodeType::ObjectSqlTypecast,
            cast.merge(&close),
            vec![
                (AttributeKey::SqlTypecastValue, value),
                (AttributeKey::SqlTypecastType, data_type),
            ],
        ))
    }

    /// Type name such as `int`, `double precision`, `varchar(25)` or `int[]`
    ///
    /// The type is kept as a `STRING_REF` over its source text.
    pub(super) fn parse_type_name(&mut self) -> ParseResult<PendingId> {
        if !self.is_name(0) {
            return Err(self.error_expected("type name"));
        }
        let mut location = self.advance();
        while matches!(self.peek_type(0), Some(TokenType::Identifier)) {
            location = location.merge(&self.advance());
        }
        if self.accept_punct("(").is_some() {
            while matches!(
                self.peek_type(0),
                Some(TokenType::LiteralInteger | TokenType::Identifier)
            ) || self.is_punct(0, ",")
            {
                self.advance();
            }
            location = location.merge(&self.expect_punct(")")?);
        }
        while self.is_punct(0, "[") && self.is_punct(1, "]") {
            self.advance();
            location = location.merge(&self.advance());
        }
        Ok(self.tree.leaf(NodeType::StringRef, location, 0))
    }
}
