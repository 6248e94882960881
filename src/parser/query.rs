//! SELECT-family grammar: `WITH`, set operations, `FROM`/`JOIN`, the
//! grouping/ordering/limiting clauses, and `VALUES` (spec §4.2).

use super::{expr, parse_object_name, Parser};
use crate::ast::{
    BinarySelect, CteDef, Distinct, FetchClause, FromItem, FromItemKind, GroupByClause,
    GroupByMode, Ident, Join, JoinCondition, JoinKind, LockingClause, LockingStrength, Query,
    QueryKind, SelectClause, SelectItem, SetOperator, SimpleSelect, ValuesQuery, WithBlock,
};
use crate::error::ParseError;
use crate::lexer::{Keyword, TokenKind};

pub(crate) fn parse_query(p: &mut Parser) -> Result<Query, ParseError> {
    let with = if p.at_kw(Keyword::With) {
        Some(parse_with_block(p)?)
    } else {
        None
    };
    parse_query_with(p, with)
}

pub(crate) fn parse_query_with(p: &mut Parser, with: Option<WithBlock>) -> Result<Query, ParseError> {
    let start = p.pos;
    let mut left = parse_set_op_operand(p)?;
    loop {
        let all_variant = |p: &mut Parser, all_op: SetOperator, op: SetOperator| {
            p.bump();
            if p.eat_kw(Keyword::All) {
                all_op
            } else {
                p.eat_kw(Keyword::Distinct);
                op
            }
        };
        let op = if p.at_kw(Keyword::Union) {
            Some(all_variant(p, SetOperator::UnionAll, SetOperator::Union))
        } else if p.at_kw(Keyword::Except) {
            Some(all_variant(p, SetOperator::ExceptAll, SetOperator::Except))
        } else if !p.intersect_precedence() && p.at_kw(Keyword::Intersect) {
            Some(all_variant(p, SetOperator::IntersectAll, SetOperator::Intersect))
        } else {
            None
        };
        let Some(op) = op else { break };
        let right = parse_set_op_operand(p)?;
        let span = p.span_from(start);
        left = Query::new(QueryKind::Binary(Box::new(BinarySelect { left, op, right }))).with_span(span);
    }
    attach_with(&mut left, with);
    Ok(left)
}

/// With `ParserOptions::intersect_precedence` (the default), `INTERSECT`
/// binds tighter than `UNION`/`EXCEPT`; otherwise all three set operators
/// chain at the same precedence (see `DESIGN.md`'s resolution of the
/// set-operator-precedence open question).
fn parse_set_op_operand(p: &mut Parser) -> Result<Query, ParseError> {
    if p.intersect_precedence() {
        parse_intersect_chain(p)
    } else {
        parse_query_primary(p)
    }
}

fn parse_intersect_chain(p: &mut Parser) -> Result<Query, ParseError> {
    let start = p.pos;
    let mut left = parse_query_primary(p)?;
    while p.at_kw(Keyword::Intersect) {
        p.bump();
        let all = p.eat_kw(Keyword::All);
        if !all {
            p.eat_kw(Keyword::Distinct);
        }
        let right = parse_query_primary(p)?;
        let op = if all {
            SetOperator::IntersectAll
        } else {
            SetOperator::Intersect
        };
        let span = p.span_from(start);
        left = Query::new(QueryKind::Binary(Box::new(BinarySelect { left, op, right }))).with_span(span);
    }
    Ok(left)
}

fn parse_query_primary(p: &mut Parser) -> Result<Query, ParseError> {
    if p.at_punct("(") {
        p.bump();
        let q = parse_query(p)?;
        p.expect_punct(")")?;
        return Ok(q);
    }
    if p.at_kw(Keyword::Values) {
        return parse_values_query(p);
    }
    parse_simple_select(p, None)
}

fn attach_with(query: &mut Query, with: Option<WithBlock>) {
    let Some(with) = with else { return };
    match &mut query.kind {
        QueryKind::Simple(s) => s.with = Some(with),
        QueryKind::Binary(b) => attach_with(&mut b.left, Some(with)),
        QueryKind::Values(_) => {}
    }
}

pub(crate) fn parse_with_block(p: &mut Parser) -> Result<WithBlock, ParseError> {
    let start = p.pos;
    p.expect_kw(Keyword::With)?;
    let recursive = p.eat_kw(Keyword::Recursive);
    let mut ctes = Vec::new();
    loop {
        let name = p.expect_ident()?;
        let mut column_aliases = Vec::new();
        if p.eat_punct("(") {
            loop {
                column_aliases.push(p.expect_ident()?);
                if !p.eat_punct(",") {
                    break;
                }
            }
            p.expect_punct(")")?;
        }
        p.expect_kw(Keyword::As)?;
        let materialized = if p.eat_kw(Keyword::Materialized) {
            Some(true)
        } else if p.at_kw(Keyword::Not) && p.peek_kw(1) == Some(Keyword::Materialized) {
            p.bump();
            p.bump();
            Some(false)
        } else {
            None
        };
        p.expect_punct("(")?;
        let body = parse_query(p)?;
        p.expect_punct(")")?;
        ctes.push(CteDef {
            name,
            column_aliases,
            materialized,
            body,
        });
        if !p.eat_punct(",") {
            break;
        }
    }
    if ctes.is_empty() {
        return Err(ParseError::EmptyWithBlock(p.span_from(start)));
    }
    for i in 0..ctes.len() {
        for j in (i + 1)..ctes.len() {
            if ctes[i].name == ctes[j].name {
                return Err(ParseError::DuplicateCte(
                    p.span_from(start),
                    ctes[j].name.text.clone(),
                ));
            }
        }
    }
    if recursive {
        for cte in &ctes {
            if !cte_self_references(&cte.body, &cte.name) {
                continue;
            }
            let has_anchor = matches!(
                &cte.body.kind,
                QueryKind::Binary(b) if matches!(b.op, SetOperator::Union | SetOperator::UnionAll)
            );
            if !has_anchor {
                return Err(ParseError::MissingRecursiveAnchor(p.span_from(start)));
            }
        }
    }
    Ok(WithBlock { recursive, ctes })
}

/// Whether `query` reads from a table named `name` anywhere in its
/// `FROM`/join/subquery tree (a `WITH RECURSIVE` CTE only needs the
/// union/anchor shape when it actually references itself; a
/// non-recursive sibling in the same block does not).
fn cte_self_references(query: &Query, name: &Ident) -> bool {
    match &query.kind {
        QueryKind::Simple(simple) => simple.from.iter().any(|item| from_item_references(item, name)),
        QueryKind::Binary(b) => cte_self_references(&b.left, name) || cte_self_references(&b.right, name),
        QueryKind::Values(_) => false,
    }
}

fn from_item_references(item: &FromItem, name: &Ident) -> bool {
    match &item.kind {
        FromItemKind::Table { name: table_name, .. } => table_name.name == *name,
        FromItemKind::Subquery { query, .. } => cte_self_references(query, name),
        FromItemKind::Join(join) => {
            from_item_references(&join.left, name) || from_item_references(&join.right, name)
        }
        FromItemKind::Function { .. } | FromItemKind::Values { .. } => false,
    }
}

fn parse_simple_select(p: &mut Parser, with: Option<WithBlock>) -> Result<Query, ParseError> {
    let start = p.pos;
    p.expect_kw(Keyword::Select)?;
    let distinct = parse_distinct(p)?;
    let items = parse_select_items(p)?;
    let mut s = SimpleSelect {
        with,
        select: SelectClause { distinct, items },
        ..Default::default()
    };
    if p.eat_kw(Keyword::From) {
        s.from = parse_from_list(p)?;
    }
    if p.eat_kw(Keyword::Where) {
        s.r#where = Some(expr::parse_expr(p)?);
    }
    if p.eat_kw(Keyword::Group) {
        p.expect_kw(Keyword::By)?;
        s.group_by = Some(parse_group_by(p)?);
    }
    if p.eat_kw(Keyword::Having) {
        s.having = Some(expr::parse_expr(p)?);
    }
    if p.eat_kw(Keyword::Window) {
        s.windows = parse_window_list(p)?;
    }
    if p.eat_kw(Keyword::Order) {
        p.expect_kw(Keyword::By)?;
        s.order_by = expr::parse_order_by_items(p)?;
    }
    parse_limit_offset_fetch(p, &mut s)?;
    if p.at_kw(Keyword::For) {
        s.for_update = Some(parse_locking_clause(p)?);
    }
    let span = p.span_from(start);
    let comments = p.finish_comments(start);
    Ok(Query::new(QueryKind::Simple(Box::new(s)))
        .with_span(span)
        .with_comments(comments))
}

fn parse_distinct(p: &mut Parser) -> Result<Distinct, ParseError> {
    if p.eat_kw(Keyword::Distinct) {
        if p.eat_kw(Keyword::On) {
            p.expect_punct("(")?;
            let exprs = expr::parse_expr_list(p)?;
            p.expect_punct(")")?;
            return Ok(Distinct::DistinctOn(exprs));
        }
        return Ok(Distinct::Distinct);
    }
    if p.eat_kw(Keyword::All) {
        return Ok(Distinct::All);
    }
    Ok(Distinct::None)
}

pub(crate) fn parse_select_items(p: &mut Parser) -> Result<Vec<SelectItem>, ParseError> {
    let start = p.pos;
    if p.at_kw(Keyword::From) || p.at_eof() {
        return Err(ParseError::EmptySelectList(p.span_from(start)));
    }
    let mut items = Vec::new();
    loop {
        items.push(parse_select_item(p)?);
        if !p.eat_punct(",") {
            break;
        }
    }
    Ok(items)
}

fn parse_select_item(p: &mut Parser) -> Result<SelectItem, ParseError> {
    if p.at_op("*") {
        p.bump();
        return Ok(SelectItem::Wildcard);
    }
    if matches!(p.current_kind(), TokenKind::Identifier | TokenKind::QuotedIdentifier)
        && matches!(p.peek_kind(1), TokenKind::Punctuation)
        && p.peek_text(1) == "."
        && matches!(p.peek_kind(2), TokenKind::Operator)
        && p.peek_text(2) == "*"
    {
        let table = p.expect_ident()?;
        p.bump(); // "."
        p.bump(); // "*"
        return Ok(SelectItem::QualifiedWildcard(table));
    }
    let expr = expr::parse_expr(p)?;
    let alias = parse_optional_select_alias(p)?;
    Ok(SelectItem::Expr { expr, alias })
}

fn parse_optional_select_alias(p: &mut Parser) -> Result<Option<crate::ast::Ident>, ParseError> {
    if p.eat_kw(Keyword::As) {
        return Ok(Some(p.expect_ident()?));
    }
    if matches!(p.current_kind(), TokenKind::Identifier | TokenKind::QuotedIdentifier) {
        return Ok(Some(p.expect_ident()?));
    }
    Ok(None)
}

pub(crate) fn parse_from_list(p: &mut Parser) -> Result<Vec<FromItem>, ParseError> {
    let mut items = Vec::new();
    loop {
        items.push(parse_from_item_with_joins(p)?);
        if !p.eat_punct(",") {
            break;
        }
    }
    Ok(items)
}

/// A single `FROM`-item with no join chain, e.g. `MERGE ... USING`'s
/// data source (which never carries its own `JOIN` clause).
pub(crate) fn parse_from_item_standalone(p: &mut Parser) -> Result<FromItem, ParseError> {
    parse_from_primary(p)
}

fn parse_from_item_with_joins(p: &mut Parser) -> Result<FromItem, ParseError> {
    let mut left = parse_from_primary(p)?;
    loop {
        let natural = p.eat_kw(Keyword::Natural);
        let kind = if p.eat_kw(Keyword::Cross) {
            p.expect_kw(Keyword::Join)?;
            JoinKind::Cross
        } else if p.eat_kw(Keyword::Inner) {
            p.expect_kw(Keyword::Join)?;
            JoinKind::Inner
        } else if p.at_kw(Keyword::Left) {
            p.bump();
            p.eat_kw(Keyword::Outer);
            p.expect_kw(Keyword::Join)?;
            JoinKind::Left
        } else if p.at_kw(Keyword::Right) {
            p.bump();
            p.eat_kw(Keyword::Outer);
            p.expect_kw(Keyword::Join)?;
            JoinKind::Right
        } else if p.at_kw(Keyword::Full) {
            p.bump();
            p.eat_kw(Keyword::Outer);
            p.expect_kw(Keyword::Join)?;
            JoinKind::Full
        } else if p.eat_kw(Keyword::Join) {
            JoinKind::Inner
        } else if natural {
            return Err(p.unexpected("JOIN"));
        } else {
            break;
        };

        let lateral_right = p.eat_kw(Keyword::Lateral);
        let right = parse_from_primary(p)?;
        let kind = if lateral_right {
            match kind {
                JoinKind::Inner => JoinKind::LateralInner,
                JoinKind::Left => JoinKind::LateralLeft,
                other => other,
            }
        } else {
            kind
        };

        let condition = if natural {
            JoinCondition::Natural
        } else if p.eat_kw(Keyword::On) {
            JoinCondition::On(expr::parse_expr(p)?)
        } else if p.eat_kw(Keyword::Using) {
            p.expect_punct("(")?;
            let mut cols = Vec::new();
            loop {
                cols.push(p.expect_ident()?);
                if !p.eat_punct(",") {
                    break;
                }
            }
            p.expect_punct(")")?;
            JoinCondition::Using(cols)
        } else {
            JoinCondition::None
        };

        let span = match (left.span, right.span) {
            (Some(a), Some(b)) => Some(a.cover(b)),
            _ => None,
        };
        let mut joined = FromItem::new(FromItemKind::Join(Box::new(Join {
            kind,
            left,
            right,
            condition,
        })));
        joined.span = span;
        left = joined;
    }
    Ok(left)
}

fn parse_from_primary(p: &mut Parser) -> Result<FromItem, ParseError> {
    let start = p.pos;
    let lateral = p.eat_kw(Keyword::Lateral);

    if p.at_punct("(") {
        p.bump();
        if p.at_kw(Keyword::Select) || p.at_kw(Keyword::With) {
            let query = parse_query(p)?;
            p.expect_punct(")")?;
            let (alias, column_aliases) = parse_alias_with_columns_required(p)?;
            let span = p.span_from(start);
            return Ok(FromItem::new(FromItemKind::Subquery {
                query: Box::new(query),
                alias,
                column_aliases,
                lateral,
            })
            .with_span(span)
            .with_comments(p.finish_comments(start)));
        }
        if p.at_kw(Keyword::Values) {
            let values = parse_values_query_inner(p)?;
            p.expect_punct(")")?;
            let (alias, column_aliases) = parse_alias_with_columns_required(p)?;
            let span = p.span_from(start);
            return Ok(FromItem::new(FromItemKind::Values {
                query: Box::new(values),
                alias,
                column_aliases,
            })
            .with_span(span)
            .with_comments(p.finish_comments(start)));
        }
        if lateral {
            return Err(p.unexpected("subquery or function after LATERAL"));
        }
        let inner = parse_from_item_with_joins(p)?;
        p.expect_punct(")")?;
        return Ok(inner);
    }

    let name = parse_object_name(p)?;
    if p.at_punct("(") {
        let call = expr::parse_table_function_call(p, name)?;
        let alias = parse_optional_table_alias(p)?;
        let column_aliases = parse_optional_column_alias_list(p)?;
        let span = p.span_from(start);
        return Ok(FromItem::new(FromItemKind::Function {
            call: Box::new(call),
            alias,
            column_aliases,
            lateral,
        })
        .with_span(span)
        .with_comments(p.finish_comments(start)));
    }
    let alias = parse_optional_table_alias(p)?;
    let column_aliases = parse_optional_column_alias_list(p)?;
    let span = p.span_from(start);
    Ok(FromItem::new(FromItemKind::Table {
        name,
        alias,
        column_aliases,
    })
    .with_span(span)
    .with_comments(p.finish_comments(start)))
}

pub(crate) fn parse_optional_table_alias(p: &mut Parser) -> Result<Option<crate::ast::Ident>, ParseError> {
    if p.eat_kw(Keyword::As) {
        return Ok(Some(p.expect_ident()?));
    }
    if matches!(p.current_kind(), TokenKind::Identifier | TokenKind::QuotedIdentifier) {
        return Ok(Some(p.expect_ident()?));
    }
    Ok(None)
}

fn parse_optional_column_alias_list(p: &mut Parser) -> Result<Vec<crate::ast::Ident>, ParseError> {
    if p.eat_punct("(") {
        let mut cols = Vec::new();
        loop {
            cols.push(p.expect_ident()?);
            if !p.eat_punct(",") {
                break;
            }
        }
        p.expect_punct(")")?;
        Ok(cols)
    } else {
        Ok(Vec::new())
    }
}

fn parse_alias_with_columns_required(
    p: &mut Parser,
) -> Result<(crate::ast::Ident, Vec<crate::ast::Ident>), ParseError> {
    p.eat_kw(Keyword::As);
    let alias = p.expect_ident()?;
    let cols = parse_optional_column_alias_list(p)?;
    Ok((alias, cols))
}

fn parse_group_by(p: &mut Parser) -> Result<GroupByClause, ParseError> {
    if p.eat_kw(Keyword::Rollup) {
        p.expect_punct("(")?;
        let exprs = expr::parse_expr_list(p)?;
        p.expect_punct(")")?;
        return Ok(GroupByClause {
            exprs,
            mode: GroupByMode::Rollup,
        });
    }
    if p.eat_kw(Keyword::Cube) {
        p.expect_punct("(")?;
        let exprs = expr::parse_expr_list(p)?;
        p.expect_punct(")")?;
        return Ok(GroupByClause {
            exprs,
            mode: GroupByMode::Cube,
        });
    }
    if p.eat_kw(Keyword::Grouping) {
        p.expect_kw(Keyword::Sets)?;
        p.expect_punct("(")?;
        let mut sets = Vec::new();
        loop {
            p.expect_punct("(")?;
            let set = if p.at_punct(")") {
                Vec::new()
            } else {
                expr::parse_expr_list(p)?
            };
            p.expect_punct(")")?;
            sets.push(set);
            if !p.eat_punct(",") {
                break;
            }
        }
        p.expect_punct(")")?;
        return Ok(GroupByClause {
            exprs: Vec::new(),
            mode: GroupByMode::GroupingSets(sets),
        });
    }
    let exprs = expr::parse_expr_list(p)?;
    Ok(GroupByClause {
        exprs,
        mode: GroupByMode::Plain,
    })
}

fn parse_window_list(p: &mut Parser) -> Result<Vec<(crate::ast::Ident, crate::ast::WindowDefinition)>, ParseError> {
    let mut windows = Vec::new();
    loop {
        let name = p.expect_ident()?;
        p.expect_kw(Keyword::As)?;
        let def = expr::parse_window_definition(p)?;
        windows.push((name, def));
        if !p.eat_punct(",") {
            break;
        }
    }
    Ok(windows)
}

fn parse_limit_offset_fetch(p: &mut Parser, s: &mut SimpleSelect) -> Result<(), ParseError> {
    loop {
        if p.eat_kw(Keyword::Limit) {
            if p.eat_kw(Keyword::All) {
                s.limit = None;
            } else {
                s.limit = Some(expr::parse_expr(p)?);
            }
            continue;
        }
        if p.eat_kw(Keyword::Offset) {
            s.offset = Some(expr::parse_expr(p)?);
            p.eat_kw(Keyword::Rows);
            continue;
        }
        if p.eat_kw(Keyword::Fetch) {
            let _ = p.eat_kw(Keyword::First) || p.eat_kw(Keyword::Next);
            let count = expr::parse_additive(p)?;
            p.expect_kw(Keyword::Rows)?;
            let with_ties = if p.eat_kw(Keyword::Only) {
                false
            } else {
                p.expect_kw(Keyword::With)?;
                p.expect_kw(Keyword::Ties)?;
                true
            };
            s.fetch = Some(FetchClause { count, with_ties });
            continue;
        }
        break;
    }
    Ok(())
}

fn parse_locking_clause(p: &mut Parser) -> Result<LockingClause, ParseError> {
    p.expect_kw(Keyword::For)?;
    let strength = if p.eat_kw(Keyword::Update) {
        LockingStrength::Update
    } else if p.at_kw(Keyword::No) {
        p.bump();
        p.expect_kw(Keyword::Key)?;
        p.expect_kw(Keyword::Update)?;
        LockingStrength::NoKeyUpdate
    } else if p.eat_kw(Keyword::Share) {
        LockingStrength::Share
    } else if p.at_kw(Keyword::Key) {
        p.bump();
        p.expect_kw(Keyword::Share)?;
        LockingStrength::KeyShare
    } else {
        return Err(p.unexpected("UPDATE, SHARE, NO KEY UPDATE, or KEY SHARE"));
    };
    let mut of = Vec::new();
    if p.eat_kw(Keyword::Of) {
        loop {
            of.push(parse_object_name(p)?);
            if !p.eat_punct(",") {
                break;
            }
        }
    }
    let nowait = p.eat_kw(Keyword::Nowait);
    let skip_locked = if !nowait && p.eat_kw(Keyword::Skip) {
        p.expect_kw(Keyword::Locked)?;
        true
    } else {
        false
    };
    Ok(LockingClause {
        strength,
        of,
        nowait,
        skip_locked,
    })
}

fn parse_values_query(p: &mut Parser) -> Result<Query, ParseError> {
    let start = p.pos;
    let values = parse_values_query_inner(p)?;
    let span = p.span_from(start);
    Ok(Query::new(QueryKind::Values(Box::new(values))).with_span(span))
}

fn parse_values_query_inner(p: &mut Parser) -> Result<ValuesQuery, ParseError> {
    p.expect_kw(Keyword::Values)?;
    let mut rows = Vec::new();
    loop {
        p.expect_punct("(")?;
        let row = expr::parse_expr_list(p)?;
        p.expect_punct(")")?;
        rows.push(row);
        if !p.eat_punct(",") {
            break;
        }
    }
    Ok(ValuesQuery { rows })
}
