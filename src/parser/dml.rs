//! `INSERT` / `UPDATE` / `DELETE` / `MERGE` grammar (spec §4.2's
//! "Statements" bullet, minus the SELECT-family handled by `query.rs`).

use super::{expr, parse_object_name, query, Parser};
use crate::ast::{
    ConflictAction, ConflictTarget, Delete, Insert, InsertSource, Merge, MergeAction,
    MergeWhenClause, OnConflict, SetItem, Update, WithBlock,
};
use crate::error::ParseError;
use crate::lexer::Keyword;

pub(crate) fn parse_insert(p: &mut Parser, with: Option<WithBlock>) -> Result<Insert, ParseError> {
    p.expect_kw(Keyword::Insert)?;
    p.expect_kw(Keyword::Into)?;
    let target = parse_object_name(p)?;

    let columns = if p.eat_punct("(") {
        let mut cols = Vec::new();
        loop {
            cols.push(p.expect_ident()?);
            if !p.eat_punct(",") {
                break;
            }
        }
        p.expect_punct(")")?;
        Some(cols)
    } else {
        None
    };

    let source = if p.eat_kw(Keyword::Default) {
        p.expect_kw(Keyword::Values)?;
        InsertSource::DefaultValues
    } else {
        InsertSource::Query(Box::new(query::parse_query(p)?))
    };

    let on_conflict = if p.eat_kw(Keyword::On) {
        p.expect_kw(Keyword::Conflict)?;
        Some(parse_on_conflict(p)?)
    } else {
        None
    };

    let returning = if p.eat_kw(Keyword::Returning) {
        Some(parse_returning_items(p)?)
    } else {
        None
    };

    Ok(Insert {
        with,
        target,
        columns,
        source,
        on_conflict,
        returning,
    })
}

fn parse_on_conflict(p: &mut Parser) -> Result<OnConflict, ParseError> {
    let target = if p.eat_kw(Keyword::On) {
        p.expect_kw(Keyword::Constraint)?;
        Some(ConflictTarget::Constraint(p.expect_ident()?))
    } else if p.eat_punct("(") {
        let mut cols = Vec::new();
        loop {
            cols.push(p.expect_ident()?);
            if !p.eat_punct(",") {
                break;
            }
        }
        p.expect_punct(")")?;
        Some(ConflictTarget::Columns(cols))
    } else {
        None
    };

    p.expect_kw(Keyword::Do)?;
    let action = if p.eat_kw(Keyword::Nothing) {
        ConflictAction::DoNothing
    } else {
        p.expect_kw(Keyword::Update)?;
        p.expect_kw(Keyword::Set)?;
        let set = parse_set_items(p)?;
        let r#where = if p.eat_kw(Keyword::Where) {
            Some(expr::parse_expr(p)?)
        } else {
            None
        };
        ConflictAction::DoUpdate { set, r#where }
    };

    Ok(OnConflict { target, action })
}

pub(crate) fn parse_set_items(p: &mut Parser) -> Result<Vec<SetItem>, ParseError> {
    let mut items = Vec::new();
    loop {
        let column = p.expect_ident()?;
        p.expect_op("=")?;
        let value = expr::parse_expr(p)?;
        items.push(SetItem { column, value });
        if !p.eat_punct(",") {
            break;
        }
    }
    Ok(items)
}

fn parse_returning_items(p: &mut Parser) -> Result<Vec<crate::ast::SelectItem>, ParseError> {
    query::parse_select_items(p)
}

pub(crate) fn parse_update(p: &mut Parser, with: Option<WithBlock>) -> Result<Update, ParseError> {
    p.expect_kw(Keyword::Update)?;
    let target = parse_object_name(p)?;
    let alias = query::parse_optional_table_alias(p)?;
    p.expect_kw(Keyword::Set)?;
    let set = parse_set_items(p)?;
    let from = if p.eat_kw(Keyword::From) {
        query::parse_from_list(p)?
    } else {
        Vec::new()
    };
    let r#where = if p.eat_kw(Keyword::Where) {
        Some(expr::parse_expr(p)?)
    } else {
        None
    };
    let returning = if p.eat_kw(Keyword::Returning) {
        Some(parse_returning_items(p)?)
    } else {
        None
    };
    Ok(Update {
        with,
        target,
        alias,
        set,
        from,
        r#where,
        returning,
    })
}

pub(crate) fn parse_delete(p: &mut Parser, with: Option<WithBlock>) -> Result<Delete, ParseError> {
    p.expect_kw(Keyword::Delete)?;
    p.expect_kw(Keyword::From)?;
    let target = parse_object_name(p)?;
    let alias = query::parse_optional_table_alias(p)?;
    let using = if p.eat_kw(Keyword::Using) {
        query::parse_from_list(p)?
    } else {
        Vec::new()
    };
    let r#where = if p.eat_kw(Keyword::Where) {
        Some(expr::parse_expr(p)?)
    } else {
        None
    };
    let returning = if p.eat_kw(Keyword::Returning) {
        Some(parse_returning_items(p)?)
    } else {
        None
    };
    Ok(Delete {
        with,
        target,
        alias,
        using,
        r#where,
        returning,
    })
}

pub(crate) fn parse_merge(p: &mut Parser) -> Result<Merge, ParseError> {
    p.expect_kw(Keyword::Merge)?;
    p.expect_kw(Keyword::Into)?;
    let target = parse_object_name(p)?;
    let target_alias = query::parse_optional_table_alias(p)?;
    p.expect_kw(Keyword::Using)?;
    let using = query::parse_from_item_standalone(p)?;
    p.expect_kw(Keyword::On)?;
    let on = expr::parse_expr(p)?;

    let mut when_clauses = Vec::new();
    loop {
        p.expect_kw(Keyword::When)?;
        let matched = if p.eat_kw(Keyword::Matched) {
            true
        } else {
            p.expect_kw(Keyword::Not)?;
            p.expect_kw(Keyword::Matched)?;
            false
        };
        let additional_condition = if p.eat_kw(Keyword::And) {
            Some(expr::parse_expr(p)?)
        } else {
            None
        };
        p.expect_kw(Keyword::Then)?;
        let action = if p.eat_kw(Keyword::Update) {
            p.expect_kw(Keyword::Set)?;
            MergeAction::Update(parse_set_items(p)?)
        } else if p.eat_kw(Keyword::Delete) {
            MergeAction::Delete
        } else if p.eat_kw(Keyword::Do) {
            p.expect_kw(Keyword::Nothing)?;
            MergeAction::DoNothing
        } else {
            p.expect_kw(Keyword::Insert)?;
            let columns = if p.eat_punct("(") {
                let mut cols = Vec::new();
                loop {
                    cols.push(p.expect_ident()?);
                    if !p.eat_punct(",") {
                        break;
                    }
                }
                p.expect_punct(")")?;
                Some(cols)
            } else {
                None
            };
            p.expect_kw(Keyword::Values)?;
            p.expect_punct("(")?;
            let values = expr::parse_expr_list(p)?;
            p.expect_punct(")")?;
            MergeAction::Insert { columns, values }
        };
        when_clauses.push(MergeWhenClause {
            matched,
            additional_condition,
            action,
        });
        if !p.at_kw(Keyword::When) {
            break;
        }
    }

    Ok(Merge {
        target,
        target_alias,
        using,
        on,
        when_clauses,
    })
}
