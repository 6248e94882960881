//! Value expression grammar (spec §4.2's precedence table).
//!
//! Generalizes the teacher's `expr_bp`/`prefix_bp`/`infix_bp`/`postfix_bp`
//! Pratt loop (`grammar/expressions.rs`) into one recursive-descent
//! function per precedence level — easier to keep readable once every
//! level also has its own special-case grammar (`BETWEEN`, `IN`, `LIKE`,
//! `IS [NOT] DISTINCT FROM`) rather than a single numeric binding-power
//! table.

use super::Parser;
use crate::ast::{
    BinaryOp, ColumnName, ColumnRef, Expr, ExprKind, FrameBound, FrameUnit, FunctionCall, Literal,
    OrderByItem, UnaryOp, WindowDefinition, WindowFrame, WindowSpec,
};
use crate::error::ParseError;
use crate::lexer::{Keyword, TokenKind};

pub(crate) fn parse_expr(p: &mut Parser) -> Result<Expr, ParseError> {
    parse_or(p)
}

fn parse_or(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_and(p)?;
    while p.eat_kw(Keyword::Or) {
        let right = parse_and(p)?;
        left = Expr::binary(BinaryOp::Or, left, right);
    }
    Ok(left)
}

fn parse_and(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_not(p)?;
    while p.eat_kw(Keyword::And) {
        let right = parse_not(p)?;
        left = Expr::binary(BinaryOp::And, left, right);
    }
    Ok(left)
}

fn parse_not(p: &mut Parser) -> Result<Expr, ParseError> {
    if p.at_kw(Keyword::Not) && p.peek_kw(1) == Some(Keyword::Exists) {
        let start = p.pos;
        p.bump();
        p.bump();
        p.expect_punct("(")?;
        let subquery = super::query::parse_query(p)?;
        p.expect_punct(")")?;
        let span = p.span_from(start);
        return Ok(Expr::new(ExprKind::Exists {
            negated: true,
            subquery: Box::new(subquery),
        })
        .with_span(span)
        .with_comments(p.finish_comments(start)));
    }
    if p.eat_kw(Keyword::Not) {
        let start = p.pos - 1;
        let inner = parse_not(p)?;
        let span = p.span_from(start);
        return Ok(Expr::new(ExprKind::Unary {
            op: UnaryOp::Not,
            expr: Box::new(inner),
        })
        .with_span(span)
        .with_comments(p.finish_comments(start)));
    }
    parse_comparison(p)
}

fn parse_comparison(p: &mut Parser) -> Result<Expr, ParseError> {
    let left = parse_additive(p)?;
    parse_comparison_tail(p, left)
}

fn comparison_binop(p: &Parser) -> Option<BinaryOp> {
    if p.at_op("=") {
        Some(BinaryOp::Eq)
    } else if p.at_op("<>") || p.at_op("!=") {
        Some(BinaryOp::NotEq)
    } else if p.at_op("<=") {
        Some(BinaryOp::LtEq)
    } else if p.at_op(">=") {
        Some(BinaryOp::GtEq)
    } else if p.at_op("<") {
        Some(BinaryOp::Lt)
    } else if p.at_op(">") {
        Some(BinaryOp::Gt)
    } else {
        None
    }
}

fn parse_comparison_tail(p: &mut Parser, left: Expr) -> Result<Expr, ParseError> {
    if let Some(op) = comparison_binop(p) {
        let op_span = p.current().span;
        p.bump();
        let right = parse_additive(p)?;
        let result = Expr::binary(op, left, right);
        if comparison_binop(p).is_some() {
            return Err(ParseError::ChainedComparison(op_span));
        }
        return Ok(result);
    }

    let negated = if p.at_kw(Keyword::Not) {
        match p.peek_kw(1) {
            Some(Keyword::Like) | Some(Keyword::Ilike) | Some(Keyword::Between) | Some(Keyword::In) => {
                p.bump();
                true
            }
            _ => return Ok(left),
        }
    } else {
        false
    };

    if p.at_kw(Keyword::Like) || p.at_kw(Keyword::Ilike) {
        let case_insensitive = p.at_kw(Keyword::Ilike);
        p.bump();
        let pattern = parse_additive(p)?;
        return Ok(Expr::new(ExprKind::Like {
            expr: Box::new(left),
            negated,
            case_insensitive,
            pattern: Box::new(pattern),
        }));
    }

    if p.eat_kw(Keyword::Between) {
        let low = parse_additive(p)?;
        p.expect_kw(Keyword::And)?;
        let high = parse_additive(p)?;
        return Ok(Expr::new(ExprKind::Between {
            expr: Box::new(left),
            negated,
            low: Box::new(low),
            high: Box::new(high),
        }));
    }

    if p.eat_kw(Keyword::In) {
        p.expect_punct("(")?;
        if p.at_kw(Keyword::Select) || p.at_kw(Keyword::With) {
            let subquery = super::query::parse_query(p)?;
            p.expect_punct(")")?;
            return Ok(Expr::new(ExprKind::InSubquery {
                expr: Box::new(left),
                negated,
                subquery: Box::new(subquery),
            }));
        }
        let mut list = Vec::new();
        if !p.at_punct(")") {
            loop {
                list.push(parse_expr(p)?);
                if !p.eat_punct(",") {
                    break;
                }
            }
        }
        p.expect_punct(")")?;
        return Ok(Expr::new(ExprKind::InList {
            expr: Box::new(left),
            negated,
            list,
        }));
    }

    if p.eat_kw(Keyword::Is) {
        let is_negated = p.eat_kw(Keyword::Not);
        if p.eat_kw(Keyword::Null) {
            return Ok(Expr::new(ExprKind::IsNull {
                expr: Box::new(left),
                negated: is_negated,
            }));
        }
        if p.eat_kw(Keyword::Distinct) {
            p.expect_kw(Keyword::From)?;
            let right = parse_additive(p)?;
            return Ok(Expr::new(ExprKind::IsDistinctFrom {
                left: Box::new(left),
                right: Box::new(right),
                negated: is_negated,
            }));
        }
        return Err(p.unexpected("NULL or DISTINCT FROM"));
    }

    Ok(left)
}

pub(crate) fn parse_additive(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_multiplicative(p)?;
    loop {
        let op = if p.at_op("+") {
            Some(BinaryOp::Add)
        } else if p.at_op("-") {
            Some(BinaryOp::Sub)
        } else if p.at_op("||") {
            Some(BinaryOp::Concat)
        } else {
            None
        };
        let Some(op) = op else { break };
        p.bump();
        let right = parse_multiplicative(p)?;
        left = Expr::binary(op, left, right);
    }
    Ok(left)
}

fn parse_multiplicative(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_pow(p)?;
    loop {
        let op = if p.at_op("*") {
            Some(BinaryOp::Mul)
        } else if p.at_op("/") {
            Some(BinaryOp::Div)
        } else if p.at_op("%") {
            Some(BinaryOp::Mod)
        } else {
            None
        };
        let Some(op) = op else { break };
        p.bump();
        let right = parse_pow(p)?;
        left = Expr::binary(op, left, right);
    }
    Ok(left)
}

/// `^` is right-associative.
fn parse_pow(p: &mut Parser) -> Result<Expr, ParseError> {
    let left = parse_unary(p)?;
    if p.eat_op("^") {
        let right = parse_pow(p)?;
        return Ok(Expr::binary(BinaryOp::Pow, left, right));
    }
    Ok(left)
}

fn parse_unary(p: &mut Parser) -> Result<Expr, ParseError> {
    if p.at_op("+") || p.at_op("-") {
        let start = p.pos;
        let op = if p.bump().text == "+" {
            UnaryOp::Plus
        } else {
            UnaryOp::Minus
        };
        let expr = parse_unary(p)?;
        let span = p.span_from(start);
        return Ok(Expr::new(ExprKind::Unary {
            op,
            expr: Box::new(expr),
        })
        .with_span(span)
        .with_comments(p.finish_comments(start)));
    }
    parse_cast(p)
}

/// `::` postfix cast binds tighter than any other operator.
fn parse_cast(p: &mut Parser) -> Result<Expr, ParseError> {
    let start = p.pos;
    let mut expr = parse_primary(p)?;
    while p.eat_op("::") {
        let type_name = parse_type_name(p)?;
        let span = p.span_from(start);
        expr = Expr::new(ExprKind::Cast {
            expr: Box::new(expr),
            type_name,
        })
        .with_span(span);
    }
    Ok(expr)
}

fn parse_primary(p: &mut Parser) -> Result<Expr, ParseError> {
    let start = p.pos;
    match p.current_kind() {
        TokenKind::NumericLiteral => {
            let tok = p.bump();
            Ok(Expr::new(ExprKind::Literal(Literal::Number(tok.text)))
                .with_span(tok.span)
                .with_comments(p.finish_comments(start)))
        }
        TokenKind::StringLiteral => {
            let tok = p.bump();
            Ok(Expr::new(ExprKind::Literal(Literal::String(tok.text)))
                .with_span(tok.span)
                .with_comments(p.finish_comments(start)))
        }
        TokenKind::ParameterPlaceholder => {
            let tok = p.bump();
            let param = p.param_ref_from_text(&tok.text);
            Ok(Expr::new(ExprKind::Parameter(param))
                .with_span(tok.span)
                .with_comments(p.finish_comments(start)))
        }
        TokenKind::Keyword(Keyword::Null) => {
            let tok = p.bump();
            Ok(Expr::new(ExprKind::Literal(Literal::Null))
                .with_span(tok.span)
                .with_comments(p.finish_comments(start)))
        }
        TokenKind::Keyword(Keyword::True) => {
            let tok = p.bump();
            Ok(Expr::new(ExprKind::Literal(Literal::Boolean(true)))
                .with_span(tok.span)
                .with_comments(p.finish_comments(start)))
        }
        TokenKind::Keyword(Keyword::False) => {
            let tok = p.bump();
            Ok(Expr::new(ExprKind::Literal(Literal::Boolean(false)))
                .with_span(tok.span)
                .with_comments(p.finish_comments(start)))
        }
        TokenKind::Keyword(Keyword::Case) => parse_case(p, start),
        TokenKind::Keyword(Keyword::Cast) => parse_cast_expr(p, start),
        TokenKind::Keyword(Keyword::Exists) => {
            p.bump();
            p.expect_punct("(")?;
            let subquery = super::query::parse_query(p)?;
            p.expect_punct(")")?;
            let span = p.span_from(start);
            Ok(Expr::new(ExprKind::Exists {
                negated: false,
                subquery: Box::new(subquery),
            })
            .with_span(span)
            .with_comments(p.finish_comments(start)))
        }
        TokenKind::Keyword(Keyword::Array) => parse_array_literal(p, start),
        TokenKind::Keyword(Keyword::Row) => parse_row_ctor(p, start),
        TokenKind::Identifier | TokenKind::QuotedIdentifier => parse_column_or_call(p, start),
        _ if p.at_punct("(") => parse_paren(p, start),
        _ => Err(p.unexpected("expression")),
    }
}

fn parse_column_or_call(p: &mut Parser, start: usize) -> Result<Expr, ParseError> {
    let first = p.expect_ident()?;
    if p.eat_punct(".") {
        if p.at_op("*") {
            p.bump();
            let span = p.span_from(start);
            return Ok(Expr::new(ExprKind::Column(ColumnRef {
                table: Some(first),
                column: ColumnName::Wildcard,
            }))
            .with_span(span)
            .with_comments(p.finish_comments(start)));
        }
        let col = p.expect_ident()?;
        if p.at_punct("(") {
            let name = crate::ast::ObjectName {
                schema: Some(first),
                name: col,
            };
            return parse_call_tail(p, name, start);
        }
        let span = p.span_from(start);
        return Ok(Expr::new(ExprKind::Column(ColumnRef {
            table: Some(first),
            column: ColumnName::Named(col),
        }))
        .with_span(span)
        .with_comments(p.finish_comments(start)));
    }
    if p.at_punct("(") {
        return parse_call_tail(p, crate::ast::ObjectName::unqualified(first), start);
    }
    let span = p.span_from(start);
    Ok(Expr::new(ExprKind::Column(ColumnRef {
        table: None,
        column: ColumnName::Named(first),
    }))
    .with_span(span)
    .with_comments(p.finish_comments(start)))
}

fn parse_call_tail(
    p: &mut Parser,
    name: crate::ast::ObjectName,
    start: usize,
) -> Result<Expr, ParseError> {
    let call = parse_function_call(p, name)?;
    let span = p.span_from(start);
    Ok(Expr::new(ExprKind::Function(Box::new(call)))
        .with_span(span)
        .with_comments(p.finish_comments(start)))
}

/// Parses a function-call's `(args) [FILTER ...] [WITHIN GROUP ...] [OVER ...]`
/// tail, shared by scalar function calls and `FROM`-clause table functions
/// (e.g. `generate_series(1, 10)`, `jsonb_to_recordset(...)`).
pub(crate) fn parse_table_function_call(
    p: &mut Parser,
    name: crate::ast::ObjectName,
) -> Result<FunctionCall, ParseError> {
    parse_function_call(p, name)
}

fn parse_function_call(
    p: &mut Parser,
    name: crate::ast::ObjectName,
) -> Result<FunctionCall, ParseError> {
    p.expect_punct("(")?;
    let distinct = p.eat_kw(Keyword::Distinct);
    p.eat_kw(Keyword::All);
    let mut args = Vec::new();
    if p.at_op("*") {
        p.bump();
        args.push(Expr::new(ExprKind::Column(ColumnRef {
            table: None,
            column: ColumnName::Wildcard,
        })));
    } else if !p.at_punct(")") {
        loop {
            args.push(parse_expr(p)?);
            if !p.eat_punct(",") {
                break;
            }
        }
    }
    p.expect_punct(")")?;

    let filter = if p.eat_kw(Keyword::Filter) {
        p.expect_punct("(")?;
        p.expect_kw(Keyword::Where)?;
        let cond = parse_expr(p)?;
        p.expect_punct(")")?;
        Some(Box::new(cond))
    } else {
        None
    };

    let within_group = if p.eat_kw(Keyword::Within) {
        p.expect_kw(Keyword::Group)?;
        p.expect_punct("(")?;
        p.expect_kw(Keyword::Order)?;
        p.expect_kw(Keyword::By)?;
        let items = parse_order_by_items(p)?;
        p.expect_punct(")")?;
        Some(items)
    } else {
        None
    };

    let over = if p.eat_kw(Keyword::Over) {
        if matches!(p.current_kind(), TokenKind::Identifier) {
            Some(WindowSpec::Named(p.expect_ident()?))
        } else {
            Some(WindowSpec::Inline(parse_window_definition(p)?))
        }
    } else {
        None
    };

    Ok(FunctionCall {
        name,
        args,
        distinct,
        filter,
        within_group,
        over,
    })
}

pub(crate) fn parse_window_definition(p: &mut Parser) -> Result<WindowDefinition, ParseError> {
    p.expect_punct("(")?;
    let mut def = WindowDefinition::default();
    if matches!(p.current_kind(), TokenKind::Identifier) {
        def.base = Some(p.expect_ident()?);
    }
    if p.eat_kw(Keyword::Partition) {
        p.expect_kw(Keyword::By)?;
        def.partition_by = parse_expr_list(p)?;
    }
    if p.eat_kw(Keyword::Order) {
        p.expect_kw(Keyword::By)?;
        def.order_by = parse_order_by_items(p)?;
    }
    if p.at_kw(Keyword::Rows) || p.at_kw(Keyword::Range) || p.at_kw(Keyword::Groups) {
        def.frame = Some(parse_window_frame(p)?);
    }
    p.expect_punct(")")?;
    Ok(def)
}

fn parse_window_frame(p: &mut Parser) -> Result<WindowFrame, ParseError> {
    let unit = if p.eat_kw(Keyword::Rows) {
        FrameUnit::Rows
    } else if p.eat_kw(Keyword::Range) {
        FrameUnit::Range
    } else {
        p.expect_kw(Keyword::Groups)?;
        FrameUnit::Groups
    };
    if p.eat_kw(Keyword::Between) {
        let start = parse_frame_bound(p)?;
        p.expect_kw(Keyword::And)?;
        let end = parse_frame_bound(p)?;
        Ok(WindowFrame {
            unit,
            start,
            end: Some(end),
        })
    } else {
        let start = parse_frame_bound(p)?;
        Ok(WindowFrame {
            unit,
            start,
            end: None,
        })
    }
}

fn parse_frame_bound(p: &mut Parser) -> Result<FrameBound, ParseError> {
    if p.eat_kw(Keyword::Unbounded) {
        if p.eat_kw(Keyword::Preceding) {
            return Ok(FrameBound::UnboundedPreceding);
        }
        p.expect_kw(Keyword::Following)?;
        return Ok(FrameBound::UnboundedFollowing);
    }
    if p.eat_kw(Keyword::Current) {
        p.expect_kw(Keyword::Row)?;
        return Ok(FrameBound::CurrentRow);
    }
    let bound_expr = parse_additive(p)?;
    if p.eat_kw(Keyword::Preceding) {
        return Ok(FrameBound::Preceding(Box::new(bound_expr)));
    }
    p.expect_kw(Keyword::Following)?;
    Ok(FrameBound::Following(Box::new(bound_expr)))
}

pub(crate) fn parse_order_by_items(p: &mut Parser) -> Result<Vec<OrderByItem>, ParseError> {
    let mut items = Vec::new();
    loop {
        let expr = parse_expr(p)?;
        let direction = if p.eat_kw(Keyword::Asc) {
            Some(crate::ast::SortDirection::Asc)
        } else if p.eat_kw(Keyword::Desc) {
            Some(crate::ast::SortDirection::Desc)
        } else {
            None
        };
        let nulls = if p.eat_kw(Keyword::Nulls) {
            if p.eat_kw(Keyword::First) {
                Some(crate::ast::NullsOrder::First)
            } else {
                p.expect_kw(Keyword::Last)?;
                Some(crate::ast::NullsOrder::Last)
            }
        } else {
            None
        };
        items.push(OrderByItem {
            expr,
            direction,
            nulls,
        });
        if !p.eat_punct(",") {
            break;
        }
    }
    Ok(items)
}

pub(crate) fn parse_expr_list(p: &mut Parser) -> Result<Vec<Expr>, ParseError> {
    let mut exprs = Vec::new();
    loop {
        exprs.push(parse_expr(p)?);
        if !p.eat_punct(",") {
            break;
        }
    }
    Ok(exprs)
}

fn parse_case(p: &mut Parser, start: usize) -> Result<Expr, ParseError> {
    p.bump(); // CASE
    let operand = if !p.at_kw(Keyword::When) {
        Some(Box::new(parse_expr(p)?))
    } else {
        None
    };
    let mut branches = Vec::new();
    loop {
        p.expect_kw(Keyword::When)?;
        let cond = parse_expr(p)?;
        p.expect_kw(Keyword::Then)?;
        let result = parse_expr(p)?;
        branches.push((cond, result));
        if !p.at_kw(Keyword::When) {
            break;
        }
    }
    let else_branch = if p.eat_kw(Keyword::Else) {
        Some(Box::new(parse_expr(p)?))
    } else {
        None
    };
    p.expect_kw(Keyword::End)?;
    let span = p.span_from(start);
    Ok(Expr::new(ExprKind::Case {
        operand,
        branches,
        else_branch,
    })
    .with_span(span)
    .with_comments(p.finish_comments(start)))
}

fn parse_cast_expr(p: &mut Parser, start: usize) -> Result<Expr, ParseError> {
    p.bump(); // CAST
    p.expect_punct("(")?;
    let expr = parse_expr(p)?;
    p.expect_kw(Keyword::As)?;
    let type_name = parse_type_name(p)?;
    p.expect_punct(")")?;
    let span = p.span_from(start);
    Ok(Expr::new(ExprKind::Cast {
        expr: Box::new(expr),
        type_name,
    })
    .with_span(span)
    .with_comments(p.finish_comments(start)))
}

fn parse_array_literal(p: &mut Parser, start: usize) -> Result<Expr, ParseError> {
    p.bump(); // ARRAY
    p.expect_punct("[")?;
    let mut elements = Vec::new();
    if !p.at_punct("]") {
        loop {
            elements.push(parse_expr(p)?);
            if !p.eat_punct(",") {
                break;
            }
        }
    }
    p.expect_punct("]")?;
    let span = p.span_from(start);
    Ok(Expr::new(ExprKind::Array(elements))
        .with_span(span)
        .with_comments(p.finish_comments(start)))
}

fn parse_row_ctor(p: &mut Parser, start: usize) -> Result<Expr, ParseError> {
    p.bump(); // ROW
    p.expect_punct("(")?;
    let mut elements = Vec::new();
    if !p.at_punct(")") {
        loop {
            elements.push(parse_expr(p)?);
            if !p.eat_punct(",") {
                break;
            }
        }
    }
    p.expect_punct(")")?;
    let span = p.span_from(start);
    Ok(Expr::new(ExprKind::Row(elements))
        .with_span(span)
        .with_comments(p.finish_comments(start)))
}

fn parse_paren(p: &mut Parser, start: usize) -> Result<Expr, ParseError> {
    p.bump(); // "("
    if p.at_kw(Keyword::Select) || p.at_kw(Keyword::With) {
        let subquery = super::query::parse_query(p)?;
        p.expect_punct(")")?;
        let span = p.span_from(start);
        return Ok(Expr::new(ExprKind::Subquery(Box::new(subquery)))
            .with_span(span)
            .with_comments(p.finish_comments(start)));
    }
    let first = parse_expr(p)?;
    if p.eat_punct(",") {
        let mut elements = vec![first];
        loop {
            elements.push(parse_expr(p)?);
            if !p.eat_punct(",") {
                break;
            }
        }
        p.expect_punct(")")?;
        let span = p.span_from(start);
        return Ok(Expr::new(ExprKind::Row(elements))
            .with_span(span)
            .with_comments(p.finish_comments(start)));
    }
    p.expect_punct(")")?;
    let span = p.span_from(start);
    Ok(Expr::new(ExprKind::Paren(Box::new(first)))
        .with_span(span)
        .with_comments(p.finish_comments(start)))
}

/// Parses a (possibly parameterized, possibly array) type name, e.g.
/// `numeric(10, 2)`, `character varying`, `text[]`.
fn parse_type_name(p: &mut Parser) -> Result<String, ParseError> {
    let mut parts = Vec::new();
    loop {
        match p.current_kind() {
            TokenKind::Identifier | TokenKind::Keyword(_) => parts.push(p.bump().text),
            _ => break,
        }
    }
    if parts.is_empty() {
        return Err(p.unexpected("type name"));
    }
    let mut name = parts.join(" ");

    if p.at_punct("(") {
        name.push_str(&p.bump().text);
        loop {
            if p.at_punct(")") {
                name.push_str(&p.bump().text);
                break;
            }
            if matches!(p.current_kind(), TokenKind::NumericLiteral) {
                name.push_str(&p.bump().text);
            } else if p.at_punct(",") {
                name.push_str(&p.bump().text);
                name.push(' ');
            } else {
                return Err(p.unexpected("numeric type modifier"));
            }
        }
    }
    while p.at_punct("[") {
        name.push_str(&p.bump().text);
        if p.at_punct("]") {
            name.push_str(&p.bump().text);
        }
    }
    Ok(name)
}
