//! Value expressions (spec §3.2's "value expressions" bullet).

use super::{ast_node, BinaryOp, Ident, Literal, ObjectName, ParamRef, SortDirection, UnaryOp};
use crate::span::Span;

ast_node!(Expr(ExprKind));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Column(ColumnRef),
    Literal(Literal),
    Parameter(ParamRef),
    Function(Box<FunctionCall>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InList {
        expr: Box<Expr>,
        negated: bool,
        list: Vec<Expr>,
    },
    InSubquery {
        expr: Box<Expr>,
        negated: bool,
        subquery: Box<crate::ast::Query>,
    },
    Like {
        expr: Box<Expr>,
        negated: bool,
        case_insensitive: bool,
        pattern: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    IsDistinctFrom {
        left: Box<Expr>,
        right: Box<Expr>,
        negated: bool,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        else_branch: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        type_name: String,
    },
    Array(Vec<Expr>),
    Row(Vec<Expr>),
    Paren(Box<Expr>),
    Subquery(Box<crate::ast::Query>),
    Exists {
        negated: bool,
        subquery: Box<crate::ast::Query>,
    },
}

/// A (possibly table-qualified) column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<Ident>,
    pub column: ColumnName,
}

/// Either a plain column name or the `*` / `t.*` wildcard forms used in
/// both projections and some expression contexts (e.g. `count(*)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnName {
    Named(Ident),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: ObjectName,
    pub args: Vec<Expr>,
    pub distinct: bool,
    pub filter: Option<Box<Expr>>,
    pub within_group: Option<Vec<OrderByItem>>,
    pub over: Option<WindowSpec>,
}

/// `OVER (...)`: either a named reference to a `WINDOW` clause entry, or
/// an inline specification (spec §4.2: named windows may forward-reference
/// peer windows, resolved by the scope resolver, not the parser).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    Named(Ident),
    Inline(WindowDefinition),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowDefinition {
    pub base: Option<Ident>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub frame: Option<WindowFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
    Rows,
    Range,
    Groups,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFrame {
    pub unit: FrameUnit,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBound {
    UnboundedPreceding,
    UnboundedFollowing,
    CurrentRow,
    Preceding(Box<Expr>),
    Following(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
    pub nulls: Option<super::NullsOrder>,
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Column(ColumnRef {
            table: None,
            column: ColumnName::Named(Ident::new(name)),
        }))
    }

    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Column(ColumnRef {
            table: Some(Ident::new(table)),
            column: ColumnName::Named(Ident::new(name)),
        }))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = match (left.span, right.span) {
            (Some(a), Some(b)) => Some(a.cover(b)),
            _ => None,
        };
        let mut e = Expr::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
        e.span = span;
        e
    }

    /// Best-effort source span recomputed from this node's children when
    /// the node itself was synthesized (no parser-assigned span).
    pub fn span_or_synthetic(&self) -> Option<Span> {
        self.span
    }
}
