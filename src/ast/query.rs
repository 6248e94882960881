//! Query-level clauses and statements (spec §3.2's "From items",
//! "Clauses" and "Statements" bullets).

use super::{ast_node, Expr, Ident, ObjectName, OrderByItem};

ast_node!(Query(QueryKind));

/// A full query: the optional `WITH` prologue plus the query body.
///
/// Spec §4.2 attaches a leading `WITH` "to whichever modifying statement
/// follows"; a set-operation chain has no node of its own to hold it, so
/// the parser attaches a top-level `WITH` to the left-most [`SimpleSelect`]
/// leaf of the resulting [`BinarySelect`] tree (see `DESIGN.md`, decision
/// on open question (a)-adjacent ambiguity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Simple(Box<SimpleSelect>),
    Binary(Box<BinarySelect>),
    Values(Box<ValuesQuery>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WithBlock {
    pub recursive: bool,
    pub ctes: Vec<CteDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CteDef {
    pub name: Ident,
    pub column_aliases: Vec<Ident>,
    pub materialized: Option<bool>,
    pub body: Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleSelect {
    pub with: Option<WithBlock>,
    pub select: SelectClause,
    pub from: Vec<FromItem>,
    pub r#where: Option<Expr>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<Expr>,
    pub windows: Vec<(Ident, crate::ast::WindowDefinition)>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub fetch: Option<FetchClause>,
    pub for_update: Option<LockingClause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchClause {
    pub count: Expr,
    pub with_ties: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockingStrength {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockingClause {
    pub strength: LockingStrength,
    pub of: Vec<ObjectName>,
    pub nowait: bool,
    pub skip_locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

/// A left-leaning set-operation tree (spec §3.2 invariant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySelect {
    pub left: Query,
    pub op: SetOperator,
    pub right: Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesQuery {
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectClause {
    pub distinct: Distinct,
    pub items: Vec<SelectItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Distinct {
    #[default]
    None,
    /// Explicit `SELECT ALL` (the default behavior spelled out).
    All,
    /// Bare `SELECT DISTINCT`.
    Distinct,
    DistinctOn(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Expr { expr: Expr, alias: Option<Ident> },
    Wildcard,
    QualifiedWildcard(Ident),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupByClause {
    pub exprs: Vec<Expr>,
    pub mode: GroupByMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupByMode {
    #[default]
    Plain,
    Rollup,
    Cube,
    GroupingSets(Vec<Vec<Expr>>),
}

ast_node!(FromItem(FromItemKind));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromItemKind {
    Table {
        name: ObjectName,
        alias: Option<Ident>,
        column_aliases: Vec<Ident>,
    },
    Subquery {
        query: Box<Query>,
        alias: Ident,
        column_aliases: Vec<Ident>,
        lateral: bool,
    },
    Values {
        query: Box<ValuesQuery>,
        alias: Ident,
        column_aliases: Vec<Ident>,
    },
    Function {
        call: Box<crate::ast::FunctionCall>,
        alias: Option<Ident>,
        column_aliases: Vec<Ident>,
        lateral: bool,
    },
    Join(Box<Join>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    LateralInner,
    LateralLeft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub left: FromItem,
    pub right: FromItem,
    pub condition: JoinCondition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    On(Expr),
    Using(Vec<Ident>),
    Natural,
    None,
}
