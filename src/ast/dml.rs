//! INSERT / UPDATE / DELETE / MERGE statements (spec §3.2's "Statements"
//! bullet, minus the SELECT-family handled by `query.rs`).

use super::{ast_node, Expr, FromItem, Ident, ObjectName, Query, WithBlock};

ast_node!(Statement(StatementKind));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Query(Query),
    Insert(Box<Insert>),
    Update(Box<Update>),
    Delete(Box<Delete>),
    Merge(Box<Merge>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub with: Option<WithBlock>,
    pub target: ObjectName,
    pub columns: Option<Vec<Ident>>,
    pub source: InsertSource,
    pub on_conflict: Option<OnConflict>,
    pub returning: Option<Vec<crate::ast::SelectItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertSource {
    Query(Box<Query>),
    DefaultValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnConflict {
    pub target: Option<ConflictTarget>,
    pub action: ConflictAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictTarget {
    Columns(Vec<Ident>),
    Constraint(Ident),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    DoNothing,
    DoUpdate {
        set: Vec<SetItem>,
        r#where: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetItem {
    pub column: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub with: Option<WithBlock>,
    pub target: ObjectName,
    pub alias: Option<Ident>,
    pub set: Vec<SetItem>,
    pub from: Vec<FromItem>,
    pub r#where: Option<Expr>,
    pub returning: Option<Vec<crate::ast::SelectItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub with: Option<WithBlock>,
    pub target: ObjectName,
    pub alias: Option<Ident>,
    pub using: Vec<FromItem>,
    pub r#where: Option<Expr>,
    pub returning: Option<Vec<crate::ast::SelectItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    pub target: ObjectName,
    pub target_alias: Option<Ident>,
    pub using: FromItem,
    pub on: Expr,
    pub when_clauses: Vec<MergeWhenClause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWhenClause {
    pub matched: bool,
    pub additional_condition: Option<Expr>,
    pub action: MergeAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    Update(Vec<SetItem>),
    Delete,
    Insert {
        columns: Option<Vec<Ident>>,
        values: Vec<Expr>,
    },
    DoNothing,
}
