//! Pure AST→AST rewrite passes (spec §4.5).
//!
//! Grounded in the teacher's `rules::RuleDefinition` trait
//! (`rules/mod.rs`): every transformer here implements the same narrow
//! `find`-then-`apply` shape under one name, `Transform::apply`. Unlike
//! the teacher's `lazy_static!` `ANALYZER_RULES` registry (spec §9's
//! "global singletons" redesign flag), transformer instances are
//! constructed directly by the caller; there is no global table to
//! register into.

mod cte;
mod crud_rewrite;
mod dynamic_query_builder;
mod json_query;
mod param_injector;
mod pagination_injector;
mod sort_injector;

pub use cte::{
    trace_column, ColumnTrace, CteCollector, CteDependencyGraph, CteNormalizer,
    CteQueryDecomposer, GraphNode,
};
pub use crud_rewrite::{
    ColumnDef, CrudToSelect, Fixture, FixtureRegistry, MissingFixtureStrategy, SchemaManager,
    SchemaValidator, TableSchema,
};
pub use dynamic_query_builder::DynamicQueryBuilder;
pub use json_query::{EntityMapping, JsonResultFormat, PostgresJsonQueryBuilder, RelationshipKind};
pub use param_injector::{
    Condition, ConditionValue, InjectionMode, LogicalOp, Operator, ParamSpec, SqlParamInjector,
};
pub use pagination_injector::{Pagination, SqlPaginationInjector};
pub use sort_injector::{SortInjection, SortSpec, SqlSortInjector};

use crate::ast::Statement;
use crate::error::TransformError;

/// A pure AST-to-AST rewrite: `apply` never mutates its input, and
/// idempotent transformers (spec §8: "for all transformers T documented
/// idempotent, T(T(ast)) = T(ast)") must uphold that property themselves.
pub trait Transform {
    fn apply(&self, statement: &Statement) -> Result<Statement, TransformError>;
}
