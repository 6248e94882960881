//! SQL lexer, recursive-descent parser, and AST transformation/printing
//! library, covering PostgreSQL's dialect (spec §1, §2).
//!
//! The layering follows the teacher's own `lexer` → `parser` → `ast` →
//! `analyze`/`rules` pipeline: text is tokenized by [`lexer`], parsed into
//! a typed [`ast`] by [`parser`], optionally resolved against a schema by
//! [`scope`], rewritten by pure AST-to-AST passes in [`transform`], and
//! rendered back to text by [`printer`]. [`visitor`] provides the
//! `Fold` trait every transform in [`transform`] implements.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod scope;
pub mod span;
pub mod transform;
pub mod visitor;

pub use error::{LexError, ParseError, PrintError, ResolutionError, TransformError};
pub use parser::{
    parse_select, parse_select_with_options, parse_statement, parse_statement_with_options,
    parse_to_position, ParserOptions, PartialParseResult,
};
pub use printer::{format, format_with_options, FormatOptions, Params, Preset};
pub use scope::{Scope, StaticSchema, TableColumnResolver};
pub use transform::{
    trace_column, ColumnDef, ColumnTrace, Condition, ConditionValue, CrudToSelect, CteCollector,
    CteDependencyGraph, CteNormalizer, CteQueryDecomposer, DynamicQueryBuilder, EntityMapping,
    Fixture, FixtureRegistry, GraphNode, InjectionMode, JsonResultFormat, LogicalOp,
    MissingFixtureStrategy, Operator, Pagination, ParamSpec, PostgresJsonQueryBuilder,
    RelationshipKind, SchemaManager, SchemaValidator, SortInjection, SortSpec,
    SqlPaginationInjector, SqlParamInjector, SqlSortInjector, TableSchema, Transform,
};
