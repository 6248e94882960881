//! Scope resolution: visible tables/CTEs/columns at any point in a query
//! (spec §4.4).
//!
//! Grounded in `PRQL-prql`'s module/namespace resolution
//! (`semantic/resolver/context_impl.rs`, `semantic/module.rs`): a stack of
//! frames pushed per `FROM`/`WITH` introduction, each holding the sources
//! visible at that level, with lookups walking from the innermost frame
//! outward — generalized here from PRQL's single-pipeline namespace chain
//! to SQL's table/CTE/column frame stack.

use std::collections::HashMap;

use crate::ast::{
    CteDef, Expr, FromItem, FromItemKind, Query, QueryKind, SelectItem, WithBlock,
};
use crate::error::ResolutionError;

/// Caller-supplied capability for expanding a base table's wildcard
/// (spec §4.4, §6): the resolver has no catalog of its own.
pub trait TableColumnResolver {
    fn columns(&self, table: &str) -> Vec<String>;
}

/// A `TableColumnResolver` backed by an in-memory schema map, handy for
/// tests and for callers who already have the relevant catalog loaded.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<String, Vec<String>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, columns: Vec<String>) -> Self {
        self.tables.insert(name.into(), columns);
        self
    }
}

impl TableColumnResolver for StaticSchema {
    fn columns(&self, table: &str) -> Vec<String> {
        self.tables.get(table).cloned().unwrap_or_default()
    }
}

/// The columns a source exposes, either known statically (subquery, CTE,
/// VALUES) or deferred to the [`TableColumnResolver`] (base table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceColumns {
    Known(Vec<String>),
    BaseTable(String),
}

/// One visible source within a [`Frame`]: a table, subquery, CTE
/// reference, or function call, each reachable by alias or bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub alias: Option<String>,
    pub name: Option<String>,
    pub columns: SourceColumns,
}

impl Source {
    fn matches(&self, qualifier: &str) -> bool {
        self.alias.as_deref() == Some(qualifier) || self.name.as_deref() == Some(qualifier)
    }

    fn label(&self) -> String {
        self.alias
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

/// The set of sources (and CTEs) visible at one nesting level (spec
/// §4.4's "frame per `FROM` introduction and per `WITH` block").
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub sources: Vec<Source>,
    pub ctes: Vec<CteDef>,
}

/// The result of resolving a (possibly qualified) column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResolution {
    pub source_label: String,
    pub column: String,
}

/// A depth-first stack of [`Frame`]s, innermost last (spec §4.4's
/// "walk from the outermost query inward").
pub struct Scope<'r> {
    frames: Vec<Frame>,
    resolver: &'r dyn TableColumnResolver,
}

impl<'r> Scope<'r> {
    pub fn new(resolver: &'r dyn TableColumnResolver) -> Self {
        Self {
            frames: Vec::new(),
            resolver,
        }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Builds the frame introduced by a query's own `WITH` block and
    /// `FROM` list (the query's direct children, not nested subqueries —
    /// those get their own frame when the caller recurses into them).
    pub fn frame_for_query(&self, query: &Query) -> Frame {
        match &query.kind {
            QueryKind::Simple(s) => self.frame_for_simple_select(s),
            QueryKind::Binary(_) | QueryKind::Values(_) => Frame::default(),
        }
    }

    /// Same as [`Scope::frame_for_query`], without requiring a
    /// [`Query`] wrapper around an already-owned [`crate::ast::SimpleSelect`].
    pub fn frame_for_simple_select(&self, simple: &crate::ast::SimpleSelect) -> Frame {
        let mut frame = Frame::default();
        if let Some(with) = &simple.with {
            frame.ctes = with.ctes.clone();
        }
        for item in &simple.from {
            collect_sources(item, &mut frame.sources);
        }
        frame
    }

    /// Resolves `table.column` (when `qualifier` is `Some`) or a bare
    /// `column`, walking frames from innermost to outermost.
    pub fn resolve_column(
        &self,
        qualifier: Option<&str>,
        column: &str,
    ) -> Result<ColumnResolution, ResolutionError> {
        for frame in self.frames.iter().rev() {
            if let Some(qualifier) = qualifier {
                if let Some(source) = frame.sources.iter().find(|s| s.matches(qualifier)) {
                    return Ok(ColumnResolution {
                        source_label: source.label(),
                        column: column.to_string(),
                    });
                }
                continue;
            }

            let matches: Vec<&Source> = frame
                .sources
                .iter()
                .filter(|s| self.exposes(s, column))
                .collect();
            match matches.len() {
                0 => continue,
                1 => {
                    return Ok(ColumnResolution {
                        source_label: matches[0].label(),
                        column: column.to_string(),
                    })
                }
                _ => {
                    return Err(ResolutionError::AmbiguousColumn(
                        column.to_string(),
                        matches.iter().map(|s| s.label()).collect(),
                    ))
                }
            }
        }
        Err(ResolutionError::UnknownColumn(column.to_string()))
    }

    fn exposes(&self, source: &Source, column: &str) -> bool {
        self.columns_of(source).iter().any(|c| c == column)
    }

    /// The column list exposed by a source, expanding a base table via
    /// the caller-supplied [`TableColumnResolver`] (spec §4.4's wildcard
    /// expansion rule).
    pub fn columns_of(&self, source: &Source) -> Vec<String> {
        match &source.columns {
            SourceColumns::Known(cols) => cols.clone(),
            SourceColumns::BaseTable(name) => self.resolver.columns(name),
        }
    }
}

fn collect_sources(item: &FromItem, out: &mut Vec<Source>) {
    match &item.kind {
        FromItemKind::Table { name, alias, .. } => {
            out.push(Source {
                alias: alias.as_ref().map(|a| a.text.clone()),
                name: Some(name.name.text.clone()),
                columns: SourceColumns::BaseTable(name.name.text.clone()),
            });
        }
        FromItemKind::Subquery { query, alias, .. } => {
            out.push(Source {
                alias: Some(alias.text.clone()),
                name: None,
                columns: SourceColumns::Known(projection_names(query)),
            });
        }
        FromItemKind::Values { alias, .. } => {
            out.push(Source {
                alias: Some(alias.text.clone()),
                name: None,
                columns: SourceColumns::Known(Vec::new()),
            });
        }
        FromItemKind::Function { alias, call, .. } => {
            out.push(Source {
                alias: alias.as_ref().map(|a| a.text.clone()),
                name: Some(call.name.name.text.clone()),
                columns: SourceColumns::Known(Vec::new()),
            });
        }
        FromItemKind::Join(join) => {
            collect_sources(&join.left, out);
            collect_sources(&join.right, out);
        }
    }
}

/// The statically-known output column names of a query's projection list
/// (spec §4.4's "for subqueries and CTEs the projection list is used
/// directly"). Unnamed/expression columns without an alias contribute no
/// entry, since they cannot be referenced by name from outside.
pub fn projection_names(query: &Query) -> Vec<String> {
    match &query.kind {
        QueryKind::Simple(s) => s
            .select
            .items
            .iter()
            .filter_map(|item| match item {
                SelectItem::Expr {
                    alias: Some(alias), ..
                } => Some(alias.text.clone()),
                SelectItem::Expr {
                    expr,
                    alias: None,
                } => column_expr_name(expr),
                _ => None,
            })
            .collect(),
        QueryKind::Binary(b) => projection_names(&b.left),
        QueryKind::Values(_) => Vec::new(),
    }
}

fn column_expr_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        crate::ast::ExprKind::Column(col) => match &col.column {
            crate::ast::ColumnName::Named(ident) => Some(ident.text.clone()),
            crate::ast::ColumnName::Wildcard => None,
        },
        _ => None,
    }
}

/// Depth-first search for every producing query (CTE branch, `UNION`
/// side, subquery) whose projection yields `column` (spec §4.4's
/// "Upstream search"). Stops descending past a query that already
/// produces the column, per the spec's "stopping at every query whose
/// projection yields the target name" rule.
pub fn find_upstream_producers<'q>(with: Option<&'q WithBlock>, query: &'q Query, column: &str) -> Vec<&'q Query> {
    let mut found = Vec::new();
    search_producers(with, query, column, &mut found);
    found
}

fn search_producers<'q>(
    with: Option<&'q WithBlock>,
    query: &'q Query,
    column: &str,
    found: &mut Vec<&'q Query>,
) {
    if projection_names(query).iter().any(|c| c == column) {
        found.push(query);
        return;
    }
    match &query.kind {
        QueryKind::Simple(s) => {
            let with = s.with.as_ref().or(with);
            for item in &s.from {
                search_from_item(with, item, column, found);
            }
        }
        QueryKind::Binary(b) => {
            search_producers(with, &b.left, column, found);
            search_producers(with, &b.right, column, found);
        }
        QueryKind::Values(_) => {}
    }
    if let Some(with) = with {
        for cte in &with.ctes {
            search_producers(Some(with), &cte.body, column, found);
        }
    }
}

fn search_from_item<'q>(
    with: Option<&'q WithBlock>,
    item: &'q FromItem,
    column: &str,
    found: &mut Vec<&'q Query>,
) {
    match &item.kind {
        FromItemKind::Subquery { query, .. } => search_producers(with, query, column, found),
        FromItemKind::Join(join) => {
            search_from_item(with, &join.left, column, found);
            search_from_item(with, &join.right, column, found);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn resolves_qualified_and_unique_unqualified_columns() {
        let stmt = parser::parse_statement("SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id").unwrap();
        let crate::ast::StatementKind::Query(query) = stmt.kind else {
            panic!("expected query")
        };
        let schema = StaticSchema::new()
            .with_table("users", vec!["id".into(), "name".into()])
            .with_table("orders", vec!["id".into(), "user_id".into()]);
        let scope = Scope::new(&schema);
        let frame = scope.frame_for_query(&query);
        let mut scoped = Scope::new(&schema);
        scoped.push_frame(frame);

        assert_eq!(
            scoped.resolve_column(Some("u"), "id").unwrap().source_label,
            "u"
        );
        assert_eq!(
            scoped.resolve_column(None, "name").unwrap().source_label,
            "u"
        );
        assert!(matches!(
            scoped.resolve_column(None, "id"),
            Err(ResolutionError::AmbiguousColumn(_, _))
        ));
    }

    #[test]
    fn finds_upstream_cte_producer() {
        let stmt = parser::parse_statement("WITH t AS (SELECT id, amount FROM sales) SELECT * FROM t").unwrap();
        let crate::ast::StatementKind::Query(query) = stmt.kind else {
            panic!("expected query")
        };
        let producers = find_upstream_producers(None, &query, "amount");
        assert_eq!(producers.len(), 1);
        assert_eq!(projection_names(producers[0]), vec!["id", "amount"]);
    }
}
