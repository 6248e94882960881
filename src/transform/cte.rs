//! CTE collection, normalization, and dependency analysis (spec §4.5's
//! three CTE transformers).

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::ast::{
    FromItem, FromItemKind, Ident, Query, QueryKind, SimpleSelect, Statement, StatementKind,
    WithBlock,
};
use crate::error::{ResolutionError, TransformError};

use super::Transform;

/// Harvests every CTE definition reachable from a statement, walking
/// `WITH` blocks, subqueries, and `UNION` branches (spec §4.5's "CTE
/// collector"). Identical bodies under the same name are deduplicated;
/// differing bodies under the same name are a [`ResolutionError::ConflictingCte`].
#[derive(Debug, Default)]
pub struct CteCollector {
    recursive: bool,
}

impl CteCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, statement: &Statement) -> Result<IndexMap<String, Query>, TransformError> {
        let mut out: IndexMap<String, Query> = IndexMap::new();
        if let StatementKind::Query(query) = &statement.kind {
            self.collect_query(query, &mut out)?;
        }
        Ok(out)
    }

    fn collect_query(
        &mut self,
        query: &Query,
        out: &mut IndexMap<String, Query>,
    ) -> Result<(), TransformError> {
        match &query.kind {
            QueryKind::Simple(simple) => self.collect_simple(simple, out),
            QueryKind::Binary(b) => {
                self.collect_query(&b.left, out)?;
                self.collect_query(&b.right, out)
            }
            QueryKind::Values(_) => Ok(()),
        }
    }

    fn collect_simple(
        &mut self,
        simple: &SimpleSelect,
        out: &mut IndexMap<String, Query>,
    ) -> Result<(), TransformError> {
        if let Some(with) = &simple.with {
            self.recursive |= with.recursive;
            for cte in &with.ctes {
                insert_dedup(out, &cte.name.text, cte.body.clone())?;
                self.collect_query(&cte.body, out)?;
            }
        }
        for item in &simple.from {
            self.collect_from_item(item, out)?;
        }
        Ok(())
    }

    fn collect_from_item(
        &mut self,
        item: &FromItem,
        out: &mut IndexMap<String, Query>,
    ) -> Result<(), TransformError> {
        match &item.kind {
            FromItemKind::Subquery { query, .. } => self.collect_query(query, out),
            FromItemKind::Join(join) => {
                self.collect_from_item(&join.left, out)?;
                self.collect_from_item(&join.right, out)
            }
            _ => Ok(()),
        }
    }

    pub fn saw_recursive(&self) -> bool {
        self.recursive
    }
}

fn insert_dedup(
    out: &mut IndexMap<String, Query>,
    name: &str,
    body: Query,
) -> Result<(), TransformError> {
    match out.get(name) {
        Some(existing) if *existing == body => Ok(()),
        Some(_) => Err(TransformError::Resolution(ResolutionError::ConflictingCte(
            name.to_string(),
        ))),
        None => {
            out.insert(name.to_string(), body);
            Ok(())
        }
    }
}

/// Hoists every CTE reachable from a statement into a single top-level
/// `WITH` block, ordered so each CTE appears after everything it
/// references (spec §4.5's "CTE normalizer").
#[derive(Debug, Default)]
pub struct CteNormalizer;

impl CteNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for CteNormalizer {
    fn apply(&self, statement: &Statement) -> Result<Statement, TransformError> {
        let mut collector = CteCollector::new();
        let collected = collector.collect(statement)?;
        if collected.is_empty() {
            return Ok(statement.clone());
        }

        let ordered = topo_sort(&collected)?;

        let mut statement = statement.clone();
        let StatementKind::Query(query) = &mut statement.kind else {
            return Ok(statement);
        };
        strip_nested_with(query);

        let ctes = ordered
            .into_iter()
            .map(|name| crate::ast::CteDef {
                name: Ident::new(name.clone()),
                column_aliases: Vec::new(),
                materialized: None,
                body: collected[&name].clone(),
            })
            .collect();

        // A top-level WITH has no node of its own on a set-operation tree,
        // so it attaches to the left-most SimpleSelect leaf, mirroring the
        // parser's own placement rule.
        if let Some(simple) = super::param_injector::left_most_simple_mut(query) {
            simple.with = Some(WithBlock {
                recursive: collector.saw_recursive(),
                ctes,
            });
        }
        Ok(statement)
    }
}

fn strip_nested_with(query: &mut Query) {
    match &mut query.kind {
        QueryKind::Simple(simple) => {
            simple.with = None;
            for item in &mut simple.from {
                strip_nested_with_from_item(item);
            }
        }
        QueryKind::Binary(b) => {
            strip_nested_with(&mut b.left);
            strip_nested_with(&mut b.right);
        }
        QueryKind::Values(_) => {}
    }
}

fn strip_nested_with_from_item(item: &mut FromItem) {
    match &mut item.kind {
        FromItemKind::Subquery { query, .. } => strip_nested_with(query),
        FromItemKind::Join(join) => {
            strip_nested_with_from_item(&mut join.left);
            strip_nested_with_from_item(&mut join.right);
        }
        _ => {}
    }
}

fn topo_sort(ctes: &IndexMap<String, Query>) -> Result<Vec<String>, TransformError> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut order = Vec::new();
    for name in ctes.keys() {
        visit(name, ctes, &mut visited, &mut order);
    }
    Ok(order)
}

fn visit(
    name: &str,
    ctes: &IndexMap<String, Query>,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) {
    if visited.contains(name) {
        return;
    }
    visited.insert(name.to_string());
    if let Some(body) = ctes.get(name) {
        for dep in references(body, ctes) {
            visit(&dep, ctes, visited, order);
        }
    }
    order.push(name.to_string());
}

/// Names, among `ctes`, referenced as a `FROM` source of `query`.
fn references(query: &Query, ctes: &IndexMap<String, Query>) -> Vec<String> {
    let mut out = Vec::new();
    collect_table_names(query, &mut out);
    out.into_iter().filter(|n| ctes.contains_key(n)).collect()
}

fn collect_table_names(query: &Query, out: &mut Vec<String>) {
    match &query.kind {
        QueryKind::Simple(simple) => {
            for item in &simple.from {
                collect_table_names_from_item(item, out);
            }
        }
        QueryKind::Binary(b) => {
            collect_table_names(&b.left, out);
            collect_table_names(&b.right, out);
        }
        QueryKind::Values(_) => {}
    }
}

fn collect_table_names_from_item(item: &FromItem, out: &mut Vec<String>) {
    match &item.kind {
        FromItemKind::Table { name, .. } => out.push(name.name.text.clone()),
        FromItemKind::Subquery { query, .. } => collect_table_names(query, out),
        FromItemKind::Join(join) => {
            collect_table_names_from_item(&join.left, out);
            collect_table_names_from_item(&join.right, out);
        }
        _ => {}
    }
}

/// A node in the CTE reference graph: either `Main` (the root statement)
/// or a named CTE.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Main,
    Cte(String),
}

/// The dependency graph over a statement's CTEs plus its main query
/// (spec §4.5's "CTE dependency analyzer & decomposer").
#[derive(Debug, Default)]
pub struct CteDependencyGraph {
    ctes: IndexMap<String, Query>,
    edges: HashMap<GraphNode, Vec<GraphNode>>,
}

impl CteDependencyGraph {
    pub fn build(statement: &Statement) -> Result<Self, TransformError> {
        let mut collector = CteCollector::new();
        let ctes = collector.collect(statement)?;
        let mut edges: HashMap<GraphNode, Vec<GraphNode>> = HashMap::new();

        for (name, body) in ctes.iter() {
            let deps = references(body, &ctes)
                .into_iter()
                .map(GraphNode::Cte)
                .collect();
            edges.insert(GraphNode::Cte(name.clone()), deps);
        }
        if let StatementKind::Query(main) = &statement.kind {
            let mut out = Vec::new();
            collect_table_names(main, &mut out);
            let deps = out
                .into_iter()
                .filter(|n| ctes.contains_key(n))
                .map(GraphNode::Cte)
                .collect();
            edges.insert(GraphNode::Main, deps);
        }

        Ok(Self { ctes, edges })
    }

    /// `true` if `name` participates in a cycle (a self-loop, or a loop
    /// through other CTEs) — spec's "detects recursion" rule, covering
    /// both the `RECURSIVE` keyword case and accidental cycles.
    pub fn is_recursive(&self, name: &str) -> bool {
        let start = GraphNode::Cte(name.to_string());
        let mut stack = vec![start.clone()];
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if let Some(deps) = self.edges.get(&node) {
                for dep in deps {
                    if *dep == start {
                        return true;
                    }
                    if seen.insert(dep.clone()) {
                        stack.push(dep.clone());
                    }
                }
            }
        }
        false
    }

    /// Longest-path level from any root (a node with no dependents),
    /// `0` for roots themselves.
    pub fn levels(&self) -> HashMap<GraphNode, u32> {
        let mut levels = HashMap::new();
        let nodes: Vec<GraphNode> = self
            .ctes
            .keys()
            .map(|n| GraphNode::Cte(n.clone()))
            .chain(std::iter::once(GraphNode::Main))
            .collect();
        for node in &nodes {
            self.level_of(node, &mut levels, &mut HashSet::new());
        }
        levels
    }

    fn level_of(
        &self,
        node: &GraphNode,
        levels: &mut HashMap<GraphNode, u32>,
        in_progress: &mut HashSet<GraphNode>,
    ) -> u32 {
        if let Some(level) = levels.get(node) {
            return *level;
        }
        if !in_progress.insert(node.clone()) {
            return 0;
        }
        let deps = self.edges.get(node).cloned().unwrap_or_default();
        let level = deps
            .iter()
            .map(|dep| self.level_of(dep, levels, in_progress) + 1)
            .max()
            .unwrap_or(0);
        levels.insert(node.clone(), level);
        level
    }

    /// An executable standalone form of CTE `name`: a fresh `WITH` block
    /// inlining every transitive dependency, selecting the CTE's body.
    pub fn decompose(&self, name: &str) -> Option<Query> {
        let body = self.ctes.get(name)?.clone();
        let mut needed = HashSet::new();
        self.transitive_deps(name, &mut needed);

        if needed.is_empty() {
            return Some(body);
        }

        let ordered = {
            let subset: IndexMap<String, Query> = needed
                .iter()
                .map(|n| (n.clone(), self.ctes[n].clone()))
                .collect();
            topo_sort(&subset).unwrap_or_default()
        };

        let ctes = ordered
            .into_iter()
            .map(|n| crate::ast::CteDef {
                name: Ident::new(n.clone()),
                column_aliases: Vec::new(),
                materialized: None,
                body: self.ctes[&n].clone(),
            })
            .collect();

        let mut wrapped = body;
        if let QueryKind::Simple(simple) = &mut wrapped.kind {
            simple.with = Some(WithBlock {
                recursive: false,
                ctes,
            });
        }
        Some(wrapped)
    }

    fn transitive_deps(&self, name: &str, out: &mut HashSet<String>) {
        if let Some(deps) = self.edges.get(&GraphNode::Cte(name.to_string())) {
            for dep in deps {
                if let GraphNode::Cte(dep_name) = dep {
                    if out.insert(dep_name.clone()) {
                        self.transitive_deps(dep_name, out);
                    }
                }
            }
        }
    }
}

/// Builds a [`CteDependencyGraph`] from a statement and produces the
/// executable, standalone form of any one of its CTEs (spec §4.5's "for
/// each CTE, produces an executable form").
pub struct CteQueryDecomposer {
    graph: CteDependencyGraph,
}

impl CteQueryDecomposer {
    pub fn new(statement: &Statement) -> Result<Self, TransformError> {
        Ok(Self {
            graph: CteDependencyGraph::build(statement)?,
        })
    }

    pub fn decompose(&self, cte_name: &str) -> Option<Query> {
        self.graph.decompose(cte_name)
    }

    pub fn is_recursive(&self, cte_name: &str) -> bool {
        self.graph.is_recursive(cte_name)
    }

    pub fn graph(&self) -> &CteDependencyGraph {
        &self.graph
    }
}

/// Result of tracing a column name from the main query through its CTE
/// dependencies (spec §4.5's "Column trace").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTrace {
    pub found_in: Vec<String>,
    pub not_found_in: Vec<String>,
    pub search_path: Vec<String>,
}

/// Traces `column` from the main query through its CTE dependency chain,
/// recording which CTEs along the path expose it by name.
pub fn trace_column(statement: &Statement, column: &str) -> Result<ColumnTrace, TransformError> {
    let graph = CteDependencyGraph::build(statement)?;
    let mut trace = ColumnTrace::default();
    let mut visited = HashSet::new();
    let mut queue = graph
        .edges
        .get(&GraphNode::Main)
        .cloned()
        .unwrap_or_default();

    while let Some(node) = queue.pop() {
        let GraphNode::Cte(name) = &node else { continue };
        if !visited.insert(name.clone()) {
            continue;
        }
        trace.search_path.push(name.clone());
        if let Some(body) = graph.ctes.get(name) {
            if crate::scope::projection_names(body).iter().any(|c| c == column) {
                trace.found_in.push(name.clone());
            } else {
                trace.not_found_in.push(name.clone());
            }
        }
        if let Some(deps) = graph.edges.get(&node) {
            queue.extend(deps.iter().cloned());
        }
    }
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn collector_dedups_identical_bodies() {
        let stmt = parser::parse_statement(
            "WITH a AS (SELECT 1 AS x), b AS (SELECT * FROM (WITH a AS (SELECT 1 AS x) SELECT * FROM a) s) SELECT * FROM a, b",
        )
        .unwrap();
        let mut collector = CteCollector::new();
        let collected = collector.collect(&stmt).unwrap();
        assert!(collected.contains_key("a"));
        assert!(collected.contains_key("b"));
    }

    #[test]
    fn normalizer_orders_dependencies_before_dependents() {
        let stmt = parser::parse_statement(
            "WITH b AS (SELECT * FROM a), a AS (SELECT 1 AS x) SELECT * FROM b",
        )
        .unwrap();
        let normalizer = CteNormalizer::new();
        let result = normalizer.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        let a_idx = sql.find("a as").unwrap();
        let b_idx = sql.find("b as").unwrap();
        assert!(a_idx < b_idx, "{sql}");
    }

    #[test]
    fn dependency_graph_detects_cycle() {
        let stmt =
            parser::parse_statement("WITH RECURSIVE t AS (SELECT * FROM t) SELECT * FROM t")
                .unwrap();
        let graph = CteDependencyGraph::build(&stmt).unwrap();
        assert!(graph.is_recursive("t"));
    }

    #[test]
    fn column_trace_finds_producing_cte() {
        let stmt = parser::parse_statement(
            "WITH a AS (SELECT id, amount FROM sales), b AS (SELECT * FROM a) SELECT * FROM b",
        )
        .unwrap();
        let trace = trace_column(&stmt, "amount").unwrap();
        assert!(trace.found_in.contains(&"a".to_string()));
    }
}
