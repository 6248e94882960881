//! `Fold`: the structural-recursion trait every AST→AST transformer in
//! `transform/` is built on (spec §5).
//!
//! Grounded in the fold pattern used throughout the PRQL compiler
//! (`prql_ast::fold::AstFold` / `Fold`): one method per node type, each
//! defaulting to a free `fold_*` function that walks the node's children
//! and rebuilds it. A transformer overrides only the methods for the
//! node kinds it cares about and calls the default free function (or
//! `self.fold_expr(...)`) to keep recursing through the rest — the same
//! "override one match arm, delegate the rest" shape as
//! `prql_ast::fold::fold_expr_kind`, adapted from a fallible
//! `Result<T>`-returning fold to infallible owned rewriting, since this
//! crate's AST→AST transforms (spec's Non-goal list excludes type
//! checking) never fail structurally — only transform-specific
//! preconditions do, and those are surfaced as [`crate::error::TransformError`]
//! by the transform itself, not by the walk.

use crate::ast::*;

/// Implement to rewrite an AST in place. Every method has a default that
/// recurses into the node's children and rebuilds it unchanged; override
/// the methods for the node kinds a given transform actually rewrites.
pub trait Fold: Sized {
    fn fold_statement(&mut self, stmt: Statement) -> Statement {
        fold_statement(self, stmt)
    }
    fn fold_query(&mut self, query: Query) -> Query {
        fold_query(self, query)
    }
    fn fold_simple_select(&mut self, select: SimpleSelect) -> SimpleSelect {
        fold_simple_select(self, select)
    }
    fn fold_with_block(&mut self, with: WithBlock) -> WithBlock {
        fold_with_block(self, with)
    }
    fn fold_from_item(&mut self, item: FromItem) -> FromItem {
        fold_from_item(self, item)
    }
    fn fold_select_item(&mut self, item: SelectItem) -> SelectItem {
        fold_select_item(self, item)
    }
    fn fold_expr(&mut self, expr: Expr) -> Expr {
        fold_expr(self, expr)
    }
    fn fold_exprs(&mut self, exprs: Vec<Expr>) -> Vec<Expr> {
        exprs.into_iter().map(|e| self.fold_expr(e)).collect()
    }
    fn fold_order_by_item(&mut self, item: OrderByItem) -> OrderByItem {
        OrderByItem {
            expr: self.fold_expr(item.expr),
            ..item
        }
    }
    fn fold_insert(&mut self, insert: Insert) -> Insert {
        fold_insert(self, insert)
    }
    fn fold_update(&mut self, update: Update) -> Update {
        fold_update(self, update)
    }
    fn fold_delete(&mut self, delete: Delete) -> Delete {
        fold_delete(self, delete)
    }
    fn fold_merge(&mut self, merge: Merge) -> Merge {
        fold_merge(self, merge)
    }
    fn fold_set_item(&mut self, item: SetItem) -> SetItem {
        SetItem {
            column: item.column,
            value: self.fold_expr(item.value),
        }
    }
}

pub fn fold_statement<F: Fold + ?Sized>(f: &mut F, stmt: Statement) -> Statement {
    let kind = match stmt.kind {
        StatementKind::Query(q) => StatementKind::Query(f.fold_query(q)),
        StatementKind::Insert(ins) => StatementKind::Insert(Box::new(f.fold_insert(*ins))),
        StatementKind::Update(upd) => StatementKind::Update(Box::new(f.fold_update(*upd))),
        StatementKind::Delete(del) => StatementKind::Delete(Box::new(f.fold_delete(*del))),
        StatementKind::Merge(mrg) => StatementKind::Merge(Box::new(f.fold_merge(*mrg))),
    };
    Statement { kind, ..stmt }
}

pub fn fold_query<F: Fold + ?Sized>(f: &mut F, query: Query) -> Query {
    let kind = match query.kind {
        QueryKind::Simple(s) => QueryKind::Simple(Box::new(f.fold_simple_select(*s))),
        QueryKind::Binary(b) => {
            let b = *b;
            QueryKind::Binary(Box::new(BinarySelect {
                left: f.fold_query(b.left),
                op: b.op,
                right: f.fold_query(b.right),
            }))
        }
        QueryKind::Values(v) => {
            let v = *v;
            QueryKind::Values(Box::new(ValuesQuery {
                rows: v.rows.into_iter().map(|row| f.fold_exprs(row)).collect(),
            }))
        }
    };
    Query { kind, ..query }
}

pub fn fold_with_block<F: Fold + ?Sized>(f: &mut F, with: WithBlock) -> WithBlock {
    WithBlock {
        recursive: with.recursive,
        ctes: with
            .ctes
            .into_iter()
            .map(|cte| CteDef {
                body: f.fold_query(cte.body),
                ..cte
            })
            .collect(),
    }
}

pub fn fold_simple_select<F: Fold + ?Sized>(f: &mut F, select: SimpleSelect) -> SimpleSelect {
    SimpleSelect {
        with: select.with.map(|w| f.fold_with_block(w)),
        select: SelectClause {
            distinct: match select.select.distinct {
                Distinct::DistinctOn(exprs) => Distinct::DistinctOn(f.fold_exprs(exprs)),
                other => other,
            },
            items: select
                .select
                .items
                .into_iter()
                .map(|item| f.fold_select_item(item))
                .collect(),
        },
        from: select
            .from
            .into_iter()
            .map(|item| f.fold_from_item(item))
            .collect(),
        r#where: select.r#where.map(|e| f.fold_expr(e)),
        group_by: select.group_by.map(|g| GroupByClause {
            exprs: f.fold_exprs(g.exprs),
            mode: match g.mode {
                GroupByMode::GroupingSets(sets) => {
                    GroupByMode::GroupingSets(sets.into_iter().map(|s| f.fold_exprs(s)).collect())
                }
                other => other,
            },
        }),
        having: select.having.map(|e| f.fold_expr(e)),
        windows: select
            .windows
            .into_iter()
            .map(|(name, def)| (name, fold_window_definition(f, def)))
            .collect(),
        order_by: select
            .order_by
            .into_iter()
            .map(|item| f.fold_order_by_item(item))
            .collect(),
        limit: select.limit.map(|e| f.fold_expr(e)),
        offset: select.offset.map(|e| f.fold_expr(e)),
        fetch: select.fetch.map(|fetch| FetchClause {
            count: f.fold_expr(fetch.count),
            with_ties: fetch.with_ties,
        }),
        for_update: select.for_update,
    }
}

pub fn fold_from_item<F: Fold + ?Sized>(f: &mut F, item: FromItem) -> FromItem {
    let kind = match item.kind {
        FromItemKind::Table { .. } => item.kind,
        FromItemKind::Subquery {
            query,
            alias,
            column_aliases,
            lateral,
        } => FromItemKind::Subquery {
            query: Box::new(f.fold_query(*query)),
            alias,
            column_aliases,
            lateral,
        },
        FromItemKind::Values {
            query,
            alias,
            column_aliases,
        } => {
            let query = *query;
            FromItemKind::Values {
                query: Box::new(ValuesQuery {
                    rows: query.rows.into_iter().map(|row| f.fold_exprs(row)).collect(),
                }),
                alias,
                column_aliases,
            }
        }
        FromItemKind::Function {
            call,
            alias,
            column_aliases,
            lateral,
        } => FromItemKind::Function {
            call: Box::new(fold_function_call(f, *call)),
            alias,
            column_aliases,
            lateral,
        },
        FromItemKind::Join(join) => {
            let join = *join;
            FromItemKind::Join(Box::new(Join {
                kind: join.kind,
                left: f.fold_from_item(join.left),
                right: f.fold_from_item(join.right),
                condition: match join.condition {
                    JoinCondition::On(e) => JoinCondition::On(f.fold_expr(e)),
                    other => other,
                },
            }))
        }
    };
    FromItem { kind, ..item }
}

pub fn fold_select_item<F: Fold + ?Sized>(f: &mut F, item: SelectItem) -> SelectItem {
    match item {
        SelectItem::Expr { expr, alias } => SelectItem::Expr {
            expr: f.fold_expr(expr),
            alias,
        },
        other => other,
    }
}

pub fn fold_expr<F: Fold + ?Sized>(f: &mut F, expr: Expr) -> Expr {
    let kind = match expr.kind {
        ExprKind::Column(_) | ExprKind::Literal(_) | ExprKind::Parameter(_) => expr.kind,
        ExprKind::Function(call) => ExprKind::Function(Box::new(fold_function_call(f, *call))),
        ExprKind::Unary { op, expr } => ExprKind::Unary {
            op,
            expr: Box::new(f.fold_expr(*expr)),
        },
        ExprKind::Binary { op, left, right } => ExprKind::Binary {
            op,
            left: Box::new(f.fold_expr(*left)),
            right: Box::new(f.fold_expr(*right)),
        },
        ExprKind::Between {
            expr,
            negated,
            low,
            high,
        } => ExprKind::Between {
            expr: Box::new(f.fold_expr(*expr)),
            negated,
            low: Box::new(f.fold_expr(*low)),
            high: Box::new(f.fold_expr(*high)),
        },
        ExprKind::InList {
            expr,
            negated,
            list,
        } => ExprKind::InList {
            expr: Box::new(f.fold_expr(*expr)),
            negated,
            list: f.fold_exprs(list),
        },
        ExprKind::InSubquery {
            expr,
            negated,
            subquery,
        } => ExprKind::InSubquery {
            expr: Box::new(f.fold_expr(*expr)),
            negated,
            subquery: Box::new(f.fold_query(*subquery)),
        },
        ExprKind::Like {
            expr,
            negated,
            case_insensitive,
            pattern,
        } => ExprKind::Like {
            expr: Box::new(f.fold_expr(*expr)),
            negated,
            case_insensitive,
            pattern: Box::new(f.fold_expr(*pattern)),
        },
        ExprKind::IsNull { expr, negated } => ExprKind::IsNull {
            expr: Box::new(f.fold_expr(*expr)),
            negated,
        },
        ExprKind::IsDistinctFrom {
            left,
            right,
            negated,
        } => ExprKind::IsDistinctFrom {
            left: Box::new(f.fold_expr(*left)),
            right: Box::new(f.fold_expr(*right)),
            negated,
        },
        ExprKind::Case {
            operand,
            branches,
            else_branch,
        } => ExprKind::Case {
            operand: operand.map(|e| Box::new(f.fold_expr(*e))),
            branches: branches
                .into_iter()
                .map(|(cond, result)| (f.fold_expr(cond), f.fold_expr(result)))
                .collect(),
            else_branch: else_branch.map(|e| Box::new(f.fold_expr(*e))),
        },
        ExprKind::Cast { expr, type_name } => ExprKind::Cast {
            expr: Box::new(f.fold_expr(*expr)),
            type_name,
        },
        ExprKind::Array(items) => ExprKind::Array(f.fold_exprs(items)),
        ExprKind::Row(items) => ExprKind::Row(f.fold_exprs(items)),
        ExprKind::Paren(inner) => ExprKind::Paren(Box::new(f.fold_expr(*inner))),
        ExprKind::Subquery(q) => ExprKind::Subquery(Box::new(f.fold_query(*q))),
        ExprKind::Exists { negated, subquery } => ExprKind::Exists {
            negated,
            subquery: Box::new(f.fold_query(*subquery)),
        },
    };
    Expr { kind, ..expr }
}

fn fold_function_call<F: Fold + ?Sized>(f: &mut F, call: FunctionCall) -> FunctionCall {
    FunctionCall {
        name: call.name,
        args: f.fold_exprs(call.args),
        distinct: call.distinct,
        filter: call.filter.map(|e| Box::new(f.fold_expr(*e))),
        within_group: call.within_group.map(|items| {
            items
                .into_iter()
                .map(|item| f.fold_order_by_item(item))
                .collect()
        }),
        over: call.over.map(|spec| match spec {
            WindowSpec::Named(name) => WindowSpec::Named(name),
            WindowSpec::Inline(def) => WindowSpec::Inline(fold_window_definition(f, def)),
        }),
    }
}

fn fold_window_definition<F: Fold + ?Sized>(f: &mut F, def: WindowDefinition) -> WindowDefinition {
    WindowDefinition {
        base: def.base,
        partition_by: f.fold_exprs(def.partition_by),
        order_by: def
            .order_by
            .into_iter()
            .map(|item| f.fold_order_by_item(item))
            .collect(),
        frame: def.frame.map(|frame| WindowFrame {
            unit: frame.unit,
            start: fold_frame_bound(f, frame.start),
            end: frame.end.map(|b| fold_frame_bound(f, b)),
        }),
    }
}

fn fold_frame_bound<F: Fold + ?Sized>(f: &mut F, bound: FrameBound) -> FrameBound {
    match bound {
        FrameBound::Preceding(e) => FrameBound::Preceding(Box::new(f.fold_expr(*e))),
        FrameBound::Following(e) => FrameBound::Following(Box::new(f.fold_expr(*e))),
        other => other,
    }
}

pub fn fold_insert<F: Fold + ?Sized>(f: &mut F, insert: Insert) -> Insert {
    Insert {
        with: insert.with.map(|w| f.fold_with_block(w)),
        target: insert.target,
        columns: insert.columns,
        source: match insert.source {
            InsertSource::Query(q) => InsertSource::Query(Box::new(f.fold_query(*q))),
            InsertSource::DefaultValues => InsertSource::DefaultValues,
        },
        on_conflict: insert.on_conflict.map(|oc| OnConflict {
            target: oc.target,
            action: match oc.action {
                ConflictAction::DoNothing => ConflictAction::DoNothing,
                ConflictAction::DoUpdate { set, r#where } => ConflictAction::DoUpdate {
                    set: set.into_iter().map(|s| f.fold_set_item(s)).collect(),
                    r#where: r#where.map(|e| f.fold_expr(e)),
                },
            },
        }),
        returning: insert.returning.map(|items| {
            items
                .into_iter()
                .map(|item| f.fold_select_item(item))
                .collect()
        }),
    }
}

pub fn fold_update<F: Fold + ?Sized>(f: &mut F, update: Update) -> Update {
    Update {
        with: update.with.map(|w| f.fold_with_block(w)),
        target: update.target,
        alias: update.alias,
        set: update.set.into_iter().map(|s| f.fold_set_item(s)).collect(),
        from: update
            .from
            .into_iter()
            .map(|item| f.fold_from_item(item))
            .collect(),
        r#where: update.r#where.map(|e| f.fold_expr(e)),
        returning: update.returning.map(|items| {
            items
                .into_iter()
                .map(|item| f.fold_select_item(item))
                .collect()
        }),
    }
}

pub fn fold_delete<F: Fold + ?Sized>(f: &mut F, delete: Delete) -> Delete {
    Delete {
        with: delete.with.map(|w| f.fold_with_block(w)),
        target: delete.target,
        alias: delete.alias,
        using: delete
            .using
            .into_iter()
            .map(|item| f.fold_from_item(item))
            .collect(),
        r#where: delete.r#where.map(|e| f.fold_expr(e)),
        returning: delete.returning.map(|items| {
            items
                .into_iter()
                .map(|item| f.fold_select_item(item))
                .collect()
        }),
    }
}

pub fn fold_merge<F: Fold + ?Sized>(f: &mut F, merge: Merge) -> Merge {
    Merge {
        target: merge.target,
        target_alias: merge.target_alias,
        using: f.fold_from_item(merge.using),
        on: f.fold_expr(merge.on),
        when_clauses: merge
            .when_clauses
            .into_iter()
            .map(|clause| MergeWhenClause {
                matched: clause.matched,
                additional_condition: clause.additional_condition.map(|e| f.fold_expr(e)),
                action: match clause.action {
                    MergeAction::Update(set) => {
                        MergeAction::Update(set.into_iter().map(|s| f.fold_set_item(s)).collect())
                    }
                    MergeAction::Delete => MergeAction::Delete,
                    MergeAction::Insert { columns, values } => MergeAction::Insert {
                        columns,
                        values: f.fold_exprs(values),
                    },
                    MergeAction::DoNothing => MergeAction::DoNothing,
                },
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    struct CountColumns {
        count: usize,
    }

    impl Fold for CountColumns {
        fn fold_expr(&mut self, expr: Expr) -> Expr {
            if matches!(expr.kind, ExprKind::Column(_)) {
                self.count += 1;
            }
            fold_expr(self, expr)
        }
    }

    #[test]
    fn fold_visits_every_column_reference() {
        let stmt = parser::parse_statement("SELECT a, b + c FROM t WHERE d = 1").unwrap();
        let mut counter = CountColumns { count: 0 };
        counter.fold_statement(stmt);
        assert_eq!(counter.count, 4);
    }
}
