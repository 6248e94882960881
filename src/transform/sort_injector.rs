//! Sort injection (spec §4.5's "Sort injection").

use indexmap::IndexMap;

use crate::ast::{
    ColumnName, Expr, ExprKind, NullsOrder, OrderByItem, SelectItem, SimpleSelect, SortDirection,
    Statement, StatementKind,
};
use crate::error::TransformError;
use crate::scope::{Scope, TableColumnResolver};

use super::param_injector::left_most_simple_mut;
use super::Transform;

/// One requested sort key: direction plus where nulls should sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

/// A `{ column → SortSpec }` map, ordered so generated `ORDER BY` items
/// follow caller-specified precedence.
pub type SortInjection = IndexMap<String, SortSpec>;

pub struct SqlSortInjector<'r> {
    resolver: &'r dyn TableColumnResolver,
    sorts: SortInjection,
}

impl<'r> SqlSortInjector<'r> {
    pub fn new(resolver: &'r dyn TableColumnResolver, sorts: SortInjection) -> Self {
        Self { resolver, sorts }
    }
}

impl<'r> Transform for SqlSortInjector<'r> {
    fn apply(&self, statement: &Statement) -> Result<Statement, TransformError> {
        let mut statement = statement.clone();
        let StatementKind::Query(query) = &mut statement.kind else {
            return Ok(statement);
        };
        let Some(simple) = left_most_simple_mut(query) else {
            return Ok(statement);
        };

        for (column, spec) in self.sorts.iter() {
            let expr = sort_target_expr(self.resolver, simple, column)?;
            simple.order_by.push(OrderByItem {
                expr,
                direction: spec.direction,
                nulls: spec.nulls,
            });
        }
        Ok(statement)
    }
}

/// Resolves a sort target: the projection list is checked first (so a
/// calculated column referenced by alias is re-emitted as that alias),
/// falling back to the scope resolver for a plain table column.
fn sort_target_expr(
    resolver: &dyn TableColumnResolver,
    simple: &SimpleSelect,
    column: &str,
) -> Result<Expr, TransformError> {
    for item in &simple.select.items {
        if let SelectItem::Expr {
            expr,
            alias: Some(alias),
        } = item
        {
            if alias.text == column {
                return Ok(Expr::column(alias.text.clone()));
            }
            let _ = expr;
        }
    }
    for item in &simple.select.items {
        if let SelectItem::Expr { expr, alias: None } = item {
            if let ExprKind::Column(col) = &expr.kind {
                if let ColumnName::Named(ident) = &col.column {
                    if ident.text == column {
                        return Ok(expr.clone());
                    }
                }
            }
        }
    }

    let (qualifier, bare) = match column.split_once('.') {
        Some((t, c)) => (Some(t), c),
        None => (None, column),
    };
    let mut scope = Scope::new(resolver);
    let frame = scope.frame_for_simple_select(simple);
    scope.push_frame(frame);
    let resolution = scope
        .resolve_column(qualifier, bare)
        .map_err(TransformError::Resolution)?;
    Ok(Expr::qualified_column(resolution.source_label, resolution.column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::scope::StaticSchema;

    #[test]
    fn appends_after_existing_order_by() {
        let stmt = parser::parse_statement("SELECT u.id FROM users u ORDER BY u.id").unwrap();
        let schema = StaticSchema::new().with_table("users", vec!["id".into(), "name".into()]);
        let mut sorts = SortInjection::new();
        sorts.insert(
            "name".to_string(),
            SortSpec {
                direction: Some(SortDirection::Desc),
                nulls: Some(NullsOrder::Last),
            },
        );
        let injector = SqlSortInjector::new(&schema, sorts);
        let result = injector.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        let first = sql.find("u.id").unwrap();
        let second = sql.find("u.name").unwrap();
        assert!(first < second, "{sql}");
        assert!(sql.contains("desc"), "{sql}");
        assert!(sql.contains("nulls last"), "{sql}");
    }

    #[test]
    fn aliased_expression_sorts_by_alias() {
        let stmt =
            parser::parse_statement("SELECT quantity * pack_size AS amount FROM sales").unwrap();
        let schema = StaticSchema::new();
        let mut sorts = SortInjection::new();
        sorts.insert(
            "amount".to_string(),
            SortSpec {
                direction: Some(SortDirection::Asc),
                nulls: None,
            },
        );
        let injector = SqlSortInjector::new(&schema, sorts);
        let result = injector.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        assert!(sql.contains("order by amount"), "{sql}");
    }
}
