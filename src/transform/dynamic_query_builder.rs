//! Dynamic query builder (spec §6's external-interface listing).
//!
//! Grounded in this crate's own `SqlParamInjector`/`SqlSortInjector`/
//! `SqlPaginationInjector` (spec §4.5): a caller assembling a query from
//! a request (filter map, sort map, page) otherwise has to thread three
//! injectors by hand in the right order. This type is a thin facade
//! over exactly those three, run filter → sort → pagination, so the
//! composition spec §6 names as a single constructor actually exists as
//! one.

use crate::ast::Statement;
use crate::error::TransformError;
use crate::scope::TableColumnResolver;

use super::pagination_injector::Pagination;
use super::param_injector::{InjectionMode, ParamSpec};
use super::sort_injector::SortInjection;
use super::{SqlPaginationInjector, SqlParamInjector, SqlSortInjector, Transform};

/// Builds up a filter/sort/pagination request, then applies all three
/// stages in one call. Any stage left unset is skipped entirely.
pub struct DynamicQueryBuilder<'r> {
    resolver: &'r dyn TableColumnResolver,
    filter: Option<(ParamSpec, InjectionMode)>,
    sort: Option<SortInjection>,
    pagination: Option<Pagination>,
    max_page_size: Option<i64>,
}

impl<'r> DynamicQueryBuilder<'r> {
    pub fn new(resolver: &'r dyn TableColumnResolver) -> Self {
        Self {
            resolver,
            filter: None,
            sort: None,
            pagination: None,
            max_page_size: None,
        }
    }

    pub fn with_filter(mut self, spec: ParamSpec, mode: InjectionMode) -> Self {
        self.filter = Some((spec, mode));
        self
    }

    pub fn with_sort(mut self, sorts: SortInjection) -> Self {
        self.sort = Some(sorts);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_max_page_size(mut self, max: i64) -> Self {
        self.max_page_size = Some(max);
        self
    }
}

impl<'r> Transform for DynamicQueryBuilder<'r> {
    fn apply(&self, statement: &Statement) -> Result<Statement, TransformError> {
        let mut current = statement.clone();

        if let Some((spec, mode)) = &self.filter {
            let injector = SqlParamInjector::new(self.resolver, spec.clone(), *mode);
            current = injector.apply(&current)?;
        }

        if let Some(sorts) = &self.sort {
            let injector = SqlSortInjector::new(self.resolver, sorts.clone());
            current = injector.apply(&current)?;
        }

        if let Some(pagination) = self.pagination {
            let mut injector = SqlPaginationInjector::new(pagination);
            if let Some(max) = self.max_page_size {
                injector = injector.with_max_page_size(max);
            }
            current = injector.apply(&current)?;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::ast::Literal;
    use crate::parser::parse_statement;
    use crate::scope::StaticSchema;
    use crate::transform::Condition;

    #[test]
    fn composes_filter_sort_and_pagination_in_order() {
        let schema = StaticSchema::new().with_table(
            "users",
            vec!["id".to_string(), "name".to_string(), "active".to_string()],
        );
        let stmt = parse_statement("SELECT id, name FROM users").unwrap();

        let mut filter = IndexMap::new();
        filter.insert(
            "active".to_string(),
            Condition::Scalar(Literal::Boolean(true)),
        );
        let mut sort = IndexMap::new();
        sort.insert("name".to_string(), Default::default());

        let builder = DynamicQueryBuilder::new(&schema)
            .with_filter(filter, InjectionMode::Normal)
            .with_sort(sort)
            .with_pagination(Pagination {
                page: 2,
                page_size: 20,
            });

        let rewritten = builder.apply(&stmt).unwrap();
        let crate::ast::StatementKind::Query(query) = &rewritten.kind else {
            panic!("expected query");
        };
        let crate::ast::QueryKind::Simple(simple) = &query.kind else {
            panic!("expected simple select");
        };
        assert!(simple.r#where.is_some());
        assert!(!simple.order_by.is_empty());
        assert!(simple.limit.is_some());
        assert!(simple.offset.is_some());
    }

    #[test]
    fn skips_stages_left_unset() {
        let schema = StaticSchema::new().with_table("users", vec!["id".to_string()]);
        let stmt = parse_statement("SELECT id FROM users").unwrap();
        let builder = DynamicQueryBuilder::new(&schema);
        let rewritten = builder.apply(&stmt).unwrap();

        let crate::ast::StatementKind::Query(query) = &rewritten.kind else {
            panic!("expected query");
        };
        let crate::ast::QueryKind::Simple(simple) = &query.kind else {
            panic!("expected simple select");
        };
        assert!(simple.r#where.is_none());
        assert!(simple.limit.is_none());
    }
}
