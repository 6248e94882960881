//! Pagination injection (spec §4.5's "Pagination injection").

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, Statement, StatementKind};
use crate::error::TransformError;

use super::param_injector::left_most_simple_mut;
use super::Transform;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

pub struct SqlPaginationInjector {
    pagination: Pagination,
    max_page_size: Option<i64>,
}

impl SqlPaginationInjector {
    pub fn new(pagination: Pagination) -> Self {
        Self {
            pagination,
            max_page_size: None,
        }
    }

    pub fn with_max_page_size(mut self, max: i64) -> Self {
        self.max_page_size = Some(max);
        self
    }
}

impl Transform for SqlPaginationInjector {
    fn apply(&self, statement: &Statement) -> Result<Statement, TransformError> {
        let Pagination { page, page_size } = self.pagination;
        if page < 1 {
            return Err(TransformError::InvalidPage(page));
        }
        if page_size < 1 {
            return Err(TransformError::InvalidPageSize(page_size));
        }
        if let Some(max) = self.max_page_size {
            if page_size > max {
                return Err(TransformError::PageSizeTooLarge(page_size, max));
            }
        }

        let mut statement = statement.clone();
        let StatementKind::Query(query) = &mut statement.kind else {
            return Ok(statement);
        };
        let Some(simple) = left_most_simple_mut(query) else {
            return Ok(statement);
        };
        if simple.limit.is_some() || simple.offset.is_some() {
            return Err(TransformError::ConflictingLimitOffset);
        }

        simple.limit = Some(number_literal(page_size));
        if page > 1 {
            simple.offset = Some(Expr::new(ExprKind::Binary {
                op: BinaryOp::Mul,
                left: Box::new(Expr::new(ExprKind::Literal(Literal::Number((page - 1).to_string())))),
                right: Box::new(number_literal(page_size)),
            }));
        }
        Ok(statement)
    }
}

fn number_literal(n: i64) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Number(n.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn first_page_omits_offset() {
        let stmt = parser::parse_statement("SELECT id FROM users").unwrap();
        let injector = SqlPaginationInjector::new(Pagination {
            page: 1,
            page_size: 20,
        });
        let result = injector.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        assert!(sql.contains("limit 20"), "{sql}");
        assert!(!sql.contains("offset"), "{sql}");
    }

    #[test]
    fn later_page_emits_offset() {
        let stmt = parser::parse_statement("SELECT id FROM users").unwrap();
        let injector = SqlPaginationInjector::new(Pagination {
            page: 3,
            page_size: 20,
        });
        let result = injector.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        assert!(sql.contains("limit 20"), "{sql}");
        assert!(sql.contains("offset 2 * 20"), "{sql}");
    }

    #[test]
    fn existing_limit_is_rejected() {
        let stmt = parser::parse_statement("SELECT id FROM users LIMIT 10").unwrap();
        let injector = SqlPaginationInjector::new(Pagination {
            page: 1,
            page_size: 20,
        });
        assert!(matches!(
            injector.apply(&stmt),
            Err(TransformError::ConflictingLimitOffset)
        ));
    }

    #[test]
    fn page_size_over_max_is_rejected() {
        let stmt = parser::parse_statement("SELECT id FROM users").unwrap();
        let injector = SqlPaginationInjector::new(Pagination {
            page: 1,
            page_size: 500,
        })
        .with_max_page_size(100);
        assert!(matches!(
            injector.apply(&stmt),
            Err(TransformError::PageSizeTooLarge(500, 100))
        ));
    }
}
