//! Parameter / predicate injection (spec §4.5's "Parameter / predicate
//! injection").
//!
//! Grounded in the teacher's rule-application shape (`rules/mod.rs`):
//! one struct per transformer, configured at construction and applied
//! through a single method. Column targeting reuses [`crate::scope`]'s
//! frame resolution instead of inventing a second lookup path.

use indexmap::IndexMap;

use crate::ast::{
    BinaryOp, ColumnName, Expr, ExprKind, FromItem, FromItemKind, Literal, ParamRef, Query,
    QueryKind, SelectItem, SimpleSelect, Statement, StatementKind,
};
use crate::error::{ResolutionError, TransformError};
use crate::scope::{self, Scope, TableColumnResolver};

use super::Transform;

/// A `{ column → condition-spec }` map (spec §4.5), ordered so that
/// generated predicates and parameter names stay in a stable,
/// document-reproducible order.
pub type ParamSpec = IndexMap<String, Condition>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    ILike,
    In,
    Any,
}

impl Operator {
    fn suffix(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::NotEq => "neq",
            Operator::Lt => "lt",
            Operator::LtEq => "lte",
            Operator::Gt => "gt",
            Operator::GtEq => "gte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::In => "in",
            Operator::Any => "any",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    fn suffix(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }

    fn as_binary(self) -> BinaryOp {
        match self {
            LogicalOp::And => BinaryOp::And,
            LogicalOp::Or => BinaryOp::Or,
        }
    }
}

/// A condition-spec value (spec §9's "dynamic any-shaped condition
/// objects" redesign flag: represented as a tagged variant, not a
/// stringly-typed map).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// A bare value, meaning equality.
    Scalar(Literal),
    /// An explicit comparison/pattern/membership operator.
    Operator(Operator, ConditionValue),
    /// A `{ min, max }` range, both bounds optional.
    Range {
        min: Option<Literal>,
        max: Option<Literal>,
    },
    /// `{ or: [...] } ` / `{ and: [...] }`; each child names its own
    /// column, since the group key is a synthetic label, not a column.
    Logical(LogicalOp, Vec<(String, Condition)>),
    /// A correlated `EXISTS` / `NOT EXISTS` subquery, independent of any
    /// column on the outer query.
    Exists {
        subquery: Box<Query>,
        negated: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Literal(Literal),
    List(Vec<Literal>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionMode {
    /// Append to the WHERE clause of the query that exposes the column.
    Normal,
    /// Push into every producing query found by the upstream search
    /// (spec §4.4's "Upstream search"), rewritten against the
    /// producer's own defining expression.
    Upstream,
}

pub struct SqlParamInjector<'r> {
    resolver: &'r dyn TableColumnResolver,
    spec: ParamSpec,
    mode: InjectionMode,
    ignore_non_existent_columns: bool,
    allow_all_undefined: bool,
}

impl<'r> SqlParamInjector<'r> {
    pub fn new(resolver: &'r dyn TableColumnResolver, spec: ParamSpec, mode: InjectionMode) -> Self {
        Self {
            resolver,
            spec,
            mode,
            ignore_non_existent_columns: false,
            allow_all_undefined: false,
        }
    }

    pub fn ignore_non_existent_columns(mut self, value: bool) -> Self {
        self.ignore_non_existent_columns = value;
        self
    }

    pub fn allow_all_undefined(mut self, value: bool) -> Self {
        self.allow_all_undefined = value;
        self
    }
}

impl<'r> Transform for SqlParamInjector<'r> {
    fn apply(&self, statement: &Statement) -> Result<Statement, TransformError> {
        if self.spec.is_empty() && !self.allow_all_undefined {
            return Err(TransformError::AllParametersUndefined);
        }

        let mut statement = statement.clone();
        let StatementKind::Query(query) = &mut statement.kind else {
            return Ok(statement);
        };

        for (key, condition) in self.spec.iter() {
            match self.mode {
                InjectionMode::Normal => self.inject_normal(query, key, key, condition)?,
                InjectionMode::Upstream => self.inject_upstream(query, key, key, condition)?,
            }
        }
        Ok(statement)
    }
}

impl<'r> SqlParamInjector<'r> {
    fn inject_normal(
        &self,
        query: &mut Query,
        param_key: &str,
        column: &str,
        condition: &Condition,
    ) -> Result<(), TransformError> {
        let Some(simple) = left_most_simple_mut(query) else {
            return Err(TransformError::InvalidInjectionSpec(
                param_key.to_string(),
                "query has no SELECT to attach a WHERE predicate to".to_string(),
            ));
        };

        if let Condition::Logical(op, children) = condition {
            let mut parts = Vec::new();
            for (i, (child_column, child_condition)) in children.iter().enumerate() {
                let child_key = format!("{param_key}_{}_{i}", op.suffix());
                if let Some(expr) = resolve_column_expr(
                    self.resolver,
                    simple,
                    child_column,
                    self.ignore_non_existent_columns,
                )? {
                    parts.push(build_leaf(&child_key, child_condition, expr));
                }
            }
            if let Some(predicate) = combine(*op, parts) {
                and_into_where(&mut simple.r#where, predicate);
            }
            return Ok(());
        }

        if let Some(expr) = resolve_column_expr(
            self.resolver,
            simple,
            column,
            self.ignore_non_existent_columns,
        )? {
            let predicate = build_leaf(param_key, condition, expr);
            and_into_where(&mut simple.r#where, predicate);
        }
        Ok(())
    }

    fn inject_upstream(
        &self,
        query: &mut Query,
        param_key: &str,
        column: &str,
        condition: &Condition,
    ) -> Result<(), TransformError> {
        if matches!(condition, Condition::Logical(..)) {
            return Err(TransformError::InvalidInjectionSpec(
                param_key.to_string(),
                "logical groups are not supported in upstream injection mode".to_string(),
            ));
        }
        let key = param_key.to_string();
        let condition = condition.clone();
        let injected = inject_into_query(query, column, &move |column_expr: &Expr| {
            build_leaf(&key, &condition, column_expr.clone())
        });
        if !injected && !self.ignore_non_existent_columns {
            return Err(TransformError::Resolution(ResolutionError::UnknownColumn(
                column.to_string(),
            )));
        }
        Ok(())
    }
}

fn resolve_column_expr(
    resolver: &dyn TableColumnResolver,
    simple: &SimpleSelect,
    column: &str,
    ignore_non_existent_columns: bool,
) -> Result<Option<Expr>, TransformError> {
    let (qualifier, bare) = match column.split_once('.') {
        Some((t, c)) => (Some(t), c),
        None => (None, column),
    };
    let mut scope = Scope::new(resolver);
    let frame = scope.frame_for_simple_select(simple);
    scope.push_frame(frame);
    match scope.resolve_column(qualifier, bare) {
        Ok(resolution) => Ok(Some(Expr::qualified_column(
            resolution.source_label,
            resolution.column,
        ))),
        Err(ResolutionError::UnknownColumn(_)) if ignore_non_existent_columns => Ok(None),
        Err(e) => Err(TransformError::Resolution(e)),
    }
}

fn build_leaf(key: &str, condition: &Condition, column_expr: Expr) -> Expr {
    match condition {
        Condition::Scalar(_) => Expr::binary(
            BinaryOp::Eq,
            column_expr,
            Expr::new(ExprKind::Parameter(ParamRef::Named(key.to_string()))),
        ),
        Condition::Operator(op, value) => build_operator(*op, column_expr, value, key),
        Condition::Range { min, max } => {
            let mut parts = Vec::new();
            if min.is_some() {
                parts.push(Expr::binary(
                    BinaryOp::GtEq,
                    column_expr.clone(),
                    Expr::new(ExprKind::Parameter(ParamRef::Named(format!("{key}_min")))),
                ));
            }
            if max.is_some() {
                parts.push(Expr::binary(
                    BinaryOp::LtEq,
                    column_expr,
                    Expr::new(ExprKind::Parameter(ParamRef::Named(format!("{key}_max")))),
                ));
            }
            combine(LogicalOp::And, parts)
                .unwrap_or_else(|| Expr::new(ExprKind::Literal(Literal::Boolean(true))))
        }
        Condition::Logical(..) => unreachable!("Logical conditions are resolved by the caller"),
        Condition::Exists { subquery, negated } => Expr::new(ExprKind::Exists {
            negated: *negated,
            subquery: subquery.clone(),
        }),
    }
}

fn build_operator(op: Operator, column_expr: Expr, value: &ConditionValue, key: &str) -> Expr {
    match op {
        Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq => {
            let bin_op = match op {
                Operator::Eq => BinaryOp::Eq,
                Operator::NotEq => BinaryOp::NotEq,
                Operator::Lt => BinaryOp::Lt,
                Operator::LtEq => BinaryOp::LtEq,
                Operator::Gt => BinaryOp::Gt,
                Operator::GtEq => BinaryOp::GtEq,
                _ => unreachable!(),
            };
            let param_key = format!("{key}_{}", op.suffix());
            Expr::binary(
                bin_op,
                column_expr,
                Expr::new(ExprKind::Parameter(ParamRef::Named(param_key))),
            )
        }
        Operator::Like | Operator::ILike => {
            let param_key = format!("{key}_{}", op.suffix());
            Expr::new(ExprKind::Like {
                expr: Box::new(column_expr),
                negated: false,
                case_insensitive: op == Operator::ILike,
                pattern: Box::new(Expr::new(ExprKind::Parameter(ParamRef::Named(param_key)))),
            })
        }
        Operator::In | Operator::Any => {
            let suffix = op.suffix();
            let list = match value {
                ConditionValue::List(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, _)| {
                        Expr::new(ExprKind::Parameter(ParamRef::Named(format!(
                            "{key}_{suffix}_{i}"
                        ))))
                    })
                    .collect(),
                ConditionValue::Literal(_) => {
                    vec![Expr::new(ExprKind::Parameter(ParamRef::Named(format!(
                        "{key}_{suffix}_0"
                    ))))]
                }
            };
            Expr::new(ExprKind::InList {
                expr: Box::new(column_expr),
                negated: false,
                list,
            })
        }
    }
}

fn combine(op: LogicalOp, mut parts: Vec<Expr>) -> Option<Expr> {
    if parts.is_empty() {
        return None;
    }
    let mut result = parts.remove(0);
    for part in parts {
        result = Expr::binary(op.as_binary(), result, part);
    }
    if matches!(op, LogicalOp::Or) {
        Some(Expr::new(ExprKind::Paren(Box::new(result))))
    } else {
        Some(result)
    }
}

pub(crate) fn and_into_where(r#where: &mut Option<Expr>, predicate: Expr) {
    *r#where = Some(match r#where.take() {
        Some(existing) => Expr::binary(BinaryOp::And, existing, predicate),
        None => predicate,
    });
}

pub(crate) fn left_most_simple_mut(query: &mut Query) -> Option<&mut SimpleSelect> {
    match &mut query.kind {
        QueryKind::Simple(s) => Some(s),
        QueryKind::Binary(b) => left_most_simple_mut(&mut b.left),
        QueryKind::Values(_) => None,
    }
}

fn projection_expr_for(simple: &SimpleSelect, column: &str) -> Expr {
    for item in &simple.select.items {
        if let SelectItem::Expr {
            expr,
            alias: Some(alias),
        } = item
        {
            if alias.text == column {
                return expr.clone();
            }
        }
    }
    for item in &simple.select.items {
        if let SelectItem::Expr { expr, alias: None } = item {
            if let ExprKind::Column(col) = &expr.kind {
                if let ColumnName::Named(ident) = &col.column {
                    if ident.text == column {
                        return expr.clone();
                    }
                }
            }
        }
    }
    Expr::column(column)
}

fn inject_into_query(query: &mut Query, column: &str, make_predicate: &dyn Fn(&Expr) -> Expr) -> bool {
    if scope::projection_names(query).iter().any(|c| c == column) {
        if let QueryKind::Simple(simple) = &mut query.kind {
            let expr = projection_expr_for(simple, column);
            let predicate = make_predicate(&expr);
            and_into_where(&mut simple.r#where, predicate);
            return true;
        }
    }

    match &mut query.kind {
        QueryKind::Simple(simple) => {
            let mut injected = false;
            if let Some(with) = &mut simple.with {
                for cte in &mut with.ctes {
                    injected |= inject_into_query(&mut cte.body, column, make_predicate);
                }
            }
            for item in &mut simple.from {
                injected |= inject_into_from_item(item, column, make_predicate);
            }
            injected
        }
        QueryKind::Binary(b) => {
            let left = inject_into_query(&mut b.left, column, make_predicate);
            let right = inject_into_query(&mut b.right, column, make_predicate);
            left || right
        }
        QueryKind::Values(_) => false,
    }
}

fn inject_into_from_item(
    item: &mut FromItem,
    column: &str,
    make_predicate: &dyn Fn(&Expr) -> Expr,
) -> bool {
    match &mut item.kind {
        FromItemKind::Subquery { query, .. } => inject_into_query(query, column, make_predicate),
        FromItemKind::Join(join) => {
            inject_into_from_item(&mut join.left, column, make_predicate)
                || inject_into_from_item(&mut join.right, column, make_predicate)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::scope::StaticSchema;

    fn parse(sql: &str) -> Statement {
        parser::parse_statement(sql).unwrap()
    }

    #[test]
    fn basic_equality_injection_qualifies_by_alias() {
        let stmt = parse("SELECT u.user_id FROM users u WHERE u.active = TRUE");
        let schema = StaticSchema::new();
        let mut spec = ParamSpec::new();
        spec.insert("user_id".to_string(), Condition::Scalar(Literal::Number("42".into())));
        let injector = SqlParamInjector::new(&schema, spec, InjectionMode::Normal);
        let result = injector.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        assert!(sql.contains("u.user_id = :user_id"), "{sql}");
    }

    #[test]
    fn or_group_injection_names_params_per_branch() {
        let stmt = parse("SELECT u.user_name, u.email FROM users u");
        let schema = StaticSchema::new();
        let mut spec = ParamSpec::new();
        spec.insert(
            "name_or_email".to_string(),
            Condition::Logical(
                LogicalOp::Or,
                vec![
                    (
                        "user_name".to_string(),
                        Condition::Operator(
                            Operator::ILike,
                            ConditionValue::Literal(Literal::String("%a%".into())),
                        ),
                    ),
                    (
                        "email".to_string(),
                        Condition::Operator(
                            Operator::ILike,
                            ConditionValue::Literal(Literal::String("%a%".into())),
                        ),
                    ),
                ],
            ),
        );
        let injector = SqlParamInjector::new(&schema, spec, InjectionMode::Normal);
        let result = injector.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        assert!(sql.contains(":name_or_email_or_0_ilike"), "{sql}");
        assert!(sql.contains(":name_or_email_or_1_ilike"), "{sql}");
    }

    #[test]
    fn upstream_injection_targets_cte_body() {
        let stmt = parse("WITH t AS (SELECT id, amount FROM sales) SELECT * FROM t");
        let schema = StaticSchema::new();
        let mut spec = ParamSpec::new();
        spec.insert(
            "amount".to_string(),
            Condition::Operator(
                Operator::Gt,
                ConditionValue::Literal(Literal::Number("100".into())),
            ),
        );
        let injector = SqlParamInjector::new(&schema, spec, InjectionMode::Upstream);
        let result = injector.apply(&stmt).unwrap();
        let (sql, _) = crate::printer::format(&result).unwrap();
        let with_idx = sql.find("with").unwrap();
        let select_idx = sql.rfind("select *").unwrap();
        let predicate_idx = sql.find("amount > :amount_gt").unwrap();
        assert!(predicate_idx > with_idx && predicate_idx < select_idx, "{sql}");
    }
}
