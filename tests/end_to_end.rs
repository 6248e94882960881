//! End-to-end scenarios exercising parse -> transform -> print together,
//! one test per scenario plus the round-trip/idempotence properties
//! they depend on.

use indexmap::IndexMap;

use sql_ast_kit::ast::{Literal, StatementKind};
use sql_ast_kit::printer::{format_with_options, FormatOptions, Params, Preset};
use sql_ast_kit::{
    parse_statement, Condition, ConditionValue, InjectionMode, LogicalOp, Operator, Pagination,
    Scope, SqlPaginationInjector, SqlParamInjector, StaticSchema, Transform,
};

fn schema() -> StaticSchema {
    StaticSchema::new()
        .with_table(
            "users",
            vec![
                "user_id".to_string(),
                "user_name".to_string(),
                "email".to_string(),
                "active".to_string(),
            ],
        )
        .with_table("sales", vec!["id".to_string(), "amount".to_string()])
}

#[test]
fn param_injection_basic() {
    let schema = schema();
    let stmt = parse_statement("SELECT u.user_id FROM users u WHERE u.active = TRUE").unwrap();

    let mut spec = IndexMap::new();
    spec.insert(
        "user_id".to_string(),
        Condition::Scalar(Literal::Number("42".to_string())),
    );
    let injector = SqlParamInjector::new(&schema, spec, InjectionMode::Normal);
    let rewritten = injector.apply(&stmt).unwrap();

    let (sql, params) =
        format_with_options(&rewritten, &FormatOptions::from_preset(Preset::Postgres)).unwrap();
    assert!(sql.contains("u.user_id = :user_id"), "{sql}");
    match params {
        Params::Named(map) => assert!(map.contains_key("user_id")),
        other => panic!("expected named params, got {other:?}"),
    }
}

#[test]
fn param_injection_or_group() {
    let schema = schema();
    let stmt = parse_statement("SELECT u.user_name, u.email FROM users u").unwrap();

    let ilike = |pattern: &str| {
        Condition::Operator(
            Operator::ILike,
            ConditionValue::Literal(Literal::String(pattern.to_string())),
        )
    };
    let group = Condition::Logical(
        LogicalOp::Or,
        vec![
            ("user_name".to_string(), ilike("%a%")),
            ("email".to_string(), ilike("%a%")),
        ],
    );
    let mut spec = IndexMap::new();
    spec.insert("name_or_email".to_string(), group);
    let injector = SqlParamInjector::new(&schema, spec, InjectionMode::Normal);
    let rewritten = injector.apply(&stmt).unwrap();

    let (sql, _) =
        format_with_options(&rewritten, &FormatOptions::from_preset(Preset::Postgres)).unwrap();
    assert!(
        sql.contains(
            "(u.user_name ilike :name_or_email_or_0_ilike or u.email ilike :name_or_email_or_1_ilike)"
        ),
        "{sql}"
    );
}

#[test]
fn upstream_injection_lands_inside_cte_body() {
    let schema = schema();
    let stmt = parse_statement("WITH t AS (SELECT id, amount FROM sales) SELECT * FROM t").unwrap();

    let mut spec = IndexMap::new();
    spec.insert(
        "amount".to_string(),
        Condition::Operator(
            Operator::Gt,
            ConditionValue::Literal(Literal::Number("100".to_string())),
        ),
    );
    let injector = SqlParamInjector::new(&schema, spec, InjectionMode::Upstream);
    let rewritten = injector.apply(&stmt).unwrap();

    let (sql, _) =
        format_with_options(&rewritten, &FormatOptions::from_preset(Preset::Postgres)).unwrap();
    let outer_start = sql.rfind("select").expect("outer select present");
    let cte_body = &sql[..outer_start];
    let outer = &sql[outer_start..];
    assert!(cte_body.contains("amount > :amount_gt"), "{sql}");
    assert!(!outer.contains("amount_gt"), "{sql}");
}

#[test]
fn pagination_first_page_omits_offset() {
    let stmt = parse_statement("SELECT id FROM users ORDER BY id").unwrap();
    let injector = SqlPaginationInjector::new(Pagination {
        page: 1,
        page_size: 10,
    });
    let rewritten = injector.apply(&stmt).unwrap();

    let (sql, _) = format_with_options(&rewritten, &FormatOptions::from_preset(Preset::Postgres)).unwrap();
    assert!(sql.trim_end().ends_with("limit 10"), "{sql}");
    assert!(!sql.contains("offset"), "{sql}");
}

#[test]
fn pagination_later_page_emits_offset_formula() {
    let stmt = parse_statement("SELECT id FROM users ORDER BY id").unwrap();
    let injector = SqlPaginationInjector::new(Pagination {
        page: 3,
        page_size: 10,
    });
    let rewritten = injector.apply(&stmt).unwrap();

    let (sql, _) = format_with_options(&rewritten, &FormatOptions::from_preset(Preset::Postgres)).unwrap();
    assert!(sql.contains("limit 10"), "{sql}");
    assert!(sql.contains("offset"), "{sql}");
}

#[test]
fn json_builder_produces_nested_array_and_object_aggregation() {
    use sql_ast_kit::{EntityMapping, JsonResultFormat, PostgresJsonQueryBuilder, RelationshipKind};

    let stmt = parse_statement(
        "SELECT o.id AS order_id, c.id AS customer_id, c.name AS customer_name, i.id AS item_id, i.product \
         FROM orders o LEFT JOIN customers c ON c.id = o.customer_id LEFT JOIN items i ON i.order_id = o.id",
    )
    .unwrap();
    let StatementKind::Query(query) = stmt.kind else {
        panic!("expected query")
    };
    let sql_ast_kit::ast::QueryKind::Simple(base) = query.kind else {
        panic!("expected simple select")
    };

    let mut root_columns = IndexMap::new();
    root_columns.insert("id".to_string(), "order_id".to_string());

    let mut customer_columns = IndexMap::new();
    customer_columns.insert("name".to_string(), "customer_name".to_string());

    let mut item_columns = IndexMap::new();
    item_columns.insert("product".to_string(), "product".to_string());

    let builder = PostgresJsonQueryBuilder::new(root_columns, JsonResultFormat::Array)
        .with_entity(EntityMapping {
            id: "customer_id".to_string(),
            parent_id: None,
            property_name: "customer".to_string(),
            relationship: RelationshipKind::Object,
            columns: customer_columns,
        })
        .with_entity(EntityMapping {
            id: "item_id".to_string(),
            parent_id: None,
            property_name: "items".to_string(),
            relationship: RelationshipKind::Array,
            columns: item_columns,
        });

    let built = builder.build(*base).unwrap();
    let out = sql_ast_kit::ast::Statement::new(StatementKind::Query(built));
    let (sql, _) = format_with_options(&out, &FormatOptions::from_preset(Preset::Postgres)).unwrap();

    assert!(sql.contains("jsonb_build_object"), "{sql}");
    assert!(sql.contains("jsonb_agg"), "{sql}");
    assert!(sql.contains("group by"), "{sql}");
}

#[test]
fn comments_survive_parse_and_format_round_trip() {
    let source = "SELECT /*pk*/ id FROM users -- all\nWHERE active";
    let stmt = parse_statement(source).unwrap();

    let mut options = FormatOptions::from_preset(Preset::Postgres);
    options.export_comment = true;
    let (sql, _) = format_with_options(&stmt, &options).unwrap();

    assert!(sql.contains("pk"), "{sql}");
    assert!(sql.contains("all"), "{sql}");
}

#[test]
fn scope_resolution_rejects_ambiguous_unqualified_column() {
    let schema = StaticSchema::new()
        .with_table("a", vec!["id".to_string(), "name".to_string()])
        .with_table("b", vec!["id".to_string()]);
    let stmt = parse_statement("SELECT id FROM a JOIN b ON a.id = b.id").unwrap();
    let StatementKind::Query(query) = &stmt.kind else {
        panic!("expected query")
    };
    let sql_ast_kit::ast::QueryKind::Simple(simple) = &query.kind else {
        panic!("expected simple select")
    };

    let mut scope = Scope::new(&schema);
    let frame = scope.frame_for_simple_select(simple);
    scope.push_frame(frame);
    let err = scope.resolve_column(None, "id").unwrap_err();
    assert!(matches!(
        err,
        sql_ast_kit::ResolutionError::AmbiguousColumn(..)
    ));
}

#[test]
fn param_injector_does_not_mutate_its_input() {
    let schema = schema();
    let stmt = parse_statement("SELECT u.user_id FROM users u").unwrap();
    let (sql_before, _) =
        format_with_options(&stmt, &FormatOptions::from_preset(Preset::Postgres)).unwrap();

    let mut spec = IndexMap::new();
    spec.insert(
        "user_id".to_string(),
        Condition::Scalar(Literal::Number("42".to_string())),
    );
    let injector = SqlParamInjector::new(&schema, spec, InjectionMode::Normal);
    let _ = injector.apply(&stmt).unwrap();

    let (sql_after, _) =
        format_with_options(&stmt, &FormatOptions::from_preset(Preset::Postgres)).unwrap();
    assert_eq!(sql_before, sql_after, "apply must not mutate its input statement");
}
