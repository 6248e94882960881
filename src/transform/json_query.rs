//! PostgreSQL JSON query builder (spec §4.5's "JSON query builder").

use indexmap::IndexMap;

use crate::ast::{
    BinaryOp, CteDef, Expr, ExprKind, FromItem, FromItemKind, FunctionCall, GroupByClause,
    GroupByMode, Ident, ObjectName, Query, QueryKind, SelectClause, SelectItem, SimpleSelect,
    WithBlock,
};
use crate::error::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonResultFormat {
    Array,
    Single,
}

/// One nested entity: `id`/`parent_id` name the columns in the flat base
/// query that link this entity to its parent (`parent_id: None` means it
/// nests directly under the root), `columns` maps each output JSON key to
/// its source column in the base query.
#[derive(Debug, Clone)]
pub struct EntityMapping {
    pub id: String,
    pub parent_id: Option<String>,
    pub property_name: String,
    pub relationship: RelationshipKind,
    pub columns: IndexMap<String, String>,
}

/// Builds a PostgreSQL JSON-aggregating query from a flat `SELECT` plus
/// a root entity and nested entity mappings (spec §4.5).
pub struct PostgresJsonQueryBuilder {
    root_columns: IndexMap<String, String>,
    entities: Vec<EntityMapping>,
    result_format: JsonResultFormat,
    empty_result: Expr,
}

impl PostgresJsonQueryBuilder {
    pub fn new(root_columns: IndexMap<String, String>, result_format: JsonResultFormat) -> Self {
        Self {
            root_columns,
            entities: Vec::new(),
            result_format,
            empty_result: Expr::new(ExprKind::Literal(crate::ast::Literal::Null)),
        }
    }

    pub fn with_entity(mut self, entity: EntityMapping) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_empty_result(mut self, empty_result: Expr) -> Self {
        self.empty_result = empty_result;
        self
    }

    pub fn build(&self, base: SimpleSelect) -> Result<Query, TransformError> {
        let ordered = self.entities_deepest_first();

        let mut ctes = vec![CteDef {
            name: Ident::new("base"),
            column_aliases: Vec::new(),
            materialized: None,
            body: Query::new(QueryKind::Simple(Box::new(base))),
        }];

        for entity in &ordered {
            ctes.push(CteDef {
                name: Ident::new(entity_cte_name(entity)),
                column_aliases: Vec::new(),
                materialized: None,
                body: entity_query(entity),
            });
        }

        let root = self.root_query(&ordered);

        let mut root = root;
        root.with = Some(WithBlock {
            recursive: false,
            ctes,
        });
        Ok(Query::new(QueryKind::Simple(Box::new(root))))
    }

    /// Sorts entities so each appears after every entity it depends on
    /// (its ancestors), then reverses: callers build deepest-first.
    fn entities_deepest_first(&self) -> Vec<EntityMapping> {
        let mut depth: IndexMap<String, u32> = IndexMap::new();
        for entity in &self.entities {
            compute_depth(entity, &self.entities, &mut depth);
        }
        let mut ordered = self.entities.clone();
        ordered.sort_by_key(|e| std::cmp::Reverse(depth.get(&e.id).copied().unwrap_or(0)));
        ordered
    }

    fn root_query(&self, ordered: &[EntityMapping]) -> SimpleSelect {
        let mut from = vec![FromItem::new(FromItemKind::Table {
            name: ObjectName::unqualified(Ident::new("base")),
            alias: Some(Ident::new("root")),
            column_aliases: Vec::new(),
        })];

        for entity in ordered {
            if entity.parent_id.is_some() {
                continue;
            }
            let cte_alias = entity_cte_name(entity);
            let join = crate::ast::Join {
                kind: crate::ast::JoinKind::Left,
                left: from.pop().unwrap(),
                right: FromItem::new(FromItemKind::Table {
                    name: ObjectName::unqualified(Ident::new(cte_alias.clone())),
                    alias: Some(Ident::new(cte_alias.clone())),
                    column_aliases: Vec::new(),
                }),
                condition: crate::ast::JoinCondition::On(Expr::binary(
                    BinaryOp::Eq,
                    Expr::qualified_column("root", &entity.id),
                    Expr::qualified_column(cte_alias, "group_key"),
                )),
            };
            from.push(FromItem::new(FromItemKind::Join(Box::new(join))));
        }

        let mut object_fields = Vec::new();
        for (key, source) in &self.root_columns {
            object_fields.push(string_literal(key));
            object_fields.push(Expr::qualified_column("root", source));
        }
        for entity in ordered {
            if entity.parent_id.is_some() {
                continue;
            }
            object_fields.push(string_literal(&entity.property_name));
            object_fields.push(Expr::qualified_column(
                entity_cte_name(entity),
                &entity.property_name,
            ));
        }
        let root_object = jsonb_build_object(object_fields);

        let select_item = match self.result_format {
            JsonResultFormat::Array => SelectItem::Expr {
                expr: coalesce(
                    Expr::new(ExprKind::Function(Box::new(FunctionCall {
                        name: ObjectName::unqualified(Ident::new("jsonb_agg")),
                        args: vec![root_object],
                        distinct: false,
                        filter: None,
                        within_group: None,
                        over: None,
                    }))),
                    self.empty_result.clone(),
                ),
                alias: Some(Ident::new("result")),
            },
            JsonResultFormat::Single => SelectItem::Expr {
                expr: coalesce(root_object, self.empty_result.clone()),
                alias: Some(Ident::new("result")),
            },
        };

        SimpleSelect {
            select: SelectClause {
                distinct: Default::default(),
                items: vec![select_item],
            },
            from,
            ..Default::default()
        }
    }
}

fn compute_depth(
    entity: &EntityMapping,
    all: &[EntityMapping],
    depth: &mut IndexMap<String, u32>,
) -> u32 {
    if let Some(d) = depth.get(&entity.id) {
        return *d;
    }
    let d = match &entity.parent_id {
        None => 0,
        Some(parent_id) => all
            .iter()
            .find(|e| &e.id == parent_id)
            .map(|parent| compute_depth(parent, all, depth) + 1)
            .unwrap_or(0),
    };
    depth.insert(entity.id.clone(), d);
    d
}

fn entity_cte_name(entity: &EntityMapping) -> String {
    format!("{}_json", entity.id)
}

fn entity_query(entity: &EntityMapping) -> Query {
    let mut object_fields = Vec::new();
    for (key, source) in &entity.columns {
        object_fields.push(string_literal(key));
        object_fields.push(Expr::qualified_column("base", source));
    }
    let object_expr = jsonb_build_object(object_fields);

    let parent_key_expr = Expr::qualified_column(
        "base",
        entity.parent_id.as_deref().unwrap_or(entity.id.as_str()),
    );

    let (select_expr, group_by) = match entity.relationship {
        RelationshipKind::Array => {
            let agg = Expr::new(ExprKind::Function(Box::new(FunctionCall {
                name: ObjectName::unqualified(Ident::new("jsonb_agg")),
                args: vec![object_expr],
                distinct: false,
                filter: None,
                within_group: None,
                over: None,
            })));
            (
                agg,
                Some(GroupByClause {
                    exprs: vec![parent_key_expr.clone()],
                    mode: GroupByMode::Plain,
                }),
            )
        }
        RelationshipKind::Object => {
            let all_null = entity
                .columns
                .values()
                .map(|source| {
                    Expr::new(ExprKind::IsNull {
                        expr: Box::new(Expr::qualified_column("base", source)),
                        negated: false,
                    })
                })
                .reduce(|acc, expr| Expr::binary(BinaryOp::And, acc, expr));
            let guarded = match all_null {
                Some(condition) => Expr::new(ExprKind::Case {
                    operand: None,
                    branches: vec![(
                        condition,
                        Expr::new(ExprKind::Literal(crate::ast::Literal::Null)),
                    )],
                    else_branch: Some(Box::new(object_expr)),
                }),
                None => object_expr,
            };
            (guarded, None)
        }
    };

    let mut items = vec![SelectItem::Expr {
        expr: parent_key_expr,
        alias: Some(Ident::new("group_key")),
    }];
    items.push(SelectItem::Expr {
        expr: select_expr,
        alias: Some(Ident::new(entity.property_name.clone())),
    });

    Query::new(QueryKind::Simple(Box::new(SimpleSelect {
        select: SelectClause {
            distinct: Default::default(),
            items,
        },
        from: vec![FromItem::new(FromItemKind::Table {
            name: ObjectName::unqualified(Ident::new("base")),
            alias: None,
            column_aliases: Vec::new(),
        })],
        group_by,
        ..Default::default()
    })))
}

fn jsonb_build_object(fields: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Function(Box::new(FunctionCall {
        name: ObjectName::unqualified(Ident::new("jsonb_build_object")),
        args: fields,
        distinct: false,
        filter: None,
        within_group: None,
        over: None,
    })))
}

fn coalesce(value: Expr, fallback: Expr) -> Expr {
    Expr::new(ExprKind::Function(Box::new(FunctionCall {
        name: ObjectName::unqualified(Ident::new("coalesce")),
        args: vec![value, fallback],
        distinct: false,
        filter: None,
        within_group: None,
        over: None,
    })))
}

fn string_literal(s: &str) -> Expr {
    Expr::new(ExprKind::Literal(crate::ast::Literal::String(s.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn flat_base() -> SimpleSelect {
        let stmt = parser::parse_statement(
            "SELECT o.id AS order_id, o.placed_at, i.id AS item_id, i.sku, i.qty FROM orders o JOIN order_items i ON i.order_id = o.id",
        )
        .unwrap();
        let crate::ast::StatementKind::Query(query) = stmt.kind else {
            panic!("expected query")
        };
        let crate::ast::QueryKind::Simple(simple) = query.kind else {
            panic!("expected simple select")
        };
        *simple
    }

    #[test]
    fn builds_array_relationship_with_fallback() {
        let mut root_columns = IndexMap::new();
        root_columns.insert("id".to_string(), "order_id".to_string());
        root_columns.insert("placedAt".to_string(), "placed_at".to_string());

        let mut item_columns = IndexMap::new();
        item_columns.insert("sku".to_string(), "sku".to_string());
        item_columns.insert("qty".to_string(), "qty".to_string());

        let builder = PostgresJsonQueryBuilder::new(root_columns, JsonResultFormat::Array)
            .with_entity(EntityMapping {
                id: "item_id".to_string(),
                parent_id: Some("order_id".to_string()),
                property_name: "items".to_string(),
                relationship: RelationshipKind::Array,
                columns: item_columns,
            })
            .with_empty_result(Expr::new(ExprKind::Array(Vec::new())));

        let query = builder.build(flat_base()).unwrap();
        let stmt = crate::ast::Statement::new(crate::ast::StatementKind::Query(query));
        let (sql, _) = crate::printer::format(&stmt).unwrap();
        assert!(sql.contains("jsonb_agg"), "{sql}");
        assert!(sql.contains("jsonb_build_object"), "{sql}");
        assert!(sql.contains("coalesce"), "{sql}");
    }
}
