//! Query translation
//!
//! Maps an `rk_queries::Query` onto sea-query statements. Every filter
//! becomes one expression and all of them are AND-combined.

use rk_core::traits::EntityId;
use rk_queries::{Filter, FilterOperator, FilterSet, FilterValue, Query, SortDirection};
use sea_orm::sea_query::{
    Alias, Asterisk, Condition, Expr, LikeExpr, Order, SelectStatement, SimpleExpr,
};
use sea_orm::Value;

use crate::hydration::ColumnMap;
use crate::repository::{RepositoryError, RepositoryResult};

/// Escape LIKE wildcards so `text` matches literally
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Bindable value for a primary key
pub fn id_value(id: &EntityId) -> Value {
    match id {
        EntityId::Int(id) => (*id).into(),
        EntityId::Uuid(id) => (*id).into(),
        EntityId::Text(id) => id.clone().into(),
    }
}

/// Add the query's filters as a WHERE clause
pub fn apply_where(query: &Query, select: &mut SelectStatement) -> RepositoryResult<()> {
    if let Some(condition) = filters_condition(&query.filters)? {
        select.cond_where(condition);
    }
    Ok(())
}

/// Select the listed fields, or every column
pub fn apply_select(query: &Query, select: &mut SelectStatement) {
    if query.select.is_empty() {
        select.column(Asterisk);
    } else {
        select.columns(query.select.iter().map(|field| Alias::new(field.as_str())));
    }
}

pub fn apply_order(query: &Query, select: &mut SelectStatement) {
    for criterion in query.sorts.criteria() {
        let order = match criterion.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        select.order_by(Alias::new(criterion.attribute.as_str()), order);
    }
}

pub fn apply_paginate(query: &Query, select: &mut SelectStatement) {
    if let Some(limit) = query.limit {
        select.limit(limit);
    }
    if let Some(offset) = query.offset {
        select.offset(offset);
    }
}

/// Project `COUNT(*) AS "count"`
pub fn apply_count(select: &mut SelectStatement) {
    select.expr_as(Expr::col(Asterisk).count(), Alias::new("count"));
}

/// AND of `column = value` for every entry
pub fn condition_from_columns(columns: &ColumnMap) -> Condition {
    columns.iter().fold(Condition::all(), |condition, (column, value)| {
        condition.add(Expr::col(Alias::new(column)).eq(value.clone()))
    })
}

/// AND of all filters; `None` when there are none
pub fn filters_condition(filters: &FilterSet) -> RepositoryResult<Option<Condition>> {
    if filters.is_empty() {
        return Ok(None);
    }

    let mut condition = Condition::all();
    for filter in filters.filters() {
        condition = condition.add(filter_expr(filter)?);
    }
    Ok(Some(condition))
}

/// Translate a single filter
pub fn filter_expr(filter: &Filter) -> RepositoryResult<SimpleExpr> {
    if !filter.is_valid() {
        return Err(invalid(filter));
    }

    let column = Expr::col(Alias::new(filter.attribute.as_str()));
    let values = &filter.values;

    let expr = match filter.operator {
        FilterOperator::Equals => match list_values(values) {
            Some(list) => column.is_in(list),
            None => column.eq(scalar(filter, values)?),
        },
        FilterOperator::NotEquals => match list_values(values) {
            Some(list) => column.is_not_in(list),
            None => column.ne(scalar(filter, values)?),
        },
        FilterOperator::Contains => column.like(pattern(filter, "%", "%")?),
        FilterOperator::NotContains => column.not_like(pattern(filter, "%", "%")?),
        FilterOperator::StartsWith => column.like(pattern(filter, "", "%")?),
        FilterOperator::EndsWith => column.like(pattern(filter, "%", "")?),
        FilterOperator::GreaterThan => column.gt(scalar(filter, values)?),
        FilterOperator::GreaterThanOrEqual => column.gte(scalar(filter, values)?),
        FilterOperator::LessThan => column.lt(scalar(filter, values)?),
        FilterOperator::LessThanOrEqual => column.lte(scalar(filter, values)?),
        FilterOperator::Between => match values {
            FilterValue::Range { from, to } => {
                column.between(scalar(filter, from)?, scalar(filter, to)?)
            }
            _ => return Err(invalid(filter)),
        },
        FilterOperator::IsNull => column.is_null(),
        FilterOperator::IsNotNull => column.is_not_null(),
    };

    Ok(expr)
}

fn invalid(filter: &Filter) -> RepositoryError {
    RepositoryError::InvalidQuery(format!(
        "cannot apply operator '{}' to '{}' with {:?}",
        filter.operator.as_str(),
        filter.attribute,
        filter.values
    ))
}

fn scalar(filter: &Filter, value: &FilterValue) -> RepositoryResult<Value> {
    let value = match value {
        FilterValue::Id(id) => id_value(id),
        FilterValue::Int(n) => (*n).into(),
        FilterValue::String(s) => s.clone().into(),
        FilterValue::Bool(b) => (*b).into(),
        FilterValue::Number(n) => (*n).into(),
        FilterValue::Date(d) => (*d).into(),
        _ => return Err(invalid(filter)),
    };
    Ok(value)
}

fn list_values(value: &FilterValue) -> Option<Vec<Value>> {
    match value {
        FilterValue::Ids(ids) => Some(ids.iter().map(id_value).collect()),
        FilterValue::Ints(ints) => Some(ints.iter().map(|n| Value::from(*n)).collect()),
        FilterValue::Strings(strings) => {
            Some(strings.iter().map(|s| Value::from(s.clone())).collect())
        }
        _ => None,
    }
}

fn pattern(filter: &Filter, prefix: &str, suffix: &str) -> RepositoryResult<LikeExpr> {
    match &filter.values {
        FilterValue::String(text) => Ok(LikeExpr::new(format!(
            "{}{}{}",
            prefix,
            escape_like(text),
            suffix
        ))
        .escape('\\')),
        _ => Err(invalid(filter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_queries::QueryBuilder;
    use sea_orm::sea_query::{PostgresQueryBuilder, Query as Statement};

    fn render(query: &Query) -> String {
        let mut select = Statement::select();
        select.from(Alias::new("widgets"));
        apply_where(query, &mut select).unwrap();
        apply_select(query, &mut select);
        apply_order(query, &mut select);
        apply_paginate(query, &mut select);
        select.to_string(PostgresQueryBuilder)
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }

    #[test]
    fn test_empty_query_selects_everything() {
        assert_eq!(render(&Query::new()), r#"SELECT * FROM "widgets""#);
    }

    #[test]
    fn test_equality_and_lists() {
        let query = QueryBuilder::new().where_eq("status", 1i64).build();
        assert_eq!(
            render(&query),
            r#"SELECT * FROM "widgets" WHERE "status" = 1"#
        );

        let query = QueryBuilder::new()
            .where_eq("status", vec![1i64, 2])
            .where_not("kind", vec![3i64, 4])
            .build();
        assert_eq!(
            render(&query),
            r#"SELECT * FROM "widgets" WHERE "status" IN (1, 2) AND "kind" NOT IN (3, 4)"#
        );
    }

    #[test]
    fn test_null_checks() {
        let query = QueryBuilder::new()
            .null("deleted_at")
            .not_null("owner_id")
            .build();
        assert_eq!(
            render(&query),
            r#"SELECT * FROM "widgets" WHERE "deleted_at" IS NULL AND "owner_id" IS NOT NULL"#
        );
    }

    #[test]
    fn test_comparisons_and_range() {
        let query = QueryBuilder::new()
            .greater_than("price", 10i64)
            .less_than("stock", 5i64)
            .between("weight", 1i64, 5i64)
            .build();
        assert_eq!(
            render(&query),
            r#"SELECT * FROM "widgets" WHERE "price" > 10 AND "stock" < 5 AND "weight" BETWEEN 1 AND 5"#
        );
    }

    #[test]
    fn test_patterns_are_escaped() {
        let query = QueryBuilder::new().contains("name", "50%").build();
        let sql = render(&query);
        assert!(sql.contains(r#""name" LIKE"#));
        assert!(sql.contains("ESCAPE"));

        let expr = filter_expr(&Filter::new(
            "name",
            FilterOperator::StartsWith,
            FilterValue::String("bolt".into()),
        ))
        .unwrap();
        let mut select = Statement::select();
        select.from(Alias::new("widgets")).column(Asterisk).and_where(expr);
        assert!(select.to_string(PostgresQueryBuilder).contains("'bolt%'"));
    }

    #[test]
    fn test_select_order_and_window() {
        let query = QueryBuilder::new()
            .select(["id", "name"])
            .order_desc("name")
            .order_asc("id")
            .limit(10)
            .offset(20)
            .build();
        assert_eq!(
            render(&query),
            r#"SELECT "id", "name" FROM "widgets" ORDER BY "name" DESC, "id" ASC LIMIT 10 OFFSET 20"#
        );
    }

    #[test]
    fn test_count_projection() {
        let mut select = Statement::select();
        select.from(Alias::new("widgets"));
        apply_where(&QueryBuilder::new().where_eq("status", 1i64).build(), &mut select).unwrap();
        apply_count(&mut select);
        assert_eq!(
            select.to_string(PostgresQueryBuilder),
            r#"SELECT COUNT(*) AS "count" FROM "widgets" WHERE "status" = 1"#
        );
    }

    #[test]
    fn test_condition_from_columns() {
        let columns = ColumnMap::new().set("owner_id", 4i64).set("status", 2i64);
        let mut select = Statement::select();
        select
            .from(Alias::new("widgets"))
            .column(Asterisk)
            .cond_where(condition_from_columns(&columns));
        assert_eq!(
            select.to_string(PostgresQueryBuilder),
            r#"SELECT * FROM "widgets" WHERE "owner_id" = 4 AND "status" = 2"#
        );
    }

    #[test]
    fn test_invalid_filters_are_rejected() {
        let no_value = Filter::new("price", FilterOperator::GreaterThan, FilterValue::None);
        assert!(matches!(
            filter_expr(&no_value),
            Err(RepositoryError::InvalidQuery(_))
        ));

        let pattern_on_number =
            Filter::new("price", FilterOperator::Contains, FilterValue::Int(3));
        assert!(matches!(
            filter_expr(&pattern_on_number),
            Err(RepositoryError::InvalidQuery(_))
        ));

        let mut select = Statement::select();
        let query = QueryBuilder::new().filter(no_value).build();
        assert!(apply_where(&query, &mut select).is_err());
    }
}
