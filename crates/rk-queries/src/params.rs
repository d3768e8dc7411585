//! Request parameters
//!
//! Converts API-style query strings into a [`Query`]:
//!
//! - `page`, `per_page` (1-indexed) or an explicit `offset`
//! - `sort=name:desc,id`
//! - `filters=[{"name":{"operator":"~","values":["bolt"]}}]`
//! - `select=id,name`
//! - `with=owner,tags`

use chrono::NaiveDate;
use rk_core::error::ValidationErrors;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::filters::{Filter, FilterOperator, FilterValue};
use crate::pagination::{Pagination, DEFAULT_PAGE_SIZE};
use crate::query::Query;
use crate::sorts::SortOrder;

/// Query parameters (from query string)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub page: u64,

    /// Items per page
    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub per_page: u64,

    /// Offset (alternative to page)
    pub offset: Option<u64>,

    /// Comma separated sort criteria
    pub sort: Option<String>,

    /// JSON-encoded filters
    pub filters: Option<String>,

    /// Comma separated field list
    pub select: Option<String>,

    /// Comma separated relation names
    pub with: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            offset: None,
            sort: None,
            filters: None,
            select: None,
            with: None,
        }
    }
}

impl QueryParams {
    /// Window described by these parameters
    pub fn pagination(&self) -> Pagination {
        match self.offset {
            Some(offset) => Pagination::new(self.per_page, offset),
            None => Pagination::page(self.page, self.per_page),
        }
    }

    /// Validate and convert into a query. All problems are reported at once.
    pub fn to_query(&self) -> Result<Query, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = self.validate() {
            errors.merge(e.into());
        }

        let pagination = self.pagination();
        if !pagination.fits_sql() {
            errors.add("page", "is out of range");
        }

        let mut query = Query::new();
        query.paginate(pagination);

        if let Some(sort) = self.sort.as_deref() {
            match SortOrder::parse(sort) {
                Ok(order) => query.sorts = order,
                Err(part) => errors.add("sort", format!("invalid sort criterion '{}'", part)),
            }
        }

        if let Some(filters) = self.filters.as_deref() {
            match parse_filters(filters) {
                Ok(parsed) => {
                    for filter in parsed {
                        query.filter(filter);
                    }
                }
                Err(filter_errors) => errors.merge(filter_errors),
            }
        }

        if let Some(select) = self.select.as_deref() {
            query.select(split_list(select));
        }

        if let Some(with) = self.with.as_deref() {
            for relation in split_list(with) {
                query.with(relation);
            }
        }

        errors.into_result().map(|_| query)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse filters in the `[{"attr":{"operator":"=","values":[..]}}]` format
pub fn parse_filters(raw: &str) -> Result<Vec<Filter>, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let entries: Vec<serde_json::Map<String, JsonValue>> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            errors.add("filters", format!("is not valid JSON: {}", e));
            return Err(errors);
        }
    };

    let mut filters = Vec::new();
    for entry in entries {
        for (attribute, definition) in entry {
            match parse_filter(&attribute, &definition) {
                Ok(filter) => filters.push(filter),
                Err(message) => errors.add(format!("filters.{}", attribute), message),
            }
        }
    }

    errors.into_result().map(|_| filters)
}

fn parse_filter(attribute: &str, definition: &JsonValue) -> Result<Filter, String> {
    let operator_str = definition
        .get("operator")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| "is missing an operator".to_string())?;
    let operator = FilterOperator::from_str(operator_str)
        .ok_or_else(|| format!("has unknown operator '{}'", operator_str))?;

    let raw_values: Vec<JsonValue> = match definition.get("values") {
        None | Some(JsonValue::Null) => vec![],
        Some(JsonValue::Array(values)) => values.clone(),
        Some(single) => vec![single.clone()],
    };

    let dates = reads_dates(operator);
    let values = match operator {
        FilterOperator::IsNull | FilterOperator::IsNotNull => FilterValue::None,
        FilterOperator::Between => match raw_values.as_slice() {
            [from, to] => FilterValue::Range {
                from: Box::new(scalar(from, dates)?),
                to: Box::new(scalar(to, dates)?),
            },
            _ => return Err("needs exactly two values".to_string()),
        },
        _ => match raw_values.as_slice() {
            [] => return Err("needs a value".to_string()),
            [single] => scalar(single, dates)?,
            many => list(many)?,
        },
    };

    let filter = Filter::new(attribute, operator, values);
    if filter.is_valid() {
        Ok(filter)
    } else {
        Err(format!("cannot use operator '{}' with these values", operator_str))
    }
}

/// Range and ordering operators are where `YYYY-MM-DD` strings mean dates;
/// everywhere else they stay text.
fn reads_dates(operator: FilterOperator) -> bool {
    matches!(
        operator,
        FilterOperator::Between
            | FilterOperator::GreaterThan
            | FilterOperator::GreaterThanOrEqual
            | FilterOperator::LessThan
            | FilterOperator::LessThanOrEqual
    )
}

fn scalar(value: &JsonValue, dates: bool) -> Result<FilterValue, String> {
    match value {
        JsonValue::Bool(b) => Ok(FilterValue::Bool(*b)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(FilterValue::Int)
            .or_else(|| n.as_f64().map(FilterValue::Number))
            .ok_or_else(|| format!("has unsupported number {}", n)),
        JsonValue::String(s) if dates => Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(FilterValue::Date)
            .unwrap_or_else(|_| FilterValue::String(s.clone()))),
        JsonValue::String(s) => Ok(FilterValue::String(s.clone())),
        other => Err(format!("has unsupported value {}", other)),
    }
}

fn list(values: &[JsonValue]) -> Result<FilterValue, String> {
    if let Some(ints) = values.iter().map(JsonValue::as_i64).collect::<Option<Vec<_>>>() {
        return Ok(FilterValue::Ints(ints));
    }
    if let Some(strings) = values
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    {
        return Ok(FilterValue::Strings(strings));
    }
    Err("mixes value types in a list".to_string())
}
