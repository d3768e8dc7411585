//! Query Builder
//!
//! Provides a fluent API for constructing queries with filters, sorts,
//! field selection, pagination and relations.

use rk_core::traits::EntityId;

use crate::filters::{Filter, FilterOperator, FilterValue};
use crate::pagination::Pagination;
use crate::query::Query;
use crate::sorts::{SortCriterion, SortOrder};

/// Builder for constructing queries fluently
#[derive(Debug, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue building from an existing query
    pub fn from_query(query: Query) -> Self {
        Self { query }
    }

    // Filter methods

    /// Add a raw filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.query.filters.add(filter);
        self
    }

    /// Filter by attribute equality (IN for lists)
    pub fn where_eq(mut self, attribute: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.query.where_eq(attribute, value);
        self
    }

    /// Filter by attribute inequality (NOT IN for lists)
    pub fn where_not(mut self, attribute: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.query.filters.add(Filter::not_equals(attribute, value));
        self
    }

    /// Filter by primary key(s)
    pub fn ids(mut self, attribute: impl Into<String>, ids: impl Into<Vec<EntityId>>) -> Self {
        self.query
            .filters
            .add(Filter::equals(attribute, FilterValue::from_ids(ids.into())));
        self
    }

    /// Filter by text containing a fragment
    pub fn contains(mut self, attribute: impl Into<String>, text: impl Into<String>) -> Self {
        self.query.filters.add(Filter::contains(attribute, text));
        self
    }

    /// Filter by text prefix
    pub fn starts_with(mut self, attribute: impl Into<String>, text: impl Into<String>) -> Self {
        self.query.filters.add(Filter::new(
            attribute,
            FilterOperator::StartsWith,
            FilterValue::String(text.into()),
        ));
        self
    }

    /// Filter by attribute greater than a value
    pub fn greater_than(mut self, attribute: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.query.filters.add(Filter::new(
            attribute,
            FilterOperator::GreaterThan,
            value.into(),
        ));
        self
    }

    /// Filter by attribute less than a value
    pub fn less_than(mut self, attribute: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.query
            .filters
            .add(Filter::new(attribute, FilterOperator::LessThan, value.into()));
        self
    }

    /// Filter by inclusive range
    pub fn between(
        mut self,
        attribute: impl Into<String>,
        from: impl Into<FilterValue>,
        to: impl Into<FilterValue>,
    ) -> Self {
        self.query.filters.add(Filter::between(attribute, from, to));
        self
    }

    /// Filter rows where the attribute is null
    pub fn null(mut self, attribute: impl Into<String>) -> Self {
        self.query.filters.add(Filter::is_null(attribute));
        self
    }

    /// Filter rows where the attribute is set
    pub fn not_null(mut self, attribute: impl Into<String>) -> Self {
        self.query.filters.add(Filter::is_not_null(attribute));
        self
    }

    // Sort methods

    /// Replace the sort order
    pub fn sort(mut self, sorts: SortOrder) -> Self {
        self.query.sorts = sorts;
        self
    }

    /// Append ascending sort
    pub fn order_asc(mut self, attribute: impl Into<String>) -> Self {
        self.query.sorts.add(SortCriterion::asc(attribute));
        self
    }

    /// Append descending sort
    pub fn order_desc(mut self, attribute: impl Into<String>) -> Self {
        self.query.sorts.add(SortCriterion::desc(attribute));
        self
    }

    // Selection, window and relations

    /// Select only the given fields
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.select(fields);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset(offset);
        self
    }

    /// Select a 1-indexed page
    pub fn page(mut self, page: u64, per_page: u64) -> Self {
        self.query.paginate(Pagination::page(page, per_page));
        self
    }

    /// Request a relation
    pub fn with(mut self, relation: impl Into<String>) -> Self {
        self.query.with(relation);
        self
    }

    /// Build the query
    pub fn build(self) -> Query {
        self.query
    }
}
