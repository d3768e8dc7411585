//! Query Model
//!
//! A Query describes which rows to read and how: filter conditions, ordering,
//! the fields to select, a limit/offset window and the relations to attach to
//! the result. It knows nothing about SQL.

use crate::filters::{Filter, FilterSet, FilterValue};
use crate::pagination::Pagination;
use crate::sorts::{SortCriterion, SortDirection, SortOrder};

/// Generic query descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// AND-combined filter conditions
    pub filters: FilterSet,
    /// Ordering, applied in sequence
    pub sorts: SortOrder,
    /// Selected fields; empty selects every column
    pub select: Vec<String>,
    /// Maximum number of rows
    pub limit: Option<u64>,
    /// Number of rows to skip
    pub offset: Option<u64>,
    /// Relation names to load onto the result
    pub with: Vec<String>,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// The given query, or an empty one
    pub fn forge(query: Option<Query>) -> Self {
        query.unwrap_or_default()
    }

    /// Add an equality condition
    pub fn where_eq(&mut self, attribute: impl Into<String>, value: impl Into<FilterValue>) -> &mut Self {
        self.filters.add(Filter::equals(attribute, value));
        self
    }

    /// Add an arbitrary filter
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.filters.add(filter);
        self
    }

    /// Append a sort criterion
    pub fn order_by(&mut self, attribute: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.sorts.add(SortCriterion::new(attribute, direction));
        self
    }

    /// Replace the selected fields
    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Apply a limit/offset window
    pub fn paginate(&mut self, pagination: Pagination) -> &mut Self {
        self.limit = Some(pagination.limit);
        self.offset = Some(pagination.offset);
        self
    }

    /// Request a relation; duplicates are ignored
    pub fn with(&mut self, relation: impl Into<String>) -> &mut Self {
        let relation = relation.into();
        if !self.with.contains(&relation) {
            self.with.push(relation);
        }
        self
    }

    /// Copy of this query with no relations requested
    pub fn without_relations(&self) -> Self {
        Self {
            with: Vec::new(),
            ..self.clone()
        }
    }

    /// Copy of this query without ordering and window, for counting
    pub fn for_count(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            ..Self::default()
        }
    }

    /// Check if the query has any filters
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Check if the query requests relations
    pub fn has_relations(&self) -> bool {
        !self.with.is_empty()
    }

    /// Current window, if a limit is set
    pub fn pagination(&self) -> Option<Pagination> {
        self.limit
            .map(|limit| Pagination::new(limit, self.offset.unwrap_or(0)))
    }
}
