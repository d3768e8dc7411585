//! # rk-queries
//!
//! Storage-independent query descriptors for repokit.
//!
//! A [`Query`] describes filters, ordering, field selection, pagination and the
//! relations to load. The database crate translates it into statements.
//!
//! ## Structure
//!
//! - `filters` - Filter types and operators
//! - `sorts` - Sort orders and directions
//! - `pagination` - Limit/offset windows
//! - `query` - The query descriptor itself
//! - `builder` - Fluent API for constructing queries
//! - `params` - Parsing API-style request parameters
//!
//! ## Example
//!
//! ```
//! use rk_queries::QueryBuilder;
//!
//! let query = QueryBuilder::new()
//!     .where_eq("status", 1i64)
//!     .contains("name", "bolt")
//!     .order_desc("created_at")
//!     .page(1, 20)
//!     .with("owner")
//!     .build();
//!
//! assert!(query.has_filters());
//! assert!(query.has_relations());
//! ```

pub mod builder;
pub mod filters;
pub mod pagination;
pub mod params;
pub mod query;
pub mod sorts;

// Re-exports for convenience
pub use builder::QueryBuilder;
pub use filters::{Filter, FilterOperator, FilterSet, FilterValue};
pub use pagination::Pagination;
pub use params::QueryParams;
pub use query::Query;
pub use sorts::{SortCriterion, SortDirection, SortOrder};
