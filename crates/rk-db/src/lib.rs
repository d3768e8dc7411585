//! # rk-db
//!
//! Generic CRUD repositories for repokit.
//!
//! This crate turns `rk_queries::Query` descriptors into SeaORM statements
//! and runs them through any `ConnectionTrait`, including:
//!
//! - Connection pool management
//! - Query translation (filters, ordering, selection, pagination)
//! - Schema introspection for writable columns
//! - A table-backed repository with relation loading hooks
//!
//! ## Example
//!
//! ```ignore
//! use rk_core::config::AppConfig;
//! use rk_db::{CrudRepository, Database};
//! use rk_queries::QueryBuilder;
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::connect(&config.database).await?;
//!
//! let repo = db.repository::<Widget>();
//! let widget = repo.find_one_by_id(1.into(), None).await?;
//! let cheap = repo
//!     .find_all(Some(QueryBuilder::new().less_than("price", 10i64).build()))
//!     .await?;
//! ```

pub mod hydration;
pub mod pool;
pub mod relations;
pub mod repository;
pub mod schema;
pub mod translate;

// Re-exports
pub use hydration::{tablize, ColumnMap, CrudEntity};
pub use pool::Database;
pub use relations::{NoRelations, RelationLoader, RelationRegistry};
pub use repository::{
    CrudRepository, PaginatedResult, RepositoryError, RepositoryOptions, RepositoryResult,
    TableRepository,
};
pub use schema::{InformationSchema, SchemaInspector, StaticSchema};
