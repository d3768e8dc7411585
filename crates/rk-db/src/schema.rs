//! Schema introspection
//!
//! The repository asks a [`SchemaInspector`] which columns a table has so
//! that writes only touch real columns.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

use crate::repository::RepositoryResult;

/// Lists the columns of a table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// Column names in table order
    async fn list_table_columns(&self, table: &str) -> RepositoryResult<Vec<String>>;
}

/// Reads columns from the database catalog on every call
#[derive(Clone)]
pub struct InformationSchema {
    conn: Arc<DatabaseConnection>,
}

impl InformationSchema {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    fn statement(backend: DatabaseBackend, table: &str) -> Statement {
        let sql = match backend {
            DatabaseBackend::Postgres => {
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position"
            }
            DatabaseBackend::MySql => {
                "SELECT column_name AS column_name FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                 ORDER BY ordinal_position"
            }
            DatabaseBackend::Sqlite => {
                "SELECT name AS column_name FROM pragma_table_info(?) ORDER BY cid"
            }
        };
        Statement::from_sql_and_values(backend, sql, [table.into()])
    }
}

#[async_trait]
impl SchemaInspector for InformationSchema {
    async fn list_table_columns(&self, table: &str) -> RepositoryResult<Vec<String>> {
        let statement = Self::statement(self.conn.get_database_backend(), table);
        let rows = self.conn.query_all(statement).await?;

        let columns = rows
            .iter()
            .map(|row| row.try_get::<String>("", "column_name"))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(table, columns = columns.len(), "Loaded table columns");
        Ok(columns)
    }
}

/// Fixed column list, for tables whose layout is known up front
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    columns: Vec<String>,
}

impl StaticSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl SchemaInspector for StaticSchema {
    async fn list_table_columns(&self, _table: &str) -> RepositoryResult<Vec<String>> {
        Ok(self.columns.clone())
    }
}
