//! Database connection pool management
//!
//! Opens a pooled SeaORM connection from [`DatabaseConfig`].

use std::sync::Arc;
use std::time::Duration;

use rk_core::config::DatabaseConfig;
use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection, DbErr, Statement};

use crate::hydration::CrudEntity;
use crate::repository::TableRepository;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    conn: Arc<DatabaseConnection>,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .sqlx_logging(config.sqlx_logging);

        let conn = sea_orm::Database::connect(options).await?;

        tracing::info!(
            max_connections = config.max_connections,
            backend = ?conn.get_database_backend(),
            "Database pool created"
        );

        Ok(Self::from_connection(conn))
    }

    /// Wrap an already opened connection
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }

    /// Get a reference to the connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Repository for `E` over this connection
    pub fn repository<E: CrudEntity>(&self) -> TableRepository<E> {
        TableRepository::from_shared(Arc::clone(&self.conn))
    }

    /// Check if the database is reachable
    pub async fn ping(&self) -> Result<(), DbErr> {
        let backend = self.conn.get_database_backend();
        self.conn
            .execute(Statement::from_string(backend, "SELECT 1"))
            .await?;
        Ok(())
    }

    /// Close the connection pool
    ///
    /// While repositories still hold the connection the pool stays open and
    /// closes once the last of them is dropped.
    pub async fn close(self) -> Result<(), DbErr> {
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => {
                conn.close().await?;
                tracing::info!("Database pool closed");
            }
            Err(shared) => {
                tracing::warn!(
                    handles = Arc::strong_count(&shared),
                    "Database pool still in use, not closed"
                );
            }
        }
        Ok(())
    }
}
