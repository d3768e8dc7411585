//! Repository traits and base implementations
//!
//! Provides generic CRUD operations for any [`CrudEntity`] stored in a
//! single table.

use std::sync::Arc;

use async_trait::async_trait;
use rk_core::error::ValidationErrors;
use rk_core::traits::EntityId;
use rk_queries::{Pagination, Query};
use sea_orm::sea_query::{Alias, Condition, Expr, Query as SeaQuery, SelectStatement, SimpleExpr};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, ExecResult, QueryResult, RuntimeErr, SqlErr,
    Statement, StatementBuilder,
};

use crate::hydration::{ColumnMap, CrudEntity};
use crate::relations::{NoRelations, RelationLoader};
use crate::schema::{InformationSchema, SchemaInspector};
use crate::translate;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {message}")]
    NotFound {
        entity: &'static str,
        message: String,
    },

    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter {
        parameter: &'static str,
        message: String,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    pub fn status_code(&self) -> u16 {
        match self {
            RepositoryError::NotFound { .. } => 404,
            RepositoryError::InvalidParameter { .. } | RepositoryError::InvalidQuery(_) => 400,
            RepositoryError::UnprocessableEntity(_) => 422,
            RepositoryError::Database(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RepositoryError::NotFound { .. } => "not_found",
            RepositoryError::InvalidParameter { .. } => "invalid_parameter",
            RepositoryError::InvalidQuery(_) => "invalid_query",
            RepositoryError::UnprocessableEntity(_) => "unprocessable_entity",
            RepositoryError::Database(_) => "database_error",
        }
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Whether the database rejected a write because of a unique constraint
pub fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }

    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };

    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => {
            db.is_unique_violation()
                || matches!(db.code().as_deref(), Some("23505") | Some("1062") | Some("2067"))
        }
        _ => false,
    }
}

/// Query result with pagination metadata
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: u64,
    pub offset: u64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }

    pub fn page(&self) -> u64 {
        Pagination::new(self.limit, self.offset).page_number()
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.total_rows().div_ceil(self.limit)
        }
    }

    pub fn has_next(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.total_rows()
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    fn total_rows(&self) -> u64 {
        u64::try_from(self.total).unwrap_or(0)
    }
}

/// Table layout options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Primary key columns; the first one addresses single rows
    pub primary_key: Vec<String>,
    /// Column filled by the database on insert, never written
    pub auto_increment: Option<String>,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            primary_key: vec!["id".to_string()],
            auto_increment: Some("id".to_string()),
        }
    }
}

impl RepositoryOptions {
    /// Column holding the row id
    pub fn id_column(&self) -> &str {
        self.primary_key.first().map(String::as_str).unwrap_or("id")
    }
}

/// CRUD operations over one entity type
#[async_trait]
pub trait CrudRepository<E: CrudEntity>: Send + Sync {
    /// Primary key columns
    fn primary_key(&self) -> &[String];

    /// Count rows matching the query's filters
    async fn count(&self, query: Option<Query>) -> RepositoryResult<i64>;

    /// Fetch all matching rows, then load the requested relations
    async fn find_all(&self, query: Option<Query>) -> RepositoryResult<Vec<E>>;

    /// First matching row; `NotFound` when there is none
    async fn find_one(&self, query: Option<Query>) -> RepositoryResult<E>;

    /// Row with the given id, further restricted by `query`
    async fn find_one_by_id(&self, id: EntityId, query: Option<Query>) -> RepositoryResult<E>;

    /// Insert the entity and store the new id on it
    async fn create(&self, entity: &mut E) -> RepositoryResult<()>;

    /// Write the entity's columns to its existing row
    async fn update(&self, entity: &E) -> RepositoryResult<()>;

    async fn delete_by_id(&self, id: EntityId) -> RepositoryResult<()>;

    /// Delete rows where every listed column equals its value. Returns the
    /// number of deleted rows.
    async fn delete_by_condition(&self, condition: ColumnMap) -> RepositoryResult<u64>;

    async fn exists(&self, id: EntityId) -> RepositoryResult<bool>;

    /// One page of results with the total count
    async fn find_page(
        &self,
        query: Option<Query>,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<E>>;
}

/// Repository backed by a single table
pub struct TableRepository<E: Send + 'static> {
    conn: Arc<DatabaseConnection>,
    options: RepositoryOptions,
    schema: Arc<dyn SchemaInspector>,
    relations: Arc<dyn RelationLoader<E>>,
}

impl<E: Send + 'static> Clone for TableRepository<E> {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            options: self.options.clone(),
            schema: Arc::clone(&self.schema),
            relations: Arc::clone(&self.relations),
        }
    }
}

impl<E: CrudEntity> TableRepository<E> {
    /// Repository reading its column list from the database catalog
    pub fn new(conn: DatabaseConnection) -> Self {
        Self::from_shared(Arc::new(conn))
    }

    /// Repository over a connection shared with other repositories
    pub fn from_shared(conn: Arc<DatabaseConnection>) -> Self {
        Self {
            schema: Arc::new(InformationSchema::new(Arc::clone(&conn))),
            conn,
            options: RepositoryOptions::default(),
            relations: Arc::new(NoRelations),
        }
    }

    pub fn with_options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_schema(mut self, schema: impl SchemaInspector + 'static) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn with_relations(mut self, loader: impl RelationLoader<E> + 'static) -> Self {
        self.relations = Arc::new(loader);
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn shared_connection(&self) -> &Arc<DatabaseConnection> {
        &self.conn
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    fn not_found(message: impl Into<String>) -> RepositoryError {
        RepositoryError::NotFound {
            entity: E::TYPE_NAME,
            message: message.into(),
        }
    }

    fn build<S: StatementBuilder>(&self, statement: &S) -> Statement {
        let statement = self.conn.get_database_backend().build(statement);
        tracing::debug!(table = E::TABLE_NAME, sql = %statement.sql, "Built statement");
        statement
    }

    fn base_select(&self) -> SelectStatement {
        let mut select = SeaQuery::select();
        select.from(Alias::new(E::TABLE_NAME));
        select
    }

    fn id_condition(&self, id: &EntityId) -> Condition {
        let column = Expr::col(Alias::new(self.options.id_column()));
        Condition::all().add(column.eq(translate::id_value(id)))
    }

    /// Table columns minus the auto-increment column
    async fn modifiable_columns(&self) -> RepositoryResult<Vec<String>> {
        let mut columns = self.schema.list_table_columns(E::TABLE_NAME).await?;
        if columns.is_empty() {
            return Err(RepositoryError::InvalidQuery(format!(
                "table '{}' has no columns",
                E::TABLE_NAME
            )));
        }
        if let Some(auto_increment) = &self.options.auto_increment {
            columns.retain(|column| column != auto_increment);
        }
        Ok(columns)
    }

    async fn select_rows(&self, query: &Query) -> RepositoryResult<Vec<E>> {
        let mut select = self.base_select();
        translate::apply_where(query, &mut select)?;
        translate::apply_select(query, &mut select);
        translate::apply_order(query, &mut select);
        translate::apply_paginate(query, &mut select);

        let rows = self.conn.query_all(self.build(&select)).await?;
        rows.iter()
            .map(|row| E::from_query_result(row, "").map_err(RepositoryError::from))
            .collect()
    }

    async fn execute<S: StatementBuilder + Sync>(&self, statement: &S) -> RepositoryResult<ExecResult> {
        Ok(self.conn.execute(self.build(statement)).await?)
    }

    /// Insert `data` and return the key of the new row
    async fn insert(&self, data: ColumnMap, known_id: Option<EntityId>) -> RepositoryResult<EntityId> {
        let id_column = self.options.id_column().to_string();
        let returning = self.conn.get_database_backend().support_returning();
        let known_id = known_id.filter(|id| !id.is_empty());

        // without RETURNING or a generated key the id has to come from the entity
        if !returning && self.options.auto_increment.is_none() && known_id.is_none() {
            return Err(RepositoryError::InvalidParameter {
                parameter: "id",
                message: format!("{} needs an ID when the key is not generated", E::TYPE_NAME),
            });
        }

        let mut insert = SeaQuery::insert();
        insert.into_table(Alias::new(E::TABLE_NAME));
        if data.is_empty() {
            insert.or_default_values();
        } else {
            insert.columns(data.keys().map(Alias::new));
            insert
                .values(data.values().cloned().map(SimpleExpr::from))
                .map_err(|e| RepositoryError::InvalidQuery(e.to_string()))?;
        }

        if returning {
            insert.returning_col(Alias::new(id_column.as_str()));
            let row = self
                .conn
                .query_one(self.build(&insert))
                .await?
                .ok_or(DbErr::RecordNotInserted)?;
            return read_id(&row, &id_column);
        }

        let result = self.execute(&insert).await?;
        if let Some(id) = known_id.filter(|_| self.options.auto_increment.is_none()) {
            return Ok(id);
        }
        match i64::try_from(result.last_insert_id()) {
            Ok(id) if id > 0 => Ok(EntityId::Int(id)),
            _ => Err(DbErr::RecordNotInserted.into()),
        }
    }

    async fn delete_where(&self, condition: Condition) -> RepositoryResult<u64> {
        let mut delete = SeaQuery::delete();
        delete
            .from_table(Alias::new(E::TABLE_NAME))
            .cond_where(condition);
        Ok(self.execute(&delete).await?.rows_affected())
    }
}

/// Read a generated key, whatever its column type
fn read_id(row: &QueryResult, column: &str) -> RepositoryResult<EntityId> {
    if let Ok(id) = row.try_get::<i64>("", column) {
        return Ok(EntityId::Int(id));
    }
    if let Ok(id) = row.try_get::<i32>("", column) {
        return Ok(id.into());
    }
    if let Ok(id) = row.try_get::<sea_orm::prelude::Uuid>("", column) {
        return Ok(id.into());
    }
    Ok(EntityId::Text(row.try_get::<String>("", column)?))
}

#[async_trait]
impl<E: CrudEntity> CrudRepository<E> for TableRepository<E> {
    fn primary_key(&self) -> &[String] {
        &self.options.primary_key
    }

    async fn count(&self, query: Option<Query>) -> RepositoryResult<i64> {
        let query = Query::forge(query).for_count();

        let mut select = self.base_select();
        translate::apply_where(&query, &mut select)?;
        translate::apply_count(&mut select);

        match self.conn.query_one(self.build(&select)).await? {
            Some(row) => Ok(row.try_get::<i64>("", "count")?),
            None => Ok(0),
        }
    }

    async fn find_all(&self, query: Option<Query>) -> RepositoryResult<Vec<E>> {
        let query = Query::forge(query);
        let rows = self.select_rows(&query.without_relations()).await?;
        self.relations.load(rows, &query.with).await
    }

    async fn find_one(&self, query: Option<Query>) -> RepositoryResult<E> {
        let mut query = Query::forge(query);
        query.limit(1);

        self.find_all(Some(query))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Self::not_found("Not found entity!"))
    }

    async fn find_one_by_id(&self, id: EntityId, query: Option<Query>) -> RepositoryResult<E> {
        if id.is_empty() {
            return Err(RepositoryError::InvalidParameter {
                parameter: "id",
                message: "Empty ID".to_string(),
            });
        }

        let mut query = Query::forge(query);
        query.where_eq(self.options.id_column(), id);
        self.find_one(Some(query)).await
    }

    async fn create(&self, entity: &mut E) -> RepositoryResult<()> {
        let columns = self.modifiable_columns().await?;
        let data = entity.to_columns().extract_by_keys(&columns);

        let id = match self.insert(data, entity.id()).await {
            Ok(id) => id,
            Err(RepositoryError::Database(err)) if is_unique_violation(&err) => {
                tracing::warn!(
                    table = E::TABLE_NAME,
                    error = %err,
                    "Insert violates a unique constraint"
                );
                return Err(RepositoryError::UnprocessableEntity(
                    ValidationErrors::with_base("Already exists!"),
                ));
            }
            Err(err) => return Err(err),
        };

        tracing::info!(table = E::TABLE_NAME, %id, "Created {}", E::TYPE_NAME);
        entity.set_id(id);
        Ok(())
    }

    async fn update(&self, entity: &E) -> RepositoryResult<()> {
        let id = entity.id().ok_or_else(|| RepositoryError::InvalidParameter {
            parameter: "id",
            message: format!("{} has no ID", E::TYPE_NAME),
        })?;
        self.find_one_by_id(id.clone(), None).await?;

        let columns = self.modifiable_columns().await?;
        let mut data = entity.to_columns().extract_by_keys(&columns);
        for key in &self.options.primary_key {
            data.remove(key);
        }
        if data.is_empty() {
            tracing::debug!(table = E::TABLE_NAME, %id, "Nothing to update");
            return Ok(());
        }

        let mut update = SeaQuery::update();
        update
            .table(Alias::new(E::TABLE_NAME))
            .values(
                data.into_iter()
                    .map(|(column, value)| (Alias::new(column), SimpleExpr::from(value))),
            )
            .cond_where(self.id_condition(&id));
        self.execute(&update).await?;

        tracing::info!(table = E::TABLE_NAME, %id, "Updated {}", E::TYPE_NAME);
        Ok(())
    }

    async fn delete_by_id(&self, id: EntityId) -> RepositoryResult<()> {
        let entity = self.find_one_by_id(id.clone(), None).await?;
        let id = entity.id().filter(|found| !found.is_empty()).unwrap_or(id);

        self.delete_where(self.id_condition(&id)).await?;
        tracing::info!(table = E::TABLE_NAME, %id, "Deleted {}", E::TYPE_NAME);
        Ok(())
    }

    async fn delete_by_condition(&self, condition: ColumnMap) -> RepositoryResult<u64> {
        if condition.is_empty() {
            return Err(RepositoryError::InvalidParameter {
                parameter: "condition",
                message: "Empty condition would delete every row".to_string(),
            });
        }

        let deleted = self
            .delete_where(translate::condition_from_columns(&condition))
            .await?;
        tracing::info!(table = E::TABLE_NAME, deleted, "Deleted by condition");
        Ok(deleted)
    }

    async fn exists(&self, id: EntityId) -> RepositoryResult<bool> {
        if id.is_empty() {
            return Ok(false);
        }
        let mut query = Query::new();
        query.where_eq(self.options.id_column(), id);
        Ok(self.count(Some(query)).await? > 0)
    }

    async fn find_page(
        &self,
        query: Option<Query>,
        pagination: Pagination,
    ) -> RepositoryResult<PaginatedResult<E>> {
        let mut query = Query::forge(query);
        let total = self.count(Some(query.clone())).await?;

        query.paginate(pagination);
        let items = self.find_all(Some(query)).await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::MockRelationLoader;
    use crate::schema::{MockSchemaInspector, StaticSchema};
    use fake::faker::lorem::en::Word;
    use fake::Fake;
    use rk_core::traits::{Entity, Identifiable};
    use rk_queries::QueryBuilder;
    use sea_orm::{
        DatabaseBackend, FromQueryResult, MockDatabase, MockExecResult, Transaction, Value,
    };
    use std::borrow::Cow;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, FromQueryResult)]
    struct Widget {
        id: i64,
        name: String,
        price: i32,
    }

    impl Identifiable for Widget {
        fn id(&self) -> Option<EntityId> {
            (self.id != 0).then(|| EntityId::Int(self.id))
        }

        fn set_id(&mut self, id: EntityId) {
            self.id = id.as_int().unwrap_or_default();
        }
    }

    impl Entity for Widget {
        const TABLE_NAME: &'static str = "widgets";
        const TYPE_NAME: &'static str = "Widget";
    }

    impl CrudEntity for Widget {
        fn to_columns(&self) -> ColumnMap {
            ColumnMap::new()
                .set("id", self.id)
                .set("name", self.name.clone())
                .set("price", self.price)
        }
    }

    #[derive(Debug)]
    struct DuplicateKey;

    impl std::fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(sqlx::error::DatabaseError::message(self))
        }
    }

    impl std::error::Error for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint \"widgets_name_key\""
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    fn duplicate_key() -> DbErr {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(Box::new(
            DuplicateKey,
        ))))
    }

    fn mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn no_rows() -> Vec<BTreeMap<&'static str, Value>> {
        Vec::new()
    }

    fn row(id: i64, name: &str, price: i32) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", Value::from(id)),
            ("name", Value::from(name)),
            ("price", Value::from(price)),
        ])
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn repo(conn: DatabaseConnection) -> TableRepository<Widget> {
        TableRepository::new(conn).with_schema(StaticSchema::new(["id", "name", "price"]))
    }

    fn transaction_log(repo: TableRepository<Widget>) -> Vec<Transaction> {
        let TableRepository {
            conn,
            schema,
            relations,
            ..
        } = repo;
        drop(schema);
        drop(relations);
        match Arc::try_unwrap(conn) {
            Ok(conn) => conn.into_transaction_log(),
            Err(_) => panic!("connection is still shared"),
        }
    }

    fn sql<I: IntoIterator<Item = Value>>(sql: &str, values: I) -> Transaction {
        Transaction::from_sql_and_values(DatabaseBackend::Postgres, sql, values)
    }

    #[test]
    fn test_error_mapping() {
        let not_found = RepositoryError::NotFound {
            entity: "Widget",
            message: "Not found entity!".to_string(),
        };
        assert_eq!(not_found.status_code(), 404);
        assert_eq!(not_found.error_code(), "not_found");

        let conflict = RepositoryError::UnprocessableEntity(ValidationErrors::with_base("x"));
        assert_eq!(conflict.status_code(), 422);

        let db = RepositoryError::from(DbErr::Custom("boom".into()));
        assert_eq!(db.status_code(), 500);
        assert_eq!(db.error_code(), "database_error");
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(is_unique_violation(&duplicate_key()));
        assert!(!is_unique_violation(&DbErr::Custom("boom".into())));
        assert!(!is_unique_violation(&DbErr::RecordNotFound("x".into())));
    }

    #[test]
    fn test_paginated_result() {
        let items = vec![1, 2, 3, 4, 5];
        let result = PaginatedResult::new(items, 50, Pagination::page(2, 5));

        assert_eq!(result.page(), 2);
        assert_eq!(result.total_pages(), 10);
        assert!(result.has_next());
        assert!(result.has_prev());

        let last = PaginatedResult::new(vec![1], 11, Pagination::page(3, 5));
        assert_eq!(last.total_pages(), 3);
        assert!(!last.has_next());

        let far = PaginatedResult::<i32>::new(vec![], 10, Pagination::new(u64::MAX, u64::MAX));
        assert!(!far.has_next());
    }

    #[test]
    fn test_default_options() {
        let options = RepositoryOptions::default();
        assert_eq!(options.primary_key, vec!["id"]);
        assert_eq!(options.auto_increment.as_deref(), Some("id"));
        assert_eq!(options.id_column(), "id");
    }

    #[tokio::test]
    async fn test_find_one_by_id() {
        let conn = mock()
            .append_query_results([vec![row(1, "bolt", 5)]])
            .into_connection();
        let repo = repo(conn);

        let widget = repo.find_one_by_id(1i64.into(), None).await.unwrap();
        assert_eq!(widget.name, "bolt");

        assert_eq!(
            transaction_log(repo),
            vec![sql(
                r#"SELECT * FROM "widgets" WHERE "id" = $1 LIMIT $2"#,
                [Value::from(1i64), Value::from(1u64)]
            )]
        );
    }

    #[tokio::test]
    async fn test_find_one_by_id_missing_row() {
        let conn = mock().append_query_results([no_rows()]).into_connection();

        let err = repo(conn).find_one_by_id(7i64.into(), None).await.unwrap_err();
        match err {
            RepositoryError::NotFound { entity, message } => {
                assert_eq!(entity, "Widget");
                assert_eq!(message, "Not found entity!");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected_before_any_statement() {
        let repo = repo(mock().into_connection());

        let err = repo.find_one_by_id(0i64.into(), None).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InvalidParameter { parameter: "id", .. }
        ));
        let err = repo.delete_by_id("".into()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidParameter { .. }));

        assert!(transaction_log(repo).is_empty());
    }

    #[tokio::test]
    async fn test_find_all_translates_query_and_loads_relations() {
        let conn = mock()
            .append_query_results([vec![row(2, "nut", 3), row(1, "bolt", 5)]])
            .into_connection();

        let mut loader = MockRelationLoader::<Widget>::new();
        loader.expect_load().times(1).returning(|widgets, relations| {
            assert_eq!(relations, ["supplier".to_string()]);
            Ok(widgets)
        });
        let repo = repo(conn).with_relations(loader);

        let query = QueryBuilder::new()
            .less_than("price", 10i64)
            .order_desc("id")
            .with("supplier")
            .build();
        let widgets = repo.find_all(Some(query)).await.unwrap();
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[0].id, 2);

        assert_eq!(
            transaction_log(repo),
            vec![sql(
                r#"SELECT * FROM "widgets" WHERE "price" < $1 ORDER BY "id" DESC"#,
                [Value::from(10i64)]
            )]
        );
    }

    #[tokio::test]
    async fn test_find_all_rejects_untranslatable_filter() {
        let repo = repo(mock().into_connection());
        let query = QueryBuilder::new()
            .filter(rk_queries::Filter::new(
                "price",
                rk_queries::FilterOperator::GreaterThan,
                rk_queries::FilterValue::None,
            ))
            .build();

        let err = repo.find_all(Some(query)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidQuery(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_count() {
        let conn = mock()
            .append_query_results([vec![BTreeMap::from([("count", Value::from(3i64))])]])
            .into_connection();
        let repo = repo(conn);

        let query = QueryBuilder::new().where_eq("price", 5i64).limit(1).build();
        assert_eq!(repo.count(Some(query)).await.unwrap(), 3);

        assert_eq!(
            transaction_log(repo),
            vec![sql(
                r#"SELECT COUNT(*) AS "count" FROM "widgets" WHERE "price" = $1"#,
                [Value::from(5i64)]
            )]
        );
    }

    #[tokio::test]
    async fn test_exists() {
        let conn = mock()
            .append_query_results([
                vec![BTreeMap::from([("count", Value::from(1i64))])],
                vec![BTreeMap::from([("count", Value::from(0i64))])],
            ])
            .into_connection();
        let repo = repo(conn);

        assert!(repo.exists(1i64.into()).await.unwrap());
        assert!(!repo.exists(2i64.into()).await.unwrap());
        assert!(!repo.exists(0i64.into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_sets_returned_id() {
        let name: String = Word().fake();
        let conn = mock()
            .append_query_results([vec![BTreeMap::from([("id", Value::from(15i64))])]])
            .into_connection();
        let repo = repo(conn);

        let mut widget = Widget {
            id: 0,
            name: name.clone(),
            price: 4,
        };
        repo.create(&mut widget).await.unwrap();
        assert_eq!(widget.id, 15);

        assert_eq!(
            transaction_log(repo),
            vec![sql(
                r#"INSERT INTO "widgets" ("name", "price") VALUES ($1, $2) RETURNING "id""#,
                [Value::from(name), Value::from(4i32)]
            )]
        );
    }

    #[tokio::test]
    async fn test_create_uses_schema_columns() {
        let conn = mock()
            .append_query_results([vec![BTreeMap::from([("id", Value::from(3i64))])]])
            .into_connection();

        let mut schema = MockSchemaInspector::new();
        schema
            .expect_list_table_columns()
            .times(1)
            .returning(|_| Ok(vec!["id".to_string(), "name".to_string()]));
        let repo = TableRepository::<Widget>::new(conn).with_schema(schema);

        let mut widget = Widget {
            id: 0,
            name: "washer".to_string(),
            price: 1,
        };
        repo.create(&mut widget).await.unwrap();

        assert_eq!(
            transaction_log(repo),
            vec![sql(
                r#"INSERT INTO "widgets" ("name") VALUES ($1) RETURNING "id""#,
                [Value::from("washer")]
            )]
        );
    }

    fn mysql_repo(conn: DatabaseConnection, options: RepositoryOptions) -> TableRepository<Widget> {
        repo(conn).with_options(options)
    }

    #[tokio::test]
    async fn test_create_uses_last_insert_id_without_returning() {
        let conn = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([MockExecResult {
                last_insert_id: 42,
                rows_affected: 1,
            }])
            .into_connection();
        let repo = mysql_repo(conn, RepositoryOptions::default());

        let mut widget = Widget {
            id: 0,
            name: "spring".to_string(),
            price: 2,
        };
        repo.create(&mut widget).await.unwrap();
        assert_eq!(widget.id, 42);

        assert_eq!(
            transaction_log(repo),
            vec![Transaction::from_sql_and_values(
                DatabaseBackend::MySql,
                "INSERT INTO `widgets` (`name`, `price`) VALUES (?, ?)",
                [Value::from("spring"), Value::from(2i32)]
            )]
        );
    }

    #[tokio::test]
    async fn test_create_without_generated_key_keeps_entity_id() {
        let conn = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([exec(1)])
            .into_connection();
        let options = RepositoryOptions {
            auto_increment: None,
            ..RepositoryOptions::default()
        };
        let repo = mysql_repo(conn, options);

        let mut widget = Widget {
            id: 7,
            name: "cog".to_string(),
            price: 3,
        };
        repo.create(&mut widget).await.unwrap();
        assert_eq!(widget.id, 7);

        let log = transaction_log(repo);
        assert_eq!(
            log,
            vec![Transaction::from_sql_and_values(
                DatabaseBackend::MySql,
                "INSERT INTO `widgets` (`id`, `name`, `price`) VALUES (?, ?, ?)",
                [Value::from(7i64), Value::from("cog"), Value::from(3i32)]
            )]
        );
    }

    #[tokio::test]
    async fn test_create_without_any_key_source_is_rejected() {
        let conn = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let options = RepositoryOptions {
            auto_increment: None,
            ..RepositoryOptions::default()
        };
        let repo = mysql_repo(conn, options);

        let mut widget = Widget {
            id: 0,
            name: "cog".to_string(),
            price: 3,
        };
        let err = repo.create(&mut widget).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InvalidParameter { parameter: "id", .. }
        ));
        assert_eq!(widget.id, 0);
        assert!(transaction_log(repo).is_empty());
    }

    #[tokio::test]
    async fn test_create_with_zero_last_insert_id_fails() {
        let conn = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([exec(1)])
            .into_connection();
        let repo = mysql_repo(conn, RepositoryOptions::default());

        let mut widget = Widget {
            id: 0,
            name: "cog".to_string(),
            price: 3,
        };
        let err = repo.create(&mut widget).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Database(DbErr::RecordNotInserted)
        ));
        assert_eq!(widget.id, 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_unprocessable() {
        let conn = mock()
            .append_query_errors([duplicate_key()])
            .into_connection();

        let mut widget = Widget {
            id: 0,
            name: "bolt".to_string(),
            price: 5,
        };
        let err = repo(conn).create(&mut widget).await.unwrap_err();

        match err {
            RepositoryError::UnprocessableEntity(errors) => {
                assert_eq!(errors.full_messages(), vec!["Already exists!"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(widget.id, 0);
    }

    #[tokio::test]
    async fn test_create_passes_other_errors_through() {
        let conn = mock()
            .append_query_errors([DbErr::Custom("disk full".into())])
            .into_connection();

        let mut widget = Widget {
            id: 0,
            name: "bolt".to_string(),
            price: 5,
        };
        let err = repo(conn).create(&mut widget).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Database(DbErr::Custom(_))));
    }

    #[tokio::test]
    async fn test_update() {
        let conn = mock()
            .append_query_results([vec![row(1, "bolt", 5)]])
            .append_exec_results([exec(1)])
            .into_connection();
        let repo = repo(conn);

        let widget = Widget {
            id: 1,
            name: "big bolt".to_string(),
            price: 8,
        };
        repo.update(&widget).await.unwrap();

        let log = transaction_log(repo);
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[1],
            sql(
                r#"UPDATE "widgets" SET "name" = $1, "price" = $2 WHERE "id" = $3"#,
                [
                    Value::from("big bolt"),
                    Value::from(8i32),
                    Value::from(1i64)
                ]
            )
        );
    }

    #[tokio::test]
    async fn test_update_requires_existing_row() {
        let repo = repo(mock().append_query_results([no_rows()]).into_connection());

        let ghost = Widget {
            id: 9,
            name: "ghost".to_string(),
            price: 0,
        };
        assert!(matches!(
            repo.update(&ghost).await.unwrap_err(),
            RepositoryError::NotFound { .. }
        ));

        let unsaved = Widget { id: 0, ..ghost };
        assert!(matches!(
            repo.update(&unsaved).await.unwrap_err(),
            RepositoryError::InvalidParameter { parameter: "id", .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let conn = mock()
            .append_query_results([vec![row(4, "nut", 2)]])
            .append_exec_results([exec(1)])
            .into_connection();
        let repo = repo(conn);

        repo.delete_by_id(4i64.into()).await.unwrap();

        let log = transaction_log(repo);
        assert_eq!(
            log[1],
            sql(r#"DELETE FROM "widgets" WHERE "id" = $1"#, [Value::from(4i64)])
        );
    }

    #[tokio::test]
    async fn test_delete_by_id_missing_row() {
        let repo = repo(mock().append_query_results([no_rows()]).into_connection());

        let err = repo.delete_by_id(4i64.into()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert_eq!(transaction_log(repo).len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_condition() {
        let conn = mock().append_exec_results([exec(2)]).into_connection();
        let repo = repo(conn);

        let condition = ColumnMap::new().set("name", "bolt").set("price", 5i32);
        assert_eq!(repo.delete_by_condition(condition).await.unwrap(), 2);

        assert_eq!(
            transaction_log(repo),
            vec![sql(
                r#"DELETE FROM "widgets" WHERE "name" = $1 AND "price" = $2"#,
                [Value::from("bolt"), Value::from(5i32)]
            )]
        );
    }

    #[tokio::test]
    async fn test_delete_by_empty_condition_is_rejected() {
        let repo = repo(mock().into_connection());

        let err = repo.delete_by_condition(ColumnMap::new()).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InvalidParameter {
                parameter: "condition",
                ..
            }
        ));
        assert!(transaction_log(repo).is_empty());
    }

    #[tokio::test]
    async fn test_find_page() {
        let conn = mock()
            .append_query_results([vec![BTreeMap::from([("count", Value::from(7i64))])]])
            .append_query_results([vec![row(3, "a", 1), row(4, "b", 1)]])
            .into_connection();
        let repo = repo(conn);

        let page = repo
            .find_page(None, Pagination::page(2, 2))
            .await
            .unwrap();

        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page(), 2);
        assert_eq!(page.total_pages(), 4);
        assert!(page.has_next());
    }
}
