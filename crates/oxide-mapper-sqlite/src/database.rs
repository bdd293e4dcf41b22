//! Running mapper plans against a SQLite pool.

use std::sync::Arc;

use oxide_mapper_core::dialect::SqliteDialect;
use oxide_mapper_core::error::{Error, HydrationError};
use oxide_mapper_core::hydrate::Hydrator;
use oxide_mapper_core::record::{Record, RecordValue};
use oxide_mapper_core::schema::{SchemaFactory, TypeSchema, VersionKind};
use oxide_mapper_core::snapshot::Snapshot;
use oxide_mapper_core::statement::{KeyRetrieval, Query, QueryPlan, StatementBuilder, UpdatePlan};
use oxide_mapper_core::value::SqlValue;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::{DatabaseError, Result};
use crate::rows::{bound, cell, cursor};

/// A SQLite database accessed through record types.
///
/// Every call reads all of its rows before hydration starts, so a dropped
/// future never leaves a partially built result behind.
///
/// # Example
///
/// ```ignore
/// let db = Database::connect("sqlite::memory:").await?;
/// let adults: Vec<Person> = db
///     .fetch(&Query::new().filter(member("age").ge(18)))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    factory: Arc<SchemaFactory>,
    dialect: SqliteDialect,
}

impl Database {
    /// Wraps an existing pool with a fresh schema factory.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            factory: Arc::new(SchemaFactory::new()),
            dialect: SqliteDialect::new(),
        }
    }

    /// Opens a pool on `url`.
    ///
    /// # Errors
    ///
    /// Returns the sqlx error if the database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Uses `factory` for schema resolution.
    #[must_use]
    pub fn with_factory(mut self, factory: impl Into<Arc<SchemaFactory>>) -> Self {
        self.factory = factory.into();
        self
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub fn factory(&self) -> &SchemaFactory {
        &self.factory
    }

    #[must_use]
    pub const fn dialect(&self) -> &SqliteDialect {
        &self.dialect
    }

    /// Rows of `T` matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the query does not compile, fails to
    /// run or a row does not hydrate.
    pub async fn fetch<T: Record>(&self, query: &Query) -> Result<Vec<T>> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).select(query)?;
        self.read(&plan).await
    }

    /// Rows of `T` returned by hand-written SQL.
    ///
    /// Text starting with `WHERE` or `FROM` is completed into a SELECT of
    /// `T`'s columns. Parameters are referenced as `@0`, `@1`, ...
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn fetch_sql<T: Record>(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<T>> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).raw(sql, params)?;
        self.read(&plan).await
    }

    /// The row of `T` with primary key `key`, if any.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn single_by_key<T: Record>(&self, key: &[SqlValue]) -> Result<Option<T>> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).single_by_key(key)?;
        Ok(self.read(&plan).await?.into_iter().next())
    }

    /// One page of `query`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn page<T: Record>(&self, query: &Query, skip: i64, take: i64) -> Result<Vec<T>> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).page(query, skip, take)?;
        self.read(&plan).await
    }

    /// Number of rows of `T` matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the query does not compile or fails.
    pub async fn count<T: Record>(&self, query: &Query) -> Result<i64> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).count(query)?;
        match self.scalar_plan(&plan).await? {
            SqlValue::Int(n) => Ok(n),
            other => Err(DatabaseError::NoRows(format!("COUNT returned {}", other.kind()))),
        }
    }

    /// Parents `P` joined with their children `C`, grouped by parent key.
    ///
    /// `sql` must return the parent columns followed by the child columns,
    /// ordered by parent key.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch), or a hydration error if `P` has no
    /// collection of `C`.
    pub async fn fetch_one_to_many<P: Record, C: Record>(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<Vec<P>> {
        let plan = QueryPlan::raw(sql, params, &self.dialect)?;
        let rows = bound(&plan).fetch_all(&self.pool).await?;
        let mut rows = cursor(&rows)?;
        Ok(Hydrator::new(&self.factory).read_one_to_many::<P, C>(&mut rows)?)
    }

    /// Runs a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the statement fails.
    pub async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<u64> {
        let plan = QueryPlan::raw(sql, params, &self.dialect)?;
        let result = bound(&plan).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// First column of the first row returned by `sql`, or `NULL`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the statement fails.
    pub async fn scalar(&self, sql: &str, params: Vec<SqlValue>) -> Result<SqlValue> {
        let plan = QueryPlan::raw(sql, params, &self.dialect)?;
        self.scalar_plan(&plan).await
    }

    /// Inserts `record` and writes the generated key and initial version
    /// back into it.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the statement fails or the key does
    /// not fit the key field.
    pub async fn insert<T: Record>(&self, record: &mut T) -> Result<()> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).insert(&record.to_record())?;
        let mut conn = self.pool.acquire().await?;

        let key = match &plan.key {
            KeyRetrieval::Returned => {
                let row = bound(&plan.statement).fetch_one(&mut *conn).await?;
                Some(cell(&row, 0)?)
            }
            KeyRetrieval::Query(query) => {
                bound(&plan.statement).execute(&mut *conn).await?;
                Some(scalar_on(&mut conn, query).await?)
            }
            KeyRetrieval::None => {
                bound(&plan.statement).execute(&mut *conn).await?;
                None
            }
        };

        let mut written = RecordValue::new();
        if let (Some(path), Some(key)) = (&plan.key_path, key) {
            debug!(table = schema.table_name(), key = ?key, "inserted row");
            written.set_path(path.as_slice(), key);
        }
        if let Some(version) = &plan.version {
            if let Some(next) = &version.next {
                written.set_path(version.path.as_slice(), next.clone());
            }
        }
        write_back(&schema, record, written)
    }

    /// Updates every writable column of `record`.
    ///
    /// Returns the number of affected rows; `0` means the row is gone or
    /// its version no longer matches. On success the new version is
    /// written back into `record`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the statement fails.
    pub async fn update<T: Record>(&self, record: &mut T) -> Result<u64> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).update(&record.to_record(), None)?;
        self.run_update(&schema, record, &plan).await
    }

    /// Updates only the columns changed since `snapshot` was captured.
    ///
    /// Returns `0` without touching the database when nothing changed. On
    /// success the snapshot's baseline moves to the written values.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if the statement fails.
    pub async fn update_changes<T: Record>(&self, snapshot: &mut Snapshot<T>) -> Result<u64> {
        let schema = self.factory.schema::<T>()?;
        let diff = snapshot.diff();
        let Some(plan) = self
            .builder(&schema)
            .update_changes(&snapshot.tracked().to_record(), &diff)?
        else {
            return Ok(0);
        };
        let affected = self.run_update(&schema, snapshot.tracked_mut(), &plan).await?;
        if affected > 0 {
            snapshot.accept_changes();
        }
        Ok(affected)
    }

    /// Deletes the row `record` was read from.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if `T` has no primary key or the
    /// statement fails.
    pub async fn delete<T: Record>(&self, record: &T) -> Result<u64> {
        let schema = self.factory.schema::<T>()?;
        let plan = self.builder(&schema).delete(&record.to_record())?;
        let result = bound(&plan).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    fn builder<'a>(&'a self, schema: &'a TypeSchema) -> StatementBuilder<'a> {
        StatementBuilder::new(schema, &self.dialect)
    }

    async fn read<T: Record>(&self, plan: &QueryPlan) -> Result<Vec<T>> {
        let rows = bound(plan).fetch_all(&self.pool).await?;
        let mut rows = cursor(&rows)?;
        Ok(Hydrator::new(&self.factory).read::<T>(&mut rows)?)
    }

    async fn scalar_plan(&self, plan: &QueryPlan) -> Result<SqlValue> {
        let mut conn = self.pool.acquire().await?;
        scalar_on(&mut conn, plan).await
    }

    async fn run_update<T: Record>(&self, schema: &TypeSchema, record: &mut T, plan: &UpdatePlan) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        let affected = bound(&plan.statement).execute(&mut *conn).await?.rows_affected();
        if affected == 0 {
            debug!(table = schema.table_name(), "update matched no rows");
            return Ok(0);
        }

        let mut written = RecordValue::new();
        if let Some(version) = &plan.version {
            let next = match (&version.kind, &plan.read_back) {
                (VersionKind::RowVersion, Some(read_back)) => Some(scalar_on(&mut conn, read_back).await?),
                _ => version.next.clone(),
            };
            if let Some(next) = next {
                written.set_path(version.path.as_slice(), next);
            }
        }
        write_back(schema, record, written)?;
        Ok(affected)
    }
}

async fn scalar_on(conn: &mut SqliteConnection, plan: &QueryPlan) -> Result<SqlValue> {
    match bound(plan).fetch_optional(&mut *conn).await? {
        Some(row) => Ok(cell(&row, 0)?),
        None => Ok(SqlValue::Null),
    }
}

fn write_back<T: Record>(schema: &TypeSchema, record: &mut T, written: RecordValue) -> Result<()> {
    if written.is_empty() {
        return Ok(());
    }
    record.apply_record(written).map_err(|source| {
        DatabaseError::Mapper(Error::Hydration(HydrationError::Record {
            type_name: schema.type_name().to_string(),
            source,
        }))
    })
}
