//! SQLite connection provider
//!
//! SQLite stores every value in one of a few storage classes, so columns are
//! decoded by the class of the value actually read: integers come back as
//! `BigInt`, reals as `Double`, and the row mapper narrows them to the
//! property type. `Decimal` and `Char` arguments are bound as text.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use repo_kernel::{
    Connection, ConnectionProvider, DriverError, PlaceholderStyle, Row, RowCursor, SqlValue,
    Statement,
};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Column, Executor, Row as _, TypeInfo, ValueRef};

use crate::error::DatabaseError;

/// Hands out pooled SQLite connections
#[derive(Debug, Clone)]
pub struct SqliteConnectionProvider {
    pool: SqlitePool,
}

impl SqliteConnectionProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionProvider for SqliteConnectionProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError> {
        let connection = self.pool.acquire().await.map_err(DatabaseError::from)?;
        Ok(Box::new(PooledSqliteConnection { connection }))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }
}

/// Returned to the pool on drop
struct PooledSqliteConnection {
    connection: PoolConnection<Sqlite>,
}

#[async_trait]
impl Connection for PooledSqliteConnection {
    async fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        let connection: &'c mut SqliteConnection = &mut self.connection;
        Executor::prepare(&mut *connection, sql)
            .await
            .map_err(DatabaseError::from)?;

        Ok(Box::new(SqlitePreparedStatement {
            connection,
            sql: sql.to_string(),
        }))
    }
}

/// Statement text bound to its connection
///
/// SQLx caches prepared statements per connection, so executing the same text
/// after [`Connection::prepare`] reuses the prepared handle.
struct SqlitePreparedStatement<'c> {
    connection: &'c mut SqliteConnection,
    sql: String,
}

#[async_trait]
impl<'c> Statement for SqlitePreparedStatement<'c> {
    async fn execute_mutation(&mut self, parameters: &[SqlValue]) -> Result<u64, DriverError> {
        let query = bind_all(sqlx::query(&self.sql), parameters);
        let result = query
            .execute(&mut *self.connection)
            .await
            .map_err(DatabaseError::from)?;
        Ok(result.rows_affected())
    }

    async fn execute_query<'s>(
        &'s mut self,
        parameters: &[SqlValue],
    ) -> Result<Box<dyn RowCursor + 's>, DriverError> {
        let Self { connection, sql } = self;
        let mut rows = bind_all(sqlx::query(sql.as_str()), parameters).fetch(&mut **connection);

        // Pull the first row so the statement runs even if no row is read.
        let first = rows.try_next().await.map_err(DatabaseError::from)?;
        let exhausted = first.is_none();

        Ok(Box::new(SqliteRowCursor {
            first,
            rows,
            exhausted,
        }))
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    parameters: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for parameter in parameters {
        query = match parameter {
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::TinyInt(v) => query.bind(*v),
            SqlValue::SmallInt(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::BigInt(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Double(v) => query.bind(*v),
            SqlValue::Decimal(v) => query.bind(v.to_string()),
            SqlValue::Char(v) => query.bind(v.to_string()),
        };
    }
    query
}

struct SqliteRowCursor<'s> {
    first: Option<SqliteRow>,
    rows: BoxStream<'s, Result<SqliteRow, sqlx::Error>>,
    exhausted: bool,
}

#[async_trait]
impl<'s> RowCursor for SqliteRowCursor<'s> {
    async fn next_row(&mut self) -> Result<Option<Box<dyn Row>>, DriverError> {
        let next = match self.first.take() {
            Some(row) => Some(row),
            None if self.exhausted => None,
            None => self.rows.try_next().await.map_err(DatabaseError::from)?,
        };

        match next {
            Some(row) => Ok(Some(Box::new(SqliteResultRow { row }))),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}

struct SqliteResultRow {
    row: SqliteRow,
}

impl Row for SqliteResultRow {
    fn get(&self, column: &str) -> Result<Option<SqlValue>, DriverError> {
        let index = self
            .row
            .columns()
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(column))
            .ok_or_else(|| DriverError::missing_column(column))?;

        let raw = self
            .row
            .try_get_raw(index)
            .map_err(|e| DriverError::decode(column, e))?;
        if raw.is_null() {
            return Ok(None);
        }
        let storage_class = raw.type_info().name().to_ascii_uppercase();

        let value = match storage_class.as_str() {
            "INTEGER" => SqlValue::BigInt(self.decode(index, column)?),
            "REAL" => SqlValue::Double(self.decode(index, column)?),
            "TEXT" => SqlValue::Text(self.decode(index, column)?),
            other => {
                return Err(DriverError::decode(
                    column,
                    format!("unsupported SQLite storage class {}", other),
                ))
            }
        };

        Ok(Some(value))
    }
}

impl SqliteResultRow {
    fn decode<T>(&self, index: usize, column: &str) -> Result<T, DriverError>
    where
        T: for<'r> sqlx::Decode<'r, Sqlite>,
    {
        self.row
            .try_get_unchecked(index)
            .map_err(|e| DriverError::decode(column, e))
    }
}
