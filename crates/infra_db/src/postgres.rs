//! PostgreSQL connection provider
//!
//! Placeholders are numbered (`$1`, `$2`, ...). Columns are decoded by their
//! declared type; types outside the supported set fail with a decode error
//! naming the column.
//!
//! Statements are never cached on the connection. Each execution prepares an
//! unnamed statement typed after the values actually bound, and the server
//! casts them to the column types.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use repo_kernel::{
    Connection, ConnectionProvider, DriverError, PlaceholderStyle, Row, RowCursor, SqlValue,
    Statement,
};
use rust_decimal::Decimal;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnection, PgPool, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::error::DatabaseError;

/// Hands out pooled PostgreSQL connections
#[derive(Debug, Clone)]
pub struct PgConnectionProvider {
    pool: PgPool,
}

impl PgConnectionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionProvider for PgConnectionProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError> {
        let connection = self.pool.acquire().await.map_err(DatabaseError::from)?;
        Ok(Box::new(PooledPgConnection { connection }))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }
}

struct PooledPgConnection {
    connection: PoolConnection<Postgres>,
}

#[async_trait]
impl Connection for PooledPgConnection {
    async fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        let connection: &'c mut PgConnection = &mut self.connection;
        Ok(Box::new(PgPreparedStatement {
            connection,
            sql: sql.to_string(),
        }))
    }
}

struct PgPreparedStatement<'c> {
    connection: &'c mut PgConnection,
    sql: String,
}

#[async_trait]
impl<'c> Statement for PgPreparedStatement<'c> {
    async fn execute_mutation(&mut self, parameters: &[SqlValue]) -> Result<u64, DriverError> {
        let result = bind_all(sqlx::query(&self.sql).persistent(false), parameters)
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
        let mut rows = bind_all(sqlx::query(sql.as_str()).persistent(false), parameters).fetch(&mut **connection);
        let first = rows.try_next().await.map_err(DatabaseError::from)?;
        let exhausted = first.is_none();

        Ok(Box::new(PgRowCursor {
            first,
            rows,
            exhausted,
        }))
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    parameters: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for parameter in parameters {
        query = match parameter {
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            // No single-byte integer type in PostgreSQL
            SqlValue::TinyInt(v) => query.bind(i16::from(*v)),
            SqlValue::SmallInt(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::BigInt(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Double(v) => query.bind(*v),
            SqlValue::Decimal(v) => query.bind(*v),
            SqlValue::Char(v) => query.bind(v.to_string()),
        };
    }
    query
}

struct PgRowCursor<'s> {
    first: Option<PgRow>,
    rows: BoxStream<'s, Result<PgRow, sqlx::Error>>,
    exhausted: bool,
}

#[async_trait]
impl<'s> RowCursor for PgRowCursor<'s> {
    async fn next_row(&mut self) -> Result<Option<Box<dyn Row>>, DriverError> {
        let next = match self.first.take() {
            Some(row) => Some(row),
            None if self.exhausted => None,
            None => self.rows.try_next().await.map_err(DatabaseError::from)?,
        };

        match next {
            Some(row) => Ok(Some(Box::new(PgResultRow { row }))),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}

struct PgResultRow {
    row: PgRow,
}

impl Row for PgResultRow {
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
        let type_name = raw.type_info().name().to_string();

        let value = match type_name.as_str() {
            "BOOL" => SqlValue::Bool(self.decode(index, column)?),
            "INT2" => SqlValue::SmallInt(self.decode(index, column)?),
            "INT4" => SqlValue::Int(self.decode(index, column)?),
            "INT8" => SqlValue::BigInt(self.decode(index, column)?),
            "FLOAT4" => SqlValue::Float(self.decode(index, column)?),
            "FLOAT8" => SqlValue::Double(self.decode(index, column)?),
            "NUMERIC" => SqlValue::Decimal(self.decode::<Decimal>(index, column)?),
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => SqlValue::Text(self.decode(index, column)?),
            other => {
                return Err(DriverError::decode(
                    column,
                    format!("unsupported PostgreSQL type {}", other),
                ))
            }
        };

        Ok(Some(value))
    }
}

impl PgResultRow {
    fn decode<T>(&self, index: usize, column: &str) -> Result<T, DriverError>
    where
        T: for<'r> sqlx::Decode<'r, Postgres>,
    {
        self.row
            .try_get_unchecked(index)
            .map_err(|e| DriverError::decode(column, e))
    }
}
