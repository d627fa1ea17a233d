//! Collaborator ports
//!
//! The engine never talks to a database directly. It drives these traits,
//! which an infrastructure crate implements on top of a real driver (see
//! `infra_db`) and which tests implement with scripted in-memory data.
//!
//! # Lifecycle
//!
//! ```text
//! ConnectionProvider::acquire ──► Connection ──prepare──► Statement
//!                                     │                       │
//!                                     │        execute_mutation / execute_query
//!                                     │                       │
//!                                     │                       ▼
//!                                     │                   RowCursor ──next_row──► Row
//!                                     ▼
//!                                   drop = release
//! ```
//!
//! Releasing is tied to `Drop`: a cursor borrows its statement, which borrows
//! its connection, so the borrow checker guarantees cursor, statement, and
//! connection are disposed in that order on every exit path.

use async_trait::async_trait;

use crate::error::DriverError;
use crate::value::SqlValue;

/// Positional placeholder syntax expected by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaceholderStyle {
    /// `?` for every parameter (SQLite, MySQL, JDBC)
    #[default]
    Question,
    /// `$1`, `$2`, ... numbered by position (PostgreSQL)
    Dollar,
}

/// Source of connections scoped to a single invocation
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Acquires a connection; dropping it releases it
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError>;

    /// Returns the placeholder syntax the underlying driver accepts
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }
}

/// A live connection
#[async_trait]
pub trait Connection: Send {
    /// Prepares positional SQL for execution
    async fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError>;
}

/// A prepared statement bound to its connection
#[async_trait]
pub trait Statement: Send {
    /// Executes the statement as a mutation and returns the affected row count
    async fn execute_mutation(&mut self, parameters: &[SqlValue]) -> Result<u64, DriverError>;

    /// Executes the statement as a query and returns a cursor over its rows
    async fn execute_query<'s>(
        &'s mut self,
        parameters: &[SqlValue],
    ) -> Result<Box<dyn RowCursor + 's>, DriverError>;
}

/// Forward-only cursor over query results
#[async_trait]
pub trait RowCursor: Send {
    /// Returns the next row, or `None` once the results are exhausted
    async fn next_row(&mut self) -> Result<Option<Box<dyn Row>>, DriverError>;
}

/// One result row
pub trait Row: Send {
    /// Reads a column by name; `Ok(None)` is SQL NULL
    ///
    /// Implementations match column names ASCII case-insensitively and return
    /// [`DriverError::MissingColumn`] when no column matches.
    fn get(&self, column: &str) -> Result<Option<SqlValue>, DriverError>;
}
