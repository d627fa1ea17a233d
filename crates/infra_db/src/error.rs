//! Database error types
//!
//! [`DatabaseError`] classifies SQLx failures. Inside the engine every
//! database failure travels as a [`DriverError`]; the conversion below keeps
//! the classified error as its source.

use repo_kernel::DriverError;
use thiserror::Error;

/// Errors that can occur while talking to a database
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// The configuration could not be loaded or names no supported backend
    #[error("Invalid database configuration: {0}")]
    Configuration(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check or not-null constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Any other SQLx error
    #[error("SQL error: {0}")]
    SqlError(#[source] sqlx::Error),
}

impl DatabaseError {
    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

impl From<config::ConfigError> for DatabaseError {
    fn from(error: config::ConfigError) -> Self {
        DatabaseError::Configuration(error.to_string())
    }
}

/// Maps SQLx errors to the most specific variant
///
/// Database errors are classified by SQLSTATE for PostgreSQL and by extended
/// result code for SQLite.
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Configuration(_) => DatabaseError::Configuration(error.to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    // PostgreSQL: https://www.postgresql.org/docs/current/errcodes-appendix.html
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") | Some("23502") => DatabaseError::ConstraintViolation(message),
                    // SQLite: https://www.sqlite.org/rescode.html
                    Some("2067") | Some("1555") => DatabaseError::DuplicateEntry(message),
                    Some("787") => DatabaseError::ForeignKeyViolation(message),
                    Some("275") | Some("1299") => DatabaseError::ConstraintViolation(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            other => DatabaseError::SqlError(other),
        }
    }
}

impl From<DatabaseError> for DriverError {
    fn from(error: DatabaseError) -> Self {
        if error.is_connection_error() {
            DriverError::connection(error)
        } else {
            DriverError::execution(error)
        }
    }
}
