//! Error types shared by the engine and its collaborators
//!
//! [`RepositoryError`] is what a caller of a declared operation sees. Every
//! variant except `Driver` is a programmer or configuration error raised by the
//! engine itself; `Driver` wraps a collaborator failure unchanged and adds the
//! operation name and translated SQL for diagnosis.

use thiserror::Error;

use crate::value::SqlType;

/// Boxed error source used by collaborator implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the connection, statement, and row collaborators
#[derive(Debug, Error)]
pub enum DriverError {
    /// A connection could not be acquired or was lost
    #[error("Connection error: {0}")]
    Connection(#[source] BoxError),

    /// Preparing or executing a statement failed
    #[error("Execution error: {0}")]
    Execution(#[source] BoxError),

    /// The result row has no column with the requested name
    #[error("Column '{column}' not present in result row")]
    MissingColumn { column: String },

    /// The column value could not be decoded by the driver
    #[error("Column '{column}' could not be decoded: {source}")]
    Decode {
        column: String,
        #[source]
        source: BoxError,
    },
}

impl DriverError {
    /// Creates a connection error from any error or message
    pub fn connection(source: impl Into<BoxError>) -> Self {
        DriverError::Connection(source.into())
    }

    /// Creates an execution error from any error or message
    pub fn execution(source: impl Into<BoxError>) -> Self {
        DriverError::Execution(source.into())
    }

    /// Creates a missing column error
    pub fn missing_column(column: impl Into<String>) -> Self {
        DriverError::MissingColumn {
            column: column.into(),
        }
    }

    /// Creates a decode error for a column
    pub fn decode(column: impl Into<String>, source: impl Into<BoxError>) -> Self {
        DriverError::Decode {
            column: column.into(),
            source: source.into(),
        }
    }
}

/// Errors surfaced by an operation invocation
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Operation '{operation}' is not registered")]
    UnknownOperation { operation: String },

    #[error("Operation '{operation}' is registered more than once")]
    DuplicateOperation { operation: String },

    #[error("Operation '{operation}' declares parameter '{name}' more than once")]
    DuplicateParameter { name: String, operation: String },

    #[error("Operation '{operation}' declares neither a select nor an update query")]
    MissingQueryDeclaration { operation: String },

    #[error("Parameter ':{name}' of operation '{operation}' has no matching declared parameter")]
    ParameterNotFound { name: String, operation: String },

    #[error("Null value bound to parameter ':{name}' of operation '{operation}' is not supported")]
    NullParameter { name: String, operation: String },

    #[error("Parameter ':{name}' of operation '{operation}' has unsupported type {type_name}")]
    UnsupportedParameterType {
        name: String,
        type_name: String,
        operation: String,
    },

    #[error("Property '{property}' of entity {entity} has unsupported type {type_name}")]
    UnsupportedPropertyType {
        entity: String,
        property: String,
        type_name: String,
    },

    #[error("Column '{column}' is null but property of entity {entity} is not optional")]
    NullColumn { entity: String, column: String },

    #[error("Column '{column}' value '{found}' cannot be converted to {expected} for entity {entity}")]
    ColumnConversion {
        entity: String,
        column: String,
        expected: SqlType,
        found: String,
    },

    #[error("Unexpected return type. Expected '{expected}' but was '{actual}'")]
    ReturnTypeMismatch { expected: String, actual: String },

    #[error("Operation '{operation}' failed executing `{sql}`: {source}")]
    Driver {
        operation: String,
        sql: String,
        #[source]
        source: DriverError,
    },
}

impl RepositoryError {
    pub fn unknown_operation(operation: impl Into<String>) -> Self {
        RepositoryError::UnknownOperation {
            operation: operation.into(),
        }
    }

    pub fn missing_query(operation: impl Into<String>) -> Self {
        RepositoryError::MissingQueryDeclaration {
            operation: operation.into(),
        }
    }

    pub fn return_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        RepositoryError::ReturnTypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Wraps a collaborator failure with the invocation context
    pub fn driver(operation: impl Into<String>, sql: impl Into<String>, source: DriverError) -> Self {
        RepositoryError::Driver {
            operation: operation.into(),
            sql: sql.into(),
            source,
        }
    }

    /// Checks if this error came from the connection or driver collaborator
    pub fn is_driver_error(&self) -> bool {
        matches!(self, RepositoryError::Driver { .. })
    }

    /// Checks if this error points at a mistake in the declared contract
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::UnknownOperation { .. }
                | RepositoryError::DuplicateOperation { .. }
                | RepositoryError::DuplicateParameter { .. }
                | RepositoryError::MissingQueryDeclaration { .. }
                | RepositoryError::ParameterNotFound { .. }
                | RepositoryError::UnsupportedPropertyType { .. }
                | RepositoryError::ReturnTypeMismatch { .. }
        )
    }

    /// Returns the collaborator error when this is a driver failure
    pub fn driver_source(&self) -> Option<&DriverError> {
        match self {
            RepositoryError::Driver { source, .. } => Some(source),
            _ => None,
        }
    }
}
