//! Operation dispatch
//!
//! [`RepositoryDispatcher`] is what a contract implementation calls for each
//! declared operation. One invocation runs through these steps:
//!
//! ```text
//! resolve ─► classify ─► translate ─► acquire ─► bind ─► prepare ─► execute ─► adapt
//!                                        │                             │
//!                                        │            Update: affected-row count
//!                                        │            Select: rows ─► RowMapper
//!                                        ▼
//!                       connection released on every exit path
//! ```
//!
//! The dispatcher holds no per-invocation state. Its only shared state is the
//! immutable registry and the translation cache, so one instance can serve
//! concurrent callers.

use std::fmt;
use std::sync::Arc;

use repo_kernel::{
    Argument, ConnectionProvider, Entity, OperationRegistry, QueryKind, RepositoryError,
    ReturnShape,
};
use tracing::debug;

use crate::binder::ParameterBinder;
use crate::row_mapper::RowMapper;
use crate::translator::{NamedQueryTranslator, TranslatedQuery, TranslationCache};

/// Result of an invocation, shaped by the operation's declared return shape
#[derive(Debug, Clone, PartialEq)]
pub enum Returned<E> {
    Unit,
    AffectedRows(u64),
    Single(Option<E>),
    List(Vec<E>),
}

impl<E: Entity> Returned<E> {
    pub fn into_unit(self) -> Result<(), RepositoryError> {
        match self {
            Returned::Unit => Ok(()),
            other => Err(RepositoryError::return_mismatch("()", other)),
        }
    }

    pub fn into_affected_rows(self) -> Result<u64, RepositoryError> {
        match self {
            Returned::AffectedRows(count) => Ok(count),
            other => Err(RepositoryError::return_mismatch("affected row count", other)),
        }
    }

    pub fn into_single(self) -> Result<Option<E>, RepositoryError> {
        match self {
            Returned::Single(entity) => Ok(entity),
            other => Err(RepositoryError::return_mismatch(ReturnShape::single::<E>(), other)),
        }
    }

    pub fn into_list(self) -> Result<Vec<E>, RepositoryError> {
        match self {
            Returned::List(entities) => Ok(entities),
            other => Err(RepositoryError::return_mismatch(ReturnShape::list::<E>(), other)),
        }
    }
}

impl<E: Entity> fmt::Display for Returned<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Returned::Unit => f.write_str("()"),
            Returned::AffectedRows(_) => f.write_str("affected row count"),
            Returned::Single(_) => write!(f, "Option<{}>", E::NAME),
            Returned::List(_) => write!(f, "Vec<{}>", E::NAME),
        }
    }
}

/// What execution produced, before adaptation to the declared shape
enum Outcome<E> {
    AffectedRows(u64),
    Rows(Vec<E>),
}

impl<E: Entity> Outcome<E> {
    fn describe(&self) -> String {
        match self {
            Outcome::AffectedRows(_) => "affected row count".to_string(),
            Outcome::Rows(_) => format!("Vec<{}>", E::NAME),
        }
    }
}

/// Executes declared operations by name
///
/// # Example
///
/// ```rust,ignore
/// use domain_repository::RepositoryDispatcher;
/// use repo_kernel::args;
///
/// let dispatcher = RepositoryDispatcher::new(registry, provider);
/// let inserted = dispatcher.execute("insert", args![10]).await?;
/// let rows: Vec<Counter> = dispatcher.fetch_all("find_all", args![]).await?;
/// ```
#[derive(Clone)]
pub struct RepositoryDispatcher {
    registry: Arc<OperationRegistry>,
    provider: Arc<dyn ConnectionProvider>,
    translations: Arc<TranslationCache>,
    binder: ParameterBinder,
}

impl RepositoryDispatcher {
    /// Creates a dispatcher translating templates into the provider's
    /// placeholder style
    pub fn new(registry: OperationRegistry, provider: Arc<dyn ConnectionProvider>) -> Self {
        let translator = NamedQueryTranslator::new(provider.placeholder_style());
        Self {
            registry: Arc::new(registry),
            provider,
            translations: Arc::new(TranslationCache::new(translator)),
            binder: ParameterBinder,
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Returns the translated query of an operation
    pub fn translated(&self, operation: &str) -> Result<Arc<TranslatedQuery>, RepositoryError> {
        let signature = self.registry.get(operation)?;
        let query = signature
            .query()
            .ok_or_else(|| RepositoryError::missing_query(operation))?;
        Ok(self.translations.get(query.raw_text()))
    }

    /// Invokes an operation, mapping any rows into `E`
    ///
    /// Use `()` for `E` when the operation maps no rows.
    ///
    /// # Errors
    ///
    /// - `UnknownOperation` if nothing is registered under `operation`
    /// - `MissingQueryDeclaration` if the operation has no query; no
    ///   connection is acquired in that case
    /// - binding errors from [`ParameterBinder::bind`]
    /// - mapping errors from [`RowMapper`]
    /// - `ReturnTypeMismatch` if the result does not fit the declared shape,
    ///   or the declared entity is not `E`
    /// - `Driver` for any collaborator failure, with the operation name and
    ///   translated SQL attached
    ///
    /// # Panics
    ///
    /// Panics if the number of arguments differs from the number of declared
    /// parameters.
    pub async fn invoke<E: Entity>(
        &self,
        operation: &str,
        arguments: Vec<Argument>,
    ) -> Result<Returned<E>, RepositoryError> {
        let signature = self.registry.get(operation)?;
        let query = signature
            .query()
            .ok_or_else(|| RepositoryError::missing_query(operation))?;
        let translated = self.translations.get(query.raw_text());
        let sql = translated.positional_sql();
        let driver_error = |source| RepositoryError::driver(operation, sql, source);

        let mut connection = self.provider.acquire().await.map_err(driver_error)?;
        let parameters =
            self.binder
                .bind(&translated, signature.parameter_names(), &arguments, operation)?;

        debug!(
            operation,
            sql,
            kind = ?query.kind(),
            parameters = parameters.len(),
            "Executing operation"
        );

        let mut statement = connection.prepare(sql).await.map_err(driver_error)?;

        let outcome = match query.kind() {
            QueryKind::Update => {
                let affected = statement
                    .execute_mutation(&parameters)
                    .await
                    .map_err(driver_error)?;
                debug!(operation, affected, "Mutation complete");
                Outcome::AffectedRows(affected)
            }
            QueryKind::Select => {
                let mapper = RowMapper::<E>::new()?;
                let limit = match signature.return_shape() {
                    ReturnShape::Single(entity) if entity == E::NAME => Some(1),
                    ReturnShape::List(entity) if entity == E::NAME => None,
                    _ => Some(0),
                };

                let mut cursor = statement
                    .execute_query(&parameters)
                    .await
                    .map_err(driver_error)?;
                let rows = mapper
                    .map_all(cursor.as_mut(), limit)
                    .await
                    .map_err(|e| e.into_repository_error(operation, sql))?;
                debug!(operation, rows = rows.len(), "Query complete");
                Outcome::Rows(rows)
            }
        };

        adapt(signature.return_shape(), outcome)
    }

    /// Invokes an update operation declared to return its affected-row count
    pub async fn execute(&self, operation: &str, arguments: Vec<Argument>) -> Result<u64, RepositoryError> {
        self.invoke::<()>(operation, arguments).await?.into_affected_rows()
    }

    /// Invokes an operation declared to return nothing
    pub async fn run(&self, operation: &str, arguments: Vec<Argument>) -> Result<(), RepositoryError> {
        self.invoke::<()>(operation, arguments).await?.into_unit()
    }

    /// Invokes a select operation declared to return a single `E`
    ///
    /// Returns `None` when the query yields no rows. When it yields several,
    /// the first is returned and the rest are not read.
    pub async fn fetch_one<E: Entity>(
        &self,
        operation: &str,
        arguments: Vec<Argument>,
    ) -> Result<Option<E>, RepositoryError> {
        self.invoke::<E>(operation, arguments).await?.into_single()
    }

    /// Invokes a select operation declared to return a list of `E`
    pub async fn fetch_all<E: Entity>(
        &self,
        operation: &str,
        arguments: Vec<Argument>,
    ) -> Result<Vec<E>, RepositoryError> {
        self.invoke::<E>(operation, arguments).await?.into_list()
    }
}

fn adapt<E: Entity>(shape: &ReturnShape, outcome: Outcome<E>) -> Result<Returned<E>, RepositoryError> {
    match (shape, outcome) {
        (ReturnShape::Unit, _) => Ok(Returned::Unit),
        (ReturnShape::AffectedRows, Outcome::AffectedRows(count)) => Ok(Returned::AffectedRows(count)),
        (ReturnShape::Single(entity), Outcome::Rows(rows)) if entity == E::NAME => {
            Ok(Returned::Single(rows.into_iter().next()))
        }
        (ReturnShape::List(entity), Outcome::Rows(rows)) if entity == E::NAME => Ok(Returned::List(rows)),
        (shape, outcome) => Err(RepositoryError::return_mismatch(shape, outcome.describe())),
    }
}
