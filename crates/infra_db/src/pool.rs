//! Database connection pool management
//!
//! This module provides pool configuration and creation for PostgreSQL and
//! SQLite. The backend is chosen from the URL scheme.

use std::time::Duration;

use async_trait::async_trait;
use repo_kernel::{Connection, ConnectionProvider, DriverError, PlaceholderStyle};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::error::DatabaseError;
use crate::postgres::PgConnectionProvider;
use crate::sqlite::SqliteConnectionProvider;

/// Prefix of the environment variables read by [`DatabaseConfig::from_env`]
pub const ENV_PREFIX: &str = "REPO";

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

/// Configuration options for the database connection pool
///
/// # Example
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("postgres://localhost/app")
///     .max_connections(20)
///     .min_connections(5)
///     .connect_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string, `postgres://...` or `sqlite:...`
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Seconds to wait when acquiring a connection
    pub connect_timeout_secs: u64,
    /// Maximum lifetime of a connection in seconds
    pub max_lifetime_secs: u64,
    /// Idle seconds before a connection is closed
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Creates a new database configuration with the given connection URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
            max_lifetime_secs: 30 * 60,
            idle_timeout_secs: 10 * 60,
        }
    }

    /// Loads configuration from `REPO_*` environment variables
    ///
    /// A `.env` file in the working directory is read first when present.
    /// Unset variables keep their defaults, so only `REPO_URL` is usually
    /// needed.
    pub fn from_env() -> Result<Self, DatabaseError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Sets the maximum number of connections in the pool (default: 10)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections to maintain (default: 2)
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the acquire timeout (default: 30s)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the maximum lifetime of a connection (default: 30 min)
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime_secs = lifetime.as_secs();
        self
    }

    /// Sets the idle timeout before closing a connection (default: 10 min)
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_secs = timeout.as_secs();
        self
    }

    /// Determines the backend from the URL scheme
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Configuration` for any other scheme
    pub fn backend(&self) -> Result<Backend, DatabaseError> {
        if self.url.starts_with("postgres://") || self.url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if self.url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            Err(DatabaseError::Configuration(format!(
                "unsupported database URL scheme in '{}'",
                self.url
            )))
        }
    }

    /// Checks if the URL names a private in-memory SQLite database
    pub fn is_sqlite_memory(&self) -> bool {
        self.url.starts_with("sqlite:") && self.url.contains(":memory:")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("sqlite::memory:")
    }
}

/// Connection provider for whichever backend the configuration named
#[derive(Debug, Clone)]
pub enum DatabaseProvider {
    Postgres(PgConnectionProvider),
    Sqlite(SqliteConnectionProvider),
}

impl DatabaseProvider {
    pub fn backend(&self) -> Backend {
        match self {
            DatabaseProvider::Postgres(_) => Backend::Postgres,
            DatabaseProvider::Sqlite(_) => Backend::Sqlite,
        }
    }
}

#[async_trait]
impl ConnectionProvider for DatabaseProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError> {
        match self {
            DatabaseProvider::Postgres(provider) => provider.acquire().await,
            DatabaseProvider::Sqlite(provider) => provider.acquire().await,
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            DatabaseProvider::Postgres(provider) => provider.placeholder_style(),
            DatabaseProvider::Sqlite(provider) => provider.placeholder_style(),
        }
    }
}

/// Creates a pool with the given configuration and wraps it in a provider
///
/// An in-memory SQLite database exists only inside the connection that
/// opened it, so for `sqlite::memory:` the pool holds exactly one connection
/// that never expires.
///
/// # Errors
///
/// - `DatabaseError::Configuration` if the URL scheme is not supported
/// - `DatabaseError::ConnectionFailed` if the pool cannot be created
///
/// # Example
///
/// ```rust,ignore
/// use infra_db::{connect, DatabaseConfig};
///
/// let provider = connect(&DatabaseConfig::new("sqlite::memory:")).await?;
/// ```
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseProvider, DatabaseError> {
    let backend = config.backend()?;
    info!(
        ?backend,
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database pool"
    );

    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
    let max_lifetime = Duration::from_secs(config.max_lifetime_secs);
    let idle_timeout = Duration::from_secs(config.idle_timeout_secs);

    let provider = match backend {
        Backend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(connect_timeout)
                .max_lifetime(max_lifetime)
                .idle_timeout(idle_timeout)
                .connect(&config.url)
                .await
                .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            DatabaseProvider::Postgres(PgConnectionProvider::new(pool))
        }
        Backend::Sqlite => {
            let options = if config.is_sqlite_memory() {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .max_lifetime(None)
                    .idle_timeout(None)
            } else {
                SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections)
                    .max_lifetime(max_lifetime)
                    .idle_timeout(idle_timeout)
            };
            let pool = options
                .acquire_timeout(connect_timeout)
                .connect(&config.url)
                .await
                .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            DatabaseProvider::Sqlite(SqliteConnectionProvider::new(pool))
        }
    };

    info!("Database pool created successfully");
    Ok(provider)
}
