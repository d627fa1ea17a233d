//! Database Test Utilities
//!
//! Provides real databases for end-to-end tests: a private in-memory SQLite
//! database, and a PostgreSQL testcontainer for tests that have Docker.

use std::sync::Arc;
use std::time::Duration;

use infra_db::{DatabaseProvider, PgConnectionProvider, SqliteConnectionProvider};
use repo_kernel::ConnectionProvider;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "repository_test";

/// Result type of test helpers and test functions
pub type TestResult<T> = anyhow::Result<T>;

/// Connection settings of the PostgreSQL test container
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A database for one test, dropped with it
pub struct TestDatabase {
    provider: DatabaseProvider,
    _container: Option<ContainerAsync<GenericImage>>,
}

impl TestDatabase {
    /// Opens a private in-memory SQLite database
    ///
    /// The pool holds a single connection that never expires, since the
    /// database disappears with the connection that created it.
    pub async fn sqlite() -> TestResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self {
            provider: DatabaseProvider::Sqlite(SqliteConnectionProvider::new(pool)),
            _container: None,
        })
    }

    /// Starts a PostgreSQL container and connects to it
    ///
    /// # Errors
    ///
    /// Returns an error if Docker is unavailable or the container fails to
    /// start
    pub async fn postgres() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        Ok(Self {
            provider: DatabaseProvider::Postgres(PgConnectionProvider::new(pool)),
            _container: Some(container),
        })
    }

    pub fn provider(&self) -> &DatabaseProvider {
        &self.provider
    }

    /// Returns the provider ready to hand to a dispatcher
    pub fn shared_provider(&self) -> Arc<dyn ConnectionProvider> {
        Arc::new(self.provider.clone())
    }

    /// Runs raw SQL, e.g. schema creation or seed data
    pub async fn execute(&self, sql: &str) -> TestResult<()> {
        match &self.provider {
            DatabaseProvider::Postgres(provider) => {
                sqlx::raw_sql(sql).execute(provider.pool()).await?;
            }
            DatabaseProvider::Sqlite(provider) => {
                sqlx::raw_sql(sql).execute(provider.pool()).await?;
            }
        }
        Ok(())
    }

    /// Counts the rows of `table`
    pub async fn count_rows(&self, table: &str) -> TestResult<i64> {
        let sql = format!("select count(*) from {}", table);
        let count = match &self.provider {
            DatabaseProvider::Postgres(provider) => {
                sqlx::query_scalar(&sql).fetch_one(provider.pool()).await?
            }
            DatabaseProvider::Sqlite(provider) => {
                sqlx::query_scalar(&sql).fetch_one(provider.pool()).await?
            }
        };
        Ok(count)
    }
}
