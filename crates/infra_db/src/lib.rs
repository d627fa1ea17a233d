//! Infrastructure Database Layer
//!
//! Implements the repository engine's connection ports on top of SQLx, for
//! PostgreSQL and SQLite.
//!
//! # Architecture
//!
//! The engine in `domain_repository` only sees the traits in
//! `repo_kernel::ports`. This crate provides:
//! - [`DatabaseConfig`] and [`connect`], which build a pool for the backend
//!   named by the URL scheme
//! - [`PgConnectionProvider`] and [`SqliteConnectionProvider`], which hand
//!   out pooled connections, bind [`SqlValue`](repo_kernel::SqlValue)s, and
//!   decode result columns
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_repository::RepositoryDispatcher;
//! use infra_db::{connect, DatabaseConfig};
//!
//! let provider = connect(&DatabaseConfig::from_env()?).await?;
//! let dispatcher = RepositoryDispatcher::new(registry, Arc::new(provider));
//! ```

pub mod pool;
pub mod error;
pub mod postgres;
pub mod sqlite;

pub use pool::{connect, Backend, DatabaseConfig, DatabaseProvider};
pub use error::DatabaseError;
pub use postgres::PgConnectionProvider;
pub use sqlite::SqliteConnectionProvider;
