//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! repository engine test suite.
//!
//! # Modules
//!
//! - `mock`: Scripted in-memory connection provider that records its use
//! - `fixtures`: Entities and operation declarations shared across suites
//! - `database`: Real databases for end-to-end tests
//! - `generators`: Property-based test data generators

pub mod mock;
pub mod fixtures;
pub mod database;
pub mod generators;

pub use mock::*;
pub use fixtures::*;
pub use database::*;
pub use generators::*;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING: OnceCell<()> = OnceCell::new();

/// Installs a test-friendly tracing subscriber once per process
///
/// The filter comes from `RUST_LOG` and defaults to `debug` for the
/// workspace crates. Output goes through the test harness's capture.
pub fn init_test_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("domain_repository=debug,infra_db=debug"));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer().with_target(true))
            .try_init();
    });
}
