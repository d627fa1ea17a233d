//! Named-Query Repository Engine
//!
//! Executes operations declared on a data-access contract. Each operation is
//! described by an [`OperationSignature`](repo_kernel::OperationSignature)
//! carrying a SQL template with named placeholders (`:name`), its parameter
//! names in declaration order, and the shape of its result.
//!
//! # Components
//!
//! - [`NamedQueryTranslator`] rewrites `:name` placeholders to the driver's
//!   positional syntax and records the names in order
//! - [`ParameterBinder`] lays the call arguments out in placeholder order
//! - [`RowMapper`] turns result rows into entities
//! - [`RepositoryDispatcher`] ties them together for one invocation
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_repository::RepositoryDispatcher;
//! use repo_kernel::{args, entity, OperationSignature, RegistryBuilder, ReturnShape};
//!
//! entity! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Counter {
//!         pub value: i32,
//!     }
//! }
//!
//! let registry = RegistryBuilder::new()
//!     .operation(
//!         OperationSignature::update("insert", "insert into counters (value) values (:value)")
//!             .with_parameters(["value"])
//!             .returning(ReturnShape::AffectedRows),
//!     )
//!     .operation(
//!         OperationSignature::select("find_all", "select value from counters")
//!             .returning(ReturnShape::list::<Counter>()),
//!     )
//!     .build()?;
//!
//! let dispatcher = RepositoryDispatcher::new(registry, provider);
//! assert_eq!(dispatcher.execute("insert", args![10]).await?, 1);
//! let counters: Vec<Counter> = dispatcher.fetch_all("find_all", args![]).await?;
//! ```

pub mod translator;
pub mod binder;
pub mod row_mapper;
pub mod dispatcher;

pub use translator::{NamedQueryTranslator, TranslatedQuery, TranslationCache};
pub use binder::ParameterBinder;
pub use row_mapper::{MapRowError, RowMapper};
pub use dispatcher::{RepositoryDispatcher, Returned};
