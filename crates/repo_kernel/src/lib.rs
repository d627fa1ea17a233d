//! Repository Kernel - Foundational types for the named-query repository engine
//!
//! This crate provides the building blocks shared by the engine, its
//! infrastructure adapters, and contract implementations:
//! - SQL value and type tags used for binding and row mapping
//! - Operation signatures and the registry that realizes a contract
//! - Entity descriptors for row-mapping targets
//! - Collaborator ports for connections, statements, and cursors
//! - The error taxonomy surfaced by invocations

pub mod value;
pub mod error;
pub mod entity;
pub mod operation;
pub mod registry;
pub mod ports;

pub use value::{Argument, IntoArgument, SqlType, SqlValue};
pub use error::{BoxError, DriverError, RepositoryError};
pub use entity::{Entity, EntityDescriptor, Property, PropertyDescriptor, PropertyType, Setter};
pub use operation::{OperationSignature, QueryKind, QueryTemplate, ReturnShape};
pub use registry::{OperationRegistry, RegistryBuilder};
pub use ports::{Connection, ConnectionProvider, PlaceholderStyle, Row, RowCursor, Statement};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::OnceCell;
}
