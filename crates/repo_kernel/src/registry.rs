//! Operation Registry
//!
//! The registry is the realized form of a declared contract: a map from
//! operation name to its [`OperationSignature`]. Whatever produces the
//! contract implementation (hand-written code, a build script, a macro)
//! fills a [`RegistryBuilder`]; the dispatcher then looks operations up by
//! name on every invocation.
//!
//! # Usage
//!
//! ```rust
//! use repo_kernel::{OperationSignature, RegistryBuilder, ReturnShape};
//!
//! let registry = RegistryBuilder::new()
//!     .operation(
//!         OperationSignature::update("insert", "insert into T (c) values (:value)")
//!             .with_parameters(["value"])
//!             .returning(ReturnShape::AffectedRows),
//!     )
//!     .operation(OperationSignature::select("count", "select count(*) as n from T"))
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.contains("insert"));
//! assert_eq!(registry.len(), 2);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::RepositoryError;
use crate::operation::OperationSignature;

/// Immutable set of declared operations, keyed by name
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<OperationSignature>>,
}

impl OperationRegistry {
    /// Returns the signature registered under `name`
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownOperation` if nothing is registered
    /// under that name
    pub fn get(&self, name: &str) -> Result<Arc<OperationSignature>, RepositoryError> {
        self.operations
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::unknown_operation(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Returns the registered operation names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Builder for an [`OperationRegistry`]
///
/// Validation is deferred to [`build`](Self::build) so a whole contract can be
/// declared fluently and checked once.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    operations: Vec<OperationSignature>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation to the contract
    pub fn operation(mut self, signature: OperationSignature) -> Self {
        self.operations.push(signature);
        self
    }

    /// Adds several operations to the contract
    pub fn operations(mut self, signatures: impl IntoIterator<Item = OperationSignature>) -> Self {
        self.operations.extend(signatures);
        self
    }

    /// Validates the contract and freezes it
    ///
    /// # Errors
    ///
    /// - `RepositoryError::DuplicateOperation` if two operations share a name
    /// - `RepositoryError::DuplicateParameter` if an operation declares the
    ///   same parameter name twice
    pub fn build(self) -> Result<OperationRegistry, RepositoryError> {
        let mut operations = HashMap::with_capacity(self.operations.len());

        for signature in self.operations {
            if let Some(duplicate) = first_duplicate(signature.parameter_names()) {
                return Err(RepositoryError::DuplicateParameter {
                    name: duplicate.to_string(),
                    operation: signature.name().to_string(),
                });
            }

            let name = signature.name().to_string();
            if operations.contains_key(&name) {
                return Err(RepositoryError::DuplicateOperation { operation: name });
            }
            operations.insert(name, Arc::new(signature));
        }

        Ok(OperationRegistry { operations })
    }
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .find(|name| !seen.insert(*name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ReturnShape;

    #[test]
    fn test_empty_registry() {
        let registry = RegistryBuilder::new().build().unwrap();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = RegistryBuilder::new()
            .operation(OperationSignature::select("find_all", "select * from t").returning(ReturnShape::List("T".into())))
            .build()
            .unwrap();

        let op = registry.get("find_all").unwrap();
        assert_eq!(op.name(), "find_all");
    }

    #[test]
    fn test_unknown_operation() {
        let registry = OperationRegistry::default();
        let error = registry.get("missing").unwrap_err();
        assert!(matches!(error, RepositoryError::UnknownOperation { ref operation } if operation == "missing"));
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let result = RegistryBuilder::new()
            .operation(OperationSignature::select("find", "select 1"))
            .operation(OperationSignature::select("find", "select 2"))
            .build();

        assert!(matches!(result, Err(RepositoryError::DuplicateOperation { .. })));
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let result = RegistryBuilder::new()
            .operation(OperationSignature::select("find", "select :a").with_parameters(["a", "a"]))
            .build();

        assert!(matches!(result, Err(RepositoryError::DuplicateParameter { ref name, .. }) if name == "a"));
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = RegistryBuilder::new()
            .operations([
                OperationSignature::new("zeta"),
                OperationSignature::new("alpha"),
                OperationSignature::new("mid"),
            ])
            .build()
            .unwrap();

        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }
}
