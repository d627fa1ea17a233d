//! Parameter binding
//!
//! Matches the placeholder names of a translated query against an operation's
//! declared parameter names and lays the call arguments out positionally.

use repo_kernel::{Argument, RepositoryError, SqlValue};

use crate::translator::TranslatedQuery;

/// Lays out call arguments in placeholder order
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    /// Binds `arguments` to the placeholders of `query`
    ///
    /// Each placeholder name is looked up among `declared_names`; the argument
    /// at the matching index fills the next positional slot. A name used
    /// several times in the template is bound once per use.
    ///
    /// # Errors
    ///
    /// - `ParameterNotFound` if a placeholder has no declared parameter
    /// - `NullParameter` if the matched argument is null
    /// - `UnsupportedParameterType` if the matched argument has no SQL mapping
    ///
    /// # Panics
    ///
    /// Panics if `declared_names` and `arguments` differ in length. The
    /// contract implementation builds both from the same declaration, so a
    /// mismatch is a bug in that implementation.
    pub fn bind(
        &self,
        query: &TranslatedQuery,
        declared_names: &[String],
        arguments: &[Argument],
        operation: &str,
    ) -> Result<Vec<SqlValue>, RepositoryError> {
        assert_eq!(
            declared_names.len(),
            arguments.len(),
            "operation '{}' declares {} parameters but was invoked with {} arguments",
            operation,
            declared_names.len(),
            arguments.len()
        );

        query
            .parameter_names()
            .iter()
            .map(|name| {
                let index = declared_names
                    .iter()
                    .position(|declared| declared == name)
                    .ok_or_else(|| RepositoryError::ParameterNotFound {
                        name: name.clone(),
                        operation: operation.to_string(),
                    })?;

                match &arguments[index] {
                    Argument::Value(value) => Ok(value.clone()),
                    Argument::Null => Err(RepositoryError::NullParameter {
                        name: name.clone(),
                        operation: operation.to_string(),
                    }),
                    Argument::Unsupported { type_name } => Err(RepositoryError::UnsupportedParameterType {
                        name: name.clone(),
                        type_name: (*type_name).to_string(),
                        operation: operation.to_string(),
                    }),
                }
            })
            .collect()
    }
}
