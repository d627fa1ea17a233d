//! Row mapping
//!
//! Converts result rows into entities. For each writable property of the
//! target entity the column with the same name is read, coerced to the
//! property's declared SQL type, and written through the property's setter.
//! Read-only properties are skipped.

use std::marker::PhantomData;

use repo_kernel::{
    DriverError, Entity, EntityDescriptor, PropertyType, RepositoryError, Row, RowCursor,
};
use thiserror::Error;

/// Failure while mapping a row
///
/// Driver failures are kept apart so the dispatcher can attach the
/// invocation context to them.
#[derive(Debug, Error)]
pub enum MapRowError {
    #[error(transparent)]
    Mapping(#[from] RepositoryError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl MapRowError {
    /// Converts into the error surfaced to the caller of `operation`
    pub fn into_repository_error(self, operation: &str, sql: &str) -> RepositoryError {
        match self {
            MapRowError::Mapping(error) => error,
            MapRowError::Driver(error) => RepositoryError::driver(operation, sql, error),
        }
    }
}

/// Maps rows into entities of type `E`
#[derive(Debug)]
pub struct RowMapper<E: Entity> {
    descriptor: &'static EntityDescriptor<E>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> RowMapper<E> {
    /// Creates a mapper for `E`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPropertyType` if a writable property of `E` has a
    /// type outside the supported set
    pub fn new() -> Result<Self, RepositoryError> {
        let descriptor = E::descriptor();

        for property in descriptor.properties().iter().filter(|p| p.is_writable()) {
            if let PropertyType::Unsupported { type_name } = property.property_type {
                return Err(RepositoryError::UnsupportedPropertyType {
                    entity: E::NAME.to_string(),
                    property: property.name.to_string(),
                    type_name: type_name.to_string(),
                });
            }
        }

        Ok(Self {
            descriptor,
            _entity: PhantomData,
        })
    }

    /// Maps one row into a new `E`
    pub fn map_row(&self, row: &dyn Row) -> Result<E, MapRowError> {
        let mut entity = E::default();

        for property in self.descriptor.properties() {
            let Some(setter) = property.setter else {
                continue;
            };
            let PropertyType::Scalar { ty, nullable } = property.property_type else {
                continue;
            };

            let value = match row.get(property.name)? {
                None if nullable => None,
                None => {
                    return Err(RepositoryError::NullColumn {
                        entity: E::NAME.to_string(),
                        column: property.name.to_string(),
                    }
                    .into())
                }
                Some(raw) => Some(raw.coerce(ty).ok_or_else(|| RepositoryError::ColumnConversion {
                    entity: E::NAME.to_string(),
                    column: property.name.to_string(),
                    expected: ty,
                    found: raw.to_string(),
                })?),
            };

            if !setter(&mut entity, value.clone()) {
                return Err(RepositoryError::ColumnConversion {
                    entity: E::NAME.to_string(),
                    column: property.name.to_string(),
                    expected: ty,
                    found: value.map_or_else(|| "NULL".to_string(), |v| v.to_string()),
                }
                .into());
            }
        }

        Ok(entity)
    }

    /// Maps rows from `cursor` until it is exhausted or `limit` rows were read
    ///
    /// Rows past the limit are never fetched.
    pub async fn map_all(
        &self,
        cursor: &mut (dyn RowCursor + '_),
        limit: Option<usize>,
    ) -> Result<Vec<E>, MapRowError> {
        let mut entities = Vec::new();

        while limit.map_or(true, |max| entities.len() < max) {
            match cursor.next_row().await? {
                Some(row) => entities.push(self.map_row(row.as_ref())?),
                None => break,
            }
        }

        Ok(entities)
    }
}
