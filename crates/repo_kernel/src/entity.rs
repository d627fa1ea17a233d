//! Entity descriptors
//!
//! A row-mapping target is any `Default` type implementing [`Entity`]. Its
//! [`EntityDescriptor`] lists every property with the SQL type it accepts and,
//! for writable properties, a setter. Descriptors are computed once per type
//! and live for the rest of the process.
//!
//! The [`entity!`](crate::entity) macro declares a struct and derives its
//! descriptor from the field list:
//!
//! ```rust
//! use repo_kernel::{entity, Entity, PropertyType, SqlType};
//!
//! entity! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Counter {
//!         pub c: i32,
//!         pub label: Option<String>,
//!     }
//! }
//!
//! let descriptor = Counter::descriptor();
//! assert_eq!(descriptor.name(), "Counter");
//! assert_eq!(
//!     descriptor.property("c").map(|p| p.property_type),
//!     Some(PropertyType::Scalar { ty: SqlType::Int, nullable: false })
//! );
//! ```

use std::fmt;

use once_cell::sync::OnceCell;
use rust_decimal::Decimal;

use crate::value::{SqlType, SqlValue};

/// Declared type of an entity property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// A supported scalar; `nullable` properties accept SQL NULL
    Scalar { ty: SqlType, nullable: bool },
    /// A type outside the supported set, named for error reporting
    Unsupported { type_name: &'static str },
}

impl PropertyType {
    /// Returns the name used when reporting this type
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyType::Scalar { ty, .. } => ty.name(),
            PropertyType::Unsupported { type_name } => type_name,
        }
    }
}

/// Writes a coerced column value into a property
///
/// Receives `None` for SQL NULL. Returns `false` when the value does not fit
/// the property.
pub type Setter<E> = fn(&mut E, Option<SqlValue>) -> bool;

/// One property of an entity
pub struct PropertyDescriptor<E> {
    /// Property name, also the column name read for it
    pub name: &'static str,
    pub property_type: PropertyType,
    /// `None` for read-only properties, which the mapper skips
    pub setter: Option<Setter<E>>,
}

impl<E> PropertyDescriptor<E> {
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

impl<E> fmt::Debug for PropertyDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("property_type", &self.property_type)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Property metadata for an entity type
pub struct EntityDescriptor<E> {
    name: &'static str,
    properties: Vec<PropertyDescriptor<E>>,
}

impl<E> EntityDescriptor<E> {
    /// Creates an empty descriptor for the named entity
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            properties: Vec::new(),
        }
    }

    /// Adds a writable property
    pub fn writable(mut self, name: &'static str, property_type: PropertyType, setter: Setter<E>) -> Self {
        self.properties.push(PropertyDescriptor {
            name,
            property_type,
            setter: Some(setter),
        });
        self
    }

    /// Adds a read-only property
    pub fn readonly(mut self, name: &'static str, property_type: PropertyType) -> Self {
        self.properties.push(PropertyDescriptor {
            name,
            property_type,
            setter: None,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn properties(&self) -> &[PropertyDescriptor<E>] {
        &self.properties
    }

    /// Looks up a property by exact name
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor<E>> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl<E> fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}

/// A row-mapping target
///
/// `Default` is the argument-less construction path used for every row; a
/// type without it cannot be an entity at all.
pub trait Entity: Default + Send + 'static {
    /// Name used in declared return shapes and error messages
    const NAME: &'static str;

    /// Returns the process-wide descriptor for this type
    fn descriptor() -> &'static EntityDescriptor<Self>;
}

/// The entity with no properties
///
/// Used as the type parameter for operations that never map rows, such as
/// mutations.
impl Entity for () {
    const NAME: &'static str = "()";

    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceCell<EntityDescriptor<()>> = OnceCell::new();
        DESCRIPTOR.get_or_init(|| EntityDescriptor::new("()"))
    }
}

/// A Rust type usable as an entity property
pub trait Property: Sized {
    const TYPE: PropertyType;

    /// Extracts the property value from a column value already coerced to
    /// `TYPE`
    fn from_column(value: Option<SqlValue>) -> Option<Self>;
}

macro_rules! scalar_property {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Property for $ty {
                const TYPE: PropertyType = PropertyType::Scalar {
                    ty: SqlType::$variant,
                    nullable: false,
                };

                fn from_column(value: Option<SqlValue>) -> Option<Self> {
                    match value {
                        Some(SqlValue::$variant(v)) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_property! {
    String => Text,
    bool => Bool,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    char => Char,
}

impl<T: Property> Property for Option<T> {
    const TYPE: PropertyType = match T::TYPE {
        PropertyType::Scalar { ty, .. } => PropertyType::Scalar { ty, nullable: true },
        other => other,
    };

    fn from_column(value: Option<SqlValue>) -> Option<Self> {
        match value {
            None => Some(None),
            some => T::from_column(some).map(Some),
        }
    }
}

/// Declares a struct and implements [`Entity`] for it
///
/// Every field becomes a writable property whose column name is the field
/// name. `Default` is derived by the macro and must not be listed again.
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Entity for $name {
            const NAME: &'static str = stringify!($name);

            fn descriptor() -> &'static $crate::EntityDescriptor<Self> {
                static DESCRIPTOR: $crate::__private::OnceCell<$crate::EntityDescriptor<$name>> =
                    $crate::__private::OnceCell::new();
                DESCRIPTOR.get_or_init(|| {
                    $crate::EntityDescriptor::new(stringify!($name))
                    $(
                        .writable(
                            stringify!($field),
                            <$ty as $crate::Property>::TYPE,
                            |entity: &mut $name, value| {
                                match <$ty as $crate::Property>::from_column(value) {
                                    Some(v) => {
                                        entity.$field = v;
                                        true
                                    }
                                    None => false,
                                }
                            },
                        )
                    )*
                })
            }
        }
    };
}
