//! SQL value model
//!
//! This module holds the fixed set of scalar types the engine knows how to
//! bind and map. Both directions use the same table: the binder hands
//! [`SqlValue`]s to the driver, and the row mapper coerces raw column values
//! into the [`SqlType`] a property declares.
//!
//! # Supported Types
//!
//! | `SqlType`  | Rust type                 |
//! |------------|---------------------------|
//! | `Text`     | `String`, `&str`          |
//! | `Bool`     | `bool`                    |
//! | `TinyInt`  | `i8`                      |
//! | `SmallInt` | `i16`                     |
//! | `Int`      | `i32`                     |
//! | `BigInt`   | `i64`                     |
//! | `Float`    | `f32`                     |
//! | `Double`   | `f64`                     |
//! | `Decimal`  | `rust_decimal::Decimal`   |
//! | `Char`     | `char`                    |

use std::fmt;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// The scalar types understood by the binder and the row mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Text,
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Char,
}

impl SqlType {
    /// Returns the SQL-flavoured name of the type
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Text => "text",
            SqlType::Bool => "boolean",
            SqlType::TinyInt => "tinyint",
            SqlType::SmallInt => "smallint",
            SqlType::Int => "integer",
            SqlType::BigInt => "bigint",
            SqlType::Float => "real",
            SqlType::Double => "double",
            SqlType::Decimal => "decimal",
            SqlType::Char => "char",
        }
    }

    /// Returns true for the four integer widths
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt
        )
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-null scalar value
///
/// SQL NULL is never a `SqlValue`: raw column values are `Option<SqlValue>`
/// and call arguments carry nulls as [`Argument::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Bool(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Char(char),
}

impl SqlValue {
    /// Returns the type tag of this value
    pub fn sql_type(&self) -> SqlType {
        match self {
            SqlValue::Text(_) => SqlType::Text,
            SqlValue::Bool(_) => SqlType::Bool,
            SqlValue::TinyInt(_) => SqlType::TinyInt,
            SqlValue::SmallInt(_) => SqlType::SmallInt,
            SqlValue::Int(_) => SqlType::Int,
            SqlValue::BigInt(_) => SqlType::BigInt,
            SqlValue::Float(_) => SqlType::Float,
            SqlValue::Double(_) => SqlType::Double,
            SqlValue::Decimal(_) => SqlType::Decimal,
            SqlValue::Char(_) => SqlType::Char,
        }
    }

    /// Converts this value into the requested type
    ///
    /// Drivers report column values in whatever width their storage uses
    /// (SQLite returns every integer as `BigInt`, for instance), so the row
    /// mapper widens, narrows, and parses here. Narrowing is range checked.
    ///
    /// # Returns
    ///
    /// `None` when the value has no faithful representation in `target`
    pub fn coerce(&self, target: SqlType) -> Option<SqlValue> {
        if self.sql_type() == target {
            return Some(self.clone());
        }

        match target {
            SqlType::Text => Some(SqlValue::Text(self.to_string())),
            SqlType::Bool => self.to_bool().map(SqlValue::Bool),
            SqlType::TinyInt => self
                .to_i64()
                .and_then(|v| i8::try_from(v).ok())
                .map(SqlValue::TinyInt),
            SqlType::SmallInt => self
                .to_i64()
                .and_then(|v| i16::try_from(v).ok())
                .map(SqlValue::SmallInt),
            SqlType::Int => self
                .to_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(SqlValue::Int),
            SqlType::BigInt => self.to_i64().map(SqlValue::BigInt),
            SqlType::Float => self.to_f64().and_then(narrow_to_f32).map(SqlValue::Float),
            SqlType::Double => self.to_f64().map(SqlValue::Double),
            SqlType::Decimal => self.to_decimal().map(SqlValue::Decimal),
            SqlType::Char => self.to_char().map(SqlValue::Char),
        }
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            SqlValue::TinyInt(v) => Some(i64::from(*v)),
            SqlValue::SmallInt(v) => Some(i64::from(*v)),
            SqlValue::Int(v) => Some(i64::from(*v)),
            SqlValue::BigInt(v) => Some(*v),
            SqlValue::Bool(v) => Some(i64::from(*v)),
            SqlValue::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            SqlValue::Double(d) if d.fract() == 0.0 => Decimal::from_f64(*d)?.to_i64(),
            SqlValue::Float(f) if f.fract() == 0.0 => Decimal::from_f32(*f)?.to_i64(),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            SqlValue::TinyInt(v) => Some(f64::from(*v)),
            SqlValue::SmallInt(v) => Some(f64::from(*v)),
            SqlValue::Int(v) => Some(f64::from(*v)),
            SqlValue::BigInt(v) => Some(*v as f64),
            SqlValue::Float(v) => Some(f64::from(*v)),
            SqlValue::Double(v) => Some(*v),
            SqlValue::Decimal(d) => d.to_f64(),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            SqlValue::TinyInt(v) => Some(Decimal::from(*v)),
            SqlValue::SmallInt(v) => Some(Decimal::from(*v)),
            SqlValue::Int(v) => Some(Decimal::from(*v)),
            SqlValue::BigInt(v) => Some(Decimal::from(*v)),
            SqlValue::Float(v) => Decimal::from_f32(*v),
            SqlValue::Double(v) => Decimal::from_f64(*v),
            SqlValue::Decimal(d) => Some(*d),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::TinyInt(_) | SqlValue::SmallInt(_) | SqlValue::Int(_) | SqlValue::BigInt(_) => {
                self.to_i64().map(|v| v != 0)
            }
            SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Some(true),
                "false" | "f" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Reads the value as text, which must be exactly one character
    fn to_char(&self) -> Option<char> {
        if let SqlValue::Char(c) = self {
            return Some(*c);
        }

        let text = self.to_string();
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

/// Narrows a double, refusing finite values outside the `f32` range
fn narrow_to_f32(value: f64) -> Option<f32> {
    let narrowed = value as f32;
    if value.is_finite() && narrowed.is_infinite() {
        None
    } else {
        Some(narrowed)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::TinyInt(v) => write!(f, "{}", v),
            SqlValue::SmallInt(v) => write!(f, "{}", v),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::BigInt(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Double(v) => write!(f, "{}", v),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::Char(v) => write!(f, "{}", v),
        }
    }
}

/// A call argument as handed to the dispatcher by a contract implementation
///
/// Generated or hand-written contract code converts each typed argument with
/// [`IntoArgument`]. Values whose runtime type has no SQL mapping are carried
/// as `Unsupported` so the binder can report them by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A bindable value
    Value(SqlValue),
    /// An absent value
    Null,
    /// A value of a type outside the supported set
    Unsupported { type_name: &'static str },
}

impl Argument {
    /// Creates an argument from any supported Rust value
    pub fn of(value: impl IntoArgument) -> Self {
        value.into_argument()
    }

    /// Creates an argument standing for a value of an unmappable type `T`
    pub fn unsupported<T: ?Sized>() -> Self {
        Argument::Unsupported {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns true when this argument carries no value
    pub fn is_null(&self) -> bool {
        matches!(self, Argument::Null)
    }
}

/// Conversion of a Rust value into a call [`Argument`]
pub trait IntoArgument {
    fn into_argument(self) -> Argument;
}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value)
                }
            }

            impl IntoArgument for $ty {
                fn into_argument(self) -> Argument {
                    Argument::Value(SqlValue::$variant(self))
                }
            }
        )*
    };
}

scalar_conversions! {
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

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl IntoArgument for &str {
    fn into_argument(self) -> Argument {
        Argument::Value(SqlValue::Text(self.to_string()))
    }
}

impl IntoArgument for SqlValue {
    fn into_argument(self) -> Argument {
        Argument::Value(self)
    }
}

impl IntoArgument for Argument {
    fn into_argument(self) -> Argument {
        self
    }
}

impl<T: IntoArgument> IntoArgument for Option<T> {
    fn into_argument(self) -> Argument {
        match self {
            Some(value) => value.into_argument(),
            None => Argument::Null,
        }
    }
}

/// Builds a `Vec<Argument>` from a list of supported values
///
/// ```rust
/// use repo_kernel::{args, Argument, SqlValue};
///
/// let arguments = args![10, "name", None::<i64>];
/// assert_eq!(arguments[0], Argument::Value(SqlValue::Int(10)));
/// assert!(arguments[2].is_null());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Argument>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::IntoArgument::into_argument($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_identity_coercion() {
        let value = SqlValue::Int(7);
        assert_eq!(value.coerce(SqlType::Int), Some(SqlValue::Int(7)));
    }

    #[test]
    fn test_narrowing_is_range_checked() {
        assert_eq!(SqlValue::BigInt(100).coerce(SqlType::TinyInt), Some(SqlValue::TinyInt(100)));
        assert_eq!(SqlValue::BigInt(300).coerce(SqlType::TinyInt), None);
        assert_eq!(SqlValue::BigInt(i64::MAX).coerce(SqlType::Int), None);
    }

    #[test]
    fn test_text_parsing() {
        assert_eq!(SqlValue::Text("42".into()).coerce(SqlType::Int), Some(SqlValue::Int(42)));
        assert_eq!(
            SqlValue::Text("12.50".into()).coerce(SqlType::Decimal),
            Some(SqlValue::Decimal(dec!(12.50)))
        );
        assert_eq!(SqlValue::Text("abc".into()).coerce(SqlType::BigInt), None);
    }

    #[test]
    fn test_bool_from_integer_and_text() {
        assert_eq!(SqlValue::BigInt(1).coerce(SqlType::Bool), Some(SqlValue::Bool(true)));
        assert_eq!(SqlValue::BigInt(0).coerce(SqlType::Bool), Some(SqlValue::Bool(false)));
        assert_eq!(SqlValue::Text("t".into()).coerce(SqlType::Bool), Some(SqlValue::Bool(true)));
        assert_eq!(SqlValue::Text("maybe".into()).coerce(SqlType::Bool), None);
    }

    #[test]
    fn test_char_requires_single_character() {
        assert_eq!(SqlValue::Text("x".into()).coerce(SqlType::Char), Some(SqlValue::Char('x')));
        assert_eq!(SqlValue::Text("xy".into()).coerce(SqlType::Char), None);
        assert_eq!(SqlValue::Text(String::new()).coerce(SqlType::Char), None);
    }

    #[test]
    fn test_char_reads_any_value_as_text() {
        assert_eq!(SqlValue::BigInt(5).coerce(SqlType::Char), Some(SqlValue::Char('5')));
        assert_eq!(SqlValue::TinyInt(-1).coerce(SqlType::Char), None);
        assert_eq!(SqlValue::Bool(true).coerce(SqlType::Char), None);
    }

    #[test]
    fn test_float_narrowing_is_range_checked() {
        assert_eq!(SqlValue::Double(1.5).coerce(SqlType::Float), Some(SqlValue::Float(1.5)));
        assert_eq!(SqlValue::Double(1e300).coerce(SqlType::Float), None);
        assert_eq!(SqlValue::Text("1e39".into()).coerce(SqlType::Float), None);
        assert_eq!(
            SqlValue::Double(f64::INFINITY).coerce(SqlType::Float),
            Some(SqlValue::Float(f32::INFINITY))
        );
    }

    #[test]
    fn test_fractional_values_do_not_become_integers() {
        assert_eq!(SqlValue::Double(1.5).coerce(SqlType::Int), None);
        assert_eq!(SqlValue::Double(2.0).coerce(SqlType::Int), Some(SqlValue::Int(2)));
        assert_eq!(SqlValue::Decimal(dec!(3.00)).coerce(SqlType::BigInt), Some(SqlValue::BigInt(3)));
    }

    #[test]
    fn test_option_argument() {
        assert_eq!(Some(5i64).into_argument(), Argument::Value(SqlValue::BigInt(5)));
        assert_eq!(None::<String>.into_argument(), Argument::Null);
    }

    #[test]
    fn test_unsupported_argument_names_type() {
        match Argument::unsupported::<Vec<u8>>() {
            Argument::Unsupported { type_name } => assert!(type_name.contains("Vec")),
            other => panic!("Expected Unsupported, got {:?}", other),
        }
    }
}
