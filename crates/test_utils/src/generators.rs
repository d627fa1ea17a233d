//! Property-Based Test Generators
//!
//! Provides proptest strategies for query templates, placeholder names, and
//! SQL values.

use proptest::prelude::*;
use repo_kernel::SqlValue;
use rust_decimal::Decimal;

/// Strategy for placeholder names: a non-empty run of ASCII letters and digits
pub fn parameter_name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,11}"
}

/// Strategy for SQL text containing no placeholder marker
///
/// Fragments start with a character that cannot continue a name, so one
/// placed right after a placeholder ends it.
pub fn sql_fragment_strategy() -> impl Strategy<Value = String> {
    "[ =(,)][a-z0-9 =<>(),.*_']{0,20}"
}

/// Strategy for SQL text without any `:`
pub fn marker_free_text_strategy() -> impl Strategy<Value = String> {
    "[^:]{0,80}"
}

/// A template assembled from fragments and named placeholders
#[derive(Debug, Clone)]
pub struct GeneratedTemplate {
    /// The raw text, e.g. `select * from t where a = :a`
    pub raw_text: String,
    /// Placeholder names in order of appearance
    pub names: Vec<String>,
}

/// Strategy for templates holding up to eight placeholders
///
/// Names are drawn from a small pool so repeats are common.
pub fn template_strategy() -> impl Strategy<Value = GeneratedTemplate> {
    let pool = prop::collection::vec(parameter_name_strategy(), 1..4);
    let pieces = prop::collection::vec((sql_fragment_strategy(), any::<prop::sample::Index>()), 0..8);

    (pool, pieces, sql_fragment_strategy())
        .prop_map(|(pool, pieces, tail)| {
            let mut raw_text = String::new();
            let mut names = Vec::with_capacity(pieces.len());

            for (fragment, index) in pieces {
                let name = index.get(&pool).clone();
                raw_text.push_str(&fragment);
                raw_text.push(':');
                raw_text.push_str(&name);
                names.push(name);
            }
            raw_text.push_str(&tail);

            GeneratedTemplate { raw_text, names }
        })
}

/// Strategy for non-null SQL values of every supported type
pub fn sql_value_strategy() -> impl Strategy<Value = SqlValue> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,16}".prop_map(SqlValue::Text),
        any::<bool>().prop_map(SqlValue::Bool),
        any::<i8>().prop_map(SqlValue::TinyInt),
        any::<i16>().prop_map(SqlValue::SmallInt),
        any::<i32>().prop_map(SqlValue::Int),
        any::<i64>().prop_map(SqlValue::BigInt),
        (-1.0e6f32..1.0e6f32).prop_map(SqlValue::Float),
        (-1.0e12f64..1.0e12f64).prop_map(SqlValue::Double),
        (-1_000_000_000i64..1_000_000_000i64).prop_map(|n| SqlValue::Decimal(Decimal::new(n, 2))),
        proptest::char::range('a', 'z').prop_map(SqlValue::Char),
    ]
}
