//! Named-parameter translation
//!
//! Query templates are written with named placeholders (`:identifier`).
//! Drivers only accept positional placeholders, so every template is rewritten
//! once and the names are kept, in order, for the binder.
//!
//! # Syntax
//!
//! A placeholder is `:` followed by the longest run of letters and digits.
//! The scan is purely lexical: a `:` inside a string literal, a comment, or a
//! PostgreSQL `::` cast is treated as a placeholder too. There is no escape for
//! a literal `:`.
//!
//! # Example
//!
//! ```rust
//! use domain_repository::NamedQueryTranslator;
//!
//! let translated = NamedQueryTranslator::default()
//!     .translate("select * from t where f1 = :a and f2 = :b and f3 not in :a");
//!
//! assert_eq!(translated.positional_sql(), "select * from t where f1 = ? and f2 = ? and f3 not in ?");
//! assert_eq!(translated.parameter_names(), ["a", "b", "a"]);
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use repo_kernel::PlaceholderStyle;
use tracing::debug;

const MARKER: char = ':';

/// A template rewritten to positional placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedQuery {
    positional_sql: String,
    parameter_names: Vec<String>,
}

impl TranslatedQuery {
    pub fn positional_sql(&self) -> &str {
        &self.positional_sql
    }

    /// Placeholder names in order of appearance, repeats included
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn placeholder_count(&self) -> usize {
        self.parameter_names.len()
    }
}

/// Rewrites named placeholders into a driver's positional syntax
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamedQueryTranslator {
    style: PlaceholderStyle,
}

impl NamedQueryTranslator {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    /// Translates a template
    ///
    /// Pure: the same input always yields the same output. A marker followed
    /// by no letter or digit is replaced like any other and records an empty
    /// name.
    pub fn translate(&self, raw_text: &str) -> TranslatedQuery {
        let mut positional_sql = String::with_capacity(raw_text.len());
        let mut parameter_names = Vec::new();
        let mut chars = raw_text.chars().peekable();

        while let Some(c) = chars.next() {
            if c != MARKER {
                positional_sql.push(c);
                continue;
            }

            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if !next.is_alphanumeric() {
                    break;
                }
                name.push(next);
                chars.next();
            }

            parameter_names.push(name);
            match self.style {
                PlaceholderStyle::Question => positional_sql.push('?'),
                PlaceholderStyle::Dollar => {
                    positional_sql.push('$');
                    positional_sql.push_str(&parameter_names.len().to_string());
                }
            }
        }

        TranslatedQuery {
            positional_sql,
            parameter_names,
        }
    }
}

/// Memoized translations keyed by raw template text
///
/// Safe for concurrent use. Two callers racing on the same template both
/// translate it and the first insert is kept; the values are equal either way.
#[derive(Debug, Default)]
pub struct TranslationCache {
    translator: NamedQueryTranslator,
    entries: DashMap<String, Arc<TranslatedQuery>>,
}

impl TranslationCache {
    pub fn new(translator: NamedQueryTranslator) -> Self {
        Self {
            translator,
            entries: DashMap::new(),
        }
    }

    pub fn translator(&self) -> NamedQueryTranslator {
        self.translator
    }

    /// Returns the translation of `raw_text`, computing it on first use
    pub fn get(&self, raw_text: &str) -> Arc<TranslatedQuery> {
        if let Some(hit) = self.entries.get(raw_text) {
            return Arc::clone(hit.value());
        }

        let translated = Arc::new(self.translator.translate(raw_text));
        debug!(
            template = raw_text,
            sql = translated.positional_sql(),
            parameters = translated.placeholder_count(),
            "Translated query template"
        );

        let entry = self.entries.entry(raw_text.to_string()).or_insert(translated);
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
