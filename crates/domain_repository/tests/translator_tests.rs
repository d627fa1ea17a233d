//! Property-based tests for named-parameter translation

use domain_repository::{NamedQueryTranslator, ParameterBinder, TranslationCache};
use proptest::prelude::*;
use repo_kernel::{Argument, PlaceholderStyle, SqlValue};
use test_utils::{marker_free_text_strategy, sql_value_strategy, template_strategy};

proptest! {
    #[test]
    fn test_translation_is_deterministic(template in template_strategy()) {
        let translator = NamedQueryTranslator::default();

        prop_assert_eq!(translator.translate(&template.raw_text), translator.translate(&template.raw_text));
    }

    #[test]
    fn test_every_occurrence_is_recorded(template in template_strategy()) {
        let translated = NamedQueryTranslator::default().translate(&template.raw_text);

        prop_assert_eq!(translated.parameter_names(), template.names.as_slice());
        prop_assert_eq!(translated.positional_sql().matches('?').count(), template.names.len());
        prop_assert!(!translated.positional_sql().contains(':'));
    }

    #[test]
    fn test_text_without_markers_is_unchanged(text in marker_free_text_strategy()) {
        let translated = NamedQueryTranslator::default().translate(&text);

        prop_assert_eq!(translated.positional_sql(), text.as_str());
        prop_assert!(translated.parameter_names().is_empty());
    }

    #[test]
    fn test_dollar_style_numbers_every_occurrence(template in template_strategy()) {
        let translated = NamedQueryTranslator::new(PlaceholderStyle::Dollar).translate(&template.raw_text);

        for position in 1..=template.names.len() {
            let placeholder = format!("${}", position);
            prop_assert!(translated.positional_sql().contains(&placeholder));
        }
        prop_assert_eq!(translated.placeholder_count(), template.names.len());
    }

    #[test]
    fn test_cache_matches_direct_translation(template in template_strategy()) {
        let cache = TranslationCache::default();
        let cached = cache.get(&template.raw_text);
        let direct = NamedQueryTranslator::default().translate(&template.raw_text);

        prop_assert_eq!(cached.as_ref(), &direct);
    }

    #[test]
    fn test_binding_preserves_values(
        values in prop::collection::vec(sql_value_strategy(), 1..6),
    ) {
        let names: Vec<String> = (0..values.len()).map(|i| format!("p{}", i)).collect();
        let raw_text = format!(
            "insert into t values ({})",
            names.iter().map(|n| format!(":{}", n)).collect::<Vec<_>>().join(", ")
        );
        let translated = NamedQueryTranslator::default().translate(&raw_text);
        let arguments: Vec<Argument> = values.iter().cloned().map(Argument::Value).collect();

        let bound = ParameterBinder.bind(&translated, &names, &arguments, "insert").unwrap();

        prop_assert_eq!(bound, values);
    }
}

#[test]
fn test_reference_translation() {
    let translated = NamedQueryTranslator::default()
        .translate("select * from t where f1 = :a and f2 = :b and f3 not in :a");

    assert_eq!(
        translated.positional_sql(),
        "select * from t where f1 = ? and f2 = ? and f3 not in ?"
    );
    assert_eq!(translated.parameter_names(), ["a", "b", "a"]);
}

#[test]
fn test_reference_insert_binding() {
    let translated = NamedQueryTranslator::default().translate("insert into T (c) values (:value)");
    let bound = ParameterBinder
        .bind(&translated, &["value".to_string()], &[Argument::Value(SqlValue::Int(10))], "insert")
        .unwrap();

    assert_eq!(translated.positional_sql(), "insert into T (c) values (?)");
    assert_eq!(bound, vec![SqlValue::Int(10)]);
}
