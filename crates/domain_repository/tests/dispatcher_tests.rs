//! Dispatcher tests against the scripted connection provider

use std::sync::Arc;

use domain_repository::{RepositoryDispatcher, Returned};
use repo_kernel::{
    args, entity, Argument, DriverError, OperationSignature, PlaceholderStyle, RegistryBuilder,
    RepositoryError, ReturnShape, SqlValue,
};
use rust_decimal_macros::dec;
use test_utils::{
    init_test_tracing, Counter, CounterOperations, MockConnectionProvider, MockRow,
};

fn dispatcher(mock: &MockConnectionProvider) -> RepositoryDispatcher {
    init_test_tracing();
    RepositoryDispatcher::new(CounterOperations::registry(), Arc::new(mock.clone()))
}

fn counter_rows(values: &[i32]) -> Vec<MockRow> {
    values.iter().map(|v| MockRow::new().column("value", *v)).collect()
}

#[tokio::test]
async fn test_insert_binds_value_and_returns_affected_rows() {
    let mock = MockConnectionProvider::new().with_affected_rows(1);

    let affected = dispatcher(&mock).execute("insert", args![10]).await.unwrap();

    assert_eq!(affected, 1);
    assert_eq!(mock.prepared_sql(), vec!["insert into counters (value) values (?)".to_string()]);
    assert_eq!(mock.bound_parameters(), vec![vec![SqlValue::Int(10)]]);
    assert!(mock.all_released());
}

#[tokio::test]
async fn test_find_all_maps_rows_in_order() {
    let mock = MockConnectionProvider::new().with_rows(counter_rows(&[0, 1, 2]));

    let counters: Vec<Counter> = dispatcher(&mock).fetch_all("find_all", args![]).await.unwrap();

    assert_eq!(
        counters,
        vec![Counter { value: 0 }, Counter { value: 1 }, Counter { value: 2 }]
    );
    let record = mock.record();
    assert_eq!(record.rows_read, 3);
    assert_eq!(record.cursors_closed, 1);
    assert_eq!(record.statements_closed, 1);
    assert_eq!(record.released, 1);
}

#[tokio::test]
async fn test_empty_result_gives_empty_list() {
    let mock = MockConnectionProvider::new();

    let counters: Vec<Counter> = dispatcher(&mock).fetch_all("find_all", args![]).await.unwrap();

    assert!(counters.is_empty());
}

#[tokio::test]
async fn test_single_without_rows_is_none() {
    let mock = MockConnectionProvider::new();

    let counter: Option<Counter> = dispatcher(&mock)
        .fetch_one("find_by_value", args![7])
        .await
        .unwrap();

    assert_eq!(counter, None);
    assert!(mock.all_released());
}

#[tokio::test]
async fn test_single_reads_only_first_row() {
    let mock = MockConnectionProvider::new().with_rows(counter_rows(&[5, 6, 7]));

    let counter: Option<Counter> = dispatcher(&mock)
        .fetch_one("find_by_value", args![5])
        .await
        .unwrap();

    assert_eq!(counter, Some(Counter { value: 5 }));
    assert_eq!(mock.rows_read(), 1);
    assert_eq!(mock.record().cursors_closed, 1);
}

#[tokio::test]
async fn test_parameters_follow_placeholder_order() {
    let mock = MockConnectionProvider::new();

    let _: Vec<Counter> = dispatcher(&mock)
        .fetch_all("find_between", args![1, 9])
        .await
        .unwrap();

    assert_eq!(mock.bound_parameters(), vec![vec![SqlValue::Int(1), SqlValue::Int(9)]]);
}

#[tokio::test]
async fn test_unit_shape_discards_result() {
    let mock = MockConnectionProvider::new().with_affected_rows(4);

    dispatcher(&mock).run("clear", args![]).await.unwrap();

    assert_eq!(mock.prepared_sql(), vec!["delete from counters".to_string()]);
    assert!(mock.all_released());
}

#[tokio::test]
async fn test_dollar_placeholders_for_numbered_drivers() {
    let mock = MockConnectionProvider::new().with_style(PlaceholderStyle::Dollar);

    let _: Vec<Counter> = dispatcher(&mock)
        .fetch_all("find_between", args![1, 9])
        .await
        .unwrap();

    assert_eq!(
        mock.prepared_sql(),
        vec!["select value from counters where value >= $1 and value <= $2 order by value".to_string()]
    );
}

#[tokio::test]
async fn test_unknown_operation() {
    let mock = MockConnectionProvider::new();

    let error = dispatcher(&mock).run("missing", args![]).await.unwrap_err();

    assert!(matches!(error, RepositoryError::UnknownOperation { ref operation } if operation == "missing"));
    assert_eq!(mock.acquired(), 0);
}

#[tokio::test]
async fn test_missing_query_never_acquires() {
    let mock = MockConnectionProvider::new();

    let error = dispatcher(&mock).run("undeclared", args![]).await.unwrap_err();

    assert!(matches!(error, RepositoryError::MissingQueryDeclaration { .. }));
    assert!(error.is_configuration_error());
    assert_eq!(mock.acquired(), 0);
}

#[tokio::test]
async fn test_null_argument_releases_connection() {
    let mock = MockConnectionProvider::new();

    let error = dispatcher(&mock)
        .execute("insert", args![None::<i32>])
        .await
        .unwrap_err();

    assert!(matches!(error, RepositoryError::NullParameter { ref name, .. } if name == "value"));
    assert_eq!(mock.acquired(), 1);
    assert!(mock.all_released());
    assert!(mock.prepared_sql().is_empty());
}

#[tokio::test]
async fn test_unsupported_argument_type() {
    let mock = MockConnectionProvider::new();

    let error = dispatcher(&mock)
        .execute("insert", vec![Argument::unsupported::<Vec<u8>>()])
        .await
        .unwrap_err();

    match error {
        RepositoryError::UnsupportedParameterType { name, type_name, operation } => {
            assert_eq!(name, "value");
            assert!(type_name.contains("Vec<u8>"));
            assert_eq!(operation, "insert");
        }
        other => panic!("Expected UnsupportedParameterType, got {:?}", other),
    }
    assert!(mock.all_released());
}

#[tokio::test]
async fn test_acquire_failure_carries_context() {
    let mock = MockConnectionProvider::new().failing_acquire("connection refused");

    let error = dispatcher(&mock).execute("insert", args![1]).await.unwrap_err();

    match &error {
        RepositoryError::Driver { operation, sql, source } => {
            assert_eq!(operation, "insert");
            assert_eq!(sql, "insert into counters (value) values (?)");
            assert!(matches!(source, DriverError::Connection(_)));
        }
        other => panic!("Expected Driver error, got {:?}", other),
    }
    assert!(error.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_prepare_failure_releases_connection() {
    let mock = MockConnectionProvider::new().failing_prepare("syntax error");

    let error = dispatcher(&mock).execute("insert", args![1]).await.unwrap_err();

    assert!(error.is_driver_error());
    assert_eq!(mock.acquired(), 1);
    assert!(mock.all_released());
}

#[tokio::test]
async fn test_execute_failure_disposes_statement() {
    let mock = MockConnectionProvider::new().failing_execute("no such table: counters");

    let error = dispatcher(&mock)
        .fetch_all::<Counter>("find_all", args![])
        .await
        .unwrap_err();

    assert!(error.is_driver_error());
    let record = mock.record();
    assert_eq!(record.statements_closed, 1);
    assert_eq!(record.cursors_closed, 0);
    assert_eq!(record.released, 1);
}

#[tokio::test]
async fn test_cursor_failure_disposes_everything() {
    let mock = MockConnectionProvider::new()
        .with_rows(counter_rows(&[1, 2, 3]))
        .failing_at_row(1);

    let error = dispatcher(&mock)
        .fetch_all::<Counter>("find_all", args![])
        .await
        .unwrap_err();

    assert!(error.is_driver_error());
    let record = mock.record();
    assert_eq!(record.rows_read, 1);
    assert_eq!(record.cursors_closed, 1);
    assert_eq!(record.statements_closed, 1);
    assert_eq!(record.released, 1);
}

#[tokio::test]
async fn test_null_column_into_required_property() {
    let mock = MockConnectionProvider::new().with_rows([MockRow::new().null("value")]);

    let error = dispatcher(&mock)
        .fetch_all::<Counter>("find_all", args![])
        .await
        .unwrap_err();

    assert!(matches!(error, RepositoryError::NullColumn { ref column, .. } if column == "value"));
    assert!(mock.all_released());
}

#[tokio::test]
async fn test_missing_column_is_driver_error() {
    let mock = MockConnectionProvider::new().with_rows([MockRow::new().column("other", 1)]);

    let error = dispatcher(&mock)
        .fetch_all::<Counter>("find_all", args![])
        .await
        .unwrap_err();

    assert!(matches!(
        error.driver_source(),
        Some(DriverError::MissingColumn { column }) if column == "value"
    ));
}

#[tokio::test]
async fn test_narrowing_out_of_range_fails() {
    let mock = MockConnectionProvider::new().with_rows([MockRow::new().column("value", i64::MAX)]);

    let error = dispatcher(&mock)
        .fetch_all::<Counter>("find_all", args![])
        .await
        .unwrap_err();

    assert!(matches!(error, RepositoryError::ColumnConversion { .. }));
}

#[tokio::test]
async fn test_update_declared_as_list_mismatches() {
    let registry = RegistryBuilder::new()
        .operation(
            OperationSignature::update("touch", "update counters set value = value + 1")
                .returning(ReturnShape::list::<Counter>()),
        )
        .build()
        .unwrap();
    let mock = MockConnectionProvider::new().with_affected_rows(2);
    let dispatcher = RepositoryDispatcher::new(registry, Arc::new(mock.clone()));

    let error = dispatcher
        .fetch_all::<Counter>("touch", args![])
        .await
        .unwrap_err();

    match error {
        RepositoryError::ReturnTypeMismatch { expected, actual } => {
            assert_eq!(expected, "Vec<Counter>");
            assert_eq!(actual, "affected row count");
        }
        other => panic!("Expected ReturnTypeMismatch, got {:?}", other),
    }
    assert!(mock.all_released());
}

entity! {
    #[derive(Debug, Clone, PartialEq)]
    struct Gauge {
        value: i32,
    }
}

#[tokio::test]
async fn test_other_entity_mismatches() {
    let mock = MockConnectionProvider::new().with_rows(counter_rows(&[1]));

    let error = dispatcher(&mock)
        .fetch_all::<Gauge>("find_all", args![])
        .await
        .unwrap_err();

    assert!(matches!(error, RepositoryError::ReturnTypeMismatch { ref expected, .. } if expected == "Vec<Counter>"));
    assert_eq!(mock.rows_read(), 0);
}

#[tokio::test]
async fn test_invoke_returns_declared_shape() {
    let mock = MockConnectionProvider::new().with_affected_rows(1);

    let returned = dispatcher(&mock).invoke::<()>("insert", args![3]).await.unwrap();

    assert_eq!(returned, Returned::AffectedRows(1));
}

#[tokio::test]
async fn test_list_accessor_on_single_shape_mismatches() {
    let mock = MockConnectionProvider::new().with_rows(counter_rows(&[1]));

    let error = dispatcher(&mock)
        .fetch_all::<Counter>("find_by_value", args![1])
        .await
        .unwrap_err();

    assert!(matches!(error, RepositoryError::ReturnTypeMismatch { ref actual, .. } if actual == "Option<Counter>"));
}

entity! {
    #[derive(Debug, Clone, PartialEq)]
    struct Price {
        sku: String,
        amount: rust_decimal::Decimal,
        discount: Option<rust_decimal::Decimal>,
    }
}

#[tokio::test]
async fn test_decimal_and_optional_properties() {
    let registry = RegistryBuilder::new()
        .operation(
            OperationSignature::select("price", "select sku, amount, discount from prices where sku = :sku")
                .with_parameters(["sku"])
                .returning(ReturnShape::single::<Price>()),
        )
        .build()
        .unwrap();
    let mock = MockConnectionProvider::new().with_rows([MockRow::new()
        .column("SKU", "A-1")
        .column("AMOUNT", "19.99")
        .null("DISCOUNT")]);
    let dispatcher = RepositoryDispatcher::new(registry, Arc::new(mock.clone()));

    let price: Option<Price> = dispatcher.fetch_one("price", args!["A-1"]).await.unwrap();

    assert_eq!(
        price,
        Some(Price {
            sku: "A-1".to_string(),
            amount: dec!(19.99),
            discount: None,
        })
    );
}

#[tokio::test]
async fn test_translation_is_cached_per_template() {
    let mock = MockConnectionProvider::new().with_affected_rows(1);
    let dispatcher = dispatcher(&mock);

    for value in 0..3 {
        dispatcher.execute("insert", args![value]).await.unwrap();
    }
    let first = dispatcher.translated("insert").unwrap();
    let second = dispatcher.translated("insert").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.parameter_names(), ["value"]);
    assert_eq!(mock.acquired(), 3);
    assert!(mock.all_released());
}

#[tokio::test]
async fn test_concurrent_invocations_share_dispatcher() {
    let mock = MockConnectionProvider::new().with_affected_rows(1);
    let dispatcher = dispatcher(&mock);

    let handles: Vec<_> = (0..8)
        .map(|value| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.execute("insert", args![value]).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }
    assert_eq!(mock.acquired(), 8);
    assert!(mock.all_released());
}
