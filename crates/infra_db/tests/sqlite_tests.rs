//! End-to-end tests against an in-memory SQLite database

use std::sync::Arc;

use anyhow::Result;
use domain_repository::RepositoryDispatcher;
use infra_db::{connect, Backend, DatabaseConfig};
use repo_kernel::{args, ConnectionProvider, PlaceholderStyle, RepositoryError};
use test_utils::{
    init_test_tracing, Account, AccountFixtures, AccountOperations, Counter, CounterOperations,
    TestDatabase, ACCOUNTS_SCHEMA, COUNTERS_SCHEMA,
};

async fn counters_database() -> Result<(TestDatabase, RepositoryDispatcher)> {
    init_test_tracing();
    let db = TestDatabase::sqlite().await?;
    db.execute(COUNTERS_SCHEMA).await?;
    let dispatcher = RepositoryDispatcher::new(CounterOperations::registry(), db.shared_provider());
    Ok((db, dispatcher))
}

#[tokio::test]
async fn test_insert_reports_one_affected_row() -> Result<()> {
    let (db, dispatcher) = counters_database().await?;

    let affected = dispatcher.execute("insert", args![10]).await?;

    assert_eq!(affected, 1);
    assert_eq!(db.count_rows("counters").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_find_all_returns_rows_in_order() -> Result<()> {
    let (_db, dispatcher) = counters_database().await?;
    for value in [0, 1, 2] {
        dispatcher.execute("insert", args![value]).await?;
    }

    let counters: Vec<Counter> = dispatcher.fetch_all("find_all", args![]).await?;

    assert_eq!(
        counters,
        vec![Counter { value: 0 }, Counter { value: 1 }, Counter { value: 2 }]
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_table() -> Result<()> {
    let (_db, dispatcher) = counters_database().await?;

    let all: Vec<Counter> = dispatcher.fetch_all("find_all", args![]).await?;
    let one: Option<Counter> = dispatcher.fetch_one("find_by_value", args![1]).await?;

    assert!(all.is_empty());
    assert!(one.is_none());
    Ok(())
}

#[tokio::test]
async fn test_repeated_and_reordered_parameters() -> Result<()> {
    let (_db, dispatcher) = counters_database().await?;
    for value in [1, 5, 9] {
        dispatcher.execute("insert", args![value]).await?;
    }

    let between: Vec<Counter> = dispatcher.fetch_all("find_between", args![2, 9]).await?;
    let found: Option<Counter> = dispatcher.fetch_one("find_by_value", args![9]).await?;

    assert_eq!(between, vec![Counter { value: 5 }, Counter { value: 9 }]);
    assert_eq!(found, Some(Counter { value: 9 }));
    Ok(())
}

#[tokio::test]
async fn test_unit_operation_runs_statement() -> Result<()> {
    let (db, dispatcher) = counters_database().await?;
    dispatcher.execute("insert", args![1]).await?;

    dispatcher.run("clear", args![]).await?;

    assert_eq!(db.count_rows("counters").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_every_property_type_round_trips() -> Result<()> {
    init_test_tracing();
    let db = TestDatabase::sqlite().await?;
    db.execute(ACCOUNTS_SCHEMA).await?;
    let dispatcher = RepositoryDispatcher::new(AccountOperations::registry(), db.shared_provider());
    let account = AccountFixtures::standard();

    dispatcher
        .execute("insert_account", AccountOperations::insert_arguments(&account))
        .await?;
    let stored: Option<Account> = dispatcher.fetch_one("find_account", args![account.id]).await?;
    assert_eq!(stored, Some(AccountFixtures::without_nickname()));

    dispatcher
        .execute("set_nickname", args![account.id, "countess"])
        .await?;
    let renamed: Option<Account> = dispatcher.fetch_one("find_account", args![account.id]).await?;
    assert_eq!(renamed, Some(account));
    Ok(())
}

#[tokio::test]
async fn test_sql_error_is_driver_error_with_context() -> Result<()> {
    init_test_tracing();
    let db = TestDatabase::sqlite().await?;
    let dispatcher = RepositoryDispatcher::new(CounterOperations::registry(), db.shared_provider());

    let error = dispatcher.execute("insert", args![1]).await.unwrap_err();

    match &error {
        RepositoryError::Driver { operation, sql, .. } => {
            assert_eq!(operation, "insert");
            assert_eq!(sql, "insert into counters (value) values (?)");
        }
        other => panic!("Expected Driver error, got {:?}", other),
    }
    assert!(error.to_string().contains("no such table"));
    Ok(())
}

#[tokio::test]
async fn test_connect_from_config() -> Result<()> {
    let provider = connect(&DatabaseConfig::new("sqlite::memory:")).await?;

    assert_eq!(provider.backend(), Backend::Sqlite);
    assert_eq!(provider.placeholder_style(), PlaceholderStyle::Question);

    let dispatcher = RepositoryDispatcher::new(CounterOperations::registry(), Arc::new(provider));
    let error = dispatcher.run("undeclared", args![]).await.unwrap_err();
    assert!(matches!(error, RepositoryError::MissingQueryDeclaration { .. }));
    Ok(())
}
