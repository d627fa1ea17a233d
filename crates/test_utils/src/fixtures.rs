//! Pre-built Test Fixtures
//!
//! Entities and operation declarations shared by the engine and
//! infrastructure test suites. The schema in [`COUNTERS_SCHEMA`] and
//! [`ACCOUNTS_SCHEMA`] matches the entities below.

use repo_kernel::{
    args, entity, Argument, OperationRegistry, OperationSignature, RegistryBuilder, ReturnShape,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

entity! {
    /// Single-column entity
    #[derive(Debug, Clone, PartialEq)]
    pub struct Counter {
        pub value: i32,
    }
}

entity! {
    /// Entity covering every supported property type
    #[derive(Debug, Clone, PartialEq)]
    pub struct Account {
        pub id: i64,
        pub owner: String,
        pub active: bool,
        pub tier: i8,
        pub branch: i16,
        pub visits: i32,
        pub rating: f32,
        pub score: f64,
        pub balance: Decimal,
        pub grade: char,
        pub nickname: Option<String>,
    }
}

/// Schema for [`Counter`], valid on SQLite and PostgreSQL
pub const COUNTERS_SCHEMA: &str = "create table counters (value integer not null)";

/// Schema for [`Account`], valid on SQLite and PostgreSQL
pub const ACCOUNTS_SCHEMA: &str = "create table accounts (\
    id bigint primary key, \
    owner text not null, \
    active boolean not null, \
    tier smallint not null, \
    branch smallint not null, \
    visits integer not null, \
    rating real not null, \
    score double precision not null, \
    balance numeric(12, 2) not null, \
    grade char(1) not null, \
    nickname text)";

/// Fixture for operation declarations over the `counters` table
pub struct CounterOperations;

impl CounterOperations {
    /// `insert(value)` returning the affected-row count
    pub fn insert() -> OperationSignature {
        OperationSignature::update("insert", "insert into counters (value) values (:value)")
            .with_parameters(["value"])
            .returning(ReturnShape::AffectedRows)
    }

    /// `find_all()` returning every counter
    pub fn find_all() -> OperationSignature {
        OperationSignature::select("find_all", "select value from counters order by value")
            .returning(ReturnShape::list::<Counter>())
    }

    /// `find_by_value(value)` returning at most one counter
    pub fn find_by_value() -> OperationSignature {
        OperationSignature::select("find_by_value", "select value from counters where value = :value")
            .with_parameters(["value"])
            .returning(ReturnShape::single::<Counter>())
    }

    /// `find_between(low, high)` returning the counters in range
    pub fn find_between() -> OperationSignature {
        OperationSignature::select(
            "find_between",
            "select value from counters where value >= :low and value <= :high order by value",
        )
        .with_parameters(["low", "high"])
        .returning(ReturnShape::list::<Counter>())
    }

    /// `clear()` discarding its result
    pub fn clear() -> OperationSignature {
        OperationSignature::update("clear", "delete from counters")
    }

    /// `undeclared()` with no query
    pub fn undeclared() -> OperationSignature {
        OperationSignature::new("undeclared")
    }

    /// Registry holding every counter operation
    pub fn registry() -> OperationRegistry {
        RegistryBuilder::new()
            .operations([
                Self::insert(),
                Self::find_all(),
                Self::find_by_value(),
                Self::find_between(),
                Self::clear(),
                Self::undeclared(),
            ])
            .build()
            .expect("counter operations have unique names")
    }
}

/// Fixture for operation declarations over the `accounts` table
pub struct AccountOperations;

impl AccountOperations {
    /// `insert_account(..)` for every column except the nullable nickname
    pub fn insert() -> OperationSignature {
        OperationSignature::update(
            "insert_account",
            "insert into accounts (id, owner, active, tier, branch, visits, rating, score, balance, grade) \
             values (:id, :owner, :active, :tier, :branch, :visits, :rating, :score, :balance, :grade)",
        )
        .with_parameters([
            "id", "owner", "active", "tier", "branch", "visits", "rating", "score", "balance", "grade",
        ])
        .returning(ReturnShape::AffectedRows)
    }

    /// `set_nickname(id, nickname)`
    pub fn set_nickname() -> OperationSignature {
        OperationSignature::update("set_nickname", "update accounts set nickname = :nickname where id = :id")
            .with_parameters(["id", "nickname"])
            .returning(ReturnShape::AffectedRows)
    }

    pub fn find_by_id() -> OperationSignature {
        OperationSignature::select("find_account", "select * from accounts where id = :id")
            .with_parameters(["id"])
            .returning(ReturnShape::single::<Account>())
    }

    pub fn registry() -> OperationRegistry {
        RegistryBuilder::new()
            .operations([Self::insert(), Self::set_nickname(), Self::find_by_id()])
            .build()
            .expect("account operations have unique names")
    }

    /// Arguments for [`AccountOperations::insert`] in declaration order
    pub fn insert_arguments(account: &Account) -> Vec<Argument> {
        args![
            account.id,
            account.owner.as_str(),
            account.active,
            account.tier,
            account.branch,
            account.visits,
            account.rating,
            account.score,
            account.balance,
            account.grade,
        ]
    }
}

/// Fixture for account test data
pub struct AccountFixtures;

impl AccountFixtures {
    /// An account with every column populated
    pub fn standard() -> Account {
        Account {
            id: 1,
            owner: "Ada".to_string(),
            active: true,
            tier: 3,
            branch: 120,
            visits: 42,
            rating: 4.5,
            score: 1234.5,
            balance: dec!(1500.25),
            grade: 'A',
            nickname: Some("countess".to_string()),
        }
    }

    /// An account as stored by [`AccountOperations::insert`]
    pub fn without_nickname() -> Account {
        Account {
            nickname: None,
            ..Self::standard()
        }
    }
}
