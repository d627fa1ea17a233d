//! Scripted In-Memory Connection Provider
//!
//! [`MockConnectionProvider`] serves scripted rows, affected-row counts, and
//! failures, and records everything the engine does with it: acquisitions,
//! releases, prepared SQL, bound parameters, and statement and cursor
//! disposals. Clones share the same record, so a test can keep one handle
//! and give another to the dispatcher.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use repo_kernel::{
    Connection, ConnectionProvider, DriverError, PlaceholderStyle, Row, RowCursor, SqlValue,
    Statement,
};

/// One scripted result row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockRow {
    columns: Vec<(String, Option<SqlValue>)>,
}

impl MockRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column holding `value`
    pub fn column(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.columns.push((name.to_string(), Some(value.into())));
        self
    }

    /// Adds a column holding SQL NULL
    pub fn null(mut self, name: &str) -> Self {
        self.columns.push((name.to_string(), None));
        self
    }
}

impl Row for MockRow {
    fn get(&self, column: &str) -> Result<Option<SqlValue>, DriverError> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| DriverError::missing_column(column))
    }
}

/// What the engine did with the provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockRecord {
    pub acquired: usize,
    pub released: usize,
    pub prepared: Vec<String>,
    pub bound: Vec<Vec<SqlValue>>,
    pub statements_closed: usize,
    pub cursors_closed: usize,
    pub rows_read: usize,
}

#[derive(Debug, Clone, Default)]
struct MockScript {
    style: PlaceholderStyle,
    rows: Vec<MockRow>,
    affected_rows: u64,
    fail_acquire: Option<String>,
    fail_prepare: Option<String>,
    fail_execute: Option<String>,
    fail_at_row: Option<usize>,
}

type SharedRecord = Arc<Mutex<MockRecord>>;

fn lock(record: &SharedRecord) -> MutexGuard<'_, MockRecord> {
    record.lock().expect("mock record lock poisoned")
}

/// Connection provider backed by scripted data
#[derive(Debug, Clone, Default)]
pub struct MockConnectionProvider {
    script: Arc<MockScript>,
    record: SharedRecord,
}

impl MockConnectionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        Arc::make_mut(&mut self.script).style = style;
        self
    }

    /// Rows returned by every query
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = MockRow>) -> Self {
        Arc::make_mut(&mut self.script).rows = rows.into_iter().collect();
        self
    }

    /// Count returned by every mutation
    pub fn with_affected_rows(mut self, count: u64) -> Self {
        Arc::make_mut(&mut self.script).affected_rows = count;
        self
    }

    pub fn failing_acquire(mut self, message: &str) -> Self {
        Arc::make_mut(&mut self.script).fail_acquire = Some(message.to_string());
        self
    }

    pub fn failing_prepare(mut self, message: &str) -> Self {
        Arc::make_mut(&mut self.script).fail_prepare = Some(message.to_string());
        self
    }

    pub fn failing_execute(mut self, message: &str) -> Self {
        Arc::make_mut(&mut self.script).fail_execute = Some(message.to_string());
        self
    }

    /// Makes the cursor fail when asked for the row at `index`
    pub fn failing_at_row(mut self, index: usize) -> Self {
        Arc::make_mut(&mut self.script).fail_at_row = Some(index);
        self
    }

    /// Returns a snapshot of the record
    pub fn record(&self) -> MockRecord {
        lock(&self.record).clone()
    }

    pub fn acquired(&self) -> usize {
        lock(&self.record).acquired
    }

    pub fn released(&self) -> usize {
        lock(&self.record).released
    }

    /// Checks that every acquired connection was released
    pub fn all_released(&self) -> bool {
        let record = lock(&self.record);
        record.acquired == record.released
    }

    pub fn prepared_sql(&self) -> Vec<String> {
        lock(&self.record).prepared.clone()
    }

    pub fn bound_parameters(&self) -> Vec<Vec<SqlValue>> {
        lock(&self.record).bound.clone()
    }

    pub fn rows_read(&self) -> usize {
        lock(&self.record).rows_read
    }
}

#[async_trait]
impl ConnectionProvider for MockConnectionProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError> {
        if let Some(message) = &self.script.fail_acquire {
            return Err(DriverError::connection(message.clone()));
        }

        lock(&self.record).acquired += 1;
        Ok(Box::new(MockConnection {
            script: Arc::clone(&self.script),
            record: Arc::clone(&self.record),
        }))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.script.style
    }
}

struct MockConnection {
    script: Arc<MockScript>,
    record: SharedRecord,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        lock(&self.record).released += 1;
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        if let Some(message) = &self.script.fail_prepare {
            return Err(DriverError::execution(message.clone()));
        }

        lock(&self.record).prepared.push(sql.to_string());
        Ok(Box::new(MockStatement {
            script: Arc::clone(&self.script),
            record: Arc::clone(&self.record),
        }))
    }
}

struct MockStatement {
    script: Arc<MockScript>,
    record: SharedRecord,
}

impl MockStatement {
    fn execute(&self, parameters: &[SqlValue]) -> Result<(), DriverError> {
        lock(&self.record).bound.push(parameters.to_vec());
        match &self.script.fail_execute {
            Some(message) => Err(DriverError::execution(message.clone())),
            None => Ok(()),
        }
    }
}

impl Drop for MockStatement {
    fn drop(&mut self) {
        lock(&self.record).statements_closed += 1;
    }
}

#[async_trait]
impl Statement for MockStatement {
    async fn execute_mutation(&mut self, parameters: &[SqlValue]) -> Result<u64, DriverError> {
        self.execute(parameters)?;
        Ok(self.script.affected_rows)
    }

    async fn execute_query<'s>(
        &'s mut self,
        parameters: &[SqlValue],
    ) -> Result<Box<dyn RowCursor + 's>, DriverError> {
        self.execute(parameters)?;
        Ok(Box::new(MockCursor {
            rows: self.script.rows.clone().into_iter(),
            position: 0,
            fail_at_row: self.script.fail_at_row,
            record: Arc::clone(&self.record),
        }))
    }
}

struct MockCursor {
    rows: std::vec::IntoIter<MockRow>,
    position: usize,
    fail_at_row: Option<usize>,
    record: SharedRecord,
}

impl Drop for MockCursor {
    fn drop(&mut self) {
        lock(&self.record).cursors_closed += 1;
    }
}

#[async_trait]
impl RowCursor for MockCursor {
    async fn next_row(&mut self) -> Result<Option<Box<dyn Row>>, DriverError> {
        if self.fail_at_row == Some(self.position) {
            return Err(DriverError::execution(format!(
                "cursor failed at row {}",
                self.position
            )));
        }

        match self.rows.next() {
            Some(row) => {
                self.position += 1;
                lock(&self.record).rows_read += 1;
                Ok(Some(Box::new(row)))
            }
            None => Ok(None),
        }
    }
}
