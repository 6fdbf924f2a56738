//! In-memory Spanner double for integration tests.
//!
//! The double answers queries from canned results keyed by SQL text, keeps a
//! tiny catalog of the tables, indexes and constraints its DDL created, and
//! records every DDL request the way the database admin API would see it:
//! a DDL batch becomes one request when it runs, a statement outside a batch
//! is a request of its own.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use asupersync::CancelKind;
use chrono::{DateTime, Utc};
use spanmodel::prelude::*;
use spanmodel_schema::introspect::{HAS_CONSTRAINT_SQL, HAS_INDEX_SQL, HAS_TABLE_SQL};
use spanmodel_core::{QueryError, StatusCode};

#[derive(Debug, Default)]
pub struct MockState {
    pub ddl_requests: Vec<Vec<String>>,
    pub batch: Option<Vec<String>>,
    pub tables: BTreeSet<String>,
    pub indexes: BTreeSet<String>,
    pub constraints: BTreeSet<String>,
    pub results: HashMap<String, Vec<Row>>,
    pub row_counts: HashMap<String, u64>,
    /// Statements sent through `execute`, with their parameters.
    pub executed: Vec<(String, Vec<Value>)>,
    /// Statements sent through `query`, with their parameters.
    pub queried: Vec<(String, Vec<Value>)>,
    /// BEGIN / COMMIT / ROLLBACK in call order.
    pub tx_log: Vec<String>,
    pub begin_options: Vec<TxOptions>,
    /// Each entry aborts one commit, with an optional server retry delay.
    pub commit_aborts: VecDeque<Option<Duration>>,
    /// Statements that fail with the given status.
    pub failures: HashMap<String, StatusCode>,
    /// Statements that cancel the caller's context once executed.
    pub cancel_on: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<MockState>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn connection(&self) -> MockConnection {
        MockConnection {
            server: self.clone(),
        }
    }

    pub fn pool(&self) -> MockPool {
        MockPool {
            server: self.clone(),
        }
    }

    pub fn put_result(&self, sql: &str, rows: Vec<Row>) {
        self.state().results.insert(sql.to_string(), rows);
    }

    pub fn put_row_count(&self, sql: &str, count: u64) {
        self.state().row_counts.insert(sql.to_string(), count);
    }

    pub fn fail(&self, sql: &str, code: StatusCode) {
        self.state().failures.insert(sql.to_string(), code);
    }

    pub fn cancel_on(&self, sql: &str) {
        self.state().cancel_on.insert(sql.to_string());
    }

    pub fn abort_commits(&self, count: usize, delay: Option<Duration>) {
        let mut state = self.state();
        for _ in 0..count {
            state.commit_aborts.push_back(delay);
        }
    }

    pub fn ddl_requests(&self) -> Vec<Vec<String>> {
        self.state().ddl_requests.clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state().executed.iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn queried_sql(&self) -> Vec<String> {
        self.state().queried.iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn tx_log(&self) -> Vec<String> {
        self.state().tx_log.clone()
    }
}

fn quoted_name_after<'s>(sql: &'s str, prefix: &str) -> Option<&'s str> {
    let rest = sql.strip_prefix(prefix)?;
    let rest = rest.strip_prefix('`')?;
    rest.split('`').next()
}

fn constraint_names(sql: &str) -> Vec<String> {
    sql.split("CONSTRAINT `")
        .skip(1)
        .filter_map(|part| part.split('`').next())
        .map(str::to_string)
        .collect()
}

fn is_ddl(sql: &str) -> bool {
    let upper = sql.trim_start().to_ascii_uppercase();
    upper.starts_with("CREATE ") || upper.starts_with("ALTER ") || upper.starts_with("DROP ")
}

impl MockState {
    fn apply_ddl(&mut self, statements: &[String]) {
        for sql in statements {
            if let Some(table) = quoted_name_after(sql, "CREATE TABLE ") {
                self.tables.insert(table.to_string());
                self.constraints.extend(constraint_names(sql));
            } else if let Some(index) = quoted_name_after(sql, "CREATE INDEX ")
                .or_else(|| quoted_name_after(sql, "CREATE UNIQUE INDEX "))
            {
                self.indexes.insert(index.to_string());
            } else if let Some(table) = quoted_name_after(sql, "DROP TABLE ") {
                self.tables.remove(table);
            } else if let Some(index) = quoted_name_after(sql, "DROP INDEX ") {
                self.indexes.remove(index);
            } else if sql.starts_with("ALTER TABLE ") {
                self.constraints.extend(constraint_names(sql));
            }
        }
    }

    fn count(&self, sql: &str, params: &[Value]) -> Option<i64> {
        let name = |idx: usize| params.get(idx).and_then(Value::as_str).unwrap_or_default();
        let present = if sql == HAS_TABLE_SQL {
            self.tables.contains(name(1))
        } else if sql == HAS_INDEX_SQL {
            self.indexes.contains(name(2))
        } else if sql == HAS_CONSTRAINT_SQL {
            self.constraints.contains(name(2))
        } else if sql.starts_with("SELECT count(*)") {
            false
        } else {
            return None;
        };
        Some(i64::from(present))
    }
}

fn failure(code: StatusCode, sql: &str) -> Error {
    Error::Query(QueryError::from_status(code, format!("mock failure for {}", sql)).with_sql(sql))
}

pub fn count_row(count: i64) -> Row {
    Row::new(vec!["count".to_string()], vec![Value::Int64(count)])
}

#[derive(Debug)]
pub struct MockConnection {
    server: MockServer,
}

impl Connection for MockConnection {
    async fn query(&self, _cx: &Cx, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        let mut state = self.server.state();
        state.queried.push((sql.to_string(), params.to_vec()));
        if let Some(code) = state.failures.get(sql) {
            return Outcome::Err(failure(*code, sql));
        }
        if let Some(rows) = state.results.get(sql) {
            return Outcome::Ok(rows.clone());
        }
        match state.count(sql, params) {
            Some(count) => Outcome::Ok(vec![count_row(count)]),
            None => Outcome::Ok(Vec::new()),
        }
    }

    async fn execute(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<u64, Error> {
        let mut state = self.server.state();
        state.executed.push((sql.to_string(), params.to_vec()));
        if state.cancel_on.contains(sql) {
            cx.cancel_with(CancelKind::User, Some("cancelled by test"));
        }
        if let Some(code) = state.failures.get(sql) {
            return Outcome::Err(failure(*code, sql));
        }
        match sql {
            "START BATCH DDL" => {
                state.batch = Some(Vec::new());
                return Outcome::Ok(0);
            }
            "RUN BATCH" => {
                let statements = state.batch.take().unwrap_or_default();
                if !statements.is_empty() {
                    state.apply_ddl(&statements);
                    state.ddl_requests.push(statements);
                }
                return Outcome::Ok(0);
            }
            "ABORT BATCH" => {
                state.batch = None;
                return Outcome::Ok(0);
            }
            _ => {}
        }
        if is_ddl(sql) {
            if let Some(batch) = state.batch.as_mut() {
                batch.push(sql.to_string());
            } else {
                let statements = vec![sql.to_string()];
                state.apply_ddl(&statements);
                state.ddl_requests.push(statements);
            }
            return Outcome::Ok(0);
        }
        Outcome::Ok(state.row_counts.get(sql).copied().unwrap_or(1))
    }

    async fn begin(&self, _cx: &Cx, options: &TxOptions) -> Outcome<(), Error> {
        let mut state = self.server.state();
        state.tx_log.push("BEGIN".to_string());
        state.begin_options.push(options.clone());
        Outcome::Ok(())
    }

    async fn commit(&self, _cx: &Cx) -> Outcome<(), Error> {
        let mut state = self.server.state();
        state.tx_log.push("COMMIT".to_string());
        match state.commit_aborts.pop_front() {
            Some(delay) => {
                let mut err = QueryError::from_status(
                    StatusCode::Aborted,
                    "Transaction was aborted due to a concurrent modification",
                );
                err.retry_delay = delay;
                Outcome::Err(Error::Query(err))
            }
            None => Outcome::Ok(()),
        }
    }

    async fn rollback(&self, _cx: &Cx) -> Outcome<(), Error> {
        self.server.state().tx_log.push("ROLLBACK".to_string());
        Outcome::Ok(())
    }

    fn batched_statements(&self) -> Option<Vec<String>> {
        self.server.state().batch.clone()
    }
}

/// A connection that is not backed by a Spanner driver and so cannot report
/// batched DDL.
#[derive(Debug)]
pub struct PlainConnection(pub MockConnection);

impl Connection for PlainConnection {
    async fn query(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        self.0.query(cx, sql, params).await
    }

    async fn execute(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<u64, Error> {
        self.0.execute(cx, sql, params).await
    }

    async fn begin(&self, cx: &Cx, options: &TxOptions) -> Outcome<(), Error> {
        self.0.begin(cx, options).await
    }

    async fn commit(&self, cx: &Cx) -> Outcome<(), Error> {
        self.0.commit(cx).await
    }

    async fn rollback(&self, cx: &Cx) -> Outcome<(), Error> {
        self.0.rollback(cx).await
    }
}

#[derive(Debug)]
pub struct MockPool {
    server: MockServer,
}

impl ConnPool for MockPool {
    type Conn = MockConnection;

    async fn acquire(&self, _cx: &Cx) -> Outcome<MockConnection, Error> {
        Outcome::Ok(self.server.connection())
    }
}

/// Opens pools over one shared server, recording how it was asked to.
#[derive(Debug, Default)]
pub struct MockDriver {
    pub server: MockServer,
    pub opened: Mutex<Vec<String>>,
}

impl Driver for MockDriver {
    type Pool = MockPool;
    type Connector = MockServer;

    fn open(&self, driver_name: &str, dsn: &str) -> Result<MockPool> {
        self.opened
            .lock()
            .unwrap()
            .push(format!("{}:{}", driver_name, dsn));
        Ok(self.server.pool())
    }

    fn open_connector(&self, connector: MockServer) -> Result<MockPool> {
        self.opened.lock().unwrap().push("connector".to_string());
        Ok(connector.pool())
    }
}

pub fn open_db(server: &MockServer) -> SpannerDb<MockPool> {
    SpannerDb::open(SpannerConfig::<MockDriver>::new().pool(server.pool()), &MockDriver::default())
        .expect("open spanner db")
}

// ==================== Models ====================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Singer {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub active: bool,
}

impl Model for Singer {
    const TABLE_NAME: &'static str = "singers";

    fn fields() -> Vec<FieldInfo> {
        vec![
            FieldInfo::new("id", "id", DataType::Uint)
                .primary_key(true)
                .auto_increment(true),
            FieldInfo::new("created_at", "created_at", DataType::Time),
            FieldInfo::new("updated_at", "updated_at", DataType::Time),
            FieldInfo::new("deleted_at", "deleted_at", DataType::Time).index(""),
            FieldInfo::new("first_name", "first_name", DataType::String),
            FieldInfo::new("last_name", "last_name", DataType::String),
            FieldInfo::new("full_name", "full_name", DataType::String),
            FieldInfo::new("active", "active", DataType::Bool),
        ]
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
            ("deleted_at", self.deleted_at.into()),
            ("first_name", self.first_name.clone().into()),
            ("last_name", self.last_name.clone().into()),
            ("full_name", self.full_name.clone().into()),
            ("active", self.active.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named_as("id")?,
            created_at: row.get_named_as("created_at")?,
            updated_at: row.get_named_as("updated_at")?,
            deleted_at: row.get_named_as("deleted_at")?,
            first_name: row.get_named_as("first_name")?,
            last_name: row.get_named_as("last_name")?,
            full_name: row.get_named_as("full_name")?,
            active: row.get_named_as("active")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Album {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub title: String,
    pub rating: f32,
    pub singer_id: i64,
}

impl Model for Album {
    const TABLE_NAME: &'static str = "albums";

    fn fields() -> Vec<FieldInfo> {
        vec![
            FieldInfo::new("id", "id", DataType::Uint)
                .primary_key(true)
                .auto_increment(true),
            FieldInfo::new("created_at", "created_at", DataType::Time),
            FieldInfo::new("updated_at", "updated_at", DataType::Time),
            FieldInfo::new("deleted_at", "deleted_at", DataType::Time).index(""),
            FieldInfo::new("title", "title", DataType::String),
            FieldInfo::new("rating", "rating", DataType::Float).size(32),
            FieldInfo::new("singer_id", "singer_id", DataType::Uint),
        ]
    }

    fn relationships() -> Vec<RelationshipInfo> {
        vec![RelationshipInfo::new(
            "singer",
            "singers",
            RelationshipKind::ManyToOne,
            "singer_id",
        )]
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
            ("deleted_at", self.deleted_at.into()),
            ("title", self.title.clone().into()),
            ("rating", self.rating.into()),
            ("singer_id", self.singer_id.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named_as("id")?,
            created_at: row.get_named_as("created_at")?,
            updated_at: row.get_named_as("updated_at")?,
            deleted_at: row.get_named_as("deleted_at")?,
            title: row.get_named_as("title")?,
            rating: row.get_named_as("rating")?,
            singer_id: row.get_named_as("singer_id")?,
        })
    }
}

/// Model with a custom sequence name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestRecord {
    pub id: i64,
    pub test: String,
    pub singer_id: i64,
}

impl Model for TestRecord {
    const TABLE_NAME: &'static str = "tests";

    fn fields() -> Vec<FieldInfo> {
        vec![
            FieldInfo::new("id", "id", DataType::Uint)
                .primary_key(true)
                .auto_increment(true)
                .sequence_name("overrided_sequence_name"),
            FieldInfo::new("test", "test", DataType::String),
            FieldInfo::new("singer_id", "singer_id", DataType::Uint),
        ]
    }

    fn relationships() -> Vec<RelationshipInfo> {
        vec![RelationshipInfo::new(
            "singer",
            "singers",
            RelationshipKind::ManyToOne,
            "singer_id",
        )]
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("test", self.test.clone().into()),
            ("singer_id", self.singer_id.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named_as("id")?,
            test: row.get_named_as("test")?,
            singer_id: row.get_named_as("singer_id")?,
        })
    }
}

/// Model with a commit timestamp column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub last_updated: CommitTimestamp,
}

impl Model for Track {
    const TABLE_NAME: &'static str = "tracks";

    fn fields() -> Vec<FieldInfo> {
        vec![
            FieldInfo::new("id", "id", DataType::Int).primary_key(true),
            FieldInfo::new("title", "title", DataType::String),
            FieldInfo::new("last_updated", "last_updated", DataType::Time)
                .data_type_of::<CommitTimestamp>(),
        ]
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("title", self.title.clone().into()),
            ("last_updated", self.last_updated.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named_as("id")?,
            title: row.get_named_as("title")?,
            last_updated: row.get_named_as("last_updated")?,
        })
    }
}

/// Row as returned for `SELECT * FROM singers`.
pub fn singer_row(id: i64, first_name: &str, last_name: &str) -> Row {
    Row::new(
        [
            "id",
            "created_at",
            "updated_at",
            "deleted_at",
            "first_name",
            "last_name",
            "full_name",
            "active",
        ]
        .iter()
        .map(|c| (*c).to_string())
        .collect(),
        vec![
            Value::Int64(id),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::String(first_name.to_string()),
            Value::String(last_name.to_string()),
            Value::String(format!("{} {}", first_name, last_name)),
            Value::Bool(true),
        ],
    )
}

/// One row of the column-details query.
pub fn column_row(name: &str, default: Option<&str>, data_type: &str, length: Option<i64>) -> Row {
    Row::new(
        ["COLUMN_NAME", "COLUMN_DEFAULT", "IS_NULLABLE", "DATA_TYPE", "COLUMN_LENGTH", "KEY"]
            .iter()
            .map(|c| (*c).to_string())
            .collect(),
        vec![
            Value::String(name.to_string()),
            default.map_or(Value::Null, Value::from),
            Value::Bool(true),
            Value::String(data_type.to_string()),
            length.map_or(Value::Null, Value::Int64),
            Value::Null,
        ],
    )
}
