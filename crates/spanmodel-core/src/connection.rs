//! Database connection traits.
//!
//! A Spanner driver provides three things: a [`Driver`] that opens a pool
//! from a DSN or a connector, the [`ConnPool`] itself, and the pooled
//! [`Connection`] handle. Transactions are scoped to a connection: `begin`,
//! `commit` and `rollback` act on the transaction currently open on it.

use std::future::Future;

use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;
use crate::{Cx, Outcome};

/// Transaction isolation levels supported by Spanner read/write transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    Serializable,
    RepeatableRead,
}

impl IsolationLevel {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
        }
    }
}

/// Options for starting a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOptions {
    /// `None` uses the database default.
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
    pub transaction_tag: Option<String>,
    /// Whether the driver transparently retries aborted transactions itself.
    pub retry_aborts_internally: bool,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            isolation: None,
            read_only: false,
            transaction_tag: None,
            retry_aborts_internally: true,
        }
    }
}

impl TxOptions {
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub fn transaction_tag(mut self, tag: impl Into<String>) -> Self {
        self.transaction_tag = Some(tag.into());
        self
    }

    pub fn retry_aborts_internally(mut self, value: bool) -> Self {
        self.retry_aborts_internally = value;
        self
    }
}

/// A single database connection.
///
/// Statements use `?` bind variables. Client-side statements understood by
/// Spanner drivers (`START BATCH DDL`, `RUN BATCH`, `ABORT BATCH`) go through
/// [`Connection::execute`] like any other statement.
///
/// `ABORT BATCH` and [`Connection::rollback`] are also sent after a cancelled
/// run, with the cancelled `cx`. Implementations must still carry them out,
/// or the batch and transaction stay open on the connection.
pub trait Connection: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        async move {
            match self.query(cx, sql, params).await {
                Outcome::Ok(rows) => Outcome::Ok(rows.into_iter().next()),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }

    /// Execute a statement and return the affected row count.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Start a read/write (or read-only) transaction on this connection.
    fn begin(
        &self,
        cx: &Cx,
        options: &TxOptions,
    ) -> impl Future<Output = Outcome<(), Error>> + Send;

    fn commit(&self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    fn rollback(&self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// DDL statements buffered by the active DDL batch.
    ///
    /// Only connections backed by a Spanner driver can report these; other
    /// connections return `None`.
    fn batched_statements(&self) -> Option<Vec<String>> {
        None
    }
}

/// A pool handing out connections.
pub trait ConnPool: Send + Sync {
    type Conn: Connection;

    fn acquire(&self, cx: &Cx) -> impl Future<Output = Outcome<Self::Conn, Error>> + Send;
}

/// Opens connection pools.
pub trait Driver {
    type Pool: ConnPool;
    /// Pre-built connector holding client configuration.
    type Connector;

    /// Open a pool from a data source name.
    fn open(&self, driver_name: &str, dsn: &str) -> Result<Self::Pool>;

    /// Open a pool from a connector.
    fn open_connector(&self, connector: Self::Connector) -> Result<Self::Pool>;
}
