//! Cloud Spanner support for a sqlmodel-style ORM.
//!
//! `spanmodel` is the facade crate. It wires the Spanner dialect, the schema
//! migrator and the transaction helpers into one database handle.
//!
//! # Role In The Architecture
//!
//! - **Configuration**: [`SpannerConfig`] names one connection source and the
//!   migration settings; [`SpannerDb::open`] validates it.
//! - **Sessions**: [`Session`] runs model operations, raw SQL, migrations and
//!   retried transactions on one pooled connection.
//! - **Column types**: [`CommitTimestamp`] and the [`array`] types map
//!   Spanner-specific columns to Rust values.
//!
//! # Example
//!
//! ```ignore
//! use spanmodel::prelude::*;
//!
//! let db = SpannerDb::open(SpannerConfig::new().dsn(dsn), &driver)?;
//! db.auto_migrate(&cx, &[Singer::schema(), Album::schema()]).await;
//!
//! let session = db.session(&cx).await;
//! session.run_transaction(&cx, TxOptions::default(), |cx, tx| {
//!     Box::pin(async move { tx.create(cx, &singer).await })
//! }).await;
//! ```

pub mod array;
pub mod commit_timestamp;
pub mod config;
pub mod db;
pub mod retry;

pub use array::{
    BoolArray, BytesArray, DateArray, Float32Array, Float64Array, Int64Array, JsonArray,
    NullBoolArray, NullBytesArray, NullDateArray, NullFloat32Array, NullFloat64Array,
    NullInt64Array, NullJsonArray, NullStringArray, NullTimestampArray, StringArray,
    TimestampArray,
};
pub use commit_timestamp::{COMMIT_TIMESTAMP_TYPE, CommitTimestamp, PENDING_COMMIT_TIMESTAMP};
pub use config::{ConfigOptions, DEFAULT_DRIVER_NAME, SpannerConfig};
pub use db::{Session, SpannerDb};
pub use retry::{RetryPolicy, TxFuture, run_transaction, run_transaction_with_policy};

pub use spanmodel_core;
pub use spanmodel_query;
pub use spanmodel_schema;

/// Common imports.
pub mod prelude {
    pub use crate::array::*;
    pub use crate::commit_timestamp::CommitTimestamp;
    pub use crate::config::{ConfigOptions, SpannerConfig};
    pub use crate::db::{Session, SpannerDb};
    pub use crate::retry::{RetryPolicy, run_transaction};

    pub use asupersync::{Cx, Outcome};
    pub use spanmodel_core::{
        CheckConstraint, ConnPool, Connection, DataType, DefaultValue, Driver, Error, FieldInfo,
        FromValue, Model, ReferentialAction, RelationshipInfo, RelationshipKind, Result, Row,
        SqlDataType, TableSchema, ToValue, TxOptions, Value,
    };
    pub use spanmodel_query::{Expr, IndexHint, OnConflict, force_index};
    pub use spanmodel_schema::{DdlStatement, MigratorOptions, SpannerMigrator};
}
