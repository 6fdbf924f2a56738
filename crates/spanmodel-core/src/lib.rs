//! Core types and traits for spanmodel.
//!
//! `spanmodel-core` is the **foundation layer** of the workspace. It defines the
//! traits and data types that the query, schema and facade crates build on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Model` is implemented by user models; `Driver`,
//!   `ConnPool` and `Connection` are implemented by Spanner drivers.
//! - **Data model**: `Row`, `Value` and `DataType` represent query inputs and
//!   outputs and are shared across every crate.
//! - **Schema metadata**: `FieldInfo`, `RelationshipInfo` and `TableSchema`
//!   describe tables for DDL generation.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so
//!   every async database operation is cancel-correct.

pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod model;
pub mod relationship;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{ConnPool, Connection, Driver, IsolationLevel, TxOptions};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, DecodeError, Error, IntrospectionError,
    QueryError, QueryErrorKind, Result, StatusCode, UnsupportedError,
};
pub use field::{DbTypeFn, DefaultValue, FieldInfo, ReferentialAction};
pub use identifiers::{quote, quote_list, quote_to};
pub use model::{
    CheckConstraint, Constraint, IndexInfo, Model, TableSchema, UniqueConstraint,
};
pub use relationship::{ForeignKeyConstraint, RelationshipInfo, RelationshipKind};
pub use row::Row;
pub use types::{DataType, DbDataType, FromValue, SqlDataType, ToValue};
pub use value::Value;
