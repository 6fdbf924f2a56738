//! Schema management for spanmodel.
//!
//! `spanmodel-schema` owns everything that touches the database schema:
//! rendering Spanner DDL, reading `INFORMATION_SCHEMA`, and the migrator that
//! ties the two together.
//!
//! # Role In The Architecture
//!
//! - **DDL**: [`ddl`] renders `CREATE TABLE`, sequences, indexes and
//!   constraints from [`TableSchema`](spanmodel_core::TableSchema) metadata.
//! - **Introspection**: [`introspect`] holds the catalog queries and decodes
//!   their rows into [`ColumnType`] and [`Index`].
//! - **Migration**: [`SpannerMigrator`] creates or alters tables in
//!   dependency order, batching the DDL into one schema update.

pub mod ddl;
pub mod introspect;
pub mod migrator;
pub mod order;

pub use ddl::{DEFAULT_SEQUENCE_KIND, UNIQUE_CONSTRAINTS_UNSUPPORTED};
pub use introspect::{ColumnType, Index};
pub use migrator::{
    DRY_RUN_UNSUPPORTED, DdlStatement, MigratorOptions, SEQUENCE_KIND_DISABLED, SpannerMigrator,
    column_needs_alter,
};
pub use order::reorder_schemas;
