//! Statement building for spanmodel.
//!
//! `spanmodel-query` turns models into SQL text and bind variables.
//!
//! # Role In The Architecture
//!
//! - **Dialect**: [`SpannerDialect`] maps field metadata to Spanner column
//!   types, quotes identifiers and renders literals for `explain`.
//! - **Clause model**: a [`Statement`] is a set of named [`Clause`]s rendered
//!   in a fixed order. A [`ClauseBuilders`] registry lets a dialect replace
//!   the rendering of single clauses; [`spanner::clause_builders`] installs
//!   the `INSERT OR UPDATE` / `THEN RETURN` rewrites.
//! - **Builders**: [`InsertBuilder`], [`UpdateBuilder`], [`DeleteBuilder`] and
//!   [`SelectBuilder`] assemble statements from models and execute them on a
//!   [`Connection`](spanmodel_core::Connection).

pub mod builder;
pub mod clause;
pub mod dialect;
pub mod hints;
pub mod spanner;
pub mod statement;

pub use builder::{BuildContext, DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
pub use clause::{Assignment, Clause, Expr, OnConflict, Returning, Where};
pub use dialect::{Dialect, MAX_BYTES_LENGTH, MAX_STRING_LENGTH, SpannerDialect, write_literal};
pub use hints::{IndexHint, force_index};
pub use statement::{BuiltStatement, ClauseBuilderFn, ClauseBuilders, SqlBuilder, Statement};
