//! Spanner schema migrator.
//!
//! `SpannerMigrator` creates, alters and drops tables, columns, indexes and
//! constraints for a set of [`TableSchema`]s over one borrowed connection.
//!
//! Spanner has no auto-increment columns. Auto-increment keys are backed by
//! a bit-reversed sequence created right before the table, and the column
//! default reads the next value from it. Unique constraints do not exist
//! either; unique indexes take their place.
//!
//! `auto_migrate` wraps the whole run in a DDL batch by default, so the
//! statements reach the server as one schema update. A failed run aborts the
//! batch and nothing is applied.

use std::collections::BTreeMap;

use asupersync::{Cx, Outcome};
use serde::Serialize;
use spanmodel_core::{
    Connection, ConnectionError, ConnectionErrorKind, Constraint, DefaultValue, Error, FieldInfo,
    TableSchema,
};
use spanmodel_query::{Dialect, SpannerDialect};

use crate::ddl::{self, DEFAULT_SEQUENCE_KIND, unique_constraints_unsupported};
use crate::introspect::{
    self, COLUMN_TYPES_SQL, CURRENT_DATABASE, ColumnType, HAS_COLUMN_SQL, HAS_CONSTRAINT_SQL,
    HAS_INDEX_SQL, HAS_TABLE_SQL, INDEXES_SQL, IS_GENERATED_SQL, Index,
};
use crate::order::reorder_schemas;

pub const START_BATCH_DDL: &str = "START BATCH DDL";
pub const RUN_BATCH: &str = "RUN BATCH";
pub const ABORT_BATCH: &str = "ABORT BATCH";

pub const DRY_RUN_UNSUPPORTED: &str =
    "unexpected connection type: dry-run is only supported on Spanner connections";

/// Sequence kind value that turns off sequence synthesis.
pub const SEQUENCE_KIND_DISABLED: &str = "DISABLED";

/// Migrator settings taken from the dialect configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratorOptions {
    /// Run auto-migrations statement by statement instead of in a DDL batch.
    pub disable_batching: bool,
    /// `sequence_kind` option of generated sequences.
    pub sequence_kind: String,
}

impl Default for MigratorOptions {
    fn default() -> Self {
        Self {
            disable_batching: false,
            sequence_kind: DEFAULT_SEQUENCE_KIND.to_string(),
        }
    }
}

impl MigratorOptions {
    pub fn disable_batching(mut self, value: bool) -> Self {
        self.disable_batching = value;
        self
    }

    pub fn sequence_kind(mut self, kind: impl Into<String>) -> Self {
        self.sequence_kind = kind.into();
        self
    }

    /// Whether auto-increment keys get a backing sequence.
    pub fn sequences_enabled(&self) -> bool {
        !self.sequence_kind.eq_ignore_ascii_case(SEQUENCE_KIND_DISABLED)
    }
}

/// A DDL statement captured by a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DdlStatement {
    pub sql: String,
}

/// Whether an existing column differs from its field definition enough to
/// need `ALTER COLUMN`.
///
/// Compares the base type, declared length, nullability and (for non-key
/// columns) the default expression.
pub fn column_needs_alter(dialect: &dyn Dialect, field: &FieldInfo, column: &ColumnType) -> bool {
    let full_type = ddl::full_data_type_of(dialect, field);

    let expected = introspect::normalize_type(&full_type);
    let actual = introspect::normalize_type(&column.data_type);
    if !expected.starts_with(&actual) {
        tracing::debug!(column = %column.name, expected = %expected, actual = %actual, "Column type changed");
        return true;
    }

    let declared = introspect::declared_length(&full_type);
    let field_size = i64::from(field.size);
    match column.length {
        Some(length) if length != field_size => {
            if length > 0 && field_size > 0 {
                return true;
            }
            if !field.primary_key && declared.is_some_and(|d| d != length) {
                return true;
            }
        }
        Some(_) => {}
        None => {
            if !field.primary_key && declared.is_some() {
                return true;
            }
        }
    }

    if !field.primary_key && column.nullable == field.not_null {
        return true;
    }

    if !field.primary_key && default_changed(field, column) {
        tracing::debug!(column = %column.name, "Column default changed");
        return true;
    }
    false
}

fn field_default_text(field: &FieldInfo) -> Option<Option<String>> {
    match field.default {
        None => Some(None),
        Some(default) if default.is_skip() => None,
        Some(DefaultValue::Expr(expr)) => {
            if expr.is_empty() || expr.eq_ignore_ascii_case("NULL") {
                Some(None)
            } else {
                Some(Some(expr.to_string()))
            }
        }
        Some(DefaultValue::Bool(b)) => Some(Some(b.to_string())),
        Some(DefaultValue::Int(i)) => Some(Some(i.to_string())),
        Some(DefaultValue::Float(f)) => Some(Some(f.to_string())),
        Some(DefaultValue::Text(s)) => Some(Some(s.to_string())),
        Some(DefaultValue::Skip) => None,
    }
}

fn normalize_default(text: &str) -> String {
    text.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_lowercase()
}

fn default_changed(field: &FieldInfo, column: &ColumnType) -> bool {
    // Skipped defaults are managed by the database.
    let Some(expected) = field_default_text(field) else {
        return false;
    };
    let actual = column
        .default_value
        .as_deref()
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("NULL"));
    match (expected.as_deref(), actual) {
        (None, None) => false,
        (Some(e), Some(a)) => normalize_default(e) != normalize_default(a),
        _ => true,
    }
}

/// Schema migrator bound to one connection.
pub struct SpannerMigrator<'a, C: Connection> {
    conn: &'a C,
    dialect: SpannerDialect,
    options: MigratorOptions,
}

impl<C: Connection> std::fmt::Debug for SpannerMigrator<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerMigrator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a, C: Connection> SpannerMigrator<'a, C> {
    pub fn new(conn: &'a C, options: MigratorOptions) -> Self {
        Self {
            conn,
            dialect: SpannerDialect,
            options,
        }
    }

    pub fn options(&self) -> &MigratorOptions {
        &self.options
    }

    /// The migrator always reports the default schema.
    pub fn current_database(&self) -> &'static str {
        CURRENT_DATABASE
    }

    /// Column type with ` NOT NULL` and ` DEFAULT (...)` as used in DDL.
    pub fn full_data_type_of(&self, field: &FieldInfo) -> String {
        ddl::full_data_type_of(&self.dialect, field)
    }

    async fn exec(&self, cx: &Cx, sql: &str) -> Outcome<(), Error> {
        tracing::trace!(sql = %sql, "Executing DDL");
        match self.conn.execute(cx, sql, &[]).await {
            Outcome::Ok(_) => Outcome::Ok(()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    async fn count(
        &self,
        cx: &Cx,
        table: &str,
        sql: &str,
        params: &[spanmodel_core::Value],
    ) -> Outcome<i64, Error> {
        let rows = match self.conn.query(cx, sql, params).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match introspect::count_from_rows(table, &rows) {
            Ok(n) => Outcome::Ok(n),
            Err(e) => Outcome::Err(e),
        }
    }

    // ==================== Batches ====================

    pub async fn start_batch_ddl(&self, cx: &Cx) -> Outcome<(), Error> {
        self.exec(cx, START_BATCH_DDL).await
    }

    pub async fn run_batch(&self, cx: &Cx) -> Outcome<(), Error> {
        self.exec(cx, RUN_BATCH).await
    }

    pub async fn abort_batch(&self, cx: &Cx) -> Outcome<(), Error> {
        self.exec(cx, ABORT_BATCH).await
    }

    /// Abort the open batch after a failed run. The migration failure is what
    /// the caller reports, so an abort failure is only logged.
    async fn abort_after_failure(&self, cx: &Cx) {
        match self.abort_batch(cx).await {
            Outcome::Ok(()) => {}
            Outcome::Err(e) => tracing::warn!(error = %e, "Failed to abort DDL batch"),
            Outcome::Cancelled(_) => tracing::warn!("DDL batch abort was cancelled"),
            Outcome::Panicked(_) => tracing::warn!("DDL batch abort panicked"),
        }
    }

    // ==================== Auto-migration ====================

    /// Create missing tables and bring existing ones up to date.
    pub async fn auto_migrate(&self, cx: &Cx, schemas: &[TableSchema]) -> Outcome<(), Error> {
        let batching = !self.options.disable_batching;
        tracing::debug!(tables = schemas.len(), batching, "Auto-migrating");
        if batching {
            match self.start_batch_ddl(cx).await {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        match self.migrate_all(cx, schemas).await {
            Outcome::Ok(()) if batching => self.run_batch(cx).await,
            Outcome::Ok(()) => Outcome::Ok(()),
            failed => {
                if batching {
                    self.abort_after_failure(cx).await;
                }
                failed
            }
        }
    }

    /// Run an auto-migration inside a DDL batch and return the statements it
    /// would execute, without applying them.
    pub async fn auto_migrate_dry_run(
        &self,
        cx: &Cx,
        schemas: &[TableSchema],
    ) -> Outcome<Vec<DdlStatement>, Error> {
        match self.start_batch_ddl(cx).await {
            Outcome::Ok(()) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
        match self.migrate_all(cx, schemas).await {
            Outcome::Ok(()) => {}
            failed => {
                self.abort_after_failure(cx).await;
                return match failed {
                    Outcome::Err(e) => Outcome::Err(e),
                    Outcome::Cancelled(r) => Outcome::Cancelled(r),
                    Outcome::Panicked(p) => Outcome::Panicked(p),
                    Outcome::Ok(()) => Outcome::Ok(Vec::new()),
                };
            }
        }

        let Some(statements) = self.conn.batched_statements() else {
            self.abort_after_failure(cx).await;
            return Outcome::Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Capability,
                message: DRY_RUN_UNSUPPORTED.to_string(),
                source: None,
            }));
        };
        tracing::debug!(statements = statements.len(), "Captured dry-run DDL");

        match self.abort_batch(cx).await {
            Outcome::Ok(()) => Outcome::Ok(
                statements
                    .into_iter()
                    .map(|sql| DdlStatement { sql })
                    .collect(),
            ),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    async fn migrate_all(&self, cx: &Cx, schemas: &[TableSchema]) -> Outcome<(), Error> {
        for schema in reorder_schemas(schemas) {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let exists = match self.has_table(cx, schema.table).await {
                Outcome::Ok(exists) => exists,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            let step = if exists {
                self.migrate_existing(cx, schema).await
            } else {
                self.create_one(cx, schema).await
            };
            match step {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        Outcome::Ok(())
    }

    async fn migrate_existing(&self, cx: &Cx, schema: &TableSchema) -> Outcome<(), Error> {
        tracing::debug!(table = schema.table, "Migrating existing table");
        let columns = match self.column_types(cx, schema).await {
            Outcome::Ok(columns) => columns,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        for field in schema.migratable_fields() {
            let existing = columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(field.column_name));
            let step = match existing {
                None => self.add_column(cx, schema, field.column_name).await,
                Some(column) => self.migrate_column(cx, schema, field, column).await,
            };
            match step {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }

        let mut constraint_names: Vec<String> = schema
            .owned_foreign_keys()
            .into_iter()
            .map(|fk| fk.name)
            .collect();
        constraint_names.extend(schema.unique_constraints().into_keys());
        constraint_names.extend(schema.parse_checks().into_keys().map(str::to_string));

        for name in &constraint_names {
            let exists = match self.has_constraint(cx, schema, name).await {
                Outcome::Ok(exists) => exists,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            if !exists {
                match self.create_constraint(cx, schema, name).await {
                    Outcome::Ok(()) => {}
                    other => return other,
                }
            }
        }

        for name in schema.parse_indexes().into_keys() {
            let exists = match self.has_index(cx, schema, &name).await {
                Outcome::Ok(exists) => exists,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            if !exists {
                match self.create_index(cx, schema, &name).await {
                    Outcome::Ok(()) => {}
                    other => return other,
                }
            }
        }
        Outcome::Ok(())
    }

    // ==================== Tables ====================

    /// Create tables, referenced tables first.
    pub async fn create_table(&self, cx: &Cx, schemas: &[TableSchema]) -> Outcome<(), Error> {
        for schema in reorder_schemas(schemas) {
            match self.create_one(cx, schema).await {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        Outcome::Ok(())
    }

    async fn create_one(&self, cx: &Cx, schema: &TableSchema) -> Outcome<(), Error> {
        // Sequence defaults apply to this statement only; the field metadata
        // keeps its declared default.
        let mut sequences = Vec::new();
        let mut sequence_defaults = BTreeMap::new();
        if self.options.sequences_enabled() {
            for field in schema.migratable_fields().filter(|f| f.needs_sequence()) {
                let name = ddl::sequence_name(schema.table, field);
                sequence_defaults.insert(field.column_name, ddl::sequence_default(&name));
                sequences.push(name);
            }
        }

        let create_sql = match ddl::create_table(&self.dialect, schema, &sequence_defaults) {
            Ok(sql) => sql,
            Err(e) => return Outcome::Err(e),
        };

        tracing::debug!(table = schema.table, sequences = sequences.len(), "Creating table");
        for name in &sequences {
            let sql = ddl::create_sequence(name, &self.options.sequence_kind);
            match self.exec(cx, &sql).await {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        match self.exec(cx, &create_sql).await {
            Outcome::Ok(()) => {}
            other => return other,
        }

        // Spanner has no inline indexes; create them afterwards in name order.
        for index in schema.parse_indexes().values() {
            let sql = ddl::create_index(&self.dialect, schema.table, index);
            match self.exec(cx, &sql).await {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        Outcome::Ok(())
    }

    /// Drop tables, dependent tables first.
    pub async fn drop_table(&self, cx: &Cx, schemas: &[TableSchema]) -> Outcome<(), Error> {
        for schema in reorder_schemas(schemas).into_iter().rev() {
            tracing::debug!(table = schema.table, "Dropping table");
            match self.exec(cx, &ddl::drop_table(&self.dialect, schema.table)).await {
                Outcome::Ok(()) => {}
                other => return other,
            }
        }
        Outcome::Ok(())
    }

    pub async fn has_table(&self, cx: &Cx, table: &str) -> Outcome<bool, Error> {
        let params = introspect::existence_params(table, "BASE TABLE");
        match self.count(cx, table, HAS_TABLE_SQL, &params).await {
            Outcome::Ok(n) => Outcome::Ok(n > 0),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    // ==================== Columns ====================

    fn lookup_field<'s>(schema: &'s TableSchema, name: &str) -> Result<&'s FieldInfo, Error> {
        schema
            .field(name)
            .ok_or_else(|| Error::Custom(format!("failed to look up field with name: {}", name)))
    }

    /// Add the column of the named field.
    pub async fn add_column(&self, cx: &Cx, schema: &TableSchema, name: &str) -> Outcome<(), Error> {
        let field = match Self::lookup_field(schema, name) {
            Ok(field) => field,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(table = schema.table, column = field.column_name, "Adding column");
        self.exec(cx, &ddl::add_column(&self.dialect, schema.table, field))
            .await
    }

    /// Alter the named column to its field definition. Generated columns are
    /// left untouched.
    pub async fn alter_column(
        &self,
        cx: &Cx,
        schema: &TableSchema,
        name: &str,
    ) -> Outcome<(), Error> {
        match self.is_column_generated(cx, schema, name).await {
            Outcome::Ok(true) => {
                tracing::debug!(table = schema.table, column = name, "Skipping generated column");
                return Outcome::Ok(());
            }
            Outcome::Ok(false) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
        let field = match Self::lookup_field(schema, name) {
            Ok(field) => field,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(table = schema.table, column = field.column_name, "Altering column");
        self.exec(cx, &ddl::alter_column(&self.dialect, schema.table, field))
            .await
    }

    /// Alter `column` if it no longer matches `field`.
    pub async fn migrate_column(
        &self,
        cx: &Cx,
        schema: &TableSchema,
        field: &FieldInfo,
        column: &ColumnType,
    ) -> Outcome<(), Error> {
        if field.ignore_migration || !column_needs_alter(&self.dialect, field, column) {
            return Outcome::Ok(());
        }
        self.alter_column(cx, schema, field.column_name).await
    }

    pub async fn has_column(&self, cx: &Cx, schema: &TableSchema, name: &str) -> Outcome<bool, Error> {
        let column = schema.field(name).map_or(name, |f| f.column_name);
        let params = introspect::existence_params(schema.table, column);
        match self.count(cx, schema.table, HAS_COLUMN_SQL, &params).await {
            Outcome::Ok(n) => Outcome::Ok(n > 0),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    pub async fn is_column_generated(
        &self,
        cx: &Cx,
        schema: &TableSchema,
        name: &str,
    ) -> Outcome<bool, Error> {
        let column = schema.field(name).map_or(name, |f| f.column_name);
        let params = introspect::existence_params(schema.table, column);
        match self.count(cx, schema.table, IS_GENERATED_SQL, &params).await {
            Outcome::Ok(n) => Outcome::Ok(n > 0),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Current columns of the table, in ordinal order.
    pub async fn column_types(
        &self,
        cx: &Cx,
        schema: &TableSchema,
    ) -> Outcome<Vec<ColumnType>, Error> {
        let params = [
            spanmodel_core::Value::from(CURRENT_DATABASE),
            spanmodel_core::Value::from(schema.table),
        ];
        let rows = match self.conn.query(cx, COLUMN_TYPES_SQL, &params).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match introspect::column_types_from_rows(schema.table, &rows) {
            Ok(columns) => Outcome::Ok(columns),
            Err(e) => Outcome::Err(e),
        }
    }

    // ==================== Indexes ====================

    /// Create the index with the given index or field name.
    pub async fn create_index(&self, cx: &Cx, schema: &TableSchema, name: &str) -> Outcome<(), Error> {
        let Some(index) = schema.lookup_index(name) else {
            return Outcome::Err(Error::Custom(format!(
                "failed to create index with name {}",
                name
            )));
        };
        tracing::debug!(table = schema.table, index = %index.name, "Creating index");
        self.exec(cx, &ddl::create_index(&self.dialect, schema.table, &index))
            .await
    }

    pub async fn drop_index(&self, cx: &Cx, schema: &TableSchema, name: &str) -> Outcome<(), Error> {
        let name = schema
            .lookup_index(name)
            .map_or_else(|| name.to_string(), |idx| idx.name);
        self.exec(cx, &ddl::drop_index(&self.dialect, &name)).await
    }

    pub async fn has_index(&self, cx: &Cx, schema: &TableSchema, name: &str) -> Outcome<bool, Error> {
        let name = schema
            .lookup_index(name)
            .map_or_else(|| name.to_string(), |idx| idx.name);
        let params = introspect::existence_params(schema.table, &name);
        match self.count(cx, schema.table, HAS_INDEX_SQL, &params).await {
            Outcome::Ok(n) => Outcome::Ok(n > 0),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Indexes of `table` that the user created, including the primary key,
    /// sorted by name.
    pub async fn get_indexes(&self, cx: &Cx, table: &str) -> Outcome<Vec<Index>, Error> {
        let params = [
            spanmodel_core::Value::from(CURRENT_DATABASE),
            spanmodel_core::Value::from(table),
        ];
        let rows = match self.conn.query(cx, INDEXES_SQL, &params).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match introspect::indexes_from_rows(table, &rows) {
            Ok(indexes) => Outcome::Ok(indexes),
            Err(e) => Outcome::Err(e),
        }
    }

    // ==================== Constraints ====================

    /// Create a foreign key or check constraint. Unique constraints are
    /// rejected.
    pub async fn create_constraint(
        &self,
        cx: &Cx,
        schema: &TableSchema,
        name: &str,
    ) -> Outcome<(), Error> {
        let sql = match schema.lookup_constraint(name) {
            Some(Constraint::Unique(_)) => return Outcome::Err(unique_constraints_unsupported()),
            Some(Constraint::ForeignKey(fk)) => ddl::add_foreign_key(&self.dialect, &fk),
            Some(Constraint::Check(check)) => ddl::add_check(&self.dialect, schema.table, &check),
            None => {
                return Outcome::Err(Error::Custom(format!(
                    "failed to create constraint with name {}",
                    name
                )));
            }
        };
        tracing::debug!(table = schema.table, constraint = name, "Creating constraint");
        self.exec(cx, &sql).await
    }

    /// Drop a foreign key or check constraint. Unique constraints are
    /// rejected.
    pub async fn drop_constraint(
        &self,
        cx: &Cx,
        schema: &TableSchema,
        name: &str,
    ) -> Outcome<(), Error> {
        let sql = match schema.lookup_constraint(name) {
            Some(Constraint::Unique(_)) => return Outcome::Err(unique_constraints_unsupported()),
            Some(Constraint::ForeignKey(fk)) => {
                ddl::drop_constraint(&self.dialect, &fk.table, &fk.name)
            }
            Some(Constraint::Check(check)) => {
                ddl::drop_constraint(&self.dialect, schema.table, check.name)
            }
            None => ddl::drop_constraint(&self.dialect, schema.table, name),
        };
        self.exec(cx, &sql).await
    }

    pub async fn has_constraint(
        &self,
        cx: &Cx,
        schema: &TableSchema,
        name: &str,
    ) -> Outcome<bool, Error> {
        let (table, name) = match schema.lookup_constraint(name) {
            Some(c) => (
                c.table().unwrap_or(schema.table).to_string(),
                c.name().to_string(),
            ),
            None => (schema.table.to_string(), name.to_string()),
        };
        let params = introspect::existence_params(&table, &name);
        match self.count(cx, &table, HAS_CONSTRAINT_SQL, &params).await {
            Outcome::Ok(n) => Outcome::Ok(n > 0),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }
}
