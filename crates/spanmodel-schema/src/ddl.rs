//! Spanner DDL text generation.
//!
//! Pure functions from schema metadata to statement text. Nothing here talks
//! to the database; the migrator decides which statements to run and when.

use std::collections::BTreeMap;

use spanmodel_core::{
    CheckConstraint, DefaultValue, Error, FieldInfo, ForeignKeyConstraint, IndexInfo, Result,
    TableSchema,
};
use spanmodel_query::Dialect;

/// Sequence kind used when none is configured.
pub const DEFAULT_SEQUENCE_KIND: &str = "bit_reversed_positive";

pub const UNIQUE_CONSTRAINTS_UNSUPPORTED: &str =
    "unique constraints are not supported by Spanner, use a unique index instead";

pub(crate) fn unique_constraints_unsupported() -> Error {
    Error::unsupported("unique constraint", UNIQUE_CONSTRAINTS_UNSUPPORTED)
}

/// Name of the sequence backing an auto-increment field: the field's
/// override, or `<table>_seq`.
pub fn sequence_name(table: &str, field: &FieldInfo) -> String {
    match field.sequence_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{}_seq", table),
    }
}

pub fn create_sequence(name: &str, kind: &str) -> String {
    format!(
        "CREATE SEQUENCE IF NOT EXISTS {} OPTIONS (sequence_kind = \"{}\")",
        name, kind
    )
}

/// Default expression drawing the next value of a sequence.
pub fn sequence_default(name: &str) -> String {
    format!("GET_NEXT_SEQUENCE_VALUE(Sequence {})", name)
}

/// Column type followed by ` NOT NULL` and ` DEFAULT (...)` where declared.
pub fn full_data_type_of(dialect: &dyn Dialect, field: &FieldInfo) -> String {
    full_data_type_with_default(dialect, field, None)
}

/// Like [`full_data_type_of`], with `default_override` taking the place of
/// the field's declared default.
pub fn full_data_type_with_default(
    dialect: &dyn Dialect,
    field: &FieldInfo,
    default_override: Option<&str>,
) -> String {
    let mut sql = dialect.column_type(field);
    if field.not_null {
        sql.push_str(" NOT NULL");
    }

    if let Some(expr) = default_override {
        sql.push_str(" DEFAULT (");
        sql.push_str(expr);
        sql.push(')');
        return sql;
    }

    match field.default {
        None => {}
        Some(default) if default.is_skip() => {}
        Some(DefaultValue::Expr(expr)) => {
            if !expr.is_empty() {
                sql.push_str(" DEFAULT (");
                sql.push_str(expr);
                sql.push(')');
            }
        }
        Some(default) => {
            if let Some(literal) = default.literal() {
                sql.push_str(" DEFAULT (");
                sql.push_str(&dialect.explain("?", &[literal]));
                sql.push(')');
            }
        }
    }
    sql
}

/// `CONSTRAINT `fk` FOREIGN KEY (`cols`) REFERENCES `ref`(`cols`) [ON DELETE ..] [ON UPDATE ..]`
pub fn foreign_key_definition(dialect: &dyn Dialect, fk: &ForeignKeyConstraint) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
        dialect.quote(&fk.name),
        quote_columns(dialect, &fk.columns),
        dialect.quote(&fk.ref_table),
        quote_columns(dialect, &fk.ref_columns),
    );
    if let Some(action) = fk.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = fk.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.as_sql());
    }
    sql
}

pub fn check_definition(dialect: &dyn Dialect, check: &CheckConstraint) -> String {
    format!(
        "CONSTRAINT {} CHECK ({})",
        dialect.quote(check.name),
        check.expression
    )
}

fn quote_columns<S: AsRef<str>>(dialect: &dyn Dialect, columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| dialect.quote(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// `CREATE TABLE` for one schema.
///
/// `sequence_defaults` maps column names to default expressions that replace
/// the declared default for this statement only; the migrator uses it for
/// sequence-backed keys. Foreign keys owned by the table and check
/// constraints are written inline. Indexes are not part of the statement.
///
/// Table options are appended verbatim after the primary key, so they carry
/// their own separator, e.g. `", INTERLEAVE IN PARENT singers ON DELETE CASCADE"`.
pub fn create_table(
    dialect: &dyn Dialect,
    schema: &TableSchema,
    sequence_defaults: &BTreeMap<&str, String>,
) -> Result<String> {
    if !schema.unique_constraints().is_empty() {
        return Err(unique_constraints_unsupported());
    }

    let mut definitions = Vec::new();
    let mut has_primary_key_in_type = false;
    for field in schema.migratable_fields() {
        let default_override = sequence_defaults.get(field.column_name).map(String::as_str);
        has_primary_key_in_type |= dialect
            .column_type(field)
            .to_uppercase()
            .contains("PRIMARY KEY");
        definitions.push(format!(
            "{} {}",
            dialect.quote(field.column_name),
            full_data_type_with_default(dialect, field, default_override)
        ));
    }

    for fk in schema.owned_foreign_keys() {
        definitions.push(foreign_key_definition(dialect, &fk));
    }
    for check in schema.parse_checks().values() {
        definitions.push(check_definition(dialect, check));
    }

    let mut sql = format!(
        "CREATE TABLE {} ({})",
        dialect.quote(schema.table),
        definitions.join(",")
    );

    let primary_keys = schema.primary_key_columns();
    if !has_primary_key_in_type && !primary_keys.is_empty() {
        sql.push_str(" PRIMARY KEY (");
        sql.push_str(&quote_columns(dialect, &primary_keys));
        sql.push(')');
    }

    if let Some(options) = schema.table_options {
        sql.push_str(options);
    }

    tracing::debug!(dialect = dialect.name(), table = schema.table, sql = %sql, "Generated CREATE TABLE");
    Ok(sql)
}

pub fn drop_table(dialect: &dyn Dialect, table: &str) -> String {
    format!("DROP TABLE {}", dialect.quote(table))
}

/// `CREATE [UNIQUE] INDEX `name` ON `table`(`cols`)`
pub fn create_index(dialect: &dyn Dialect, table: &str, index: &IndexInfo) -> String {
    format!(
        "CREATE {}INDEX {} ON {}({})",
        if index.unique { "UNIQUE " } else { "" },
        dialect.quote(&index.name),
        dialect.quote(table),
        quote_columns(dialect, &index.columns)
    )
}

pub fn drop_index(dialect: &dyn Dialect, name: &str) -> String {
    format!("DROP INDEX {}", dialect.quote(name))
}

pub fn add_column(dialect: &dyn Dialect, table: &str, field: &FieldInfo) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        dialect.quote(table),
        dialect.quote(field.column_name),
        full_data_type_of(dialect, field)
    )
}

pub fn alter_column(dialect: &dyn Dialect, table: &str, field: &FieldInfo) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} {}",
        dialect.quote(table),
        dialect.quote(field.column_name),
        full_data_type_of(dialect, field)
    )
}

pub fn add_foreign_key(dialect: &dyn Dialect, fk: &ForeignKeyConstraint) -> String {
    format!(
        "ALTER TABLE {} ADD {}",
        dialect.quote(&fk.table),
        foreign_key_definition(dialect, fk)
    )
}

pub fn add_check(dialect: &dyn Dialect, table: &str, check: &CheckConstraint) -> String {
    format!(
        "ALTER TABLE {} ADD {}",
        dialect.quote(table),
        check_definition(dialect, check)
    )
}

pub fn drop_constraint(dialect: &dyn Dialect, table: &str, name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        dialect.quote(table),
        dialect.quote(name)
    )
}
