//! Reading the current schema from Spanner's information schema.
//!
//! Spanner exposes a single schema per database to the default dialect, so
//! every query binds the empty string as `table_schema`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use spanmodel_core::{Error, IntrospectionError, Result, Row, Value};

/// The schema name bound into information-schema queries.
pub const CURRENT_DATABASE: &str = "";

pub const HAS_TABLE_SQL: &str = "SELECT count(*) FROM information_schema.tables \
     WHERE table_schema = ? AND table_name = ? AND table_type = ?";

pub const HAS_COLUMN_SQL: &str = "SELECT count(*) FROM INFORMATION_SCHEMA.columns \
     WHERE table_schema = ? AND table_name = ? AND column_name = ?";

pub const HAS_INDEX_SQL: &str = "SELECT count(*) FROM information_schema.indexes \
     WHERE table_schema = ? AND table_name = ? AND index_name = ?";

pub const HAS_CONSTRAINT_SQL: &str = "SELECT count(*) FROM INFORMATION_SCHEMA.table_constraints \
     WHERE constraint_schema = ? AND table_name = ? AND constraint_name = ?";

pub const IS_GENERATED_SQL: &str = "SELECT count(*) FROM INFORMATION_SCHEMA.columns \
     WHERE table_schema = ? AND table_name = ? AND column_name = ? \
     AND generation_expression IS NOT NULL";

pub const INDEXES_SQL: &str = "SELECT i.index_name, i.is_unique, \
     i.index_type = 'PRIMARY_KEY' AS is_primary_key, i.index_type, col.column_name \
     FROM information_schema.indexes i \
     INNER JOIN information_schema.index_columns ic \
     ON ic.table_catalog = i.table_catalog AND ic.table_schema = i.table_schema \
     AND ic.table_name = i.table_name AND ic.index_name = i.index_name \
     INNER JOIN information_schema.columns col \
     ON col.column_name = ic.column_name AND col.table_name = ic.table_name \
     AND col.table_schema = ic.table_schema AND col.table_catalog = ic.table_catalog \
     WHERE i.spanner_is_managed = false AND i.table_schema = ? AND i.table_name = ? \
     ORDER BY i.table_catalog, i.table_schema, i.table_name, i.index_name, ic.ordinal_position";

/// Column metadata query. `KEY` is `PRI` or `UNI` from the first unique index
/// covering the column, ordered by index type.
pub const COLUMN_TYPES_SQL: &str = "SELECT COLUMN_NAME, COLUMN_DEFAULT, IS_NULLABLE = 'YES', \
     REGEXP_REPLACE(SPANNER_TYPE, '\\\\(.*\\\\)', '') AS DATA_TYPE, \
     SAFE_CAST(REPLACE(REPLACE(REGEXP_EXTRACT(SPANNER_TYPE, '\\\\(.*\\\\)'), '(', ''), ')', '') AS INT64) AS COLUMN_LENGTH, \
     (SELECT IF(I.INDEX_TYPE='PRIMARY_KEY', 'PRI', 'UNI') \
     FROM INFORMATION_SCHEMA.INDEXES I \
     INNER JOIN INFORMATION_SCHEMA.INDEX_COLUMNS IC USING (TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME, INDEX_NAME) \
     WHERE IC.TABLE_CATALOG = C.TABLE_CATALOG AND IC.TABLE_SCHEMA = C.TABLE_SCHEMA \
     AND IC.TABLE_NAME = C.TABLE_NAME AND IC.COLUMN_NAME = C.COLUMN_NAME AND I.IS_UNIQUE \
     ORDER BY I.INDEX_TYPE LIMIT 1) AS KEY \
     FROM INFORMATION_SCHEMA.COLUMNS C WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

/// A column as it currently exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    pub name: String,
    /// `COLUMN_DEFAULT` with surrounding single quotes removed.
    pub default_value: Option<String>,
    pub nullable: bool,
    /// Spanner type with any parenthesised length removed, e.g. `STRING`.
    pub data_type: String,
    /// Declared length; `None` for `MAX` and unsized types.
    pub length: Option<i64>,
    pub primary_key: bool,
    pub unique: bool,
}

impl ColumnType {
    /// Precision and scale; Spanner NUMERIC is fixed at 38/9.
    pub fn decimal_size(&self) -> Option<(i64, i64)> {
        if self.data_type == "NUMERIC" {
            Some((38, 9))
        } else {
            None
        }
    }

    pub fn from_row(table: &str, row: &Row) -> Result<Self> {
        let name: String = decode(table, row.get_as(0))?;
        let default_value: Option<String> = decode(table, row.get_as(1))?;
        let nullable: Option<bool> = decode(table, row.get_as(2))?;
        let data_type: String = decode(table, row.get_as(3))?;
        let length: Option<i64> = decode(table, row.get_as(4))?;
        let key: Option<String> = decode(table, row.get_as(5))?;

        Ok(Self {
            name,
            default_value: default_value.map(|d| d.trim_matches('\'').to_string()),
            nullable: nullable.unwrap_or(false),
            data_type,
            length,
            primary_key: key.as_deref() == Some("PRI"),
            unique: key.as_deref() == Some("UNI"),
        })
    }
}

/// An index as it currently exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub table: String,
    pub name: String,
    /// Columns in ordinal order.
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary_key: bool,
}

fn decode<T>(table: &str, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        Error::Introspection(IntrospectionError {
            table: table.to_string(),
            message: e.to_string(),
        })
    })
}

/// Decode the rows of [`COLUMN_TYPES_SQL`].
pub fn column_types_from_rows(table: &str, rows: &[Row]) -> Result<Vec<ColumnType>> {
    rows.iter().map(|row| ColumnType::from_row(table, row)).collect()
}

/// Group the rows of [`INDEXES_SQL`] into indexes, sorted by name.
pub fn indexes_from_rows(table: &str, rows: &[Row]) -> Result<Vec<Index>> {
    let mut indexes: BTreeMap<String, Index> = BTreeMap::new();
    for row in rows {
        let name: String = decode(table, row.get_as(0))?;
        let unique: Option<bool> = decode(table, row.get_as(1))?;
        let primary_key: Option<bool> = decode(table, row.get_as(2))?;
        let column: String = decode(table, row.get_as(4))?;
        indexes
            .entry(name.clone())
            .or_insert_with(|| Index {
                table: table.to_string(),
                name,
                columns: Vec::new(),
                unique: unique.unwrap_or(false),
                primary_key: primary_key.unwrap_or(false),
            })
            .columns
            .push(column);
    }
    Ok(indexes.into_values().collect())
}

/// Read the single `count(*)` value of an existence query.
pub fn count_from_rows(table: &str, rows: &[Row]) -> Result<i64> {
    match rows.first() {
        Some(row) => decode(table, row.get_as::<i64>(0)),
        None => Ok(0),
    }
}

/// Bind values for a `(schema, table, name)` existence query.
pub fn existence_params(table: &str, name: &str) -> Vec<Value> {
    vec![
        Value::from(CURRENT_DATABASE),
        Value::from(table),
        Value::from(name),
    ]
}

fn type_params_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^()]*\)").ok()).as_ref()
}

fn type_length_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_<>]*?\((\d+)\)").ok()).as_ref()
}

/// Lower-cased type text with length arguments removed, so a model type
/// such as `ARRAY<STRING(MAX)>` compares equal to the introspected
/// `ARRAY<STRING>`.
pub fn normalize_type(type_text: &str) -> String {
    let lowered = type_text.trim().to_lowercase();
    match type_params_regex() {
        Some(re) => re.replace_all(&lowered, "").into_owned(),
        None => lowered,
    }
}

/// Numeric length declared in a type string, e.g. `200` for `STRING(200)`.
pub fn declared_length(type_text: &str) -> Option<i64> {
    type_length_regex()?
        .captures(type_text.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
