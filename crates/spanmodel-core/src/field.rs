//! Field and column definitions.

use crate::types::{DataType, DbDataType, SqlDataType};
use crate::value::Value;

/// Referential action for foreign key constraints (ON DELETE / ON UPDATE).
///
/// Spanner accepts `NO ACTION` and `CASCADE`; the other variants are kept so
/// that models shared with other databases still describe themselves fully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    /// No action - raise error if any references exist.
    #[default]
    NoAction,
    Restrict,
    /// Cascade - automatically delete/update referencing rows.
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Get the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse a referential action from a string (case-insensitive).
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NO ACTION" | "NOACTION" | "NO_ACTION" => Some(ReferentialAction::NoAction),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" | "SETNULL" | "SET_NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" | "SETDEFAULT" | "SET_DEFAULT" => Some(ReferentialAction::SetDefault),
            _ => None,
        }
    }
}

/// Column default as declared on the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    /// Raw SQL expression, emitted as `DEFAULT (<expr>)`.
    Expr(&'static str),
    Bool(bool),
    Int(i64),
    Float(f64),
    /// String literal, emitted quoted.
    Text(&'static str),
    /// The column has a default on the database side that DDL must not emit,
    /// e.g. generated columns. Written `(-)` in tag form.
    Skip,
}

impl DefaultValue {
    /// Literal defaults as a bindable value; `None` for expressions and `Skip`.
    pub fn literal(&self) -> Option<Value> {
        match self {
            DefaultValue::Bool(b) => Some(Value::Bool(*b)),
            DefaultValue::Int(i) => Some(Value::Int64(*i)),
            DefaultValue::Float(f) => Some(Value::Float64(*f)),
            DefaultValue::Text(s) => Some(Value::String((*s).to_string())),
            DefaultValue::Expr(_) | DefaultValue::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, DefaultValue::Skip | DefaultValue::Expr("(-)"))
    }
}

/// Computes the database type string of a field; see [`DbDataType`].
pub type DbTypeFn = fn(&FieldInfo) -> String;

/// Metadata about a model field/column.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Database column name
    pub column_name: &'static str,
    pub data_type: DataType,
    /// Declared length for STRING/BYTES, or bit width for floats. 0 means unset.
    pub size: u32,
    /// Precision for NUMERIC
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    /// Explicit type text, e.g. `STRING(MAX) AS (...) STORED`.
    /// Takes precedence over `data_type` in DDL generation.
    pub sql_type_override: Option<&'static str>,
    /// Column type hook supplied by the field's Rust type.
    pub db_type: Option<DbTypeFn>,
    pub not_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    /// Single-column unique constraint.
    pub unique: bool,
    pub default: Option<DefaultValue>,
    /// Index name; an empty string asks for the conventional `idx_<table>_<column>`.
    pub index: Option<&'static str>,
    /// Unique index name; empty string as for `index`.
    pub unique_index: Option<&'static str>,
    /// Sequence backing an auto-increment key, instead of `<table>_seq`.
    pub sequence_name: Option<&'static str>,
    /// Read-only columns are never written by INSERT or UPDATE.
    pub read_only: bool,
    /// Excluded from migrations entirely.
    pub ignore_migration: bool,
}

impl FieldInfo {
    /// Create a new field info with minimal required data.
    pub const fn new(name: &'static str, column_name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            column_name,
            data_type,
            size: 0,
            precision: None,
            scale: None,
            sql_type_override: None,
            db_type: None,
            not_null: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default: None,
            index: None,
            unique_index: None,
            sequence_name: None,
            read_only: false,
            ignore_migration: false,
        }
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    pub const fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Set both precision and scale for NUMERIC.
    pub const fn decimal_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Set explicit SQL type override.
    ///
    /// The string is used verbatim in DDL. Spanner generated columns are
    /// declared this way:
    ///
    /// ```ignore
    /// FieldInfo::new("full_name", "full_name", DataType::String)
    ///     .sql_type_override("STRING(MAX) AS (concat(first_name, ' ', last_name)) STORED")
    ///     .read_only(true)
    ///     .default(DefaultValue::Skip)
    /// ```
    pub const fn sql_type_override(mut self, type_str: &'static str) -> Self {
        self.sql_type_override = Some(type_str);
        self
    }

    /// Take the logical data type from a column type.
    pub fn data_type_of<T: SqlDataType>(mut self) -> Self {
        self.data_type = T::data_type();
        self
    }

    /// Take the database type string from a column type.
    pub fn db_type_of<T: DbDataType>(mut self) -> Self {
        self.db_type = Some(T::db_data_type);
        self
    }

    pub const fn not_null(mut self, value: bool) -> Self {
        self.not_null = value;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set auto-increment flag.
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Set unique flag.
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Set default value.
    pub const fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Set index name.
    pub const fn index(mut self, name: &'static str) -> Self {
        self.index = Some(name);
        self
    }

    pub const fn unique_index(mut self, name: &'static str) -> Self {
        self.unique_index = Some(name);
        self
    }

    pub const fn sequence_name(mut self, name: &'static str) -> Self {
        self.sequence_name = Some(name);
        self
    }

    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub const fn ignore_migration(mut self, value: bool) -> Self {
        self.ignore_migration = value;
        self
    }

    /// An auto-increment key without its own default gets a sequence-backed one.
    pub fn needs_sequence(&self) -> bool {
        self.auto_increment && self.default.is_none()
    }
}
