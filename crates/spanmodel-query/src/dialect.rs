//! Dialect capabilities and the Spanner implementation.
//!
//! A [`Dialect`] supplies the database-specific pieces that statement
//! building and DDL generation need: bind variable syntax, identifier
//! quoting, type mapping and literal rendering.

use chrono::SecondsFormat;
use spanmodel_core::{DataType, FieldInfo, Value, identifiers};

/// Longest STRING length Spanner accepts before `MAX` must be used.
pub const MAX_STRING_LENGTH: u32 = 2_621_440;

/// Longest BYTES length Spanner accepts before `MAX` must be used.
pub const MAX_BYTES_LENGTH: u32 = 10_485_760;

/// Database-specific SQL capabilities.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write the bind variable for the `position`-th parameter (1-based).
    fn bind_var_to(&self, out: &mut String, position: usize);

    fn quote_to(&self, out: &mut String, ident: &str);

    /// Map a field's logical type to a database type string.
    fn data_type_of(&self, field: &FieldInfo) -> String;

    /// Expression used for columns written without a value.
    fn default_value_of(&self, field: &FieldInfo) -> &'static str;

    /// Inline `vars` into `sql` as literals, for logging and DEFAULT clauses.
    fn explain(&self, sql: &str, vars: &[Value]) -> String;

    /// Full column type of a field: the field's own type hook first, then an
    /// explicit override, then the dialect mapping.
    fn column_type(&self, field: &FieldInfo) -> String {
        if let Some(db_type) = field.db_type {
            return db_type(field);
        }
        if let Some(override_str) = field.sql_type_override {
            return override_str.to_string();
        }
        self.data_type_of(field)
    }

    fn quote(&self, ident: &str) -> String {
        let mut out = String::with_capacity(ident.len() + 2);
        self.quote_to(&mut out, ident);
        out
    }
}

/// The Cloud Spanner (GoogleSQL) dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpannerDialect;

impl SpannerDialect {
    pub const NAME: &'static str = "spanner";

    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SpannerDialect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn bind_var_to(&self, out: &mut String, _position: usize) {
        out.push('?');
    }

    fn quote_to(&self, out: &mut String, ident: &str) {
        identifiers::quote_to(out, ident);
    }

    fn data_type_of(&self, field: &FieldInfo) -> String {
        match field.data_type {
            DataType::Bool => "BOOL".to_string(),
            DataType::Int | DataType::Uint => "INT64".to_string(),
            DataType::Float => {
                if field.size == 32 {
                    "FLOAT32".to_string()
                } else {
                    "FLOAT64".to_string()
                }
            }
            DataType::String => sized("STRING", field.size, MAX_STRING_LENGTH),
            DataType::Bytes => sized("BYTES", field.size, MAX_BYTES_LENGTH),
            DataType::Time => "TIMESTAMP".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Numeric => "NUMERIC".to_string(),
            DataType::Json => "JSON".to_string(),
            DataType::Custom(name) => name.to_string(),
        }
    }

    fn default_value_of(&self, _field: &FieldInfo) -> &'static str {
        "NULL"
    }

    fn explain(&self, sql: &str, vars: &[Value]) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut vars = vars.iter();
        let mut in_string = false;
        let mut in_ident = false;
        for ch in sql.chars() {
            match ch {
                '\'' if !in_ident => in_string = !in_string,
                '`' if !in_string => in_ident = !in_ident,
                '?' if !in_string && !in_ident => {
                    if let Some(value) = vars.next() {
                        write_literal(&mut out, value);
                        continue;
                    }
                }
                _ => {}
            }
            out.push(ch);
        }
        out
    }
}

fn sized(base: &str, size: u32, max: u32) -> String {
    if size > 0 && size <= max {
        format!("{}({})", base, size)
    } else {
        format!("{}(MAX)", base)
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('\'');
}

/// Render a value as a GoogleSQL literal.
pub fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int64(v) => out.push_str(&v.to_string()),
        Value::Float32(v) => out.push_str(&v.to_string()),
        Value::Float64(v) => out.push_str(&v.to_string()),
        Value::Numeric(v) => {
            out.push_str("NUMERIC ");
            push_quoted(out, v);
        }
        Value::String(s) => push_quoted(out, s),
        Value::Bytes(b) => {
            out.push('B');
            push_quoted(out, &String::from_utf8_lossy(b));
        }
        Value::Date(d) => {
            out.push_str("DATE ");
            push_quoted(out, &d.format("%Y-%m-%d").to_string());
        }
        Value::Timestamp(ts) => {
            out.push_str("TIMESTAMP ");
            push_quoted(out, &ts.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        }
        Value::Json(j) => {
            out.push_str("JSON ");
            push_quoted(out, &j.to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        Value::Expr(expr) => out.push_str(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn field(data_type: DataType, size: u32) -> FieldInfo {
        FieldInfo::new("f", "f", data_type).size(size)
    }

    #[test]
    fn test_scalar_mapping() {
        let d = SpannerDialect;
        assert_eq!(d.data_type_of(&field(DataType::Bool, 0)), "BOOL");
        assert_eq!(d.data_type_of(&field(DataType::Int, 0)), "INT64");
        assert_eq!(d.data_type_of(&field(DataType::Uint, 0)), "INT64");
        assert_eq!(d.data_type_of(&field(DataType::Time, 0)), "TIMESTAMP");
        assert_eq!(d.data_type_of(&field(DataType::Json, 0)), "JSON");
        assert_eq!(d.data_type_of(&field(DataType::Numeric, 0)), "NUMERIC");
    }

    #[test]
    fn test_float_width() {
        let d = SpannerDialect;
        assert_eq!(d.data_type_of(&field(DataType::Float, 32)), "FLOAT32");
        assert_eq!(d.data_type_of(&field(DataType::Float, 64)), "FLOAT64");
        assert_eq!(d.data_type_of(&field(DataType::Float, 0)), "FLOAT64");
    }

    #[test]
    fn test_string_length_bounds() {
        let d = SpannerDialect;
        assert_eq!(d.data_type_of(&field(DataType::String, 0)), "STRING(MAX)");
        assert_eq!(d.data_type_of(&field(DataType::String, 100)), "STRING(100)");
        assert_eq!(
            d.data_type_of(&field(DataType::String, MAX_STRING_LENGTH)),
            "STRING(2621440)"
        );
        assert_eq!(
            d.data_type_of(&field(DataType::String, MAX_STRING_LENGTH + 1)),
            "STRING(MAX)"
        );
    }

    #[test]
    fn test_bytes_length_bounds() {
        let d = SpannerDialect;
        assert_eq!(d.data_type_of(&field(DataType::Bytes, 0)), "BYTES(MAX)");
        assert_eq!(d.data_type_of(&field(DataType::Bytes, 16)), "BYTES(16)");
        assert_eq!(
            d.data_type_of(&field(DataType::Bytes, MAX_BYTES_LENGTH)),
            "BYTES(10485760)"
        );
        assert_eq!(
            d.data_type_of(&field(DataType::Bytes, MAX_BYTES_LENGTH + 1)),
            "BYTES(MAX)"
        );
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let d = SpannerDialect;
        assert_eq!(d.data_type_of(&field(DataType::Custom("date"), 0)), "date");
    }

    #[test]
    fn test_column_type_precedence() {
        fn hook(_: &FieldInfo) -> String {
            "ARRAY<INT64>".to_string()
        }
        let d = SpannerDialect;
        let overridden = field(DataType::String, 0).sql_type_override("STRING(10) NOT NULL");
        assert_eq!(d.column_type(&overridden), "STRING(10) NOT NULL");

        let mut hooked = overridden.clone();
        hooked.db_type = Some(hook);
        assert_eq!(d.column_type(&hooked), "ARRAY<INT64>");
    }

    #[test]
    fn test_bind_var_and_quote() {
        let d = SpannerDialect;
        let mut out = String::new();
        d.bind_var_to(&mut out, 1);
        d.bind_var_to(&mut out, 2);
        assert_eq!(out, "??");
        assert_eq!(d.quote("singers.id"), "`singers`.`id`");
        assert_eq!(d.default_value_of(&field(DataType::Int, 0)), "NULL");
    }

    #[test]
    fn test_explain_inlines_literals() {
        let d = SpannerDialect;
        let sql = d.explain(
            "SELECT * FROM `t?` WHERE a = ? AND b = ? AND c = '?' AND d = ?",
            &[Value::from("it's"), Value::Int64(7), Value::Null],
        );
        assert_eq!(
            sql,
            "SELECT * FROM `t?` WHERE a = 'it\\'s' AND b = 7 AND c = '?' AND d = NULL"
        );
    }

    #[test]
    fn test_explain_typed_literals() {
        let d = SpannerDialect;
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(d.explain("?", &[Value::Date(date)]), "DATE '2024-02-29'");
        assert_eq!(
            d.explain("?", &[Value::Timestamp(ts)]),
            "TIMESTAMP '2024-01-02T03:04:05Z'"
        );
        assert_eq!(d.explain("?", &[Value::Bool(true)]), "true");
        assert_eq!(
            d.explain("?", &[Value::Array(vec![Value::Int64(1), Value::Null])]),
            "[1, NULL]"
        );
    }

    #[test]
    fn test_explain_leaves_extra_placeholders() {
        let d = SpannerDialect;
        assert_eq!(d.explain("? ?", &[Value::Int64(1)]), "1 ?");
    }
}
