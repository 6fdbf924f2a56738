//! ARRAY column types.
//!
//! Spanner arrays may always contain NULL elements, even in NOT NULL
//! columns. Every element type therefore comes in two flavours:
//!
//! - a native array such as [`StringArray`] that rejects NULL elements when
//!   decoding, with an error naming the first offending index;
//! - a nullable array such as [`NullStringArray`] whose elements are
//!   `Option`s.
//!
//! Both report their own column type, so a field declared with
//! `.db_type_of::<StringArray>()` migrates to `ARRAY<STRING(MAX)>` (or
//! `ARRAY<STRING(n)>` when the field has a size).

use chrono::{DateTime, NaiveDate, Utc};
use spanmodel_core::{
    DataType, DbDataType, Error, FieldInfo, FromValue, Result, SqlDataType, ToValue, Value,
};

fn sized_string_array(field: &FieldInfo) -> String {
    if field.size > 0 {
        format!("ARRAY<STRING({})>", field.size)
    } else {
        "ARRAY<STRING(MAX)>".to_string()
    }
}

fn array_items<'v>(expected: &'static str, value: &'v Value) -> Result<&'v [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::decode(
            expected,
            format!("invalid value for {}: {}", expected, other.type_name()),
        )),
    }
}

macro_rules! array_pair {
    (
        $(#[$native_doc:meta])* $native:ident,
        $(#[$null_doc:meta])* $nullable:ident,
        $elem:ty, $label:literal, $sql_type:literal, $db_type:expr
    ) => {
        $(#[$native_doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $native(pub Vec<$elem>);

        $(#[$null_doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $nullable(pub Vec<Option<$elem>>);

        impl From<Vec<$elem>> for $native {
            fn from(items: Vec<$elem>) -> Self {
                Self(items)
            }
        }

        impl From<Vec<Option<$elem>>> for $nullable {
            fn from(items: Vec<Option<$elem>>) -> Self {
                Self(items)
            }
        }

        impl ToValue for $native {
            fn to_value(&self) -> Value {
                Value::Array(self.0.iter().map(ToValue::to_value).collect())
            }
        }

        impl ToValue for $nullable {
            fn to_value(&self) -> Value {
                Value::Array(self.0.iter().map(ToValue::to_value).collect())
            }
        }

        impl From<$native> for Value {
            fn from(array: $native) -> Self {
                array.to_value()
            }
        }

        impl From<$nullable> for Value {
            fn from(array: $nullable) -> Self {
                array.to_value()
            }
        }

        impl FromValue for $native {
            fn from_value(value: &Value) -> Result<Self> {
                let items = array_items(stringify!($native), value)?;
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    if item.is_null() {
                        return Err(Error::decode(
                            stringify!($native),
                            format!("index {} of {} array contains a null value", index, $label),
                        ));
                    }
                    out.push(<$elem>::from_value(item)?);
                }
                Ok(Self(out))
            }
        }

        impl FromValue for $nullable {
            fn from_value(value: &Value) -> Result<Self> {
                array_items(stringify!($nullable), value)?
                    .iter()
                    .map(Option::<$elem>::from_value)
                    .collect::<Result<Vec<_>>>()
                    .map(Self)
            }
        }

        impl SqlDataType for $native {
            fn data_type() -> DataType {
                DataType::Custom($sql_type)
            }
        }

        impl SqlDataType for $nullable {
            fn data_type() -> DataType {
                DataType::Custom($sql_type)
            }
        }

        impl DbDataType for $native {
            fn db_data_type(field: &FieldInfo) -> String {
                ($db_type)(field)
            }
        }

        impl DbDataType for $nullable {
            fn db_data_type(field: &FieldInfo) -> String {
                ($db_type)(field)
            }
        }
    };
}

array_pair!(
    /// `ARRAY<BOOL>` without NULL elements.
    BoolArray,
    NullBoolArray,
    bool, "bool", "ARRAY<BOOL>", |_: &FieldInfo| "ARRAY<BOOL>".to_string()
);

array_pair!(
    /// `ARRAY<BYTES(MAX)>` without NULL elements.
    BytesArray,
    NullBytesArray,
    Vec<u8>, "bytes", "ARRAY<BYTES(MAX)>", |_: &FieldInfo| "ARRAY<BYTES(MAX)>".to_string()
);

array_pair!(
    /// `ARRAY<INT64>` without NULL elements.
    Int64Array,
    NullInt64Array,
    i64, "int64", "ARRAY<INT64>", |_: &FieldInfo| "ARRAY<INT64>".to_string()
);

array_pair!(
    /// `ARRAY<FLOAT32>` without NULL elements.
    Float32Array,
    NullFloat32Array,
    f32, "float32", "ARRAY<FLOAT32>", |_: &FieldInfo| "ARRAY<FLOAT32>".to_string()
);

array_pair!(
    /// `ARRAY<FLOAT64>` without NULL elements.
    Float64Array,
    NullFloat64Array,
    f64, "float64", "ARRAY<FLOAT64>", |_: &FieldInfo| "ARRAY<FLOAT64>".to_string()
);

array_pair!(
    /// `ARRAY<STRING>` without NULL elements, sized by the field.
    StringArray,
    NullStringArray,
    String, "string", "ARRAY<STRING(MAX)>", sized_string_array
);

array_pair!(
    /// `ARRAY<DATE>` without NULL elements.
    DateArray,
    NullDateArray,
    NaiveDate, "date", "ARRAY<DATE>", |_: &FieldInfo| "ARRAY<DATE>".to_string()
);

array_pair!(
    /// `ARRAY<TIMESTAMP>` without NULL elements.
    TimestampArray,
    NullTimestampArray,
    DateTime<Utc>, "timestamp", "ARRAY<TIMESTAMP>", |_: &FieldInfo| "ARRAY<TIMESTAMP>".to_string()
);

array_pair!(
    /// `ARRAY<JSON>` without SQL NULL elements. JSON `null` is a value.
    JsonArray,
    NullJsonArray,
    serde_json::Value, "json", "ARRAY<JSON>", |_: &FieldInfo| "ARRAY<JSON>".to_string()
);
