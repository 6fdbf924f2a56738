//! Logical data types and the value capability traits.
//!
//! A field is described by a [`DataType`]; the dialect turns that into a
//! concrete Spanner type string. Types that need more control implement one
//! of the capability traits below:
//!
//! - [`ToValue`] / [`FromValue`]: encode to and decode from a driver [`Value`].
//! - [`SqlDataType`]: the logical data type a column of this type declares.
//! - [`DbDataType`]: a dialect-specific type string, computed from the field
//!   (used by arrays, whose element type depends on the field size).

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::field::FieldInfo;
use crate::value::Value;

/// Dialect-independent data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Bytes,
    Time,
    Date,
    Numeric,
    Json,
    /// Any other type name; passed through to DDL unchanged.
    Custom(&'static str),
}

impl DataType {
    /// The logical name, used when no dialect mapping applies.
    pub const fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Uint => "uint",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Bytes => "bytes",
            DataType::Time => "time",
            DataType::Date => "date",
            DataType::Numeric => "numeric",
            DataType::Json => "json",
            DataType::Custom(name) => *name,
        }
    }
}

/// Encode a Rust value for binding.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Decode a Rust value from a result column.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

/// Declares the logical data type of a column type.
pub trait SqlDataType {
    fn data_type() -> DataType;
}

/// Declares the database type string of a column type for a given field.
pub trait DbDataType {
    fn db_data_type(field: &FieldInfo) -> String;
}

fn mismatch<T>(value: &Value) -> Error {
    Error::decode(
        std::any::type_name::<T>(),
        format!(
            "cannot decode {} into {}",
            value.type_name(),
            std::any::type_name::<T>()
        ),
    )
}

macro_rules! impl_value_traits {
    ($ty:ty, $variant:ident) => {
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v.clone()),
                    other => Err(mismatch::<$ty>(other)),
                }
            }
        }
    };
}

impl_value_traits!(bool, Bool);
impl_value_traits!(i64, Int64);
impl_value_traits!(f64, Float64);
impl_value_traits!(String, String);
impl_value_traits!(Vec<u8>, Bytes);
impl_value_traits!(NaiveDate, Date);
impl_value_traits!(DateTime<Utc>, Timestamp);
impl_value_traits!(serde_json::Value, Json);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float32(*self)
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float32(v) => Ok(*v),
            Value::Float64(v) => Ok(*v as f32),
            other => Err(mismatch::<f32>(other)),
        }
    }
}

impl ToValue for i32 {
    fn to_value(&self) -> Value {
        Value::Int64(i64::from(*self))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int64(v) => i32::try_from(*v).map_err(|_| {
                Error::decode("i32", format!("value {} out of range for i32", v))
            }),
            other => Err(mismatch::<i32>(other)),
        }
    }
}

impl ToValue for u64 {
    fn to_value(&self) -> Value {
        Value::Int64(*self as i64)
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int64(v) => u64::try_from(*v).map_err(|_| {
                Error::decode("u64", format!("value {} out of range for u64", v))
            }),
            other => Err(mismatch::<u64>(other)),
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
