//! Result rows.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::FromValue;
use crate::value::Value;

/// One row of a result set. Column names are shared between rows of the same result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            columns: Arc::new(columns),
            values,
        }
    }

    /// Build a row that reuses an existing column list.
    pub fn with_columns(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Case-insensitive lookup by column name.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }

    /// Decode the value at `index`.
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).ok_or_else(|| {
            Error::decode(
                std::any::type_name::<T>(),
                format!("column index {} out of range ({} columns)", index, self.len()),
            )
        })?;
        T::from_value(value)
    }

    /// Decode the value of column `name`.
    pub fn get_named_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get_named(name).ok_or_else(|| {
            Error::decode(
                std::any::type_name::<T>(),
                format!("no column named `{}` in result", name),
            )
        })?;
        T::from_value(value)
    }
}
