//! Commit timestamp columns.
//!
//! A [`CommitTimestamp`] field always writes `PENDING_COMMIT_TIMESTAMP()`,
//! whatever it holds. Spanner fills in the commit time when the transaction
//! commits, so the value only becomes visible to a later read.
//!
//! ```ignore
//! FieldInfo::new("last_updated", "last_updated", DataType::Time)
//!     .data_type_of::<CommitTimestamp>()
//! ```

use chrono::{DateTime, Utc};
use spanmodel_core::{DataType, DbDataType, Error, FieldInfo, FromValue, Result, SqlDataType, ToValue, Value};

/// SQL expression Spanner replaces with the commit time.
pub const PENDING_COMMIT_TIMESTAMP: &str = "PENDING_COMMIT_TIMESTAMP()";

/// Column type of commit timestamp columns.
pub const COMMIT_TIMESTAMP_TYPE: &str = "TIMESTAMP OPTIONS (allow_commit_timestamp=true)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitTimestamp {
    /// `None` until the row has been read back after its transaction committed.
    pub timestamp: Option<DateTime<Utc>>,
}

impl CommitTimestamp {
    pub const fn new() -> Self {
        Self { timestamp: None }
    }

    pub const fn is_valid(&self) -> bool {
        self.timestamp.is_some()
    }
}

impl ToValue for CommitTimestamp {
    fn to_value(&self) -> Value {
        Value::Expr(PENDING_COMMIT_TIMESTAMP.to_string())
    }
}

impl From<CommitTimestamp> for Value {
    fn from(ts: CommitTimestamp) -> Self {
        ts.to_value()
    }
}

impl FromValue for CommitTimestamp {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self { timestamp: None }),
            Value::Timestamp(ts) => Ok(Self {
                timestamp: Some(*ts),
            }),
            other => Err(Error::decode(
                "CommitTimestamp",
                format!(
                    "invalid type for a commit timestamp column: {}",
                    other.type_name()
                ),
            )),
        }
    }
}

impl SqlDataType for CommitTimestamp {
    fn data_type() -> DataType {
        DataType::Custom(COMMIT_TIMESTAMP_TYPE)
    }
}

impl DbDataType for CommitTimestamp {
    fn db_data_type(_field: &FieldInfo) -> String {
        COMMIT_TIMESTAMP_TYPE.to_string()
    }
}
