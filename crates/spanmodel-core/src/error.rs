//! Error types shared by every spanmodel crate.

use std::fmt;
use std::time::Duration;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for spanmodel operations.
#[derive(Debug)]
pub enum Error {
    /// Invalid dialect or driver configuration.
    Config(ConfigError),
    /// A feature the Spanner dialect cannot express.
    Unsupported(UnsupportedError),
    /// A statement was rejected or failed on the server.
    Query(QueryError),
    /// Connection-level failure (acquire, open, closed handle).
    Connection(ConnectionError),
    /// A column value could not be converted into the requested type.
    Decode(DecodeError),
    /// The information schema returned something unexpected.
    Introspection(IntrospectionError),
    /// Free-form error raised by user callbacks.
    Custom(String),
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

/// Raised before any SQL is sent when a construct has no Spanner equivalent.
#[derive(Debug)]
pub struct UnsupportedError {
    pub feature: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Malformed or invalid statement text.
    Syntax,
    /// Constraint violation (primary key, foreign key, check).
    Constraint,
    /// Read/write transaction aborted by the server; retryable.
    Aborted,
    /// Statement exceeded its deadline.
    Timeout,
    /// Anything else reported by the database.
    Database,
}

/// gRPC status codes as reported by Spanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl StatusCode {
    /// Canonical upper-case name, e.g. `ABORTED`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::Unknown => "UNKNOWN",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::PermissionDenied => "PERMISSION_DENIED",
            StatusCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::Aborted => "ABORTED",
            StatusCode::OutOfRange => "OUT_OF_RANGE",
            StatusCode::Unimplemented => "UNIMPLEMENTED",
            StatusCode::Internal => "INTERNAL",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::DataLoss => "DATA_LOSS",
            StatusCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub code: Option<StatusCode>,
    pub message: String,
    pub sql: Option<String>,
    /// Server-suggested backoff attached to `ABORTED` errors.
    pub retry_delay: Option<Duration>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    /// Build a query error from a status code, deriving the kind.
    pub fn from_status(code: StatusCode, message: impl Into<String>) -> Self {
        let kind = match code {
            StatusCode::Aborted => QueryErrorKind::Aborted,
            StatusCode::DeadlineExceeded => QueryErrorKind::Timeout,
            StatusCode::InvalidArgument => QueryErrorKind::Syntax,
            StatusCode::AlreadyExists | StatusCode::FailedPrecondition => {
                QueryErrorKind::Constraint
            }
            _ => QueryErrorKind::Database,
        };
        Self {
            kind,
            code: Some(code),
            message: message.into(),
            sql: None,
            retry_delay: None,
            source: None,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Opening the database handle failed.
    Connect,
    /// The pool could not hand out a connection.
    Acquire,
    /// The connection has already been closed.
    Closed,
    /// The connection does not provide a required capability.
    Capability,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct DecodeError {
    /// Target type name, e.g. `StringArray`.
    pub expected: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct IntrospectionError {
    pub table: String,
    pub message: String,
}

impl Error {
    /// Returns true when the server aborted the read/write transaction.
    pub fn is_aborted(&self) -> bool {
        match self {
            Error::Query(q) => {
                q.kind == QueryErrorKind::Aborted || q.code == Some(StatusCode::Aborted)
            }
            _ => false,
        }
    }

    /// Backoff the server asked for before retrying an aborted transaction.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Error::Query(q) => q.retry_delay,
            _ => None,
        }
    }

    /// The gRPC status code, if the error came from the server.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::Query(q) => q.code,
            _ => None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
        })
    }

    pub fn unsupported(feature: &'static str, message: impl Into<String>) -> Self {
        Error::Unsupported(UnsupportedError {
            feature,
            message: message.into(),
        })
    }

    pub fn decode(expected: &'static str, message: impl Into<String>) -> Self {
        Error::Decode(DecodeError {
            expected,
            message: message.into(),
        })
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Error::Query(QueryError::from_status(StatusCode::Aborted, message))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {}", e.message),
            Error::Unsupported(e) => f.write_str(&e.message),
            Error::Query(e) => match e.code {
                Some(code) => write!(f, "spanner: code = {}, desc = {}", code, e.message),
                None => write!(f, "query error: {}", e.message),
            },
            Error::Connection(e) => write!(f, "connection error: {}", e.message),
            Error::Decode(e) => f.write_str(&e.message),
            Error::Introspection(e) => {
                write!(f, "introspection of `{}` failed: {}", e.table, e.message)
            }
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Connection(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}
