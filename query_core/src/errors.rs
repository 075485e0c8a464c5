//! Error taxonomy for the data-access core
//!
//! Every failure surfaced by the builder, compiler or executor is a
//! [`QueryError`]. Driver errors are classified once, at the point they leave
//! sqlx, so the retry policy and callers only ever look at [`ErrorCategory`].

use std::time::Duration;
use thiserror::Error;

/// Broad category of a failure, independent of engine-specific codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed clause composition, rejected before any I/O
    Validation,
    /// Connection loss, serialization conflict, resource exhaustion
    Transient,
    /// Unique/foreign-key/not-null/check/exclusion violation
    Conflict,
    /// A single-row lookup that required a row found none
    NotFound,
    /// Caller cancellation or deadline expiry
    Cancelled,
    /// Terminal engine error: syntax, undefined object, authorization, unknown
    Database,
    /// Rows came back but could not be decoded into the row type
    Decode,
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict on {table} (SQLSTATE {sqlstate}): {message}")]
    Conflict {
        table: String,
        sqlstate: String,
        constraint: Option<String>,
        message: String,
    },

    #[error("Transient database error on {table}: {message}")]
    Transient {
        table: String,
        sqlstate: Option<String>,
        message: String,
        /// The statement provably never ran, so re-sending a write cannot
        /// apply it twice
        before_send: bool,
    },

    #[error("Database error on {table}: {message}")]
    Database {
        table: String,
        sqlstate: Option<String>,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Deadline of {timeout:?} exceeded")]
    DeadlineExceeded { timeout: Duration },

    #[error("Failed to decode rows from {table}: {message}")]
    Decode { table: String, message: String },

    #[error("Batch starting at offset {offset} failed: {source}")]
    Batch {
        offset: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{source} (gave up after {attempts} attempts in {elapsed:?})")]
    AttemptsExhausted {
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: Box<QueryError>,
    },
}

impl QueryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::Validation(_) => ErrorCategory::Validation,
            QueryError::Conflict { .. } => ErrorCategory::Conflict,
            QueryError::Transient { .. } => ErrorCategory::Transient,
            QueryError::Database { .. } => ErrorCategory::Database,
            QueryError::NotFound(_) => ErrorCategory::NotFound,
            QueryError::Cancelled(_) | QueryError::DeadlineExceeded { .. } => {
                ErrorCategory::Cancelled
            }
            QueryError::Decode { .. } => ErrorCategory::Decode,
            // A failing callback is the caller's error, never retried
            QueryError::Batch { .. } => ErrorCategory::Validation,
            QueryError::AttemptsExhausted { source, .. } => source.category(),
        }
    }

    /// Whether this failure is safe to assume never committed a side effect
    pub fn is_retryable(&self) -> bool {
        match self {
            // Already retried to the limit
            QueryError::AttemptsExhausted { .. } => false,
            other => other.category() == ErrorCategory::Transient,
        }
    }

    /// Stricter [`QueryError::is_retryable`] for statements that are not
    /// idempotent: only failures known to precede execution qualify. A reset
    /// or EOF after sending may hide a committed write.
    pub fn is_retryable_write(&self) -> bool {
        matches!(self, QueryError::Transient { before_send: true, .. })
    }

    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }

    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }

    /// SQLSTATE reported by the engine, when there was one
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            QueryError::Conflict { sqlstate, .. } => Some(sqlstate),
            QueryError::Transient { sqlstate, .. } | QueryError::Database { sqlstate, .. } => {
                sqlstate.as_deref()
            }
            QueryError::AttemptsExhausted { source, .. } => source.sqlstate(),
            _ => None,
        }
    }

    /// Number of attempts made before this error was returned
    pub fn attempts(&self) -> u32 {
        match self {
            QueryError::AttemptsExhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }

    /// Build a classified error from an engine error code and message
    pub fn from_sqlstate(
        table: &str,
        sqlstate: &str,
        constraint: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let table = table.to_string();
        let sqlstate_owned = Some(sqlstate.to_string());

        match classify_sqlstate(sqlstate) {
            ErrorCategory::Conflict => QueryError::Conflict {
                table,
                sqlstate: sqlstate.to_string(),
                constraint,
                message,
            },
            ErrorCategory::Transient => QueryError::Transient {
                table,
                before_send: is_before_send_sqlstate(sqlstate),
                sqlstate: sqlstate_owned,
                message,
            },
            ErrorCategory::Cancelled => QueryError::Cancelled(message),
            _ => QueryError::Database {
                table,
                sqlstate: sqlstate_owned,
                message,
            },
        }
    }

    /// Classify a driver error raised while operating on `table`
    pub fn from_sqlx(table: &str, error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Database(db_error) => {
                let message = db_error.message().to_string();
                let constraint = db_error.constraint().map(str::to_string);
                match db_error.code() {
                    Some(code) => Self::from_sqlstate(table, &code, constraint, message),
                    None => Self::from_message(table, message),
                }
            }
            sqlx::Error::RowNotFound => QueryError::NotFound(format!("no row in {}", table)),
            sqlx::Error::Io(e) => QueryError::Transient {
                table: table.to_string(),
                sqlstate: None,
                before_send: e.kind() == std::io::ErrorKind::ConnectionRefused,
                message: e.to_string(),
            },
            sqlx::Error::PoolTimedOut => QueryError::Transient {
                table: table.to_string(),
                sqlstate: None,
                message: sqlx::Error::PoolTimedOut.to_string(),
                before_send: true,
            },
            e @ (sqlx::Error::Tls(_) | sqlx::Error::WorkerCrashed | sqlx::Error::Protocol(_)) => {
                QueryError::Transient {
                    table: table.to_string(),
                    sqlstate: None,
                    message: e.to_string(),
                    before_send: false,
                }
            }
            e @ (sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. }) => QueryError::Decode {
                table: table.to_string(),
                message: e.to_string(),
            },
            e @ (sqlx::Error::PoolClosed | sqlx::Error::Configuration(_)) => {
                QueryError::Database {
                    table: table.to_string(),
                    sqlstate: None,
                    message: e.to_string(),
                }
            }
            other => Self::from_message(table, other.to_string()),
        }
    }

    /// Fallback classification for errors that carry no SQLSTATE
    pub fn from_message(table: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_transient_message(&message) {
            QueryError::Transient {
                table: table.to_string(),
                sqlstate: None,
                before_send: is_before_send_message(&message),
                message,
            }
        } else {
            QueryError::Database {
                table: table.to_string(),
                sqlstate: None,
                message,
            }
        }
    }
}

/// Map a PostgreSQL SQLSTATE to an error category.
///
/// Codes not listed fall back to [`ErrorCategory::Database`], which is never
/// retried. The table is specific to PostgreSQL.
pub fn classify_sqlstate(code: &str) -> ErrorCategory {
    match code {
        // serialization_failure, deadlock_detected
        "40001" | "40P01" => ErrorCategory::Transient,
        // cannot_connect_now
        "57P03" => ErrorCategory::Transient,
        // admin/crash shutdown: the server dropped us before answering
        "57P01" | "57P02" => ErrorCategory::Transient,
        // query_canceled (statement_timeout or pg_cancel_backend)
        "57014" => ErrorCategory::Cancelled,
        // insufficient_privilege
        "42501" => ErrorCategory::Database,
        _ => match sqlstate_class(code) {
            // integrity_constraint_violation
            "23" => ErrorCategory::Conflict,
            // connection_exception
            "08" => ErrorCategory::Transient,
            // insufficient_resources: disk full, out of memory, too many connections
            "53" => ErrorCategory::Transient,
            // invalid authorization, syntax error, undefined objects and
            // anything unrecognised are terminal
            _ => ErrorCategory::Database,
        },
    }
}

fn sqlstate_class(code: &str) -> &str {
    code.get(..2).unwrap_or(code)
}

/// Transient codes raised before the statement could take effect: the
/// connection was never established, or the server rolled the statement back
fn is_before_send_sqlstate(code: &str) -> bool {
    matches!(code, "40001" | "40P01" | "57P03" | "08001" | "08004") || sqlstate_class(code) == "53"
}

const TRANSIENT_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection closed",
    "broken pipe",
    "unexpected eof",
    "timed out",
    "too many connections",
    "out of memory",
    "no space left",
    "disk full",
    "deadlock",
    "could not serialize",
    "cannot connect now",
];

// Subset of TRANSIENT_PATTERNS that cannot follow a delivered statement
const BEFORE_SEND_PATTERNS: &[&str] = &[
    "connection refused",
    "too many connections",
    "cannot connect now",
    "could not serialize",
    "deadlock",
];

fn is_before_send_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    BEFORE_SEND_PATTERNS.iter().any(|p| lower.contains(p))
}

fn is_transient_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p)) || lower.ends_with("eof")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_integrity_codes_are_conflicts() {
        for code in ["23505", "23503", "23502", "23514", "23P01"] {
            assert_eq!(classify_sqlstate(code), ErrorCategory::Conflict, "{}", code);
        }
    }

    #[test]
    fn test_transient_codes() {
        for code in ["40001", "40P01", "08006", "08001", "08003", "53300", "53200", "53100", "57P03"] {
            assert_eq!(classify_sqlstate(code), ErrorCategory::Transient, "{}", code);
        }
    }

    #[test]
    fn test_terminal_codes() {
        for code in ["42601", "42P01", "42703", "42883", "42501", "28P01", "22P02", "XX000"] {
            assert_eq!(classify_sqlstate(code), ErrorCategory::Database, "{}", code);
        }
        assert_eq!(classify_sqlstate("57014"), ErrorCategory::Cancelled);
    }

    #[test]
    fn test_unique_violation_keeps_constraint() {
        let err = QueryError::from_sqlstate(
            "users",
            "23505",
            Some("users_email_key".to_string()),
            "duplicate key value violates unique constraint",
        );
        assert!(err.is_conflict());
        assert!(!err.is_retryable());
        assert_eq!(err.sqlstate(), Some("23505"));
        match err {
            QueryError::Conflict { constraint, .. } => {
                assert_eq!(constraint.as_deref(), Some("users_email_key"))
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_sqlx_io_errors_are_transient() {
        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::UnexpectedEof,
            io::ErrorKind::TimedOut,
        ] {
            let err = QueryError::from_sqlx("orders", sqlx::Error::Io(io::Error::new(kind, "io")));
            assert!(err.is_retryable(), "{:?}", kind);
        }
    }

    #[test]
    fn test_only_pre_execution_failures_are_retryable_writes() {
        let io_error = |kind: io::ErrorKind| QueryError::from_sqlx("orders", sqlx::Error::Io(io::Error::new(kind, "io")));
        assert!(io_error(io::ErrorKind::ConnectionRefused).is_retryable_write());
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::UnexpectedEof,
            io::ErrorKind::TimedOut,
        ] {
            let err = io_error(kind);
            assert!(err.is_retryable(), "{:?}", kind);
            assert!(!err.is_retryable_write(), "{:?}", kind);
        }

        assert!(QueryError::from_sqlx("orders", sqlx::Error::PoolTimedOut).is_retryable_write());
        assert!(!QueryError::from_sqlx("orders", sqlx::Error::WorkerCrashed).is_retryable_write());

        for code in ["40001", "40P01", "57P03", "08001", "08004", "53300", "53100"] {
            let err = QueryError::from_sqlstate("orders", code, None, "retry me");
            assert!(err.is_retryable_write(), "{}", code);
        }
        for code in ["08006", "08003", "57P01", "57P02"] {
            let err = QueryError::from_sqlstate("orders", code, None, "gone");
            assert!(err.is_retryable(), "{}", code);
            assert!(!err.is_retryable_write(), "{}", code);
        }

        assert!(QueryError::from_message("t", "Connection refused (os error 111)").is_retryable_write());
        assert!(!QueryError::from_message("t", "connection closed").is_retryable_write());
        assert!(!QueryError::from_sqlstate("t", "23505", None, "dup").is_retryable_write());
    }

    #[test]
    fn test_sqlx_variants() {
        assert!(QueryError::from_sqlx("orders", sqlx::Error::PoolTimedOut).is_retryable());
        assert_eq!(
            QueryError::from_sqlx("orders", sqlx::Error::RowNotFound).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            QueryError::from_sqlx("orders", sqlx::Error::PoolClosed).category(),
            ErrorCategory::Database
        );
        assert_eq!(
            QueryError::from_sqlx("orders", sqlx::Error::ColumnNotFound("sku".into())).category(),
            ErrorCategory::Decode
        );
    }

    #[test]
    fn test_message_fallback() {
        assert!(QueryError::from_message("t", "Connection refused (os error 111)").is_retryable());
        assert!(QueryError::from_message("t", "FATAL: sorry, too many connections").is_retryable());
        assert!(QueryError::from_message("t", "unexpected EOF").is_retryable());
        assert!(!QueryError::from_message("t", "something odd happened").is_retryable());
    }

    #[test]
    fn test_exhausted_delegates_category_but_is_not_retryable() {
        let err = QueryError::AttemptsExhausted {
            attempts: 3,
            elapsed: Duration::from_millis(300),
            source: Box::new(QueryError::from_message("t", "connection refused")),
        };
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert_eq!(err.attempts(), 3);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_deadline_is_cancellation() {
        let err = QueryError::DeadlineExceeded {
            timeout: Duration::from_secs(1),
        };
        assert!(err.is_cancelled());
        assert!(!err.is_retryable());
    }
}
