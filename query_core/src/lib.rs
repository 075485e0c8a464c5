//! Query core - generic query construction and resilient execution for Shopkeep
//!
//! A fluent, row-typed query builder compiles clause state into one
//! PostgreSQL statement and runs it through an error-classifying retry policy.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod client;
pub mod context;
pub mod errors;
pub mod prelude;
pub mod query_builder;
pub mod retry;
pub mod traits;
pub mod validation;
pub mod value;

pub use client::{Database, DbTransaction};
pub use context::ExecContext;
pub use errors::{ErrorCategory, QueryError};
pub use query_builder::{
    CompiledStatement, Loaded, OnConflict, Operator, Page, QueryBuilder, SortOrder, UpdateSet,
};
pub use retry::RetryPolicy;
pub use traits::*;
pub use validation::{ValidatedTableName, ValidationError};
pub use value::{FieldMap, QueryValue};
