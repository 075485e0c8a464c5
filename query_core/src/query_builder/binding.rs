//! Argument binding and the executor-generic fetch helpers
//!
//! Every helper takes any sqlx executor, so the same code runs against the
//! pool and against a transaction connection.

use super::sql_generation::CompiledStatement;
use crate::value::QueryValue;
use sqlx::postgres::PgRow;
use sqlx::{Executor, FromRow, Postgres};

// Shared binding logic for query, query_as and query_scalar
macro_rules! bind_value {
    ($query:expr, $value:expr) => {
        match $value {
            // never emitted by the compiler, which renders NULL literally
            QueryValue::Null => $query.bind(None::<String>),
            QueryValue::Bool(v) => $query.bind(*v),
            QueryValue::I32(v) => $query.bind(*v),
            QueryValue::I64(v) => $query.bind(*v),
            QueryValue::F64(v) => $query.bind(*v),
            QueryValue::Text(v) => $query.bind(v.clone()),
            QueryValue::Uuid(v) => $query.bind(*v),
            QueryValue::Timestamp(v) => $query.bind(*v),
            QueryValue::Json(v) => $query.bind(sqlx::types::Json(v.clone())),
            QueryValue::Bytes(v) => $query.bind(v.clone()),
        }
    };
}

pub(crate) async fn fetch_all<'c, T, E>(
    executor: E,
    stmt: &CompiledStatement,
) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query_as::<_, T>(&stmt.sql);
    for arg in &stmt.args {
        query = bind_value!(query, arg);
    }
    query.fetch_all(executor).await
}

pub(crate) async fn fetch_optional<'c, T, E>(
    executor: E,
    stmt: &CompiledStatement,
) -> Result<Option<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query_as::<_, T>(&stmt.sql);
    for arg in &stmt.args {
        query = bind_value!(query, arg);
    }
    query.fetch_optional(executor).await
}

pub(crate) async fn fetch_one<'c, T, E>(executor: E, stmt: &CompiledStatement) -> Result<T, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query_as::<_, T>(&stmt.sql);
    for arg in &stmt.args {
        query = bind_value!(query, arg);
    }
    query.fetch_one(executor).await
}

pub(crate) async fn fetch_count<'c, E>(executor: E, stmt: &CompiledStatement) -> Result<i64, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query_scalar::<_, i64>(&stmt.sql);
    for arg in &stmt.args {
        query = bind_value!(query, arg);
    }
    query.fetch_one(executor).await
}

pub(crate) async fn fetch_exists<'c, E>(executor: E, stmt: &CompiledStatement) -> Result<bool, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query_scalar::<_, bool>(&stmt.sql);
    for arg in &stmt.args {
        query = bind_value!(query, arg);
    }
    query.fetch_one(executor).await
}

/// Rows of a single `row_to_json` column
pub(crate) async fn fetch_json<'c, E>(
    executor: E,
    stmt: &CompiledStatement,
) -> Result<Vec<serde_json::Value>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query_scalar::<_, serde_json::Value>(&stmt.sql);
    for arg in &stmt.args {
        query = bind_value!(query, arg);
    }
    query.fetch_all(executor).await
}

/// Rows affected
pub(crate) async fn execute<'c, E>(executor: E, stmt: &CompiledStatement) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query(&stmt.sql);
    for arg in &stmt.args {
        query = bind_value!(query, arg);
    }
    Ok(query.execute(executor).await?.rows_affected())
}
