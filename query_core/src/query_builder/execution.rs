//! Terminal methods
//!
//! Each terminal method consumes the builder, compiles its statement once and
//! runs it through the retry policy (pool) or once (transaction), with the
//! builder's timeout and cancellation token guarding the whole call. Reads
//! use [`RetryPolicy::run`]; writes use the stricter
//! [`RetryPolicy::run_write`].
//!
//! [`RetryPolicy::run`]: crate::retry::RetryPolicy::run
//! [`RetryPolicy::run_write`]: crate::retry::RetryPolicy::run_write

use super::binding;
use super::builder::{QueryBuilder, Target};
use super::sql_generation::{CompiledStatement, SqlGenerator};
use super::update::UpdateSet;
use crate::context::ExecContext;
use crate::debug_log;
use crate::errors::QueryError;
use crate::traits::TableMetadata;
use crate::value::FieldMap;
use sqlx::PgPool;

// Run `$helper(executor, stmt)` against the builder's target, retrying on a
// pool with `RetryPolicy::$run`
macro_rules! dispatch {
    ($builder:ident, $run:ident, $ctx:expr, $stmt:expr, $helper:expr) => {{
        let ctx: &ExecContext = $ctx;
        let stmt: &CompiledStatement = $stmt;
        let policy = $builder.effective_policy();
        let table = $builder.state.table.as_str();
        match &mut $builder.target {
            Target::Pool(pool) => {
                let pool: &PgPool = *pool;
                policy
                    .$run(ctx, move || async move {
                        $helper(pool, stmt)
                            .await
                            .map_err(|e| QueryError::from_sqlx(table, e))
                    })
                    .await
            }
            Target::Connection(conn) => {
                ctx.guard(async {
                    $helper(&mut **conn, stmt)
                        .await
                        .map_err(|e| QueryError::from_sqlx(table, e))
                })
                .await
            }
        }
    }};
}

impl<'a, T: TableMetadata> QueryBuilder<'a, T> {
    pub(crate) fn context(&self) -> ExecContext {
        ExecContext::new(self.state.timeout, self.state.cancel.clone())
    }

    pub(crate) async fn fetch_rows(&mut self, ctx: &ExecContext) -> Result<Vec<T>, QueryError> {
        let stmt = SqlGenerator::select(&self.state)?;
        debug_log!("select on {}: {} ({} args)", self.state.table, stmt.sql, stmt.args.len());
        dispatch!(self, run, ctx, &stmt, binding::fetch_all::<T, _>)
    }

    pub(crate) async fn fetch_count(&mut self, ctx: &ExecContext) -> Result<u64, QueryError> {
        let stmt = SqlGenerator::count(&self.state)?;
        debug_log!("count on {}: {}", self.state.table, stmt.sql);
        let count = dispatch!(self, run, ctx, &stmt, binding::fetch_count)?;
        Ok(count.max(0) as u64)
    }

    /// Execute a write; see [`RetryPolicy::run_write`](crate::retry::RetryPolicy::run_write)
    pub(crate) async fn run_statement(
        &mut self,
        ctx: &ExecContext,
        stmt: &CompiledStatement,
    ) -> Result<u64, QueryError> {
        debug_log!("execute on {}: {}", self.state.table, stmt.sql);
        dispatch!(self, run_write, ctx, stmt, binding::execute)
    }

    pub(crate) async fn run_returning(
        &mut self,
        ctx: &ExecContext,
        stmt: &CompiledStatement,
    ) -> Result<Vec<T>, QueryError> {
        debug_log!("execute on {}: {}", self.state.table, stmt.sql);
        dispatch!(self, run_write, ctx, stmt, binding::fetch_all::<T, _>)
    }

    pub(crate) async fn fetch_json(
        &mut self,
        ctx: &ExecContext,
        stmt: &CompiledStatement,
    ) -> Result<Vec<serde_json::Value>, QueryError> {
        debug_log!("load on {}: {}", self.state.table, stmt.sql);
        dispatch!(self, run, ctx, stmt, binding::fetch_json)
    }

    /// All matching rows, in ORDER BY order; empty when nothing matches
    pub async fn all(mut self) -> Result<Vec<T>, QueryError> {
        let ctx = self.context();
        self.fetch_rows(&ctx).await
    }

    /// The first matching row, or `None`. No match is not an error.
    pub async fn first(mut self) -> Result<Option<T>, QueryError> {
        let ctx = self.context();
        self.state.limit = Some(1);
        let stmt = SqlGenerator::select(&self.state)?;
        debug_log!("first on {}: {}", self.state.table, stmt.sql);
        dispatch!(self, run, &ctx, &stmt, binding::fetch_optional::<T, _>)
    }

    /// Number of matching rows (or groups, with GROUP BY)
    pub async fn count(mut self) -> Result<u64, QueryError> {
        let ctx = self.context();
        self.fetch_count(&ctx).await
    }

    pub async fn exists(mut self) -> Result<bool, QueryError> {
        let ctx = self.context();
        let stmt = SqlGenerator::exists(&self.state)?;
        debug_log!("exists on {}: {}", self.state.table, stmt.sql);
        dispatch!(self, run, &ctx, &stmt, binding::fetch_exists)
    }

    /// Insert a typed record and return the stored row
    pub async fn insert(self, record: &T) -> Result<T, QueryError> {
        self.insert_fields(record.to_field_map()).await
    }

    /// Insert a partial row and return the stored row, defaults filled in
    pub async fn insert_fields(mut self, fields: FieldMap) -> Result<T, QueryError> {
        let ctx = self.context();
        let stmt = SqlGenerator::insert(&self.state.table, &[fields], None, true)?;
        debug_log!("insert on {}: {}", self.state.table, stmt.sql);
        dispatch!(self, run_write, &ctx, &stmt, binding::fetch_one::<T, _>)
    }

    /// Insert all records in one statement; returns the affected count
    pub async fn insert_many(mut self, records: &[T]) -> Result<u64, QueryError> {
        if records.is_empty() {
            return Ok(0);
        }
        let ctx = self.context();
        let rows: Vec<FieldMap> = records.iter().map(TableMetadata::to_field_map).collect();
        let stmt = SqlGenerator::insert(&self.state.table, &rows, None, false)?;
        self.run_statement(&ctx, &stmt).await
    }

    /// Apply `set` to matching rows; returns the affected count
    pub async fn update(mut self, set: impl Into<UpdateSet>) -> Result<u64, QueryError> {
        let ctx = self.context();
        let stmt = SqlGenerator::update(&self.state, &set.into(), false)?;
        self.run_statement(&ctx, &stmt).await
    }

    /// Apply `set` to matching rows and return them as updated
    pub async fn update_returning(mut self, set: impl Into<UpdateSet>) -> Result<Vec<T>, QueryError> {
        let ctx = self.context();
        let stmt = SqlGenerator::update(&self.state, &set.into(), true)?;
        self.run_returning(&ctx, &stmt).await
    }

    pub async fn delete(mut self) -> Result<u64, QueryError> {
        let ctx = self.context();
        let stmt = SqlGenerator::delete(&self.state, false)?;
        self.run_statement(&ctx, &stmt).await
    }

    /// Delete matching rows and return them as they were
    pub async fn delete_returning(mut self) -> Result<Vec<T>, QueryError> {
        let ctx = self.context();
        let stmt = SqlGenerator::delete(&self.state, true)?;
        self.run_returning(&ctx, &stmt).await
    }
}
