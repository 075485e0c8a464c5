//! Database client and transactions
//!
//! [`Database`] is constructed explicitly and passed to whoever needs it; there
//! is no process-wide connection.

use crate::context::ExecContext;
use crate::errors::QueryError;
use crate::query_builder::{QueryBuilder, Target};
use crate::retry::RetryPolicy;
use crate::traits::TableMetadata;
use sqlx::{PgPool, Postgres, Transaction};

/// Pool plus the default retry policy for every query built from it
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    retry_policy: RetryPolicy,
}

impl Database {
    pub fn new(pool: PgPool, retry_policy: RetryPolicy) -> Self {
        Self { pool, retry_policy }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Start a query over `T`'s table
    pub fn query<T: TableMetadata>(&self) -> QueryBuilder<'_, T> {
        QueryBuilder::new(Target::Pool(&self.pool), self.retry_policy)
    }

    /// Begin a database transaction
    ///
    /// Acquiring the connection is retried like any other statement; nothing
    /// has been executed yet at that point.
    pub async fn begin(&self) -> Result<DbTransaction, QueryError> {
        let pool = &self.pool;
        let tx = self
            .retry_policy
            .run(&ExecContext::default(), move || async move {
                pool.begin()
                    .await
                    .map_err(|e| QueryError::from_sqlx("transaction", e))
            })
            .await?;
        Ok(DbTransaction { tx })
    }

    /// Close every pooled connection; queries afterwards fail
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// An open transaction
///
/// Dropping it without `commit` rolls back. Statements run exactly once: a
/// failed statement aborts the transaction, so retrying inside it is never
/// correct.
///
/// ```ignore
/// let mut tx = db.begin().await?;
/// let product = tx.query::<Product>().where_id(id).for_update().first().await?;
/// tx.query::<Product>().where_id(id).update(UpdateSet::new().decrement("stock", 1)).await?;
/// tx.commit().await?;
/// ```
pub struct DbTransaction {
    tx: Transaction<'static, Postgres>,
}

impl DbTransaction {
    /// Start a query that runs inside this transaction
    pub fn query<T: TableMetadata>(&mut self) -> QueryBuilder<'_, T> {
        QueryBuilder::new(Target::Connection(&mut *self.tx), RetryPolicy::disabled())
    }

    pub async fn commit(self) -> Result<(), QueryError> {
        self.tx
            .commit()
            .await
            .map_err(|e| QueryError::from_sqlx("transaction", e))
    }

    pub async fn rollback(self) -> Result<(), QueryError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| QueryError::from_sqlx("transaction", e))
    }

    /// The underlying sqlx transaction, for statements outside the builder
    pub fn as_mut(&mut self) -> &mut Transaction<'static, Postgres> {
        &mut self.tx
    }
}
