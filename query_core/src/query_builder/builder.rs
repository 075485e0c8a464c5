//! Fluent query builder
//!
//! Every method here only records clause state; nothing touches the database
//! until a terminal method in `execution` consumes the builder.

use super::filter::{Operator, WhereClause, WhereGroup};
use super::group_builder::GroupParent;
use super::join::{JoinClause, JoinKind};
use super::join_builder::JoinBuilder;
use super::ordering::{OrderTerm, SortOrder};
use super::sql_generation::{CompiledStatement, SqlGenerator};
use super::state::QueryState;
use crate::errors::QueryError;
use crate::retry::RetryPolicy;
use crate::traits::{Filterable, TableMetadata};
use crate::value::QueryValue;
use sqlx::{PgConnection, PgPool};
use std::marker::PhantomData;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where a builder's statements run
pub enum Target<'a> {
    /// Each attempt borrows a pooled connection, so attempts can be retried
    Pool(&'a PgPool),
    /// An open transaction; statements run once
    Connection(&'a mut PgConnection),
}

/// Query builder over the row type `T`
#[must_use = "a query builder does nothing until a terminal method is awaited"]
pub struct QueryBuilder<'a, T: TableMetadata> {
    pub(crate) target: Target<'a>,
    pub(crate) state: QueryState,
    pub(crate) policy: RetryPolicy,
    _row: PhantomData<fn() -> T>,
}

impl<'a, T: TableMetadata> QueryBuilder<'a, T> {
    pub fn new(target: Target<'a>, policy: RetryPolicy) -> Self {
        Self {
            target,
            state: QueryState::new(T::table_name(), T::primary_key_field()),
            policy,
            _row: PhantomData,
        }
    }

    /// Read-only view of the accumulated clause state
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Query a different table than `T::table_name()`
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.state.table = name.into();
        self
    }

    /// Select these column expressions instead of `*`
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.state.distinct = true;
        self
    }

    /// Primary key equality
    pub fn where_id(self, id: impl Into<QueryValue>) -> Self {
        let column = self.state.primary_key.clone();
        self.push_clause(WhereClause::eq(column, id))
    }

    pub fn join(self, table: impl Into<String>) -> JoinBuilder<'a, T> {
        JoinBuilder::new(self, JoinClause::new(JoinKind::Inner, table))
    }

    pub fn left_join(self, table: impl Into<String>) -> JoinBuilder<'a, T> {
        JoinBuilder::new(self, JoinClause::new(JoinKind::Left, table))
    }

    pub fn right_join(self, table: impl Into<String>) -> JoinBuilder<'a, T> {
        JoinBuilder::new(self, JoinClause::new(JoinKind::Right, table))
    }

    pub fn full_join(self, table: impl Into<String>) -> JoinBuilder<'a, T> {
        JoinBuilder::new(self, JoinClause::new(JoinKind::Full, table))
    }

    pub(crate) fn attach_join(mut self, join: JoinClause) -> Self {
        self.state.joins.push(join);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortOrder) -> Self {
        self.state.order_by.push(OrderTerm::new(column, direction));
        self
    }

    pub fn order_by_asc(self, column: impl Into<String>) -> Self {
        self.order_by(column, SortOrder::Asc)
    }

    pub fn order_by_desc(self, column: impl Into<String>) -> Self {
        self.order_by(column, SortOrder::Desc)
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .group_by
            .fields
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// `expression operator value` over aggregates, e.g. `having("COUNT(*)", Operator::Gt, 5)`
    pub fn having(
        mut self,
        expression: impl Into<String>,
        operator: Operator,
        value: impl Into<QueryValue>,
    ) -> Self {
        self.state
            .group_by
            .having
            .push(WhereClause::compare(expression, operator, value));
        self
    }

    pub fn having_raw(mut self, expression: impl Into<String>, args: Vec<QueryValue>) -> Self {
        self.state
            .group_by
            .having
            .push(WhereClause::raw(expression, args));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.state.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.state.offset = Some(offset);
        self
    }

    /// Eager-load a relation declared in `T::relations()` (see `all_loaded`)
    pub fn with_relation(mut self, name: impl Into<String>) -> Self {
        self.state.relations.push(name.into());
        self
    }

    /// `FOR UPDATE` row lock; only meaningful inside a transaction
    pub fn for_update(mut self) -> Self {
        self.state.lock_for_update = true;
        self
    }

    /// Hard deadline covering every attempt and backoff of the call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.state.timeout = Some(timeout);
        self
    }

    /// Stop issuing attempts once `token` is cancelled
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.state.cancel = Some(token);
        self
    }

    /// Override the client's retry policy for this call
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.state.retry_policy = Some(policy);
        self
    }

    /// Allow `update`/`delete` with no WHERE condition to touch every row
    pub fn confirm_unconditional(mut self) -> Self {
        self.state.unconditional = true;
        self
    }

    /// Compile the SELECT without running it
    pub fn to_statement(&self) -> Result<CompiledStatement, QueryError> {
        SqlGenerator::select(&self.state)
    }

    /// Policy in force for this call
    pub(crate) fn effective_policy(&self) -> RetryPolicy {
        match &self.target {
            // a failed statement aborts the whole transaction
            Target::Connection(_) => RetryPolicy::disabled(),
            Target::Pool(_) => self.state.retry_policy.unwrap_or(self.policy),
        }
    }
}

impl<T: TableMetadata> Filterable for QueryBuilder<'_, T> {
    fn push_clause(mut self, clause: WhereClause) -> Self {
        self.state.wheres.push(clause);
        self
    }
}

impl<T: TableMetadata> GroupParent for QueryBuilder<'_, T> {
    fn attach_group(mut self, group: WhereGroup) -> Self {
        self.state.where_groups.push(group);
        self
    }
}
