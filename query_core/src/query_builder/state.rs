use super::filter::{WhereClause, WhereGroup};
use super::grouping::GroupBy;
use super::join::JoinClause;
use super::ordering::{OrderTerm, SortOrder};
use crate::retry::RetryPolicy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one builder has accumulated for one logical query
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<String>,
    pub distinct: bool,
    pub joins: Vec<JoinClause>,
    pub wheres: Vec<WhereClause>,
    pub where_groups: Vec<WhereGroup>,
    pub group_by: GroupBy,
    pub order_by: Vec<OrderTerm>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub relations: Vec<String>,
    pub lock_for_update: bool,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    pub retry_policy: Option<RetryPolicy>,
    /// Set by `confirm_unconditional`: UPDATE/DELETE may touch every row
    pub unconditional: bool,
}

impl QueryState {
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            ..Self::default()
        }
    }

    /// Give OFFSET windows a deterministic row order when none was set:
    /// the primary key, or the grouping columns of a grouped query
    pub fn ensure_stable_order(&mut self) {
        if !self.order_by.is_empty() {
            return;
        }
        let columns = if self.group_by.is_empty() {
            vec![self.primary_key.clone()]
        } else {
            self.group_by.fields.clone()
        };
        self.order_by = columns
            .into_iter()
            .map(|column| OrderTerm::new(column, SortOrder::Asc))
            .collect();
    }

    /// Whether the WHERE clause can exclude any row.
    ///
    /// False with no predicates, and also when every predicate is always
    /// true (such as `where_not_in` with an empty list).
    pub fn has_conditions(&self) -> bool {
        let mut parts = self
            .wheres
            .iter()
            .map(WhereClause::constant_value)
            .chain(
                self.where_groups
                    .iter()
                    .filter(|g| !g.is_empty())
                    .map(WhereGroup::constant_value),
            )
            .peekable();
        if parts.peek().is_none() {
            return false;
        }
        !parts.all(|value| value == Some(true))
    }
}
