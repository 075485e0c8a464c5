use super::builder::QueryBuilder;
use super::filter::Operator;
use super::join::{JoinClause, JoinCondition};
use crate::traits::TableMetadata;
use crate::value::QueryValue;

/// Sub-builder for one JOIN; `end()` attaches it to the query
#[must_use = "call end() to attach the join to its query"]
pub struct JoinBuilder<'a, T: TableMetadata> {
    parent: QueryBuilder<'a, T>,
    join: JoinClause,
}

impl<'a, T: TableMetadata> JoinBuilder<'a, T> {
    pub(crate) fn new(parent: QueryBuilder<'a, T>, join: JoinClause) -> Self {
        Self { parent, join }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.join.alias = Some(alias.into());
        self
    }

    /// `left op right`, both columns
    pub fn on(mut self, left: impl Into<String>, operator: Operator, right: impl Into<String>) -> Self {
        self.join
            .conditions
            .push(JoinCondition::columns(left, operator, right));
        self
    }

    /// Further column condition, ANDed with the previous ones
    pub fn and(self, left: impl Into<String>, operator: Operator, right: impl Into<String>) -> Self {
        self.on(left, operator, right)
    }

    /// `left op $n`, right side bound as a parameter
    pub fn on_value(
        mut self,
        left: impl Into<String>,
        operator: Operator,
        value: impl Into<QueryValue>,
    ) -> Self {
        self.join
            .conditions
            .push(JoinCondition::literal(left, operator, value));
        self
    }

    pub fn and_value(
        self,
        left: impl Into<String>,
        operator: Operator,
        value: impl Into<QueryValue>,
    ) -> Self {
        self.on_value(left, operator, value)
    }

    pub fn end(self) -> QueryBuilder<'a, T> {
        self.parent.attach_join(self.join)
    }
}
