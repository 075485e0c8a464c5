use crate::query_builder::filter::{Operator, WhereClause};
use crate::value::QueryValue;

/// Predicate methods shared by the query builder and its group sub-builders
///
/// Implementors only decide where a finished [`WhereClause`] goes; every
/// `where_*` method is built on [`Filterable::push_clause`].
pub trait Filterable: Sized {
    fn push_clause(self, clause: WhereClause) -> Self;

    /// `column = value`; a `None`/NULL value renders `IS NULL`
    fn where_eq(self, column: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(WhereClause::eq(column, value))
    }

    fn where_op(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<QueryValue>,
    ) -> Self {
        self.push_clause(WhereClause::compare(column, operator, value))
    }

    /// `NOT (column = value)`
    fn where_not(self, column: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(WhereClause::eq(column, value).negated())
    }

    /// An empty list matches no rows
    fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryValue>,
    {
        self.push_clause(WhereClause::in_list(column, values))
    }

    /// An empty list matches every row
    fn where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryValue>,
    {
        self.push_clause(WhereClause::in_list(column, values).negated())
    }

    fn where_null(self, column: impl Into<String>) -> Self {
        self.push_clause(WhereClause::is_null(column))
    }

    fn where_not_null(self, column: impl Into<String>) -> Self {
        self.push_clause(WhereClause::is_not_null(column))
    }

    fn where_like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.push_clause(WhereClause::like(column, pattern))
    }

    /// Verbatim SQL; each `?` takes the next argument, `??` is a literal `?`
    fn where_raw(self, expression: impl Into<String>, args: Vec<QueryValue>) -> Self {
        self.push_clause(WhereClause::raw(expression, args))
    }

    /// Add a prebuilt clause
    fn where_clause(self, clause: WhereClause) -> Self {
        self.push_clause(clause)
    }
}
