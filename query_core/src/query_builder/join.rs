use super::filter::Operator;
use crate::value::QueryValue;

/// Represents the type of SQL JOIN operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN - returns records that have matching values in both tables
    Inner,
    /// LEFT JOIN - returns all records from the left table and matched records from the right table
    Left,
    /// RIGHT JOIN - returns all records from the right table and matched records from the left table
    Right,
    /// FULL OUTER JOIN - returns all records when there is a match in either left or right table
    Full,
}

impl JoinKind {
    /// Convert JoinKind to SQL string
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

/// Right-hand side of a join condition
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOperand {
    /// Another column, interpolated as an identifier
    Column(String),
    /// A literal, bound as a parameter
    Value(QueryValue),
}

/// One `left op right` condition of an ON clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub left: String,
    pub operator: Operator,
    pub right: JoinOperand,
}

impl JoinCondition {
    pub fn columns(left: impl Into<String>, operator: Operator, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            operator,
            right: JoinOperand::Column(right.into()),
        }
    }

    pub fn literal(left: impl Into<String>, operator: Operator, value: impl Into<QueryValue>) -> Self {
        Self {
            left: left.into(),
            operator,
            right: JoinOperand::Value(value.into()),
        }
    }

    pub fn right_is_literal(&self) -> bool {
        matches!(self.right, JoinOperand::Value(_))
    }
}

/// Represents a complete JOIN clause; its conditions are ANDed
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub conditions: Vec<JoinCondition>,
}

impl JoinClause {
    pub fn new(kind: JoinKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            alias: None,
            conditions: Vec::new(),
        }
    }

    /// Add an alias for the joined table
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Get the table reference (alias if present, otherwise table name)
    pub fn table_ref(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}
