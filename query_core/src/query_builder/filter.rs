//! WHERE clause model
//!
//! A [`WhereClause`] is one predicate; a [`WhereGroup`] combines clauses and
//! nested groups under a single connector.

use crate::value::QueryValue;

/// Comparison operators recognised in predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    In,        // IN
    Like,      // LIKE
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

impl Operator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::Like => "LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator takes no right-hand value
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

/// Logical operators for combining conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Connector::And => " AND ",
            Connector::Or => " OR ",
        }
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `IS NULL` / `IS NOT NULL`
    None,
    Single(QueryValue),
    /// `IN` list; may be empty
    List(Vec<QueryValue>),
}

/// Body of a predicate: either structured or a raw fragment, never both
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        operator: Operator,
        operand: Operand,
    },
    /// Verbatim SQL with `?` placeholders, one per argument
    Raw { expression: String, args: Vec<QueryValue> },
}

/// Single condition in a WHERE or HAVING clause
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub predicate: Predicate,
    pub negate: bool,
}

impl WhereClause {
    /// `column operator value`
    pub fn compare(column: impl Into<String>, operator: Operator, value: impl Into<QueryValue>) -> Self {
        let operand = if operator.is_unary() {
            Operand::None
        } else {
            Operand::Single(value.into())
        };
        Self {
            predicate: Predicate::Compare {
                column: column.into(),
                operator,
                operand,
            },
            negate: false,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryValue>,
    {
        Self {
            predicate: Predicate::Compare {
                column: column.into(),
                operator: Operator::In,
                operand: Operand::List(values.into_iter().map(Into::into).collect()),
            },
            negate: false,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::unary(column, Operator::IsNull)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::unary(column, Operator::IsNotNull)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::Like, QueryValue::Text(pattern.into()))
    }

    pub fn raw(expression: impl Into<String>, args: Vec<QueryValue>) -> Self {
        Self {
            predicate: Predicate::Raw {
                expression: expression.into(),
                args,
            },
            negate: false,
        }
    }

    fn unary(column: impl Into<String>, operator: Operator) -> Self {
        Self {
            predicate: Predicate::Compare {
                column: column.into(),
                operator,
                operand: Operand::None,
            },
            negate: false,
        }
    }

    /// Wrap the predicate in NOT
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.predicate, Predicate::Raw { .. })
    }

    /// The predicate's value when it does not depend on the row: an empty
    /// IN list is always false, and its negation always true
    pub fn constant_value(&self) -> Option<bool> {
        match &self.predicate {
            Predicate::Compare {
                operator: Operator::In,
                operand: Operand::List(values),
                ..
            } if values.is_empty() => Some(self.negate),
            _ => None,
        }
    }
}

/// A parenthesized group of predicates joined by one connector
#[derive(Debug, Clone, PartialEq)]
pub struct WhereGroup {
    pub conditions: Vec<WhereClause>,
    pub subgroups: Vec<WhereGroup>,
    pub connector: Connector,
    pub negate: bool,
}

impl WhereGroup {
    pub fn new(connector: Connector) -> Self {
        Self {
            conditions: Vec::new(),
            subgroups: Vec::new(),
            connector,
            negate: false,
        }
    }

    pub fn and() -> Self {
        Self::new(Connector::And)
    }

    pub fn or() -> Self {
        Self::new(Connector::Or)
    }

    pub fn with(mut self, clause: WhereClause) -> Self {
        self.conditions.push(clause);
        self
    }

    pub fn with_group(mut self, group: WhereGroup) -> Self {
        self.subgroups.push(group);
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// True when the group, recursively, holds no predicate at all
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.subgroups.iter().all(WhereGroup::is_empty)
    }

    /// The group's value when no member depends on the row, or when one
    /// constant member decides the connector (`false` under AND, `true`
    /// under OR). `None` for an empty group.
    pub fn constant_value(&self) -> Option<bool> {
        let members: Vec<Option<bool>> = self
            .conditions
            .iter()
            .map(WhereClause::constant_value)
            .chain(
                self.subgroups
                    .iter()
                    .filter(|g| !g.is_empty())
                    .map(WhereGroup::constant_value),
            )
            .collect();
        if members.is_empty() {
            return None;
        }

        let deciding = match self.connector {
            Connector::And => false,
            Connector::Or => true,
        };
        let value = if members.contains(&Some(deciding)) {
            Some(deciding)
        } else if members.iter().all(Option::is_some) {
            Some(!deciding)
        } else {
            None
        };
        value.map(|v| v != self.negate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_predicates() {
        let none: Vec<i64> = Vec::new();
        assert_eq!(WhereClause::in_list("id", none.clone()).constant_value(), Some(false));
        assert_eq!(
            WhereClause::in_list("id", none.clone()).negated().constant_value(),
            Some(true)
        );
        assert_eq!(WhereClause::in_list("id", [1i64]).constant_value(), None);
        assert_eq!(WhereClause::eq("sku", "A-1").constant_value(), None);

        let always = WhereClause::in_list("id", none.clone()).negated();
        let or = WhereGroup::or().with(WhereClause::eq("sku", "A-1")).with(always.clone());
        assert_eq!(or.constant_value(), Some(true));
        assert_eq!(or.clone().negated().constant_value(), Some(false));

        let and = WhereGroup::and().with(WhereClause::eq("sku", "A-1")).with(always.clone());
        assert_eq!(and.constant_value(), None);
        assert_eq!(WhereGroup::and().with(always).constant_value(), Some(true));
        assert_eq!(WhereGroup::or().with_group(WhereGroup::and()).constant_value(), None);
    }

    #[test]
    fn test_null_operators_carry_no_value() {
        let clause = WhereClause::compare("deleted_at", Operator::IsNull, 5);
        match clause.predicate {
            Predicate::Compare { operand, .. } => assert_eq!(operand, Operand::None),
            _ => panic!("expected comparison"),
        }
    }

    #[test]
    fn test_negation_toggles() {
        let clause = WhereClause::eq("status", "paid").negated();
        assert!(clause.negate);
        assert!(!clause.negated().negate);
    }

    #[test]
    fn test_group_emptiness_is_recursive() {
        assert!(WhereGroup::or().is_empty());
        assert!(WhereGroup::and().with_group(WhereGroup::or()).is_empty());
        assert!(!WhereGroup::and()
            .with_group(WhereGroup::or().with(WhereClause::eq("a", 1)))
            .is_empty());
    }
}
