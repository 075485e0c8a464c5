//! Statement compiler
//!
//! Renders a [`QueryState`] into one PostgreSQL statement plus its ordered
//! argument list. Clause order is fixed regardless of the order the builder
//! methods were called in:
//!
//! `SELECT [DISTINCT] cols → FROM/JOIN → WHERE → GROUP BY → HAVING →
//! ORDER BY → LIMIT/OFFSET → FOR UPDATE`
//!
//! Placeholders are numbered by one counter for the whole statement, so the
//! n-th bound argument always matches `$n`. Compilation is a pure function of
//! the state.

use super::conflict::{ConflictAction, OnConflict};
use super::filter::{Operand, Operator, Predicate, WhereClause, WhereGroup};
use super::join::{JoinClause, JoinOperand};
use super::state::QueryState;
use super::update::UpdateSet;
use crate::errors::QueryError;
use crate::traits::Relation;
use crate::validation::{validate_column, validate_column_ref, ValidatedTableName};
use crate::value::{FieldMap, QueryValue};

/// A statement ready to bind and execute
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub args: Vec<QueryValue>,
}

/// Positional argument accumulator
#[derive(Debug, Default)]
struct Args {
    values: Vec<QueryValue>,
}

impl Args {
    /// Render a value operand: `NULL` literal or the next `$n`
    fn push(&mut self, value: &QueryValue) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.values.push(value.clone());
        format!("${}", self.values.len())
    }

    fn finish(self, sql: String) -> CompiledStatement {
        CompiledStatement {
            sql,
            args: self.values,
        }
    }
}

pub struct SqlGenerator;

impl SqlGenerator {
    /// Full SELECT for `all`/`first`
    pub fn select(state: &QueryState) -> Result<CompiledStatement, QueryError> {
        let mut args = Args::default();
        let mut parts = vec![Self::select_clause(state)];
        parts.push(Self::from_clause(state, &mut args)?);
        Self::push_nonempty(&mut parts, Self::where_clause(state, &mut args)?);
        Self::push_nonempty(&mut parts, Self::group_by_clause(state)?);
        Self::push_nonempty(&mut parts, Self::having_clause(state, &mut args)?);
        Self::push_nonempty(&mut parts, Self::order_clause(state)?);
        Self::push_nonempty(&mut parts, Self::limit_clause(state.limit, state.offset));
        if state.lock_for_update {
            parts.push("FOR UPDATE".to_string());
        }
        Ok(args.finish(parts.join(" ")))
    }

    /// `SELECT COUNT(*)`, ignoring columns, ordering, pagination and locking
    pub fn count(state: &QueryState) -> Result<CompiledStatement, QueryError> {
        let mut args = Args::default();
        let body = Self::filtered_body(state, &mut args)?;
        let sql = if state.group_by.fields.is_empty() {
            format!("SELECT COUNT(*) {}", body)
        } else {
            // one row per group: count the groups
            format!("SELECT COUNT(*) FROM (SELECT 1 {}) AS grouped", body)
        };
        Ok(args.finish(sql))
    }

    /// `SELECT EXISTS(...)`, ignoring the same settings as `count`
    pub fn exists(state: &QueryState) -> Result<CompiledStatement, QueryError> {
        let mut args = Args::default();
        let body = Self::filtered_body(state, &mut args)?;
        Ok(args.finish(format!("SELECT EXISTS(SELECT 1 {})", body)))
    }

    /// Multi-row INSERT, optionally with a conflict clause and `RETURNING *`
    pub fn insert(
        table: &str,
        rows: &[FieldMap],
        on_conflict: Option<&OnConflict>,
        returning: bool,
    ) -> Result<CompiledStatement, QueryError> {
        let table = ValidatedTableName::new(table)?;
        let first = rows
            .first()
            .ok_or_else(|| QueryError::validation("insert requires at least one row"))?;
        if first.is_empty() {
            return Err(QueryError::validation("insert requires at least one column"));
        }

        let columns: Vec<&str> = first.columns().collect();
        for column in &columns {
            validate_column(column)?;
        }

        let mut args = Args::default();
        let mut tuples = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if !row.columns().eq(columns.iter().copied()) {
                return Err(QueryError::validation(format!(
                    "row {} has a different column set than row 0",
                    index
                )));
            }
            let placeholders: Vec<String> = row.iter().map(|(_, v)| args.push(v)).collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            columns.join(", "),
            tuples.join(", ")
        );

        if let Some(conflict) = on_conflict {
            sql.push(' ');
            sql.push_str(&Self::conflict_clause(conflict)?);
        }
        if returning {
            sql.push_str(" RETURNING *");
        }
        Ok(args.finish(sql))
    }

    /// UPDATE ... SET ... WHERE ..., SET arguments numbered before WHERE ones
    pub fn update(
        state: &QueryState,
        set: &UpdateSet,
        returning: bool,
    ) -> Result<CompiledStatement, QueryError> {
        Self::check_mutation(state, "update")?;
        if set.is_empty() {
            return Err(QueryError::validation("update requires at least one column"));
        }
        let table = ValidatedTableName::new(&state.table)?;

        let mut args = Args::default();
        let mut assignments = Vec::with_capacity(set.len());
        for (field, operation) in set.operations() {
            validate_column(field)?;
            let operand = args.push(operation.value());
            assignments.push(operation.to_sql(field, &operand));
        }

        let mut parts = vec![format!("UPDATE {} SET {}", table, assignments.join(", "))];
        Self::push_nonempty(&mut parts, Self::where_clause(state, &mut args)?);
        if returning {
            parts.push("RETURNING *".to_string());
        }
        Ok(args.finish(parts.join(" ")))
    }

    pub fn delete(state: &QueryState, returning: bool) -> Result<CompiledStatement, QueryError> {
        Self::check_mutation(state, "delete")?;
        let table = ValidatedTableName::new(&state.table)?;

        let mut args = Args::default();
        let mut parts = vec![format!("DELETE FROM {}", table)];
        Self::push_nonempty(&mut parts, Self::where_clause(state, &mut args)?);
        if returning {
            parts.push("RETURNING *".to_string());
        }
        Ok(args.finish(parts.join(" ")))
    }

    /// Related rows as JSON, for eager loading
    pub fn relation_load(
        relation: &Relation,
        keys: &[QueryValue],
    ) -> Result<CompiledStatement, QueryError> {
        let table = ValidatedTableName::new(relation.table)?;
        validate_column(relation.foreign_key)?;

        let mut args = Args::default();
        let placeholders: Vec<String> = keys.iter().map(|k| args.push(k)).collect();
        let sql = format!(
            "SELECT row_to_json(r) FROM {} r WHERE r.{} IN ({})",
            table,
            relation.foreign_key,
            placeholders.join(", ")
        );
        Ok(args.finish(sql))
    }

    fn push_nonempty(parts: &mut Vec<String>, part: String) {
        if !part.is_empty() {
            parts.push(part);
        }
    }

    fn check_mutation(state: &QueryState, operation: &str) -> Result<(), QueryError> {
        if !state.joins.is_empty()
            || !state.group_by.is_empty()
            || state.limit.is_some()
            || state.offset.is_some()
        {
            return Err(QueryError::validation(format!(
                "{} does not support JOIN, GROUP BY, HAVING, LIMIT or OFFSET",
                operation
            )));
        }
        if !state.has_conditions() && !state.unconditional {
            return Err(QueryError::validation(format!(
                "{} on {} has no WHERE condition that restricts rows; call confirm_unconditional() to affect every row",
                operation, state.table
            )));
        }
        Ok(())
    }

    /// `FROM ... JOIN ... WHERE ... GROUP BY ... HAVING ...`
    fn filtered_body(state: &QueryState, args: &mut Args) -> Result<String, QueryError> {
        let mut parts = vec![Self::from_clause(state, args)?];
        Self::push_nonempty(&mut parts, Self::where_clause(state, args)?);
        Self::push_nonempty(&mut parts, Self::group_by_clause(state)?);
        Self::push_nonempty(&mut parts, Self::having_clause(state, args)?);
        Ok(parts.join(" "))
    }

    fn select_clause(state: &QueryState) -> String {
        let columns = if state.columns.is_empty() {
            if state.joins.is_empty() {
                "*".to_string()
            } else {
                // keep joined columns from shadowing the root row's
                format!("{}.*", state.table)
            }
        } else {
            state.columns.join(", ")
        };

        if state.distinct {
            format!("SELECT DISTINCT {}", columns)
        } else {
            format!("SELECT {}", columns)
        }
    }

    fn from_clause(state: &QueryState, args: &mut Args) -> Result<String, QueryError> {
        let table = ValidatedTableName::new(&state.table)?;
        let mut sql = format!("FROM {}", table);
        for join in &state.joins {
            sql.push(' ');
            sql.push_str(&Self::join_clause(join, args)?);
        }
        Ok(sql)
    }

    fn join_clause(join: &JoinClause, args: &mut Args) -> Result<String, QueryError> {
        let table = ValidatedTableName::new(&join.table)?;
        if join.conditions.is_empty() {
            return Err(QueryError::validation(format!(
                "join on {} has no ON condition",
                join.table
            )));
        }

        let table_part = match &join.alias {
            Some(alias) => {
                validate_column(alias)?;
                format!("{} AS {}", table, alias)
            }
            None => table.to_string(),
        };

        let mut conditions = Vec::with_capacity(join.conditions.len());
        for condition in &join.conditions {
            if condition.operator.is_unary() || condition.operator == Operator::In {
                return Err(QueryError::validation(format!(
                    "join condition on {} must use a binary comparison",
                    condition.left
                )));
            }
            validate_column_ref(&condition.left)?;
            let rendered = match (&condition.right, condition.operator) {
                (JoinOperand::Column(column), operator) => {
                    validate_column_ref(column)?;
                    format!("{} {} {}", condition.left, operator.to_sql(), column)
                }
                (JoinOperand::Value(QueryValue::Null), Operator::Eq) => {
                    format!("{} IS NULL", condition.left)
                }
                (JoinOperand::Value(QueryValue::Null), Operator::Ne) => {
                    format!("{} IS NOT NULL", condition.left)
                }
                (JoinOperand::Value(QueryValue::Null), operator) => {
                    return Err(QueryError::validation(format!(
                        "join condition {} {} NULL never matches",
                        condition.left,
                        operator.to_sql()
                    )));
                }
                (JoinOperand::Value(value), operator) => {
                    format!("{} {} {}", condition.left, operator.to_sql(), args.push(value))
                }
            };
            conditions.push(rendered);
        }

        Ok(format!(
            "{} {} ON {}",
            join.kind.to_sql(),
            table_part,
            conditions.join(" AND ")
        ))
    }

    /// Top-level predicates ANDed, then each group ANDed as a parenthesized unit
    fn where_clause(state: &QueryState, args: &mut Args) -> Result<String, QueryError> {
        let mut parts = Vec::new();
        for clause in &state.wheres {
            parts.push(Self::render_clause(clause, args, true)?);
        }
        for group in &state.where_groups {
            if let Some(rendered) = Self::render_group(group, args)? {
                parts.push(rendered);
            }
        }

        if parts.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("WHERE {}", parts.join(" AND ")))
        }
    }

    /// `None` for a group with no predicates, so it adds nothing
    fn render_group(group: &WhereGroup, args: &mut Args) -> Result<Option<String>, QueryError> {
        let mut parts = Vec::new();
        for clause in &group.conditions {
            parts.push(Self::render_clause(clause, args, true)?);
        }
        for subgroup in &group.subgroups {
            if let Some(rendered) = Self::render_group(subgroup, args)? {
                parts.push(rendered);
            }
        }

        if parts.is_empty() {
            return Ok(None);
        }

        let body = format!("({})", parts.join(group.connector.to_sql()));
        Ok(Some(if group.negate {
            format!("NOT {}", body)
        } else {
            body
        }))
    }

    fn render_clause(
        clause: &WhereClause,
        args: &mut Args,
        validate: bool,
    ) -> Result<String, QueryError> {
        let (column, operator, operand) = match &clause.predicate {
            Predicate::Raw { expression, args: raw_args } => {
                let rendered = format!("({})", Self::render_raw(expression, raw_args, args)?);
                return Ok(Self::negate(rendered, clause.negate));
            }
            Predicate::Compare {
                column,
                operator,
                operand,
            } => (column, *operator, operand),
        };

        if validate {
            validate_column_ref(column)?;
        }

        let rendered = match (operator, operand) {
            (Operator::IsNull | Operator::IsNotNull, _) => {
                format!("{} {}", column, operator.to_sql())
            }
            (Operator::In, Operand::List(values)) => {
                // IN () is not valid SQL: an empty list matches nothing,
                // and its negation matches everything
                if values.is_empty() {
                    return Ok(if clause.negate { "1 = 1" } else { "1 = 0" }.to_string());
                }
                let placeholders: Vec<String> = values.iter().map(|v| args.push(v)).collect();
                let keyword = if clause.negate { "NOT IN" } else { "IN" };
                return Ok(format!("{} {} ({})", column, keyword, placeholders.join(", ")));
            }
            (Operator::In, Operand::Single(value)) => {
                format!("{} IN ({})", column, args.push(value))
            }
            (Operator::Eq, Operand::Single(QueryValue::Null)) => format!("{} IS NULL", column),
            (Operator::Ne, Operand::Single(QueryValue::Null)) => {
                format!("{} IS NOT NULL", column)
            }
            (_, Operand::Single(value)) => {
                format!("{} {} {}", column, operator.to_sql(), args.push(value))
            }
            (_, Operand::List(_)) | (_, Operand::None) => {
                return Err(QueryError::validation(format!(
                    "operator {} on {} needs a single value",
                    operator.to_sql(),
                    column
                )));
            }
        };

        Ok(Self::negate(rendered, clause.negate))
    }

    fn negate(rendered: String, negate: bool) -> String {
        if negate {
            format!("NOT ({})", rendered)
        } else {
            rendered
        }
    }

    /// Replace each `?` with the next placeholder; `??` is a literal `?`
    fn render_raw(
        expression: &str,
        raw_args: &[QueryValue],
        args: &mut Args,
    ) -> Result<String, QueryError> {
        let mut out = String::with_capacity(expression.len() + raw_args.len() * 2);
        let mut remaining = raw_args.iter();
        let mut chars = expression.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '?' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'?') {
                chars.next();
                out.push('?');
                continue;
            }
            let value = remaining.next().ok_or_else(|| {
                QueryError::validation(format!(
                    "raw fragment '{}' has more placeholders than its {} argument(s)",
                    expression,
                    raw_args.len()
                ))
            })?;
            out.push_str(&args.push(value));
        }

        if remaining.next().is_some() {
            return Err(QueryError::validation(format!(
                "raw fragment '{}' has fewer placeholders than its {} argument(s)",
                expression,
                raw_args.len()
            )));
        }
        Ok(out)
    }

    fn group_by_clause(state: &QueryState) -> Result<String, QueryError> {
        if state.group_by.fields.is_empty() {
            return Ok(String::new());
        }
        for field in &state.group_by.fields {
            validate_column_ref(field)?;
        }
        Ok(format!("GROUP BY {}", state.group_by.fields.join(", ")))
    }

    /// HAVING terms are aggregate expressions, so their columns are not
    /// validated as identifiers
    fn having_clause(state: &QueryState, args: &mut Args) -> Result<String, QueryError> {
        if !state.group_by.has_having() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(state.group_by.having.len());
        for clause in &state.group_by.having {
            parts.push(Self::render_clause(clause, args, false)?);
        }
        Ok(format!("HAVING {}", parts.join(" AND ")))
    }

    fn order_clause(state: &QueryState) -> Result<String, QueryError> {
        if state.order_by.is_empty() {
            return Ok(String::new());
        }

        let mut items = Vec::with_capacity(state.order_by.len());
        for term in &state.order_by {
            validate_column_ref(&term.column)?;
            items.push(format!("{} {}", term.column, term.direction.to_sql()));
        }
        Ok(format!("ORDER BY {}", items.join(", ")))
    }

    fn limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }

    fn conflict_clause(conflict: &OnConflict) -> Result<String, QueryError> {
        if conflict.target.is_empty() {
            return Err(QueryError::validation(
                "upsert requires an explicit conflict target column",
            ));
        }
        for column in &conflict.target {
            validate_column(column)?;
        }
        let target = conflict.target.join(", ");

        match &conflict.action {
            ConflictAction::DoNothing => Ok(format!("ON CONFLICT ({}) DO NOTHING", target)),
            ConflictAction::DoUpdate(columns) => {
                if columns.is_empty() {
                    return Err(QueryError::validation(
                        "upsert do_update requires at least one column",
                    ));
                }
                let mut assignments = Vec::with_capacity(columns.len());
                for column in columns {
                    validate_column(column)?;
                    assignments.push(format!("{} = EXCLUDED.{}", column, column));
                }
                Ok(format!(
                    "ON CONFLICT ({}) DO UPDATE SET {}",
                    target,
                    assignments.join(", ")
                ))
            }
        }
    }
}
