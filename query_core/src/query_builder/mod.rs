//! Query builder
//!
//! Clause model, fluent builder, statement compiler and terminal methods.

mod binding;
pub mod builder;
pub mod conflict;
mod execution;
pub mod filter;
pub mod group_builder;
pub mod grouping;
mod helpers;
pub mod join;
pub mod join_builder;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod state;
pub mod update;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;


pub use builder::{QueryBuilder, Target};
pub use conflict::{ConflictAction, OnConflict};
pub use filter::{Connector, Operator, WhereClause, WhereGroup};
pub use group_builder::{GroupBuilder, GroupParent};
pub use helpers::Loaded;
pub use join::{JoinClause, JoinCondition, JoinKind};
pub use join_builder::JoinBuilder;
pub use ordering::{OrderTerm, SortOrder};
pub use pagination::{Page, PageRequest, MAX_PAGE_SIZE};
pub use sql_generation::{CompiledStatement, SqlGenerator};
pub use state::QueryState;
pub use update::{UpdateOperation, UpdateSet};
