//! Convenience re-exports for building and running queries

// Core traits
pub use crate::traits::{Filterable, Relation, TableMetadata};
pub use crate::query_builder::GroupParent;

// Error types
pub use crate::errors::{ErrorCategory, QueryError};

// Client
pub use crate::client::{Database, DbTransaction};
pub use crate::retry::RetryPolicy;

// Query building
pub use crate::query_builder::{
    Loaded, OnConflict, Operator, Page, QueryBuilder, SortOrder, UpdateSet, WhereClause,
    WhereGroup,
};
pub use crate::value::{FieldMap, QueryValue};

// Common external dependencies that are frequently used
pub use serde::{Deserialize, Serialize};
pub use sqlx::{FromRow, PgPool};
pub use tokio_util::sync::CancellationToken;
pub use uuid::Uuid;
