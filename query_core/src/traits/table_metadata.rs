//! Trait definitions
//!
//! This module defines the row-type contract the query builder is generic over.

use crate::value::{FieldMap, QueryValue};
use sqlx::postgres::PgRow;

/// A relation that can be eager-loaded alongside a root row
///
/// Related rows are those in `table` whose `foreign_key` equals the root row's
/// `local_key` (the primary key when `local_key` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub local_key: Option<&'static str>,
}

impl Relation {
    /// Rows in `table` pointing back at the root's primary key
    pub const fn has_many(name: &'static str, table: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            table,
            foreign_key,
            local_key: None,
        }
    }

    /// The row in `table` whose `key` matches the root's `local_key` column
    pub const fn belongs_to(
        name: &'static str,
        table: &'static str,
        key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self {
            name,
            table,
            foreign_key: key,
            local_key: Some(local_key),
        }
    }
}

/// Metadata about a table and the typed rows stored in it
///
/// Row decoding is delegated to [`sqlx::FromRow`]; this trait supplies the
/// naming and the record → column mapping used by insert and update.
///
/// ```ignore
/// #[derive(Debug, Clone, sqlx::FromRow)]
/// pub struct Product {
///     pub id: Uuid,
///     pub name: String,
///     pub price_cents: i64,
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
///
/// impl TableMetadata for Product {
///     fn table_name() -> &'static str {
///         "products"
///     }
///
///     fn primary_key_value(&self) -> QueryValue {
///         self.id.into()
///     }
///
///     fn to_field_map(&self) -> FieldMap {
///         FieldMap::new()
///             .set("id", self.id)
///             .set("name", &self.name)
///             .set("price_cents", self.price_cents)
///     }
/// }
/// ```
pub trait TableMetadata: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin + Sized {
    /// The table name in the database
    fn table_name() -> &'static str;

    /// Get the primary key field name
    fn primary_key_field() -> &'static str {
        "id"
    }

    /// Column set to `NOW()` by soft delete and cleared by restore
    fn soft_delete_field() -> &'static str {
        "deleted_at"
    }

    /// Relations available to `with_relation`
    fn relations() -> &'static [Relation] {
        &[]
    }

    /// Extract the primary key value from a row
    fn primary_key_value(&self) -> QueryValue;

    /// Columns written when this record is inserted or upserted
    fn to_field_map(&self) -> FieldMap;

    /// Look up a declared relation by name
    fn relation(name: &str) -> Option<&'static Relation> {
        Self::relations().iter().find(|r| r.name == name)
    }
}
