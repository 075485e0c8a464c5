//! Traits for database operations

pub mod filterable;
pub mod table_metadata;

pub use filterable::Filterable;
pub use table_metadata::{Relation, TableMetadata};
