//! # Shopkeep
//!
//! The data-access core of the shop backend: a row-typed PostgreSQL query
//! builder whose statements run through an error-classifying retry policy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shopkeep::prelude::*;
//!
//! #[derive(Debug, Clone, FromRow)]
//! pub struct Product {
//!     pub id: i64,
//!     pub name: String,
//!     pub price: i64,
//! }
//!
//! impl TableMetadata for Product {
//!     fn table_name() -> &'static str {
//!         "products"
//!     }
//!
//!     fn primary_key_value(&self) -> QueryValue {
//!         self.id.into()
//!     }
//!
//!     fn to_field_map(&self) -> FieldMap {
//!         FieldMap::new().set("name", &self.name).set("price", self.price)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let shop = Shopkeep::connect(&config).await?;
//!     let db = shop.database();
//!
//!     let page = db
//!         .query::<Product>()
//!         .where_op("price", Operator::Lt, 5000)
//!         .order_by_asc("name")
//!         .paginate(1, 20)
//!         .await?;
//!     println!("{} of {} products", page.data.len(), page.total);
//!
//!     let changed = db
//!         .query::<Product>()
//!         .where_id(42i64)
//!         .update(UpdateSet::new().set("name", "Renamed"))
//!         .await?;
//!     assert!(changed <= 1);
//!
//!     shop.close().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::Shopkeep;
pub use errors::ShopkeepError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, RetryConfig};

// Re-export the data-access core
pub use query_core;

// Re-export external dependencies used in public API
pub use sqlx;
pub use tokio_util;
