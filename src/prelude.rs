//! Convenience re-exports for common Shopkeep usage
//!
//! ```rust
//! use shopkeep::prelude::*;
//! ```

// Core Shopkeep components
pub use crate::core::Shopkeep;
pub use crate::errors::ShopkeepError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, RetryConfig};

// Builder, executor and row contract
pub use query_core::prelude::*;

// Common external dependencies
pub use sqlx;
pub use tokio;
