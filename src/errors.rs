//! Error types for the Shopkeep crate
//!
//! Query errors keep their classification; see [`query_core::QueryError`].

use config::ConfigError;
use query_core::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopkeepError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] QueryError),
}
