//! Core Shopkeep functionality
//!
//! [`Shopkeep`] turns an [`AppConfig`] into a connected [`Database`] and owns
//! its lifecycle: connect, use, explicit close.

use query_core::{Database, RetryPolicy};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use crate::errors::ShopkeepError;
use config::{AppConfig, DatabaseConfig};

/// Explicitly constructed owner of the connection pool
pub struct Shopkeep {
    database: Database,
}

impl Shopkeep {
    /// Validate the configuration, connect the pool and build the client
    pub async fn connect(config: &AppConfig) -> Result<Self, ShopkeepError> {
        config.validate()?;
        let pool = Self::pool_options(&config.database)
            .connect(&config.database.connection_string())
            .await?;

        debug_log!(
            "connected to {}:{}/{}",
            config.database.host,
            config.database.port,
            config.database.database
        );

        Ok(Self {
            database: Database::new(pool, RetryPolicy::from(&config.retry)),
        })
    }

    /// Wrap an existing pool, e.g. one shared with other code
    pub fn from_pool(pool: PgPool, retry_policy: RetryPolicy) -> Self {
        Self {
            database: Database::new(pool, retry_policy),
        }
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        pool_options
    }

    /// The query client; clone it freely
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        self.database.pool()
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), ShopkeepError> {
        sqlx::query("SELECT 1").fetch_one(self.pool()).await?;
        Ok(())
    }

    /// Close the pool; every clone of the client stops working
    pub async fn close(&self) {
        self.database.close().await;
    }
}
