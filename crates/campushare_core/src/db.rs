//! Pooled SQLite database handle.

use crate::config::DatabaseConfig;
use crate::error::CoreResult;
use crate::migration::{self, MigrationRunResult, MigrationVersion};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

/// A handle to the CampuShare database.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects without running migrations.
    pub async fn connect(config: &DatabaseConfig) -> CoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        let mut pool_options =
            SqlitePoolOptions::new().max_connections(config.effective_max_connections());
        if config.is_in_memory() {
            // The database lives and dies with its only connection.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        info!(url = %config.url, "connected to database");
        Ok(Self { pool })
    }

    /// Connects and applies all pending migrations.
    pub async fn open(config: &DatabaseConfig) -> CoreResult<Self> {
        let db = Self::connect(config).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Opens a fresh, migrated in-memory database.
    pub async fn in_memory() -> CoreResult<Self> {
        Self::open(&DatabaseConfig::in_memory()).await
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begins a deferred transaction.
    pub async fn begin(&self) -> CoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Begins a transaction that takes the write lock up front (`BEGIN IMMEDIATE`).
    ///
    /// Read-modify-write paths must use this: a deferred transaction that
    /// reads first fails with `SQLITE_BUSY` on upgrade instead of waiting out
    /// the busy timeout.
    pub async fn begin_write(&self) -> CoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Applies pending migrations.
    pub async fn migrate(&self) -> CoreResult<MigrationRunResult> {
        let result = migration::run_pending(&self.pool).await?;
        debug!(
            applied = result.applied.len(),
            version = result.final_version,
            "migrations up to date"
        );
        Ok(result)
    }

    /// Returns the applied schema version.
    pub async fn schema_version(&self) -> CoreResult<MigrationVersion> {
        migration::current_version(&self.pool).await
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database closed");
    }
}
