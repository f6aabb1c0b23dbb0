//! # scholarsync-db
//!
//! PostgreSQL persistence layer for scholarsync.
//!
//! This crate provides:
//! - Connection pool management
//! - The job posting store ([`PgJobStore`])
//! - The enrichment queue state machine ([`PgEnrichmentQueue`])
//! - The sync run audit log ([`PgSyncLog`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use scholarsync_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/scholarsync").await?;
//!     db.migrate().await?;
//!
//!     let progress = db.queue.progress_snapshot().await?;
//!     println!("pending: {}", progress.pending);
//!     Ok(())
//! }
//! ```

pub mod jobs;
pub mod pool;
pub mod queue;
pub mod sync_log;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use sqlx::PgPool;

// Re-export core types
pub use scholarsync_core::*;

pub use jobs::{compute_content_hash, PgJobStore};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use queue::PgEnrichmentQueue;
pub use sync_log::{PgSyncLog, SyncTotals};

/// Bundle of all repositories sharing one connection pool.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
    pub jobs: PgJobStore,
    pub queue: PgEnrichmentQueue,
    pub sync_log: PgSyncLog,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_config(database_url, PoolConfig::default()).await
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build the repository bundle over an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            jobs: PgJobStore::new(pool.clone()),
            queue: PgEnrichmentQueue::new(pool.clone()),
            sync_log: PgSyncLog::new(pool.clone()),
            pool,
        }
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}
