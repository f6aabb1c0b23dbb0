//! Connection pool construction and health reporting.
//!
//! The enrichment runner is strictly sequential, so the pool exists mostly to
//! absorb overlapping operator invocations and integration tests. Sizing
//! defaults live in [`scholarsync_core::defaults`]; everything here is
//! plumbing over [`PgPoolOptions`].

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use scholarsync_core::{defaults, Error, Result};

/// Tunable pool parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Hard cap on open connections.
    pub max_connections: u32,
    /// Idle connections kept warm between bursts.
    pub min_connections: u32,
    /// How long an acquire may wait before failing.
    pub acquire_timeout: Duration,
    /// Idle time after which a connection is closed.
    pub idle_timeout: Duration,
    /// Age at which a connection is recycled, `None` to keep forever.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::POOL_MAX_CONNECTIONS,
            min_connections: defaults::POOL_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::POOL_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(defaults::POOL_IDLE_TIMEOUT_SECS),
            max_lifetime: Some(Duration::from_secs(defaults::POOL_MAX_LIFETIME_SECS)),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DB_MAX_CONNECTIONS` | `10` | Hard cap on open connections |
    /// | `DB_MIN_CONNECTIONS` | `1` | Idle connections kept warm |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `30` | Acquire wait limit |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.max_connections = n.max(1);
        }
        if let Some(n) = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.min_connections = n;
        }
        if let Some(secs) = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.acquire_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }
}

/// Open a pool with the default configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Open a pool with explicit configuration, logging the settings and how
/// long the first connection took.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "Opening Postgres pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout);

    if let Some(max_lifetime) = config.max_lifetime {
        options = options.max_lifetime(max_lifetime);
    }

    let pool = options
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Postgres pool ready"
    );
    Ok(pool)
}

/// Emit a debug event with the current size/idle counts, escalating to a
/// warning when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "db",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool utilization"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = size,
            "All pool connections are checked out"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_shared_constants() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, defaults::POOL_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, defaults::POOL_MIN_CONNECTIONS);
        assert_eq!(
            config.acquire_timeout,
            Duration::from_secs(defaults::POOL_ACQUIRE_TIMEOUT_SECS)
        );
        assert!(config.max_lifetime.is_some());
    }

    #[test]
    fn builders_override_defaults() {
        let config = PoolConfig::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(60))
            .max_lifetime(None);

        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
        assert!(config.max_lifetime.is_none());
    }
}
