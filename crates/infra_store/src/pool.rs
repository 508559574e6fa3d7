//! Connection pool configuration for the SQLite store

use std::str::FromStr;
use std::time::Duration;

use domain_ledger::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

/// Type alias for the SQLite connection pool
pub type StorePool = SqlitePool;

/// Configuration options for the ledger store's connection pool
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use infra_store::StoreConfig;
///
/// let config = StoreConfig::new("sqlite://ledger.db")
///     .max_connections(10)
///     .connect_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite connection string, e.g. `sqlite://ledger.db` or `sqlite::memory:`
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
}

impl StoreConfig {
    /// Creates a configuration with sensible defaults for an operator tool:
    /// a small pool and a short connect timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// In-memory database for tests. Pinned to a single connection, since
    /// every SQLite `:memory:` connection is its own database.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:").max_connections(1)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Creates a connection pool, creating the database file when absent.
///
/// # Errors
///
/// Returns [`StoreError::ConnectionFailed`] when the URL is malformed or
/// the database cannot be opened.
pub async fn create_pool(config: &StoreConfig) -> Result<StorePool, StoreError> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

    info!(
        url = %config.url,
        max_connections = config.max_connections,
        "store pool created"
    );
    Ok(pool)
}
