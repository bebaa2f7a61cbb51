//! Shared term store for Dealroom negotiations
//!
//! Both parties of a negotiation run in separate processes and never talk to
//! each other directly; this store is the single source of truth between them.
//! Every operation is one atomic statement, so no multi-record transactions
//! are needed and a crash between a write and its notification leaves the
//! store consistent.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dealroom_db::{StoreConfig, TermSpec, TermStore};
//!
//! let store = TermStore::open(&StoreConfig::sqlite("negotiation.sqlite"), "valuation").await?;
//! store.initialize(&[TermSpec::new("EBITDA", "$")]).await?;
//! store.set_value("EBITDA", 100.0).await?;
//! let settled = store.is_fully_approved().await?;
//! ```

mod error;
mod schema;
mod terms;
mod types;

pub use error::{DbError, Result};
pub use types::{Term, TermSnapshot, TermSpec};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Connection settings for the shared store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// sqlite:/path/to/file.sqlite or sqlite::memory:
    pub url: String,
    pub max_connections: u32,
    /// How long a writer waits for the other process's lock
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 4,
            busy_timeout: Duration::from_millis(dealroom_protocol::defaults::STORE_BUSY_TIMEOUT_MS),
        }
    }

    /// File-backed SQLite store (shared across processes).
    pub fn sqlite(path: impl AsRef<std::path::Path>) -> Self {
        Self::from_url(format!("sqlite:{}", path.as_ref().display()))
    }

    /// In-memory store (for testing). One connection, so every clone of the
    /// handle sees the same database.
    pub fn sqlite_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            busy_timeout: Duration::from_millis(dealroom_protocol::defaults::STORE_BUSY_TIMEOUT_MS),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Handle to the shared term store, scoped to one game.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct TermStore {
    pool: SqlitePool,
    game: Arc<str>,
}

impl TermStore {
    /// Open (creating if missing) the store and ensure the schema exists.
    ///
    /// Any failure here is reported as [`DbError::Unavailable`].
    pub async fn open(config: &StoreConfig, game: &str) -> Result<Self> {
        let pool = Self::connect(config)
            .await
            .map_err(|e| DbError::Unavailable(format!("{}: {}", config.url, e)))?;

        let store = Self {
            pool,
            game: Arc::from(game),
        };
        store
            .ensure_schema()
            .await
            .map_err(|e| DbError::Unavailable(format!("{}: {}", config.url, e)))?;

        info!(url = %config.url, game = %game, "Term store opened");
        Ok(store)
    }

    async fn connect(config: &StoreConfig) -> std::result::Result<SqlitePool, sqlx::Error> {
        if let Some(path) = config.url.strip_prefix("sqlite:") {
            if !config.is_memory() {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_memory() {
            // Dropping the only connection would drop the database.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        pool_options.connect_with(options).await
    }

    /// Same database, different game.
    pub fn for_game(&self, game: &str) -> Self {
        Self {
            pool: self.pool.clone(),
            game: Arc::from(game),
        }
    }

    pub fn game(&self) -> &str {
        &self.game
    }

    /// Close the pool. Other clones become unusable.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// Timestamp utilities
impl TermStore {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_else(chrono::Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("test.sqlite");

        let store = TermStore::open(&StoreConfig::sqlite(&db_path), "valuation")
            .await
            .unwrap();
        assert!(db_path.exists());
        assert_eq!(store.game(), "valuation");

        store.close().await;
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        // A directory cannot be opened as a database file.
        let config = StoreConfig::from_url(format!("sqlite:{}", tmp.path().display()));

        let result = TermStore::open(&config, "valuation").await;
        assert!(matches!(result, Err(DbError::Unavailable(_))));
    }

    #[test]
    fn test_millis_roundtrip() {
        let now = TermStore::now_millis();
        assert_eq!(TermStore::millis_to_datetime(now).timestamp_millis(), now);
    }
}
