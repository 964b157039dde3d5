//! # SQLite Handle
//!
//! Opens the commission store and hands out repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new("comtrack.db")          DbConfig::in_memory()           │
//! │        │  file, WAL, N connections          │  one shared connection   │
//! │        └───────────────┬────────────────────┘                          │
//! │                        ▼                                                │
//! │              Database::new(config)                                      │
//! │                        │  open pool ──► apply migrations                │
//! │                        ▼                                                │
//! │   ┌──────────────┬──────────────┬───────────────┬────────────────┐     │
//! │   │ entity_types │   entities   │ transactions  │   analytics    │     │
//! │   └──────────────┴──────────────┴───────────────┴────────────────┘     │
//! │          repositories share the pool; each call borrows a conn         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A dashboard request runs several aggregations concurrently, so file
//! databases use WAL: readers keep going while a transaction is recorded.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::analytics::AnalyticsRepository;
use crate::repository::entity::EntityRepository;
use crate::repository::entity_type::EntityTypeRepository;
use crate::repository::transaction::TransactionRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// A file, created on first open.
    File(PathBuf),
    /// A private in-memory database, gone when the pool closes.
    Memory,
}

/// How to open the store.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/comtrack/comtrack.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,

    /// Pool size (default 5). Forced to 1 in memory.
    pub max_connections: u32,

    /// How long a query waits for a free connection (default 30s).
    pub acquire_timeout: Duration,

    /// Apply embedded migrations on open (default true).
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: DbLocation::File(path.into()),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// An empty, migrated database that lives as long as the pool. Used by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            location: DbLocation::Memory,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Opens the store as-is; the caller applies migrations.
    pub fn skip_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.location {
            DbLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            DbLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?,
        };

        // Cascading deletes rely on this; SQLite leaves it off per connection
        Ok(options
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new().acquire_timeout(self.acquire_timeout);

        match self.location {
            DbLocation::File(_) => options
                .max_connections(self.max_connections.max(1))
                .idle_timeout(Some(Duration::from_secs(600))),
            // Every new connection to :memory: would be a fresh empty database,
            // so the single connection is never recycled.
            DbLocation::Memory => options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the commission store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let connect_options = config.connect_options()?;
        debug!(location = ?config.location, "Opening SQLite store");

        let pool = config
            .pool_options()
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            location = %describe(&config.location),
            max_connections = config.max_connections,
            "SQLite store opened"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn entity_types(&self) -> EntityTypeRepository {
        EntityTypeRepository::new(self.pool.clone())
    }

    /// Partners.
    pub fn entities(&self) -> EntityRepository {
        EntityRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    /// Conditional sums, breakdowns and landing page figures.
    ///
    /// ```rust,ignore
    /// let windows = PeriodWindows::for_date(PeriodKind::Quarter, today);
    /// let totals = db.analytics().period_totals(&windows).await?;
    /// ```
    pub fn analytics(&self) -> AnalyticsRepository {
        AnalyticsRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing SQLite store");
        self.pool.close().await;
    }

    /// `true` while `SELECT 1` succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

fn describe(location: &DbLocation) -> String {
    match location {
        DbLocation::File(path) => path.display().to_string(),
        DbLocation::Memory => ":memory:".to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (known, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert!(known > 0);
        assert_eq!(known, applied);
    }

    #[tokio::test]
    async fn test_unhealthy_after_close() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_skip_migrations_leaves_schema_empty() {
        let db = Database::new(DbConfig::in_memory().skip_migrations())
            .await
            .unwrap();

        let result = sqlx::query("SELECT COUNT(*) FROM entity_transactions")
            .execute(db.pool())
            .await;
        assert!(result.is_err());

        db.run_migrations().await.unwrap();
        assert_eq!(db.transactions().count().await.unwrap(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/comtrack-test.db")
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(2))
            .skip_migrations();

        assert_eq!(
            config.location,
            DbLocation::File(PathBuf::from("/tmp/comtrack-test.db"))
        );
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(2));
        assert!(!config.run_migrations);
        assert_eq!(DbConfig::in_memory().location, DbLocation::Memory);
    }
}
