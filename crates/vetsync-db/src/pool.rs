//! # Store Connection
//!
//! Opens the local SQLite mirror and hands out write sessions.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DbConfig::new("vetsync.db")                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config) ── file missing? created                         │
//! │       │                ── directory missing / locked? ConnectionFailed  │
//! │       │                   (the sync run cannot start)                   │
//! │       ▼                                                                 │
//! │  embedded migrations (001_initial_schema.sql)                           │
//! │       │                                                                 │
//! │       ├──► session()  ── StoreSession: batched writes of one run        │
//! │       ├──► pool()     ── ad-hoc reads (row counts, inspection)          │
//! │       ▼                                                                 │
//! │  close()                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every connection enforces foreign keys; the schema relies on them to keep
//! pets attached to customers and sub-resources attached to pets. File
//! stores use WAL so `vetsync status` can read while a run is writing.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::session::StoreSession;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Store settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/vetsync/vetsync.db")
///     .max_connections(2)
///     .connect_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub path: PathBuf,

    /// Pool size. A sync run uses one connection; the rest serve reads.
    pub max_connections: u32,

    /// How long to wait for a pooled connection.
    pub connect_timeout: Duration,

    /// How long SQLite retries when another process holds the write lock.
    pub busy_timeout: Duration,

    /// Apply embedded migrations when opening.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Private in-memory store, for tests.
    ///
    /// The pool holds a single connection, so a [`StoreSession`] owns the
    /// whole database while it is open.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        Ok(options
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the local mirror.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the store and applies migrations.
    ///
    /// Any failure is reported as [`DbError::ConnectionFailed`] or
    /// [`DbError::MigrationFailed`]; callers treat both as "store unavailable".
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.path.display(), "Opening local store");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Store pool ready");

        let db = Database { pool };

        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }

        Ok(db)
    }

    /// Pool for reads outside a session.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a batched write session.
    pub fn session(&self) -> StoreSession {
        StoreSession::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing local store");
        self.pool.close().await;
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('customers', 'pets', 'vaccines', 'grooming_services', 'appointments')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, 5);
    }

    #[tokio::test]
    async fn test_file_store_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(db.health_check().await);
        assert!(path.exists());

        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let orphan = sqlx::query(
            "INSERT INTO pets (id, customer_id, name, species) VALUES (1, 42, 'Rex', 'Cão')",
        )
        .execute(db.pool())
        .await
        .map_err(DbError::from);
        assert!(matches!(orphan, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_missing_directory_fails_to_connect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("mirror.db");

        let result =
            Database::new(DbConfig::new(path).connect_timeout(Duration::from_secs(2))).await;
        assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/vetsync.db")
            .max_connections(2)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
