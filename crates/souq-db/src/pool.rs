//! # Ledger Database
//!
//! SQLite pool and the write transactions settlement runs in.
//!
//! ## Settling Under Contention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two checkouts for the same customer, 1000 points, 800 each             │
//! │                                                                         │
//! │  settle A ── BEGIN IMMEDIATE ── UPDATE ... RETURNING 400 ── COMMIT      │
//! │  settle B ── BEGIN IMMEDIATE ··· waits (busy_timeout) ···┐              │
//! │                                                          ▼              │
//! │                         UPDATE ... WHERE balance >= 800 → no row        │
//! │                         ROLLBACK → InsufficientPoints                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `BEGIN IMMEDIATE` takes the write lock before the balance is read, so a
//! second writer queues on `busy_timeout` instead of failing mid-transaction
//! with `SQLITE_BUSY`. Readers (balance previews, history pages) are not
//! blocked thanks to WAL.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::account::LoyaltyAccountRepository;
use crate::repository::ledger::LoyaltyLedgerRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Ledger database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/souq/loyalty.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Pool size. Default: 5
    pub max_connections: u32,

    /// How long a settlement waits for another settlement's write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// How long a caller waits for a free pooled connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Apply embedded migrations on connect. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Private in-memory ledger for tests.
    ///
    /// One connection that is never recycled: the database lives exactly as
    /// long as that connection.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
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

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        Ok(options
            .busy_timeout(self.busy_timeout)
            // Ledger rows reference their account
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the points ledger. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening loyalty ledger"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Balances and manual credits.
    pub fn accounts(&self) -> LoyaltyAccountRepository {
        LoyaltyAccountRepository::new(self.pool.clone())
    }

    /// Order settlement and transaction history.
    pub fn ledger(&self) -> LoyaltyLedgerRepository {
        LoyaltyLedgerRepository::new(self.pool.clone())
    }

    /// Closes the pool; later operations fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing loyalty ledger");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Write Transactions
// =============================================================================

/// A pooled connection holding SQLite's write lock.
///
/// Finish with [`commit`](Self::commit) or [`rollback`](Self::rollback).
/// Dropped unfinished (e.g. a cancelled checkout), the connection is closed
/// rather than returned to the pool, and SQLite discards the open
/// transaction.
pub(crate) struct WriteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTransaction {
    /// Acquires a connection and starts an immediate transaction, waiting up
    /// to `busy_timeout` for a concurrent writer.
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        debug!("Write transaction started");

        Ok(WriteTransaction { conn: Some(conn) })
    }

    pub(crate) fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| DbError::Internal("write transaction already finished".to_string()))
    }

    pub(crate) async fn commit(mut self) -> DbResult<()> {
        let Some(mut conn) = self.conn.take() else {
            return Err(DbError::Internal(
                "write transaction already finished".to_string(),
            ));
        };

        if let Err(err) = sqlx::query("COMMIT").execute(&mut *conn).await {
            roll_back(conn).await;
            return Err(err.into());
        }
        Ok(())
    }

    pub(crate) async fn rollback(mut self) {
        if let Some(conn) = self.conn.take() {
            roll_back(conn).await;
        }
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("Write transaction dropped unfinished, closing its connection");
            drop(conn.detach());
        }
    }
}

async fn roll_back(mut conn: PoolConnection<Sqlite>) {
    if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        warn!(error = %err, "Rollback failed, closing connection");
        drop(conn.detach());
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
