//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  LedgerConfig::load() ──► DbConfig::from_ledger_config()                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ Concurrent admin sessions                                      │
//! │       ▼                                                                 │
//! │  Readers run in parallel (WAL).                                        │
//! │  Writers queue on SQLite's single write lock (busy_timeout).           │
//! │  Every operation is cut off at operation_timeout.                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Serialization
//! Every write transaction opens with a write statement, so it takes the
//! database write lock before it reads anything it depends on. Stock checks,
//! showcase code allocation and duplicate detection therefore see every
//! previously committed write.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{LedgerConfig, LedgerSettings};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::distributor::DistributorRepository;
use crate::repository::holdings::HoldingsRepository;
use crate::repository::ledger::LedgerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::showcase::ShowcaseRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/mostruario.db")
///     .max_connections(5)
///     .operation_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    pub min_connections: u32,

    /// How long to wait for a pooled connection.
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections.
    pub idle_timeout: Option<Duration>,

    /// SQLite busy timeout on a locked database.
    pub busy_timeout: Duration,

    /// Deadline for every repository operation.
    pub operation_timeout: Duration,

    /// Whether to run migrations on connect.
    pub run_migrations: bool,

    /// Showcase code prefix and restock behavior.
    pub ledger: LedgerSettings,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_millis(5_000),
            operation_timeout: Duration::from_millis(10_000),
            run_migrations: true,
            ledger: LedgerSettings::default(),
        }
    }

    /// Builds the pool configuration from a loaded [`LedgerConfig`].
    pub fn from_ledger_config(config: &LedgerConfig) -> Self {
        DbConfig {
            database_path: config.database.path.clone(),
            max_connections: config.database.max_connections,
            min_connections: config.database.min_connections,
            connect_timeout: config.acquire_timeout(),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: config.busy_timeout(),
            operation_timeout: config.operation_timeout(),
            run_migrations: true,
            ledger: config.ledger.clone(),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn ledger_settings(mut self, ledger: LedgerSettings) -> Self {
        self.ledger = ledger;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A single connection that is never recycled, so the data lives as
    /// long as the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_millis(5_000),
            operation_timeout: Duration::from_millis(10_000),
            run_migrations: true,
            ledger: LedgerSettings::default(),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; every clone shares the pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_ledger_config(&config)).await?;
///
/// let showcase = db.showcases().create(&request).await?;
/// db.showcases().finish(&showcase.id, &returns).await?;
/// let sale = db.sales().register_sale(&sale_request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    operation_timeout: Duration,

    ledger: LedgerSettings,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    ///    - Busy timeout so writers queue instead of failing at once
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let base_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new().filename(&config.database_path)
        };

        let connect_options = base_options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            operation_timeout_ms = config.operation_timeout.as_millis() as u64,
            "Database pool created"
        );

        let db = Database {
            pool,
            operation_timeout: config.operation_timeout,
            ledger: config.ledger,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Opens a fresh, migrated in-memory database.
    pub async fn in_memory() -> DbResult<Self> {
        Database::new(DbConfig::in_memory()).await
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    pub fn ledger_settings(&self) -> &LedgerSettings {
        &self.ledger
    }

    /// Catalog: products, categories, photos.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.operation_timeout)
    }

    pub fn distributors(&self) -> DistributorRepository {
        DistributorRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Inventory ledger and stock sums.
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Showcase lifecycle: create, finish, list.
    pub fn showcases(&self) -> ShowcaseRepository {
        ShowcaseRepository::new(self.pool.clone(), self.operation_timeout, self.ledger.clone())
    }

    /// Settlement: register and edit sales.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Distributor holdings and history read-models.
    pub fn holdings(&self) -> HoldingsRepository {
        HoldingsRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Deadlines
// =============================================================================

/// Runs `fut` under `limit`.
///
/// On expiry the future is dropped, which rolls back any transaction it
/// held, and a retryable [`DbError::Timeout`] is returned.
pub(crate) async fn with_deadline<T, F>(limit: Duration, operation: &'static str, fut: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = limit.as_millis() as u64;
            warn!(operation, after_ms, "Operation timed out");
            Err(DbError::Timeout {
                operation: operation.to_string(),
                after_ms,
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
