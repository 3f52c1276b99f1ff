//! SQLite pool setup for the catalog store.
//!
//! File databases run in WAL mode. A `:memory:` database exists only as long
//! as its connection, so it is served by exactly one connection that the pool
//! never retires. Foreign keys are always enforced, and the embedded
//! migrations run before the pool is returned.
//!
//! ```rust,ignore
//! let pool = core_library::db::create_pool(DatabaseConfig::new("catalog.db")).await?;
//! let repo = SqliteTrackRepository::new(pool);
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const MEMORY_URL: &str = "sqlite::memory:";

/// Where the catalog lives and how many connections may reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `sqlite:<path>` or `sqlite::memory:`
    pub database_url: String,
    pub max_connections: u32,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Catalog stored in the file at `path`, created on first use
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}", path.as_ref().display()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Throwaway catalog held in memory
    pub fn in_memory() -> Self {
        Self {
            database_url: MEMORY_URL.to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }

    /// Rejects settings the pool cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(invalid_config("max_connections must be at least 1"));
        }
        if self.is_in_memory() && self.max_connections != 1 {
            return Err(invalid_config(
                "an in-memory catalog must use exactly one connection",
            ));
        }
        Ok(())
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&self.database_url)?
            .foreign_keys(true)
            .create_if_missing(true);

        Ok(if self.is_in_memory() {
            options
        } else {
            options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        })
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.idle_timeout(Duration::from_secs(600))
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn invalid_config(message: &str) -> LibraryError {
    LibraryError::InvalidInput {
        field: "database_config".to_string(),
        message: message.to_string(),
    }
}

/// Opens the catalog and brings its schema up to date
///
/// # Errors
/// `InvalidInput` for an unusable configuration, `Database` when the store
/// cannot be opened, `Migration` when the schema cannot be applied.
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    config.validate()?;
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening catalog database"
    );

    let pool = config
        .pool_options()
        .connect_with(config.connect_options()?)
        .await
        .map_err(|e| {
            warn!(error = %e, database_url = %config.database_url, "Cannot open catalog database");
            LibraryError::Database(e)
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        warn!(error = %e, "Schema migration failed");
        LibraryError::Migration(e.to_string())
    })?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    debug!(connections = pool.size(), "Catalog database ready");

    Ok(pool)
}

/// Fresh in-memory catalog with the schema applied
pub async fn create_test_pool() -> Result<SqlitePool> {
    create_pool(DatabaseConfig::in_memory()).await
}

/// Seeds an album row so tracks can reference it.
///
/// Albums have no repository; tests and fixtures write them directly.
pub async fn insert_test_album(pool: &SqlitePool, id: i64, name: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO albums (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}
