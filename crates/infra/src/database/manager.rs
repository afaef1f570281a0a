//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use innoverse_domain::{ClientError, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::{info, warn};

use crate::errors::into_client_error;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps an r2d2 pool.
#[derive(Debug)]
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: Option<PathBuf>,
}

impl DbManager {
    /// Open (creating if needed) the database file at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                ClientError::Storage(format!(
                    "unable to create database directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL;\nPRAGMA synchronous=NORMAL;")?;
            conn.busy_timeout(BUSY_TIMEOUT)
        });

        let db = Self::build(manager, pool_size.max(1), Some(path))?;
        info!(
            db_path = ?db.path,
            max_connections = db.pool.max_size(),
            "sqlite pool initialised"
        );
        Ok(db)
    }

    /// Private in-memory database; a single connection so every caller
    /// sees the same data.
    pub fn in_memory() -> Result<Self> {
        Self::build(SqliteConnectionManager::memory(), 1, None)
    }

    fn build(
        manager: SqliteConnectionManager,
        max_size: u32,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut builder =
            Pool::builder().max_size(max_size).connection_timeout(CONNECTION_TIMEOUT);
        if path.is_none() {
            // Recycling the only connection would drop an in-memory database
            builder = builder.max_lifetime(None).idle_timeout(None);
        }

        let pool = builder
            .build(manager)
            .map_err(|err| {
                warn!(error = %err, "failed to create connection pool");
                into_client_error(err)
            })?;

        let db = Self { pool, path };
        db.run_migrations()?;
        Ok(db)
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(into_client_error)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(into_client_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(into_client_error)?;
        Ok(())
    }

    /// Database file, or `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Verify the database is reachable and answering queries.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(into_client_error)?;
        Ok(())
    }
}
