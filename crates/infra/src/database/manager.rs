//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use careline_domain::{CarelineError, DatabaseConfig, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Pool of SQLite connections
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Connection checked out of a [`SqlitePool`]
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps an [`SqlitePool`].
pub struct DbManager {
    pool: SqlitePool,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        let manager = SqliteConnectionManager::file(&path).with_init(apply_connection_pragmas);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(map_pool_error)?;

        info!(db_path = %path.display(), max_connections = pool.max_size(), "sqlite pool initialised");

        Ok(Self { pool, path })
    }

    /// Build a manager from configuration and bring the schema up to date.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let manager = Self::new(&config.path, config.pool_size)?;
        manager.run_migrations()?;
        Ok(manager)
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(map_pool_error)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and responding.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

/// Per-connection pragmas: WAL journal, foreign keys and a busy timeout.
fn apply_connection_pragmas(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA wal_autocheckpoint=1000;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;",
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER) * 1000)",
        params![SCHEMA_VERSION],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> CarelineError {
    CarelineError::from(InfraError::from(err))
}

fn map_pool_error(err: r2d2::Error) -> CarelineError {
    CarelineError::from(InfraError::from(err))
}
