//! Pooled `SQLite` connections.
//!
//! Every connection handed out by the pool has already run the pragma batch
//! from [`ConnectionConfig::pragmas`]. An in-memory pool is one private
//! database per connection, so [`new_in_memory`] is only useful with a pool
//! of one.

use std::time::Duration;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of task database connections.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Connection checked out of a [`ConnectionPool`].
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning for a task database pool.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Upper bound on open connections. Zero is treated as one.
    pub pool_size: u32,
    /// How long a writer waits on a locked database before `SQLITE_BUSY`.
    pub busy_timeout_ms: u32,
    /// Page cache per connection, in KiB.
    pub cache_size_kib: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 30_000,
            cache_size_kib: 4096,
        }
    }
}

impl ConnectionConfig {
    /// Pragma batch run on every new connection.
    pub fn pragmas(&self) -> String {
        [
            "PRAGMA journal_mode = WAL;".to_string(),
            "PRAGMA synchronous = NORMAL;".to_string(),
            "PRAGMA foreign_keys = ON;".to_string(),
            format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms),
            format!("PRAGMA cache_size = -{};", self.cache_size_kib),
        ]
        .concat()
    }
}

#[derive(Debug)]
struct OnConnect(String);

impl CustomizeConnection<Connection, rusqlite::Error> for OnConnect {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&self.0)
    }
}

/// Where the pool's database lives.
#[derive(Clone, Copy, Debug)]
enum Location<'a> {
    File(&'a str),
    Memory,
}

fn open(location: Location<'_>, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let builder = Pool::builder()
        .max_size(config.pool_size.max(1))
        .connection_timeout(CHECKOUT_TIMEOUT)
        .connection_customizer(Box::new(OnConnect(config.pragmas())));

    let pool = match location {
        Location::File(path) => builder.build(SqliteConnectionManager::file(path))?,
        // The database vanishes with its last connection, so never reap it.
        Location::Memory => builder
            .idle_timeout(None)
            .max_lifetime(None)
            .build(SqliteConnectionManager::memory())?,
    };
    Ok(pool)
}

/// Pool over the database file at `path`, created if missing.
pub fn new_file(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    open(Location::File(path), config)
}

/// Pool over a private in-memory database.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    open(Location::Memory, config)
}

/// Journal mode of `conn`, lowercased by `SQLite` (`wal`, `memory`, ...).
pub fn journal_mode(conn: &Connection) -> Result<String> {
    Ok(conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?)
}

/// Whether `conn` enforces foreign keys.
pub fn foreign_keys_enabled(conn: &Connection) -> Result<bool> {
    let on: i64 = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
    Ok(on == 1)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragma_batch_carries_config() {
        let config = ConnectionConfig {
            busy_timeout_ms: 250,
            cache_size_kib: 64,
            ..Default::default()
        };
        let batch = config.pragmas();
        assert!(batch.contains("busy_timeout = 250;"));
        assert!(batch.contains("cache_size = -64;"));
        assert!(batch.contains("foreign_keys = ON;"));
    }

    #[test]
    fn file_connections_are_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let pool = new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
        let conn = pool.get().unwrap();
        assert_eq!(journal_mode(&conn).unwrap(), "wal");
        assert!(foreign_keys_enabled(&conn).unwrap());
        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 30_000);
    }

    #[test]
    fn memory_connections_enforce_foreign_keys() {
        let config = ConnectionConfig {
            pool_size: 0,
            ..Default::default()
        };
        let pool = new_in_memory(&config).unwrap();
        assert_eq!(pool.max_size(), 1);
        let conn = pool.get().unwrap();
        assert_eq!(journal_mode(&conn).unwrap(), "memory");
        assert!(foreign_keys_enabled(&conn).unwrap());
    }
}
