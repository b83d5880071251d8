//! Schema and substrate setup
//!
//! Opening is idempotent: pragmas are re-applied and the table is created
//! only if missing, so an existing store opens unchanged.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::config::Config;
use crate::error::Result;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS kv(
  key TEXT PRIMARY KEY NOT NULL,
  value BLOB,
  original BLOB,
  description TEXT,
  category TEXT
);
";

/// Open (creating if needed) the data file at `path`
pub fn open_connection(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    Ok(Connection::open_with_flags(path, flags)?)
}

/// Apply pragmas from `config` and create the record table
pub fn initialize(conn: &Connection, config: &Config) -> Result<()> {
    // Bounded wait on lock contention before a write fails with SQLITE_BUSY.
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

    // auto_vacuum only takes effect before the first table exists.
    let auto_vacuum = if config.auto_vacuum { "FULL" } else { "NONE" };
    conn.pragma_update(None, "auto_vacuum", auto_vacuum)?;

    let journal_mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_sql(),
        |row| row.get(0),
    )?;
    conn.pragma_update(None, "synchronous", config.synchronous.as_sql())?;

    conn.pragma_update(None, "journal_size_limit", config.journal_size_limit)?;
    conn.pragma_update(None, "mmap_size", config.mmap_size)?;
    conn.pragma_update(None, "cache_size", config.cache_size)?;

    conn.execute_batch(CREATE_TABLE)?;

    tracing::debug!(
        "Schema ready (journal_mode={}, synchronous={}, busy_timeout={}ms)",
        journal_mode,
        config.synchronous.as_sql(),
        config.busy_timeout_ms
    );
    Ok(())
}
