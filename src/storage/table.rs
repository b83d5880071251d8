//! Record table primitives
//!
//! Point operations on single records plus an ordered scan. Callers are
//! responsible for lifecycle checks and value encoding; this layer only
//! moves bytes.

use rusqlite::{params, Connection, OptionalExtension, Statement};

use crate::error::{Result, StoreError};

use super::{KeyInfo, ScannedRecord};

/// Set `value` for `key`, inserting the record if needed
///
/// `original` and metadata are left untouched on an existing record.
pub fn upsert_value(conn: &Connection, key: &str, bytes: &[u8]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO kv(key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )?;
    stmt.execute(params![key, bytes])?;
    Ok(())
}

/// Set the default and metadata for `key`, inserting the record if needed
///
/// `value` is left untouched on an existing record.
pub fn upsert_default(
    conn: &Connection,
    key: &str,
    bytes: &[u8],
    description: &str,
    category: &str,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO kv(key, original, description, category) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET
           original = excluded.original,
           description = excluded.description,
           category = excluded.category",
    )?;
    stmt.execute(params![key, bytes, description, category])?;
    Ok(())
}

/// Current value of `key`, if the record exists and has one
pub fn read_value(conn: &Connection, key: &str) -> Result<Option<Vec<u8>>> {
    read_blob(conn, "SELECT value FROM kv WHERE key = ?1 LIMIT 1", key)
}

/// Default value of `key`, if the record exists and has one
pub fn read_original(conn: &Connection, key: &str) -> Result<Option<Vec<u8>>> {
    read_blob(conn, "SELECT original FROM kv WHERE key = ?1 LIMIT 1", key)
}

fn read_blob(conn: &Connection, sql: &str, key: &str) -> Result<Option<Vec<u8>>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let blob: Option<Option<Vec<u8>>> = stmt
        .query_row(params![key], |row| row.get(0))
        .optional()?;
    Ok(blob.flatten())
}

/// Metadata of `key`
///
/// `None` when there is no record, the record never had metadata
/// written, or the row could not be read.
pub fn read_info(conn: &Connection, key: &str) -> Option<KeyInfo> {
    let row = conn
        .prepare_cached("SELECT description, category FROM kv WHERE key = ?1 LIMIT 1")
        .and_then(|mut stmt| {
            let row = stmt
                .query_row(params![key], |row| {
                    Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
                })
                .optional();
            row
        });

    match row {
        Ok(Some((Some(description), Some(category)))) => Some(KeyInfo {
            description,
            category,
        }),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Info lookup for {:?} failed: {}", key, e);
            None
        }
    }
}

/// Overwrite the current value of `key` with its default
///
/// Fails with `NoDefault` when the key has no record or no default; the
/// record is then left as it was. Substrate failures surface as `Storage`.
pub fn copy_original_to_value(conn: &Connection, key: &str) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE kv SET value = original WHERE key = ?1 AND original IS NOT NULL",
    )?;
    match stmt.execute(params![key])? {
        0 => Err(StoreError::NoDefault),
        _ => Ok(()),
    }
}

/// Remove the record for `key`, default and metadata included
///
/// Removing a missing key is not an error.
pub fn delete_record(conn: &Connection, key: &str) -> Result<()> {
    let mut stmt = conn.prepare_cached("DELETE FROM kv WHERE key = ?1")?;
    stmt.execute(params![key])?;
    Ok(())
}

/// Number of records in the table
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
    Ok(n as u64)
}

/// Prepared, restartable scan over all records in ascending key order
///
/// Rows are produced lazily by [`rows`](Scan::rows); calling it again
/// re-runs the query from the first key.
pub struct Scan<'conn> {
    stmt: Statement<'conn>,
    limit: i64,
}

impl<'conn> Scan<'conn> {
    /// Prepare a scan returning at most `limit` rows (`limit <= 0`: all)
    pub fn prepare(conn: &'conn Connection, limit: i64) -> Result<Self> {
        let stmt = conn.prepare(
            "SELECT key, value, original FROM kv ORDER BY key ASC LIMIT ?1",
        )?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = if limit <= 0 { -1 } else { limit };
        Ok(Self { stmt, limit })
    }

    /// Iterate the records from the start
    pub fn rows(&mut self) -> Result<impl Iterator<Item = Result<ScannedRecord>> + '_> {
        let limit = self.limit;
        let rows = self.stmt.query_map(params![limit], |row| {
            Ok(ScannedRecord {
                key: row.get(0)?,
                value: row.get(1)?,
                original: row.get(2)?,
            })
        })?;
        Ok(rows.map(|row| row.map_err(StoreError::from)))
    }
}
