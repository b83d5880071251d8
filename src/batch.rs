//! Transaction Runner
//!
//! Applies a batch of record mutations as one all-or-nothing unit.
//!
//! ## Guarantees
//! - Atomicity: every operation is applied, or none is
//! - Durability once `run_batch` returns `Ok`
//! - Isolation is whatever the substrate gives a default (deferred)
//!   transaction; nothing stronger is promised

use rusqlite::Connection;

use crate::error::Result;
use crate::storage::table;

/// A single mutation inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Set the current value of a key (upsert)
    UpsertValue { key: String, bytes: Vec<u8> },

    /// Remove a key entirely
    Delete { key: String },
}

impl BatchOp {
    pub fn key(&self) -> &str {
        match self {
            BatchOp::UpsertValue { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// Run `ops` in one transaction
///
/// Stops at the first failing operation and returns its error; the
/// transaction is then dropped without commit, which rolls back everything
/// applied so far.
pub fn run_batch(conn: &mut Connection, ops: Vec<BatchOp>) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    let count = ops.len();

    for op in &ops {
        match op {
            BatchOp::UpsertValue { key, bytes } => table::upsert_value(&tx, key, bytes)?,
            BatchOp::Delete { key } => table::delete_record(&tx, key)?,
        }
    }

    tx.commit()?;
    tracing::debug!("Committed batch of {} operations", count);
    Ok(())
}
