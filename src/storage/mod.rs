//! Storage Module
//!
//! Durable record table on top of SQLite.
//!
//! ## Responsibilities
//! - Open the data file and tune the substrate (journal, sync, locking)
//! - Create the record table idempotently
//! - Point lookups, upserts, deletes and ordered scans over records
//!
//! ## Table Layout
//! ```text
//! kv
//! ┌──────────────┬──────────┬───────────┬──────────────┬───────────┐
//! │ key (PK)     │ value    │ original  │ description  │ category  │
//! │ TEXT NOT NULL│ BLOB?    │ BLOB?     │ TEXT?        │ TEXT?     │
//! └──────────────┴──────────┴───────────┴──────────────┴───────────┘
//! ```
//! `value` is the encoded current value, `original` the encoded default.
//! Either may be NULL independently.
//!
//! Every function here takes a plain `&Connection`, so the same code runs
//! standalone or inside a [`rusqlite::Transaction`] (which derefs to one).

mod record;
pub mod schema;
pub mod table;

pub use record::{KeyInfo, ScannedRecord};
pub use table::Scan;
