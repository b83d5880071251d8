//! Store Module
//!
//! The public handle that coordinates all components.
//!
//! ## Responsibilities
//! - Gate every operation on the lifecycle state
//! - Encode and decode values through the codec
//! - Layer current values over defaults on read
//! - Route batch mutations through the transaction runner

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::batch::{self, BatchOp};
use crate::codec::{Codec, CustomData, Value};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::lifecycle::{Lifecycle, State};
use crate::storage::{schema, table, KeyInfo, Scan};

/// Operation set of a layered key-value store
///
/// Object-safe mirror of [`Store`]'s API, for callers that want to hold
/// the store behind a trait object.
pub trait KeyValueStore: Send + Sync {
    /// Open the store in directory `path`, creating it if needed
    fn open(&self, path: &Path) -> Result<()>;

    /// Close the store; a no-op when it is not open
    fn close(&self) -> Result<()>;

    /// Set the current value for `key`
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Get the current value, else the default, else `NotFound`
    fn get(&self, key: &str) -> Result<Value>;

    /// Set all pairs in one transaction
    fn set_many(&self, pairs: HashMap<String, Value>) -> Result<()>;

    /// Get up to `limit` pairs (all when `limit <= 0`)
    fn get_all(&self, limit: i64) -> Result<ScanResult>;

    /// Overwrite the current value of `key` with its default
    fn revert(&self, key: &str) -> Result<()>;

    /// Metadata for `key`, if any
    fn info(&self, key: &str) -> Option<KeyInfo>;

    /// Remove `key` with its value, default and metadata
    fn delete(&self, key: &str) -> Result<()>;

    /// Remove all `keys` in one transaction
    fn delete_many(&self, keys: &[&str]) -> Result<()>;

    /// Set the default value and metadata for `key`
    fn set_default(&self, key: &str, value: Value, info: &KeyInfo) -> Result<()>;
}

/// A key whose stored bytes could not be decoded during [`Store::get_all`]
#[derive(Debug)]
pub struct ScanFailure {
    pub key: String,
    pub error: StoreError,
}

/// Outcome of a best-effort scan
///
/// Rows that decode end up in `entries`; rows that don't are listed in
/// `failures` without aborting the scan.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub entries: HashMap<String, Value>,
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    /// True when every scanned row decoded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Embedded key-value store with per-key defaults
///
/// ## Concurrency Model
///
/// - **Lifecycle**: one atomic flag, checked first by every operation
/// - **Connection**: a single SQLite connection behind a `Mutex`; in-process
///   callers serialize here, other processes wait on the substrate's file
///   lock for up to `busy_timeout_ms`
/// - **Codec**: internal `RwLock` on the type registry
///
/// `Store` is `Send + Sync`; share it with `Arc<Store>`.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Open/closed state machine
    lifecycle: Lifecycle,

    /// Substrate connection, present while open
    conn: Mutex<Option<Connection>>,

    /// Data file path, present while open
    path: RwLock<Option<PathBuf>>,

    /// Value serializer and user type registry
    codec: Codec,
}

impl Store {
    /// Create a store that is not yet opened, with the default config
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a store that is not yet opened
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::new(),
            conn: Mutex::new(None),
            path: RwLock::new(None),
            codec: Codec::new(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the store in directory `path`
    ///
    /// On open:
    /// 1. Resolve the directory (empty path: current working directory)
    /// 2. Create it recursively if missing
    /// 3. Open the data file and apply substrate settings
    /// 4. Create the record table if it does not exist
    ///
    /// Fails with `AlreadyOpen` if the store is open.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<()> {
        let previous = self.lifecycle.begin_open()?;

        // Steps 1-3: nothing durable has happened yet, so failures roll the
        // state back to where it was.
        let (file, conn) = match self.connect(path.as_ref()) {
            Ok(opened) => opened,
            Err(e) => {
                self.lifecycle.abort_open(previous);
                return Err(e);
            }
        };

        // Step 4
        if let Err(e) = schema::initialize(&conn, &self.config) {
            tracing::error!("Failed to initialize {}: {}", file.display(), e);
            self.lifecycle.finish_open(false);
            return Err(e);
        }

        tracing::info!("Opened store at {}", file.display());
        *self.conn.lock() = Some(conn);
        *self.path.write() = Some(file);
        self.lifecycle.finish_open(true);
        Ok(())
    }

    fn connect(&self, path: &Path) -> Result<(PathBuf, Connection)> {
        let dir = if path.as_os_str().is_empty() {
            std::env::current_dir()?
        } else {
            path.to_path_buf()
        };

        if !dir.exists() {
            create_dir(&dir, self.config.dir_mode)?;
        }

        let file = dir.join(&self.config.file_name);
        let conn = schema::open_connection(&file)?;
        Ok((file, conn))
    }

    /// Close the store
    ///
    /// A no-op when the store is not open. If the substrate fails to close,
    /// the store ends up in the `Error` state and the failure is returned.
    pub fn close(&self) -> Result<()> {
        if !self.lifecycle.begin_close() {
            return Ok(());
        }

        // Waits for any in-flight operation to release the connection.
        let conn = self.conn.lock().take();
        let file = self.path.write().take();

        let Some(conn) = conn else {
            self.lifecycle.finish_close(true);
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                self.lifecycle.finish_close(true);
                if let Some(file) = file {
                    tracing::info!("Closed store at {}", file.display());
                }
                Ok(())
            }
            Err((_, e)) => {
                tracing::error!("Failed to close store: {}", e);
                self.lifecycle.finish_close(false);
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Set the current value for `key`, replacing any previous one
    ///
    /// The default and metadata of the key are not touched.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.lifecycle.ensure_open()?;
        validate_key(key)?;
        let bytes = self.codec.encode(&value.into())?;
        self.with_conn(|conn| table::upsert_value(conn, key, &bytes))
    }

    /// Set the default value and metadata for `key`
    ///
    /// The current value of the key is not touched, so a key that already
    /// has a value keeps reading that value until it is reverted.
    pub fn set_default(&self, key: &str, value: impl Into<Value>, info: &KeyInfo) -> Result<()> {
        self.lifecycle.ensure_open()?;
        validate_key(key)?;
        let bytes = self.codec.encode(&value.into())?;
        self.with_conn(|conn| {
            table::upsert_default(conn, key, &bytes, &info.description, &info.category)
        })
    }

    /// Set all pairs in one transaction
    ///
    /// Every value is encoded before the transaction starts; if any key is
    /// invalid or any value fails to encode, nothing is written.
    pub fn set_many<I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.lifecycle.ensure_open()?;

        let ops = pairs
            .into_iter()
            .map(|(key, value)| {
                let key = key.into();
                validate_key(&key)?;
                let bytes = self.codec.encode(&value.into())?;
                Ok(BatchOp::UpsertValue { key, bytes })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Setting {} keys in one batch", ops.len());
        self.with_conn(|conn| batch::run_batch(conn, ops))
    }

    /// Overwrite the current value of `key` with its default
    ///
    /// Fails with `NoDefault` if the key has no record or no default.
    pub fn revert(&self, key: &str) -> Result<()> {
        self.lifecycle.ensure_open()?;
        validate_key(key)?;
        self.with_conn(|conn| table::copy_original_to_value(conn, key))
    }

    /// Remove `key` entirely, including its default and metadata
    ///
    /// Deleting a missing key succeeds.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.lifecycle.ensure_open()?;
        validate_key(key)?;
        self.with_conn(|conn| table::delete_record(conn, key))
    }

    /// Remove all `keys` in one transaction
    pub fn delete_many<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.lifecycle.ensure_open()?;

        let ops = keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref();
                validate_key(key)?;
                Ok(BatchOp::Delete {
                    key: key.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Deleting {} keys in one batch", ops.len());
        self.with_conn(|conn| batch::run_batch(conn, ops))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the value for `key`
    ///
    /// Search order:
    /// 1. Current value
    /// 2. Default value
    ///
    /// Fails with `NotFound` if the key has neither.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.lifecycle.ensure_open()?;
        validate_key(key)?;

        let bytes = self.with_conn(|conn| match table::read_value(conn, key)? {
            Some(bytes) => Ok(Some(bytes)),
            None => table::read_original(conn, key),
        })?;

        match bytes {
            Some(bytes) => self.codec.decode(&bytes),
            None => Err(StoreError::NotFound),
        }
    }

    /// Get up to `limit` key-value pairs in ascending key order
    ///
    /// A `limit` of zero or less returns every pair. Each key resolves to
    /// its current value, else its default. Rows that fail to decode are
    /// reported in [`ScanResult::failures`] and do not stop the scan.
    pub fn get_all(&self, limit: i64) -> Result<ScanResult> {
        self.lifecycle.ensure_open()?;

        self.with_conn(|conn| {
            let mut scan = Scan::prepare(conn, limit)?;
            let mut result = ScanResult::default();

            for record in scan.rows()? {
                let record = record?;
                let Some(bytes) = record.effective() else {
                    continue;
                };
                match self.codec.decode(bytes) {
                    Ok(value) => {
                        result.entries.insert(record.key, value);
                    }
                    Err(error) => {
                        tracing::warn!("Skipping undecodable key {:?}: {}", record.key, error);
                        result.failures.push(ScanFailure {
                            key: record.key,
                            error,
                        });
                    }
                }
            }

            Ok(result)
        })
    }

    /// Metadata for `key`
    ///
    /// `None` if the store is not open, the key has no metadata, or the
    /// lookup fails; these cases are not distinguished.
    pub fn info(&self, key: &str) -> Option<KeyInfo> {
        if key.is_empty() {
            return None;
        }
        self.with_conn(|conn| Ok(table::read_info(conn, key)))
            .ok()
            .flatten()
    }

    /// Number of keys in the store
    pub fn len(&self) -> Result<u64> {
        self.lifecycle.ensure_open()?;
        self.with_conn(|conn| table::count(conn))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // =========================================================================
    // Codec
    // =========================================================================

    /// Register a user type so it can be stored as [`Value::Custom`]
    ///
    /// Must be called, with the same name, in every process that reads or
    /// writes values of that type.
    pub fn register<T>(&self, name: &str) -> Result<()>
    where
        T: CustomData + Serialize + DeserializeOwned,
    {
        self.codec.register::<T>(name)
    }

    /// The codec used for values
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the lifecycle state
    pub fn state(&self) -> State {
        self.lifecycle.state()
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.is_open()
    }

    /// Get the data file path (only while open)
    pub fn path(&self) -> Option<PathBuf> {
        self.path.read().clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` against the open connection
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        self.lifecycle.ensure_open()?;
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(StoreError::NotOpen)?;
        f(conn)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for Store {
    fn open(&self, path: &Path) -> Result<()> {
        Store::open(self, path)
    }

    fn close(&self) -> Result<()> {
        Store::close(self)
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        Store::set(self, key, value)
    }

    fn get(&self, key: &str) -> Result<Value> {
        Store::get(self, key)
    }

    fn set_many(&self, pairs: HashMap<String, Value>) -> Result<()> {
        Store::set_many(self, pairs)
    }

    fn get_all(&self, limit: i64) -> Result<ScanResult> {
        Store::get_all(self, limit)
    }

    fn revert(&self, key: &str) -> Result<()> {
        Store::revert(self, key)
    }

    fn info(&self, key: &str) -> Option<KeyInfo> {
        Store::info(self, key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        Store::delete(self, key)
    }

    fn delete_many(&self, keys: &[&str]) -> Result<()> {
        Store::delete_many(self, keys)
    }

    fn set_default(&self, key: &str, value: Value, info: &KeyInfo) -> Result<()> {
        Store::set_default(self, key, value, info)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey);
    }
    Ok(())
}

#[cfg(unix)]
fn create_dir(dir: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(mode).create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_dir(dir: &Path, _mode: u32) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}
