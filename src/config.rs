//! Configuration for prefstore
//!
//! Centralized configuration with sensible defaults. Everything here is
//! applied when a store is opened; the directory itself is passed to
//! [`Store::open`](crate::Store::open).

/// Main configuration for a prefstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Name of the data file inside the store directory
    /// Internal structure:
    ///   {dir}/
    ///     ├── kvstore.sqlite       (data file)
    ///     ├── kvstore.sqlite-wal   (substrate write-ahead log)
    ///     └── kvstore.sqlite-shm   (substrate shared memory index)
    pub file_name: String,

    /// Unix permission bits for directories created on open
    pub dir_mode: u32,

    // -------------------------------------------------------------------------
    // Substrate Configuration
    // -------------------------------------------------------------------------
    /// How long a contended write waits on the substrate lock (milliseconds)
    pub busy_timeout_ms: u64,

    /// Journal mode pragma
    pub journal_mode: JournalMode,

    /// Synchronous pragma
    pub synchronous: Synchronous,

    /// Reclaim free pages on every commit
    pub auto_vacuum: bool,

    /// Upper bound for the journal file after a checkpoint (bytes)
    pub journal_size_limit: i64,

    /// Memory-mapped I/O window (bytes)
    pub mmap_size: i64,

    /// Page cache size (pages)
    pub cache_size: i64,
}

/// Journal mode of the substrate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Write-ahead logging (concurrent readers alongside one writer)
    Wal,

    /// Rollback journal, deleted after each transaction
    Delete,
}

impl JournalMode {
    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// How aggressively the substrate syncs to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synchronous {
    /// No fsync (fastest, unsafe on power loss)
    Off,

    /// fsync at checkpoints (safe in WAL mode against application crashes)
    Normal,

    /// fsync on every commit
    Full,
}

impl Synchronous {
    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_name: "kvstore.sqlite".to_string(),
            dir_mode: 0o755,
            busy_timeout_ms: 5000,
            journal_mode: JournalMode::Wal,
            synchronous: Synchronous::Normal,
            auto_vacuum: true,
            journal_size_limit: 64 * 1024 * 1024, // 64 MB
            mmap_size: 128 * 1024 * 1024,         // 128 MB
            cache_size: 2000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data file name
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    /// Set the permission bits for created directories
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.config.dir_mode = mode;
        self
    }

    /// Set the lock wait before a contended write fails (in milliseconds)
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// Set the journal mode
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.config.journal_mode = mode;
        self
    }

    /// Set the sync level
    pub fn synchronous(mut self, level: Synchronous) -> Self {
        self.config.synchronous = level;
        self
    }

    /// Enable or disable full auto-vacuum
    pub fn auto_vacuum(mut self, enabled: bool) -> Self {
        self.config.auto_vacuum = enabled;
        self
    }

    /// Set the journal size limit (in bytes)
    pub fn journal_size_limit(mut self, bytes: i64) -> Self {
        self.config.journal_size_limit = bytes;
        self
    }

    /// Set the mmap window (in bytes)
    pub fn mmap_size(mut self, bytes: i64) -> Self {
        self.config.mmap_size = bytes;
        self
    }

    /// Set the page cache size (in pages)
    pub fn cache_size(mut self, pages: i64) -> Self {
        self.config.cache_size = pages;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
