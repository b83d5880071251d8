//! # prefstore
//!
//! An embedded key-value store that layers a current value over an
//! optional default value per key:
//! - Reads fall back from the current value to the default
//! - Atomic revert of a key to its default
//! - Atomic batch set and batch delete
//! - Generic values, including user types registered with the codec
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │        (get / set / set_default / revert / info / ...)      │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//!  ┌───────────┐         ┌─────────────┐         ┌─────────────┐
//!  │ Lifecycle │         │    Codec    │         │    Batch    │
//!  │ (atomic)  │         │  (bincode)  │         │(transaction)│
//!  └───────────┘         └─────────────┘         └──────┬──────┘
//!                                                       │
//!                        ┌──────────────────────────────▼──────┐
//!                        │          Storage (record table)     │
//!                        │               SQLite                │
//!                        └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use prefstore::{KeyInfo, Store};
//!
//! # fn main() -> prefstore::Result<()> {
//! let store = Store::new();
//! store.open("./prefs")?;
//!
//! store.set_default("theme", "light", &KeyInfo::new("UI color theme", "appearance"))?;
//! store.set("theme", "dark")?;
//! assert_eq!(store.get("theme")?.as_str(), Some("dark"));
//!
//! store.revert("theme")?;
//! assert_eq!(store.get("theme")?.as_str(), Some("light"));
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod lifecycle;
pub mod codec;
pub mod storage;
pub mod batch;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use codec::{Codec, CustomValue, Value};
pub use lifecycle::State;
pub use storage::KeyInfo;
pub use store::{KeyValueStore, ScanFailure, ScanResult, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of prefstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
