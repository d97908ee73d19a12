//! Key-value storage providers
//!
//! The browser's persistent storage is an external collaborator of the auth
//! subsystem; this module models it at its interface: a synchronous
//! string-to-string store addressed by documented key names.
//!
//! Two implementations:
//! - [`FileStorage`]: durable, survives restarts, flushed synchronously on
//!   every mutation (the deduplicator's write-before-send ordering depends on
//!   that)
//! - [`MemoryStorage`]: volatile, scoped to the process, also the unit-test
//!   double
//!
//! Writers use fixed, namespaced keys; reading another component's keys is
//! allowed only through the documented verifier-preservation fallbacks, which
//! is why [`StorageProvider::keys`] exists as a read-only scan.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Synchronous key-value storage
///
/// Reads are infallible (a missing key is `None`); mutations surface their
/// failure so callers that depend on durability ordering can refuse to
/// proceed.
pub trait StorageProvider: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`, persisting before returning.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` and its value, persisting before returning.
    ///
    /// Removing an absent key is a no-op.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Snapshot of all key names, for the documented read-only fallback
    /// scans.
    fn keys(&self) -> Vec<String>;
}
