//! Redirect-target memory
//!
//! When a 401/403 forces reauthentication, the page the user was on is
//! remembered so navigation can resume there once the session is
//! re-established.

use std::sync::Arc;

use helmgate_common::storage::StorageProvider;
use helmgate_domain::{keys, AuthError};
use tracing::{debug, warn};

/// Durable memory of the page to resume after reauthentication
///
/// Set at most once per reauthentication episode (the first failing request
/// wins; later failures in the same storm see the slot occupied) and cleared
/// immediately after being consumed by a successful navigation.
#[derive(Clone)]
pub struct RedirectMemory {
    storage: Arc<dyn StorageProvider>,
}

impl RedirectMemory {
    /// Create a memory over the given durable storage.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    /// Remember `target` unless a target is already stored.
    ///
    /// Returns `true` when the target was written, `false` when an earlier
    /// episode already claimed the slot.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] if the write failed.
    pub fn remember(&self, target: &str) -> Result<bool, AuthError> {
        if self.storage.get(keys::REDIRECT_AFTER_REAUTH).is_some() {
            debug!("redirect target already set, keeping the earlier one");
            return Ok(false);
        }

        self.storage
            .set(keys::REDIRECT_AFTER_REAUTH, target)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        debug!(target, "redirect target remembered");
        Ok(true)
    }

    /// Consume the stored target: read it and clear it.
    #[must_use]
    pub fn take(&self) -> Option<String> {
        let target = self.storage.get(keys::REDIRECT_AFTER_REAUTH)?;

        if let Err(e) = self.storage.remove(keys::REDIRECT_AFTER_REAUTH) {
            warn!(error = %e, "failed to clear consumed redirect target");
        }

        debug!(target = %target, "redirect target consumed");
        Some(target)
    }
}
