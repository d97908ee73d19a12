//! Code-exchange deduplication ledger
//!
//! Authorization codes are single-use at the IdP: a second submission after
//! the first succeeded would be rejected and could trigger retry loops or
//! false logouts. The ledger removes this class of bug entirely rather than
//! relying on request cancellation.

use std::sync::Arc;

use helmgate_common::storage::StorageProvider;
use helmgate_domain::{keys, AuthError};
use tracing::{debug, warn};

/// Durable ledger of authorization codes already submitted for exchange
///
/// A code moves from unseen to attempted the instant it is selected for
/// submission, before the network call resolves, and the transition is
/// persisted synchronously. A reload racing a slow exchange therefore cannot
/// cause a second submission: the next boot finds the code in the ledger and
/// treats it as stale.
///
/// The ledger grows monotonically and is not pruned; codes are short-lived
/// and single-use at the IdP, so the set stays small in practice.
#[derive(Clone)]
pub struct AttemptedCodes {
    storage: Arc<dyn StorageProvider>,
}

impl AttemptedCodes {
    /// Create a ledger over the given durable storage.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    /// Whether `code` has already been submitted for exchange.
    #[must_use]
    pub fn has_attempted(&self, code: &str) -> bool {
        self.load().iter().any(|entry| entry == code)
    }

    /// Record `code` as attempted, persisting before returning.
    ///
    /// Idempotent: recording a code already present is a no-op. Callers must
    /// invoke this before issuing the network call (write-before-send).
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] if the ledger could not be persisted;
    /// the exchange must not proceed in that case.
    pub fn mark_attempted(&self, code: &str) -> Result<(), AuthError> {
        let mut entries = self.load();
        if entries.iter().any(|entry| entry == code) {
            debug!("authorization code already in ledger");
            return Ok(());
        }

        entries.push(code.to_string());
        let serialized = serde_json::to_string(&entries)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.storage
            .set(keys::ATTEMPTED_CODES, &serialized)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        debug!(total = entries.len(), "authorization code recorded as attempted");
        Ok(())
    }

    fn load(&self) -> Vec<String> {
        let Some(raw) = self.storage.get(keys::ATTEMPTED_CODES) else {
            return Vec::new();
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "attempted-codes ledger malformed, starting empty");
                Vec::new()
            }
        }
    }
}
