//! PKCE verifier preservation across the IdP round-trip
//!
//! The authorization flow navigates away from the application to the IdP's
//! login page and back, which is a full page load: the verifier cannot live
//! in memory. It is written to durable storage immediately before the
//! redirect and read back (then destroyed) when the callback returns.

use std::sync::Arc;

use helmgate_common::storage::StorageProvider;
use helmgate_domain::{keys, AuthError};
use tracing::{debug, warn};

/// Read-only scan of a foreign OAuth library's storage for a verifier
///
/// Some IdP client libraries persist the PKCE verifier themselves under their
/// own keys and occasionally scrub ours. Scanning their storage format is a
/// fragile coupling, so it is isolated behind this trait: one implementation
/// per library, consulted only after all of our own keys came up empty.
///
/// Implementations must not mutate storage.
pub trait ExternalPkceStorageAdapter: Send + Sync {
    /// Name of the library this adapter understands, for logging.
    fn library(&self) -> &'static str;

    /// Scan for a verifier left behind by the library.
    fn scan(&self, storage: &dyn StorageProvider) -> Option<String>;
}

/// Adapter for the Keycloak JS client's callback blobs
///
/// The Keycloak adapter stores per-login state under `kc-callback-{state}`
/// keys as JSON objects carrying a `pkceCodeVerifier` field.
pub struct KeycloakCallbackAdapter;

impl ExternalPkceStorageAdapter for KeycloakCallbackAdapter {
    fn library(&self) -> &'static str {
        "keycloak-js"
    }

    fn scan(&self, storage: &dyn StorageProvider) -> Option<String> {
        for key in storage.keys() {
            if !key.starts_with("kc-callback-") {
                continue;
            }

            let Some(raw) = storage.get(&key) else { continue };
            let Ok(blob) = serde_json::from_str::<serde_json::Value>(&raw) else {
                continue;
            };

            if let Some(verifier) = blob.get("pkceCodeVerifier").and_then(|v| v.as_str()) {
                return Some(verifier.to_string());
            }
        }

        None
    }
}

/// Preservation store for the PKCE verifier
///
/// Writes two copies before the redirect (the primary key and a secondary
/// copy in case an underlying library scrubs the primary on return) and
/// resolves the verifier through a fixed fallback chain on retrieval.
pub struct VerifierStore {
    storage: Arc<dyn StorageProvider>,
    adapters: Vec<Arc<dyn ExternalPkceStorageAdapter>>,
}

impl VerifierStore {
    /// Create a store with the built-in Keycloak adapter registered.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self::with_adapters(storage, vec![Arc::new(KeycloakCallbackAdapter)])
    }

    /// Create a store with an explicit adapter list.
    #[must_use]
    pub fn with_adapters(
        storage: Arc<dyn StorageProvider>,
        adapters: Vec<Arc<dyn ExternalPkceStorageAdapter>>,
    ) -> Self {
        Self { storage, adapters }
    }

    /// Persist the verifier so it survives the navigation to the IdP.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] if neither copy could be written.
    pub fn persist(&self, verifier: &str) -> Result<(), AuthError> {
        self.storage
            .set(keys::PKCE_VERIFIER, verifier)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        // The copy is best-effort: losing it only narrows the fallback chain.
        if let Err(e) = self.storage.set(keys::PKCE_VERIFIER_COPY, verifier) {
            warn!(error = %e, "failed to write preserved verifier copy");
        }

        debug!("pkce verifier persisted for the IdP round-trip");
        Ok(())
    }

    /// Resolve the verifier through the fallback chain: preserved copy,
    /// primary key, legacy key names, then foreign-library adapters.
    #[must_use]
    pub fn retrieve(&self) -> Option<String> {
        if let Some(verifier) = self.storage.get(keys::PKCE_VERIFIER_COPY) {
            return Some(verifier);
        }

        if let Some(verifier) = self.storage.get(keys::PKCE_VERIFIER) {
            return Some(verifier);
        }

        for legacy_key in keys::LEGACY_PKCE_VERIFIER_KEYS {
            if let Some(verifier) = self.storage.get(legacy_key) {
                debug!(key = legacy_key, "pkce verifier found under legacy key");
                return Some(verifier);
            }
        }

        for adapter in &self.adapters {
            if let Some(verifier) = adapter.scan(self.storage.as_ref()) {
                debug!(library = adapter.library(), "pkce verifier recovered from foreign storage");
                return Some(verifier);
            }
        }

        None
    }

    /// Remove all of our verifier copies after a single use, success or
    /// failure. Foreign-library keys are left untouched.
    pub fn clear(&self) {
        for key in [keys::PKCE_VERIFIER, keys::PKCE_VERIFIER_COPY]
            .into_iter()
            .chain(keys::LEGACY_PKCE_VERIFIER_KEYS)
        {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to remove verifier copy");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::verifier_store.
    use helmgate_common::storage::MemoryStorage;

    use super::*;

    fn store() -> (MemoryStorage, VerifierStore) {
        let storage = MemoryStorage::new();
        let store = VerifierStore::new(Arc::new(storage.clone()));
        (storage, store)
    }

    #[test]
    fn persist_writes_primary_and_copy() {
        let (storage, store) = store();

        store.persist("verifier-1").unwrap();

        assert_eq!(storage.get(keys::PKCE_VERIFIER), Some("verifier-1".to_string()));
        assert_eq!(storage.get(keys::PKCE_VERIFIER_COPY), Some("verifier-1".to_string()));
    }

    #[test]
    fn retrieve_prefers_the_preserved_copy() {
        let (storage, store) = store();

        storage.set(keys::PKCE_VERIFIER, "scrubbed-later").unwrap();
        storage.set(keys::PKCE_VERIFIER_COPY, "preserved").unwrap();

        assert_eq!(store.retrieve(), Some("preserved".to_string()));
    }

    #[test]
    fn retrieve_falls_back_to_primary_when_copy_is_gone() {
        let (storage, store) = store();

        store.persist("verifier-1").unwrap();
        storage.remove(keys::PKCE_VERIFIER_COPY).unwrap();

        assert_eq!(store.retrieve(), Some("verifier-1".to_string()));
    }

    #[test]
    fn retrieve_falls_back_to_legacy_keys() {
        let (storage, store) = store();

        storage.set("pkce_verifier", "from-older-release").unwrap();

        assert_eq!(store.retrieve(), Some("from-older-release".to_string()));
    }

    #[test]
    fn retrieve_scans_keycloak_callback_blobs() {
        let (storage, store) = store();

        storage
            .set(
                "kc-callback-3f9a",
                r#"{"state":"3f9a","nonce":"n","pkceCodeVerifier":"kc-held-verifier"}"#,
            )
            .unwrap();

        assert_eq!(store.retrieve(), Some("kc-held-verifier".to_string()));
    }

    #[test]
    fn scan_ignores_unrelated_keys_and_does_not_mutate() {
        let (storage, store) = store();

        storage.set("token", "not-a-verifier").unwrap();
        storage.set("kc-callback-bad", "not json").unwrap();

        assert_eq!(store.retrieve(), None);
        // The scan is read-only: unrelated keys are untouched
        assert_eq!(storage.get("token"), Some("not-a-verifier".to_string()));
        assert_eq!(storage.get("kc-callback-bad"), Some("not json".to_string()));
    }

    #[test]
    fn clear_removes_our_copies_only() {
        let (storage, store) = store();

        store.persist("verifier-1").unwrap();
        storage.set("pkce_verifier", "legacy").unwrap();
        storage.set("kc-callback-3f9a", r#"{"pkceCodeVerifier":"foreign"}"#).unwrap();

        store.clear();

        assert_eq!(storage.get(keys::PKCE_VERIFIER), None);
        assert_eq!(storage.get(keys::PKCE_VERIFIER_COPY), None);
        assert_eq!(storage.get("pkce_verifier"), None);
        // Foreign library keys stay
        assert!(storage.get("kc-callback-3f9a").is_some());
    }

    #[test]
    fn retrieve_returns_none_on_empty_storage() {
        let (_storage, store) = store();
        assert_eq!(store.retrieve(), None);
    }
}
