//! Token/user persistence layer
//!
//! The single source of truth for "is there a usable session": written by
//! login, read on boot, cleared on logout and on 401/403 recovery. The access
//! token is mirrored into a shared bearer slot that the HTTP request stage
//! reads on every outgoing request, so the in-memory credential and durable
//! storage never disagree beyond a single synchronous update.

use std::sync::Arc;

use helmgate_common::storage::StorageProvider;
use helmgate_domain::{keys, AuthError, Session, UserProfile};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Shared slot holding the current bearer token
///
/// This is the request interceptor's view of the session: cloned into the
/// HTTP client at construction time and updated by the persistence layer on
/// every session change. The equivalent of mutating the HTTP client's default
/// authorization header, without the hidden global.
#[derive(Debug, Clone, Default)]
pub struct BearerSlot {
    token: Arc<RwLock<Option<String>>>,
}

impl BearerSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current bearer token, if a session is active.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

/// Persistence layer for the authenticated session
///
/// Sole owner of the [`Session`]: everything else reads through it or clears
/// through it.
pub struct SessionStore {
    storage: Arc<dyn StorageProvider>,
    current: RwLock<Option<Session>>,
    bearer: BearerSlot,
}

impl SessionStore {
    /// Create a store over the given durable storage.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage, current: RwLock::new(None), bearer: BearerSlot::new() }
    }

    /// The bearer slot the HTTP request stage reads. Clone it into the API
    /// client at construction time.
    #[must_use]
    pub fn bearer(&self) -> BearerSlot {
        self.bearer.clone()
    }

    /// Whether a session is currently active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// The current session, if any.
    #[must_use]
    pub fn get_session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Install a new session: durable keys, in-memory copy, and bearer slot
    /// as one logical update.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] if the durable write failed; the
    /// in-memory state is left unchanged in that case.
    pub fn set_session(&self, session: &Session) -> Result<(), AuthError> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let store = |key: &str, value: &str| {
            self.storage.set(key, value).map_err(|e| AuthError::Storage(e.to_string()))
        };

        store(keys::TOKEN, &session.access_token)?;
        store(keys::USER, &user_json)?;
        store(keys::EXPIRES_IN, &session.expires_in.to_string())?;
        store(keys::TOKEN_TYPE, &session.token_type)?;
        match &session.refresh_token {
            Some(refresh) => store(keys::REFRESH_TOKEN, refresh)?,
            None => {
                let _ = self.storage.remove(keys::REFRESH_TOKEN);
            }
        }

        self.bearer.set(&session.access_token);
        *self.current.write() = Some(session.clone());

        info!(user = %session.user.username, "session persisted");
        Ok(())
    }

    /// Replace the stored user profile, keeping tokens untouched.
    ///
    /// # Errors
    /// Returns [`AuthError::NotAuthenticated`] without an active session and
    /// [`AuthError::Storage`] if the durable write failed.
    pub fn update_user(&self, user: &UserProfile) -> Result<(), AuthError> {
        let mut current = self.current.write();
        let session = current.as_mut().ok_or(AuthError::NotAuthenticated)?;

        let user_json =
            serde_json::to_string(user).map_err(|e| AuthError::Storage(e.to_string()))?;
        self.storage
            .set(keys::USER, &user_json)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        session.user = user.clone();
        Ok(())
    }

    /// Rebuild a session purely from durable storage, without any network
    /// call. Used on boot so a previously-established session costs no round
    /// trip.
    ///
    /// Returns `None` when storage holds no usable token+user pair; a
    /// malformed user blob counts as unusable (logged, not fatal).
    pub fn restore_from_storage(&self) -> Option<Session> {
        let access_token = self
            .storage
            .get(keys::TOKEN)
            .or_else(|| self.storage.get(keys::LEGACY_ACCESS_TOKEN))?;
        let user_json = self.storage.get(keys::USER)?;

        let user: UserProfile = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "stored user profile malformed, ignoring stored session");
                return None;
            }
        };

        let expires_in = self
            .storage
            .get(keys::EXPIRES_IN)
            .and_then(|raw| raw.parse::<i64>().ok())
            .unwrap_or(0);
        let token_type =
            self.storage.get(keys::TOKEN_TYPE).unwrap_or_else(|| "Bearer".to_string());
        let refresh_token = self.storage.get(keys::REFRESH_TOKEN);

        let session = Session::new(access_token, refresh_token, expires_in, token_type, user);

        debug!(
            user = %session.user.username,
            expires_in = session.expires_in,
            "session restored from storage"
        );

        self.bearer.set(&session.access_token);
        *self.current.write() = Some(session.clone());

        Some(session)
    }

    /// Destroy the session: durable keys, in-memory copy, and bearer slot.
    ///
    /// Best-effort on the durable side; a failed removal is logged and the
    /// in-memory state is cleared regardless, because recovery must proceed
    /// to the hard navigation either way.
    pub fn clear(&self) {
        for key in [
            keys::TOKEN,
            keys::LEGACY_ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::USER,
            keys::EXPIRES_IN,
            keys::TOKEN_TYPE,
        ] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to remove session key");
            }
        }

        self.bearer.clear();
        *self.current.write() = None;

        info!("session cleared");
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::session_store.
    use std::collections::BTreeSet;

    use helmgate_common::storage::MemoryStorage;

    use super::*;

    fn sample_user() -> UserProfile {
        UserProfile {
            full_name: "Ada Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            roles: BTreeSet::from(["admin".to_string()]),
        }
    }

    fn sample_session() -> Session {
        Session::new(
            "access-1".to_string(),
            Some("refresh-1".to_string()),
            3600,
            "Bearer".to_string(),
            sample_user(),
        )
    }

    fn store() -> (MemoryStorage, SessionStore) {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(Arc::new(storage.clone()));
        (storage, store)
    }

    #[test]
    fn set_session_writes_keys_and_bearer() {
        let (storage, store) = store();
        let bearer = store.bearer();

        store.set_session(&sample_session()).unwrap();

        assert_eq!(storage.get(keys::TOKEN), Some("access-1".to_string()));
        assert_eq!(storage.get(keys::REFRESH_TOKEN), Some("refresh-1".to_string()));
        assert!(storage.get(keys::USER).unwrap().contains("ada"));
        assert_eq!(storage.get(keys::EXPIRES_IN), Some("3600".to_string()));
        assert_eq!(storage.get(keys::TOKEN_TYPE), Some("Bearer".to_string()));
        assert_eq!(bearer.current(), Some("access-1".to_string()));
        assert!(store.is_authenticated());
    }

    #[test]
    fn restore_rebuilds_session_without_network() {
        let (storage, store) = store();
        store.set_session(&sample_session()).unwrap();

        // A fresh store over the same storage simulates the next boot
        let rebooted = SessionStore::new(Arc::new(storage));
        let restored = rebooted.restore_from_storage().unwrap();

        assert_eq!(restored.access_token, "access-1");
        assert_eq!(restored.user.username, "ada");
        assert_eq!(restored.refresh_token, Some("refresh-1".to_string()));
        assert_eq!(rebooted.bearer().current(), Some("access-1".to_string()));
    }

    #[test]
    fn restore_honors_legacy_access_token_alias() {
        let (storage, store) = store();

        storage.set(keys::LEGACY_ACCESS_TOKEN, "legacy-token").unwrap();
        storage
            .set(keys::USER, &serde_json::to_string(&sample_user()).unwrap())
            .unwrap();

        let restored = store.restore_from_storage().unwrap();
        assert_eq!(restored.access_token, "legacy-token");
        // Absent metadata falls back to defaults
        assert_eq!(restored.token_type, "Bearer");
        assert_eq!(restored.expires_in, 0);
    }

    #[test]
    fn restore_requires_both_token_and_user() {
        let (storage, store) = store();

        storage.set(keys::TOKEN, "token-only").unwrap();
        assert!(store.restore_from_storage().is_none());
        assert!(store.bearer().current().is_none());
    }

    #[test]
    fn restore_rejects_malformed_user_blob() {
        let (storage, store) = store();

        storage.set(keys::TOKEN, "token").unwrap();
        storage.set(keys::USER, "{ not json").unwrap();

        assert!(store.restore_from_storage().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn clear_removes_everything() {
        let (storage, store) = store();
        let bearer = store.bearer();
        store.set_session(&sample_session()).unwrap();

        store.clear();

        assert!(storage.get(keys::TOKEN).is_none());
        assert!(storage.get(keys::USER).is_none());
        assert!(storage.get(keys::REFRESH_TOKEN).is_none());
        assert!(bearer.current().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn update_user_replaces_profile_only() {
        let (storage, store) = store();
        store.set_session(&sample_session()).unwrap();

        let mut updated = sample_user();
        updated.full_name = "Ada King".to_string();
        store.update_user(&updated).unwrap();

        assert!(storage.get(keys::USER).unwrap().contains("Ada King"));
        assert_eq!(store.get_session().unwrap().user.full_name, "Ada King");
        assert_eq!(store.get_session().unwrap().access_token, "access-1");
    }

    #[test]
    fn update_user_without_session_fails() {
        let (_storage, store) = store();

        let result = store.update_user(&sample_user());
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn session_without_refresh_token_clears_stale_key() {
        let (storage, store) = store();
        store.set_session(&sample_session()).unwrap();

        let mut no_refresh = sample_session();
        no_refresh.refresh_token = None;
        store.set_session(&no_refresh).unwrap();

        assert!(storage.get(keys::REFRESH_TOKEN).is_none());
    }
}
