//! Single-flight 401/403 recovery
//!
//! Any protected endpoint answering 401/403 means the session is unusable.
//! Recovery clears the persistence layer, remembers where the user was, and
//! hard-navigates to the application root so the bootstrap orchestrator runs
//! again from a clean slate. When several in-flight requests fail in the same
//! tick, exactly one recovery sequence executes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::ports::Navigator;
use super::redirect::RedirectMemory;
use super::session_store::SessionStore;
use super::verifier_store::VerifierStore;

/// Single-flight guard for the recovery sequence
///
/// Owned by the [`RecoveryCoordinator`] and injected where the HTTP response
/// stage is built, rather than living as a module-level global. Intentionally
/// never reset: the only exit from the guarded sequence is a full navigation,
/// which discards all in-memory state including this flag.
#[derive(Debug, Default)]
pub struct RecoveryGuard {
    active: AtomicBool,
}

impl RecoveryGuard {
    /// Create an inactive guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to begin the guarded sequence. Returns `false` when another
    /// failure already holds the guard.
    pub fn begin(&self) -> bool {
        !self.active.swap(true, Ordering::SeqCst)
    }

    /// Whether a recovery sequence has begun on this page load.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// What the coordinator did with a rejected response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// This failure initiated the recovery sequence.
    Initiated,
    /// Another in-flight failure is already handling recovery; this one was
    /// swallowed.
    AlreadyInFlight,
}

/// Coordinates the logout-and-redirect sequence after an auth rejection
pub struct RecoveryCoordinator {
    guard: RecoveryGuard,
    sessions: Arc<SessionStore>,
    verifiers: Arc<VerifierStore>,
    redirect: RedirectMemory,
    navigator: Arc<dyn Navigator>,
    root_url: String,
}

impl RecoveryCoordinator {
    /// Create a coordinator with a fresh guard.
    ///
    /// `root_url` is the application entry point the hard navigation targets,
    /// e.g. `https://admin.example.com/`.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        verifiers: Arc<VerifierStore>,
        redirect: RedirectMemory,
        navigator: Arc<dyn Navigator>,
        root_url: String,
    ) -> Self {
        Self { guard: RecoveryGuard::new(), sessions, verifiers, redirect, navigator, root_url }
    }

    /// Handle a 401/403 from a protected endpoint.
    ///
    /// Under the single-flight guard: remember the current location (unless
    /// the user is already on the entry page), clear the session and verifier
    /// copies, then hard-navigate to the application root. Clearing is
    /// best-effort; the navigation happens regardless, because a clean page
    /// load is the recovery primitive.
    pub fn on_auth_rejected(&self) -> RecoveryAction {
        if !self.guard.begin() {
            debug!("auth rejection swallowed, recovery already in flight");
            return RecoveryAction::AlreadyInFlight;
        }

        info!("auth rejected, starting session recovery");

        let location = self.navigator.current_url();
        match relative_part(&location) {
            Some(target) if !is_entry_page(&target) => {
                if let Err(e) = self.redirect.remember(&target) {
                    warn!(error = %e, "failed to remember redirect target");
                }
            }
            _ => debug!("already on the entry page, no redirect target to remember"),
        }

        self.sessions.clear();
        self.verifiers.clear();

        self.navigator.assign(&self.root_url);
        RecoveryAction::Initiated
    }

    /// Whether this coordinator already ran its sequence.
    #[must_use]
    pub fn is_recovering(&self) -> bool {
        self.guard.is_active()
    }
}

/// Path + query + fragment of an absolute URL, or `None` if it does not
/// parse.
fn relative_part(absolute: &str) -> Option<String> {
    let url = Url::parse(absolute).ok()?;

    let mut relative = url.path().to_string();
    if let Some(query) = url.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }
    Some(relative)
}

/// The login/root pages are the entry point already; resuming there after
/// reauthentication would be a no-op.
fn is_entry_page(relative: &str) -> bool {
    let path = relative.split(['?', '#']).next().unwrap_or(relative);
    path.is_empty() || path == "/" || path == "/login"
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::recovery.
    use helmgate_common::storage::{MemoryStorage, StorageProvider};
    use helmgate_domain::keys;

    use super::*;
    use crate::testing::RecordingNavigator;

    fn coordinator_at(url: &str) -> (MemoryStorage, Arc<RecordingNavigator>, RecoveryCoordinator) {
        let storage = MemoryStorage::new();
        let shared: Arc<dyn helmgate_common::storage::StorageProvider> =
            Arc::new(storage.clone());
        let navigator = Arc::new(RecordingNavigator::new(url));

        let coordinator = RecoveryCoordinator::new(
            Arc::new(SessionStore::new(shared.clone())),
            Arc::new(VerifierStore::new(shared.clone())),
            RedirectMemory::new(shared),
            navigator.clone(),
            "https://admin.example.com/".to_string(),
        );

        (storage, navigator, coordinator)
    }

    #[test]
    fn guard_begins_once() {
        let guard = RecoveryGuard::new();
        assert!(!guard.is_active());

        assert!(guard.begin());
        assert!(guard.is_active());
        // Never reset on this page load
        assert!(!guard.begin());
    }

    #[test]
    fn recovery_remembers_location_and_navigates_to_root() {
        let (storage, navigator, coordinator) =
            coordinator_at("https://admin.example.com/messages/42?tab=drafts");

        storage.set(keys::TOKEN, "stale").unwrap();

        assert_eq!(coordinator.on_auth_rejected(), RecoveryAction::Initiated);

        assert_eq!(
            storage.get(keys::REDIRECT_AFTER_REAUTH),
            Some("/messages/42?tab=drafts".to_string())
        );
        // Session keys are gone and the hard navigation targets the root
        assert!(storage.get(keys::TOKEN).is_none());
        assert_eq!(navigator.assigned(), vec!["https://admin.example.com/".to_string()]);
    }

    #[test]
    fn second_rejection_is_swallowed() {
        let (_storage, navigator, coordinator) =
            coordinator_at("https://admin.example.com/messages/42");

        assert_eq!(coordinator.on_auth_rejected(), RecoveryAction::Initiated);
        assert_eq!(coordinator.on_auth_rejected(), RecoveryAction::AlreadyInFlight);
        assert_eq!(coordinator.on_auth_rejected(), RecoveryAction::AlreadyInFlight);

        // Exactly one hard navigation despite three failures
        assert_eq!(navigator.assigned().len(), 1);
    }

    #[test]
    fn entry_page_location_is_not_remembered() {
        let (storage, _navigator, coordinator) = coordinator_at("https://admin.example.com/");

        coordinator.on_auth_rejected();
        assert!(storage.get(keys::REDIRECT_AFTER_REAUTH).is_none());

        let (storage, _navigator, coordinator) =
            coordinator_at("https://admin.example.com/login?expired=1");
        coordinator.on_auth_rejected();
        assert!(storage.get(keys::REDIRECT_AFTER_REAUTH).is_none());
    }

    #[test]
    fn relative_part_keeps_query_and_fragment() {
        assert_eq!(
            relative_part("https://a.example.com/x/y?q=1#frag"),
            Some("/x/y?q=1#frag".to_string())
        );
        assert_eq!(relative_part("not a url"), None);
    }
}
