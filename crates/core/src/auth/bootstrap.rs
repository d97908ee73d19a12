//! Auth bootstrap orchestrator
//!
//! The state machine run once per application load. It decides among
//! restoring a stored session, exchanging an authorization code from the
//! URL, redirecting to the IdP, or settling idle, and drives the
//! deduplication ledger, verifier store, persistence layer, and
//! redirect-target memory along the way.

use std::sync::Arc;

use helmgate_common::pkce::{PkceError, PkceMaterial};
use helmgate_common::storage::StorageProvider;
use helmgate_domain::{AuthError, CodeExchangeRequest, IdpConfig, Result, UserProfile};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

use super::ledger::AttemptedCodes;
use super::ports::{AuthGateway, Navigator};
use super::redirect::RedirectMemory;
use super::session_store::SessionStore;
use super::verifier_store::VerifierStore;

/// States of the bootstrap machine
///
/// `RedirectingToIdp` is terminal for the current page load: the hard
/// navigation it performs discards all in-memory state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Init,
    Restoring,
    Exchanging,
    RedirectingToIdp,
    Authenticated,
    Idle,
}

/// Terminal result of one bootstrap pass
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    /// A usable session is in place (restored or freshly exchanged).
    Authenticated,
    /// No session and nothing further to do on this pass. A surfaced error
    /// means the exchange failed; the UI shows a retry affordance, nothing is
    /// retried automatically.
    Idle { error: Option<AuthError> },
    /// The page is navigating to the IdP's login form.
    RedirectingToIdp { authorization_url: String },
}

/// Orchestrates the authentication bootstrap, once per application load
pub struct BootstrapService {
    gateway: Arc<dyn AuthGateway>,
    navigator: Arc<dyn Navigator>,
    sessions: Arc<SessionStore>,
    verifiers: Arc<VerifierStore>,
    ledger: AttemptedCodes,
    redirect: RedirectMemory,
    idp: IdpConfig,
    state: RwLock<BootstrapState>,
}

impl BootstrapService {
    /// Create the orchestrator over shared durable storage.
    ///
    /// `sessions` is shared with the API client (for the bearer slot) and
    /// with the recovery coordinator; the ledger, verifier store, and
    /// redirect memory are constructed here over the same storage.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        sessions: Arc<SessionStore>,
        gateway: Arc<dyn AuthGateway>,
        navigator: Arc<dyn Navigator>,
        idp: IdpConfig,
    ) -> Self {
        Self {
            gateway,
            navigator,
            sessions,
            verifiers: Arc::new(VerifierStore::new(storage.clone())),
            ledger: AttemptedCodes::new(storage.clone()),
            redirect: RedirectMemory::new(storage),
            idp,
            state: RwLock::new(BootstrapState::Init),
        }
    }

    /// The verifier store, shared with the recovery coordinator.
    #[must_use]
    pub fn verifiers(&self) -> Arc<VerifierStore> {
        self.verifiers.clone()
    }

    /// Current state of the machine.
    #[must_use]
    pub fn state(&self) -> BootstrapState {
        *self.state.read()
    }

    fn transition(&self, next: BootstrapState) {
        let mut state = self.state.write();
        debug!(from = ?*state, to = ?next, "bootstrap transition");
        *state = next;
    }

    /// Run the bootstrap pass. Call exactly once per application load.
    ///
    /// Network failures during the exchange are caught here and resolve to
    /// [`BootstrapOutcome::Idle`]; they never propagate past this boundary.
    ///
    /// # Errors
    /// Only [`AuthError::CryptoUnavailable`] is returned as an error: without
    /// secure randomness the redirect to the IdP must be aborted.
    pub async fn run(&self) -> Result<BootstrapOutcome> {
        self.transition(BootstrapState::Restoring);

        // 1. A stored session short-circuits everything, no network call.
        if let Some(session) = self.sessions.restore_from_storage() {
            info!(
                user = %session.user.username,
                expires_in = ?session.seconds_until_expiry(),
                "session restored, skipping exchange"
            );

            let url = self.navigator.current_url();
            if query_param(&url, "code").is_some() {
                // Race: a code arrived although a session was restored on
                // this same pass. The code is stale; drop it from the URL.
                debug!("stale authorization code alongside a restored session");
                self.navigator.replace(&strip_auth_params(&url));
            }

            self.transition(BootstrapState::Authenticated);
            return Ok(BootstrapOutcome::Authenticated);
        }

        // 2. No session; is there an authorization code in the URL?
        let url = self.navigator.current_url();
        if let Some(code) = query_param(&url, "code") {
            return Ok(self.consume_code(&url, &code).await);
        }

        // 3. Nothing to restore, nothing to exchange: go log in.
        self.redirect_to_idp()
    }

    /// Step 2 of the bootstrap: submit the code at most once, then settle.
    async fn consume_code(&self, url: &str, code: &str) -> BootstrapOutcome {
        if self.ledger.has_attempted(code) {
            // The earlier attempt's outcome, if any, already decided the
            // session state; this pass treats the code as a no-op.
            debug!("authorization code already attempted, ignoring");
            self.navigator.replace(&strip_auth_params(url));
            self.transition(BootstrapState::Idle);
            return BootstrapOutcome::Idle { error: None };
        }

        self.transition(BootstrapState::Exchanging);

        // Write-before-send: the attempt is recorded before the network call
        // so a reload racing a slow exchange cannot resubmit the code.
        if let Err(e) = self.ledger.mark_attempted(code) {
            error!(error = %e, "cannot record exchange attempt, refusing to submit code");
            self.navigator.replace(&strip_auth_params(url));
            self.transition(BootstrapState::Idle);
            return BootstrapOutcome::Idle { error: Some(e) };
        }

        let code_verifier = self.verifiers.retrieve();
        if code_verifier.is_none() {
            // The backend is expected to reject a verifier-less exchange
            // unless it implements a non-PKCE fallback; its verdict is
            // authoritative.
            warn!("{}", AuthError::MissingVerifier);
        }

        let request = CodeExchangeRequest {
            code: code.to_string(),
            redirect_uri: self.idp.redirect_uri.clone(),
            code_verifier,
        };

        let exchanged = self.gateway.exchange_code(request).await;

        // The verifier is single-use: destroy every copy, success or failure.
        self.verifiers.clear();

        match exchanged {
            Ok(session) => {
                if let Err(e) = self.sessions.set_session(&session) {
                    error!(error = %e, "exchange succeeded but session could not be persisted");
                    self.navigator.replace(&strip_auth_params(url));
                    self.transition(BootstrapState::Idle);
                    return BootstrapOutcome::Idle { error: Some(e) };
                }

                info!(user = %session.user.username, "code exchange completed");

                match self.redirect.take() {
                    Some(target) => self.navigator.replace(&target),
                    None => self.navigator.replace(&strip_auth_params(url)),
                }

                self.transition(BootstrapState::Authenticated);
                BootstrapOutcome::Authenticated
            }
            Err(e) => {
                error!(error = %e, "code exchange failed");
                self.navigator.replace(&strip_auth_params(url));
                self.transition(BootstrapState::Idle);
                BootstrapOutcome::Idle { error: Some(e) }
            }
        }
    }

    /// Step 3 of the bootstrap: persist fresh PKCE material and leave for the
    /// IdP. Terminal for this page load.
    fn redirect_to_idp(&self) -> Result<BootstrapOutcome> {
        let material = match PkceMaterial::generate() {
            Ok(material) => material,
            Err(PkceError::CryptoUnavailable(msg)) => {
                error!("no secure randomness source, aborting the IdP redirect");
                return Err(AuthError::CryptoUnavailable(msg));
            }
        };

        if let Err(e) = self.verifiers.persist(&material.verifier) {
            // Without a preserved verifier the exchange will run verifier-less
            // and the backend decides; that is the documented non-fatal path.
            warn!(error = %e, "verifier could not be persisted before redirect");
        }

        let authorization_url = build_authorization_url(&self.idp, &material);

        info!("redirecting to the IdP for login");
        self.transition(BootstrapState::RedirectingToIdp);
        self.navigator.assign(&authorization_url);

        Ok(BootstrapOutcome::RedirectingToIdp { authorization_url })
    }

    /// Re-fetch the signed-in user from the backend and update the stored
    /// profile. The boot path never calls this; it exists for explicit
    /// profile refreshes after administrative changes.
    ///
    /// # Errors
    /// Returns [`AuthError::NotAuthenticated`] without an active session;
    /// gateway errors pass through.
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        let session = self.sessions.get_session().ok_or(AuthError::NotAuthenticated)?;

        let user = self.gateway.fetch_profile(&session.access_token).await?;
        self.sessions.update_user(&user)?;

        debug!(user = %user.username, "profile refreshed");
        Ok(user)
    }

    /// Explicit logout: destroy the session and leave for the IdP's
    /// end-session endpoint, which redirects back to the entry page.
    pub fn logout(&self) {
        info!("logging out");

        self.sessions.clear();
        self.verifiers.clear();

        let url = format!(
            "{}?client_id={}&post_logout_redirect_uri={}",
            self.idp.end_session_endpoint(),
            urlencoding::encode(&self.idp.client_id),
            urlencoding::encode(self.idp.post_logout_redirect()),
        );
        self.navigator.assign(&url);
    }
}

/// Build the IdP authorization URL for one login round-trip.
fn build_authorization_url(idp: &IdpConfig, material: &PkceMaterial) -> String {
    let params = [
        ("client_id", idp.client_id.as_str()),
        ("redirect_uri", idp.redirect_uri.as_str()),
        ("response_type", "code"),
        ("response_mode", "query"),
        ("scope", &idp.scope_string()),
        ("state", &material.state),
        ("code_challenge", &material.challenge),
        ("code_challenge_method", material.challenge_method()),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", idp.authorization_endpoint(), query)
}

/// Read a query parameter off an absolute URL.
fn query_param(raw: &str, name: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}

/// Drop the IdP callback parameters from a URL, keeping everything else.
///
/// `session_state` and `iss` ride along with `code` and `state` on Keycloak
/// callbacks; all four are consumed together.
fn strip_auth_params(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !matches!(k.as_ref(), "code" | "state" | "session_state" | "iss"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if retained.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(retained);
        let query = serializer.finish();
        url.set_query(Some(&query));
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    //! Unit tests for the URL helpers; the state machine itself is covered by
    //! the crate's integration tests.
    use super::*;

    #[test]
    fn query_param_reads_code() {
        let url = "https://admin.example.com/?code=abc&state=xyz";
        assert_eq!(query_param(url, "code"), Some("abc".to_string()));
        assert_eq!(query_param(url, "missing"), None);
    }

    #[test]
    fn strip_removes_callback_params_only() {
        let url = "https://admin.example.com/inbox?tab=sent&code=abc&state=xyz&session_state=s&iss=https%3A%2F%2Fid";
        assert_eq!(strip_auth_params(url), "https://admin.example.com/inbox?tab=sent");
    }

    #[test]
    fn strip_drops_empty_query_entirely() {
        let url = "https://admin.example.com/?code=abc&state=xyz";
        assert_eq!(strip_auth_params(url), "https://admin.example.com/");
    }

    #[test]
    fn strip_leaves_urls_without_callback_params_alone() {
        let url = "https://admin.example.com/messages/42?tab=drafts";
        assert_eq!(strip_auth_params(url), url);
    }

    #[test]
    fn authorization_url_carries_the_pkce_contract() {
        let idp = IdpConfig {
            base_url: "https://id.example.com".to_string(),
            realm: "helmgate".to_string(),
            client_id: "admin-console".to_string(),
            redirect_uri: "https://admin.example.com/".to_string(),
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
            post_logout_redirect_uri: None,
        };
        let material = PkceMaterial::generate().unwrap();

        let url = build_authorization_url(&idp, &material);

        assert!(url.starts_with(
            "https://id.example.com/realms/helmgate/protocol/openid-connect/auth?"
        ));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("response_mode=query"));
        assert!(url.contains("client_id=admin-console"));
        assert!(url.contains("scope=openid%20profile%20email"));
        assert!(url.contains(&format!("state={}", material.state)));
        assert!(url.contains(&format!("code_challenge={}", material.challenge)));
        assert!(url.contains("code_challenge_method=S256"));
    }
}
