//! Ports for the auth state machine's external collaborators
//!
//! These traits enable dependency injection and testing by abstracting the
//! two collaborators with behavior: the backend auth endpoints and the
//! browser's navigation surface. The infra crate provides the production
//! implementations.

use async_trait::async_trait;
use helmgate_domain::{CodeExchangeRequest, Result, Session, UserProfile};

/// Backend auth endpoints
///
/// The code exchange is backend-mediated: the client never talks to the IdP's
/// token endpoint directly.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Submit an authorization code to `POST /auth/callback`.
    ///
    /// # Errors
    /// Returns [`helmgate_domain::AuthError::ExchangeFailed`] when the
    /// backend rejects the exchange and `Network` when it cannot be reached.
    async fn exchange_code(&self, request: CodeExchangeRequest) -> Result<Session>;

    /// Fetch the signed-in user from `GET /profile/me` with the given bearer
    /// token.
    ///
    /// # Errors
    /// Returns [`helmgate_domain::AuthError::AuthRejected`] on 401/403 and
    /// `Network` on transport failures.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile>;
}

/// Browser navigation surface
///
/// A hard navigation ([`Navigator::assign`]) terminates the current page
/// load; the state machine models it as an explicit terminal transition so
/// tests can assert on a recording implementation instead of a real browser.
pub trait Navigator: Send + Sync {
    /// The full current URL, including query and fragment.
    fn current_url(&self) -> String;

    /// Swap the visible URL without reloading (history replacement). Used to
    /// strip consumed callback parameters and to resume a remembered
    /// redirect target.
    fn replace(&self, url: &str);

    /// Full-page navigation. Terminal for the current page load: everything
    /// in memory is gone afterwards.
    fn assign(&self, url: &str);
}
