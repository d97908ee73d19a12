//! Session, profile, and auth wire types
//!
//! Defines the data the bootstrap state machine moves around: the
//! authenticated [`Session`], the embedded [`UserProfile`], and the request/
//! response shapes of the backend auth endpoints.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile of the signed-in administrator
///
/// Embedded in [`Session`]; never exists independently of one. The backend
/// serializes profile fields in camelCase; the serde attributes below perform
/// the key-casing normalization at the deserialization boundary so downstream
/// consumers only ever see snake_case Rust fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub full_name: String,
    pub username: String,
    pub email: String,
    /// Role names granted to this user, e.g. `admin`, `editor`.
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl UserProfile {
    /// Check membership in a role by name.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// An established authenticated session
///
/// Owned exclusively by the persistence layer: created on successful code
/// exchange, mutated only through explicit set operations, destroyed on
/// logout or on any 401/403 from a non-auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer access token for API authentication.
    pub access_token: String,

    /// Refresh token, when the backend issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access-token lifetime in seconds.
    pub expires_in: i64,

    /// Token type (`Bearer` for OAuth 2.0).
    pub token_type: String,

    /// Absolute expiration timestamp (UTC), calculated from `expires_in` at
    /// creation or restore time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The signed-in user.
    pub user: UserProfile,
}

impl Session {
    /// Create a new session with a calculated expiration timestamp.
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        token_type: String,
        user: UserProfile,
    ) -> Self {
        let expires_at = if expires_in > 0 {
            Some(Utc::now() + chrono::Duration::seconds(expires_in))
        } else {
            None
        };

        Self { access_token, refresh_token, expires_in, token_type, expires_at, user }
    }

    /// Check whether the access token is expired or expires within the given
    /// threshold.
    ///
    /// Returns `false` when no expiry is set: a session without an expiration
    /// timestamp is assumed valid until the backend says otherwise.
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let threshold = chrono::Duration::seconds(threshold_seconds);
                Utc::now() + threshold >= expires_at
            }
            None => false,
        }
    }

    /// Seconds until the access token expires, if an expiry is set.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }

    /// Recalculate `expires_at` from `expires_in` against the current time.
    ///
    /// Used when reconstructing a session from storage, where only the
    /// original lifetime survived.
    pub fn refresh_expiry_timestamp(&mut self) {
        if self.expires_in > 0 {
            self.expires_at = Some(Utc::now() + chrono::Duration::seconds(self.expires_in));
        }
    }
}

/// Body of `POST /auth/callback`
///
/// `code_verifier` is omitted only when no PKCE verifier survived the IdP
/// round-trip; the backend is expected to reject such an exchange unless it
/// implements a non-PKCE fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExchangeRequest {
    pub code: String,
    pub redirect_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

/// Successful response of `POST /auth/callback` (RFC 6749 token response
/// plus the embedded user).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserProfile,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<TokenResponse> for Session {
    fn from(response: TokenResponse) -> Self {
        Self::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            response.token_type,
            response.user,
        )
    }
}

/// Response of `GET /profile/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}
