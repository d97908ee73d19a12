//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Helmgate auth operations
///
/// The first five variants are the protocol-level failure kinds of the
/// bootstrap state machine; `Storage`, `Config` and `Network` cover the
/// infrastructure they run on. Errors are converted into one of these at the
/// boundary where they occur and never escape as panics.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthError {
    /// The platform exposes no secure randomness source. Fatal: the redirect
    /// to the IdP must be aborted rather than issued with weak PKCE material.
    #[error("Secure randomness unavailable: {0}")]
    CryptoUnavailable(String),

    /// No PKCE verifier survived the round-trip to the IdP. Non-fatal: the
    /// exchange is still submitted without `code_verifier` and the backend's
    /// verdict is authoritative.
    #[error("PKCE verifier missing at exchange time")]
    MissingVerifier,

    /// The backend rejected (or never answered) the code exchange. Non-fatal:
    /// the URL is cleaned and the user lands on the login entry point, no
    /// automatic retry.
    #[error("Code exchange failed: {0}")]
    ExchangeFailed(String),

    /// A protected endpoint answered 401/403. Triggers the single-flight
    /// recovery sequence unless the request targeted an auth endpoint.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// The authorization code in the URL was already consumed, or a session
    /// already exists. Silently ignored.
    #[error("Stale authorization code")]
    StaleCode,

    /// An operation that needs an active session found none.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Result type alias for Helmgate operations
pub type Result<T> = std::result::Result<T, AuthError>;
