//! Durable-storage key names
//!
//! Every component writes fixed, namespaced keys; nothing reads another
//! component's scratch keys except through the documented verifier fallbacks.
//! Key names are part of the external storage contract and must stay stable
//! across releases, so they live here rather than next to their writers.

/// Access token written by the persistence layer.
pub const TOKEN: &str = "token";

/// Alias for [`TOKEN`] written by older releases; read (never written) on
/// restore.
pub const LEGACY_ACCESS_TOKEN: &str = "access_token";

/// Refresh token, when the backend issued one.
pub const REFRESH_TOKEN: &str = "refresh_token";

/// Serialized user profile (JSON).
pub const USER: &str = "user";

/// Access-token lifetime in seconds, as reported by the backend.
pub const EXPIRES_IN: &str = "expires_in";

/// Token type, `Bearer` in practice.
pub const TOKEN_TYPE: &str = "token_type";

/// PKCE code verifier, written immediately before the IdP redirect so it
/// survives the full-page navigation.
pub const PKCE_VERIFIER: &str = "__pkce_code_verifier__";

/// Secondary copy of the verifier, written alongside [`PKCE_VERIFIER`] in
/// case an underlying OAuth library scrubs the primary key on return.
pub const PKCE_VERIFIER_COPY: &str = "__pkce_code_verifier_copy__";

/// Verifier key names used by older releases; read-only fallbacks on
/// retrieval, removed on clear.
pub const LEGACY_PKCE_VERIFIER_KEYS: [&str; 2] = ["pkce_code_verifier", "pkce_verifier"];

/// Ledger of authorization codes already submitted for exchange (JSON array).
pub const ATTEMPTED_CODES: &str = "auth_attempted_codes";

/// URL the user occupied when forced to reauthenticate.
pub const REDIRECT_AFTER_REAUTH: &str = "redirect_url_after_reauth";
