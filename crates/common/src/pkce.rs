//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for binding an authorization code to a client-held
//! secret. Used by the bootstrap orchestrator immediately before redirecting
//! to the IdP.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error type for PKCE material generation
#[derive(Debug, Error)]
pub enum PkceError {
    /// The operating system exposes no secure randomness source. Fatal for
    /// the login flow: the redirect must be aborted.
    #[error("secure randomness unavailable: {0}")]
    CryptoUnavailable(String),
}

/// Generate a cryptographically secure code verifier
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43
/// characters). Per RFC 7636, verifiers must be 43-128 characters long.
///
/// # Errors
/// Returns [`PkceError::CryptoUnavailable`] if the OS randomness source
/// cannot be read.
pub fn generate_verifier() -> Result<String, PkceError> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes()?))
}

/// Derive the code challenge from a verifier using SHA-256
///
/// Per RFC 7636, the challenge is `BASE64URL(SHA256(ASCII(code_verifier)))`
/// with no padding. Pure and deterministic.
#[must_use]
pub fn derive_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF binding
///
/// Independent of the verifier; the IdP returns it unchanged in the callback.
///
/// # Errors
/// Returns [`PkceError::CryptoUnavailable`] if the OS randomness source
/// cannot be read.
pub fn generate_state() -> Result<String, PkceError> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes()?))
}

fn random_bytes() -> Result<[u8; 32], PkceError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| PkceError::CryptoUnavailable(e.to_string()))?;
    Ok(bytes)
}

/// PKCE material for one authorization round-trip
///
/// Ephemeral: created immediately before redirecting to the IdP, must survive
/// exactly one full-page navigation (via the verifier preservation store),
/// destroyed after its first use.
#[derive(Debug, Clone)]
pub struct PkceMaterial {
    /// Random string (43-128 chars, base64url encoded). Kept secret until
    /// token exchange.
    pub verifier: String,

    /// SHA-256 hash of the verifier (base64url encoded), sent in the
    /// authorization request.
    pub challenge: String,

    /// Random CSRF-binding token, echoed back by the IdP.
    pub state: String,
}

impl PkceMaterial {
    /// Generate a fresh verifier/challenge/state triple.
    ///
    /// # Errors
    /// Returns [`PkceError::CryptoUnavailable`] if the OS randomness source
    /// cannot be read; the caller must abort the redirect.
    pub fn generate() -> Result<Self, PkceError> {
        let verifier = generate_verifier()?;
        let challenge = derive_challenge(&verifier);
        let state = generate_state()?;

        Ok(Self { verifier, challenge, state })
    }

    /// The challenge method, always `S256`.
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for pkce.
    use super::*;

    #[test]
    fn generated_material_meets_rfc_lengths() {
        let material = PkceMaterial::generate().unwrap();

        // RFC 7636: verifier must be 43-128 chars
        assert!(material.verifier.len() >= 43, "verifier too short: {}", material.verifier.len());
        assert!(material.verifier.len() <= 128, "verifier too long: {}", material.verifier.len());

        assert!(!material.challenge.is_empty());
        assert!(!material.state.is_empty());
        assert_eq!(material.challenge_method(), "S256");
    }

    #[test]
    fn successive_generations_are_unique() {
        let first = PkceMaterial::generate().unwrap();
        let second = PkceMaterial::generate().unwrap();

        assert_ne!(first.verifier, second.verifier);
        assert_ne!(first.challenge, second.challenge);
        assert_ne!(first.state, second.state);
    }

    #[test]
    fn output_is_base64url_without_padding() {
        let material = PkceMaterial::generate().unwrap();

        for value in [&material.verifier, &material.challenge, &material.state] {
            assert!(!value.contains('='));
            assert!(!value.contains('+'));
            assert!(!value.contains('/'));
        }
    }

    #[test]
    fn challenge_is_deterministic_for_a_verifier() {
        let material = PkceMaterial::generate().unwrap();
        let recomputed = derive_challenge(&material.verifier);

        assert_eq!(material.challenge, recomputed);
    }

    #[test]
    fn known_vector_from_rfc_7636() {
        // Appendix B of RFC 7636
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(derive_challenge(verifier), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }
}
