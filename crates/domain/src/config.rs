//! Application configuration
//!
//! Typed configuration for the IdP, the backend API, and durable storage.
//! Loading (environment variables, config files) lives in the infra crate;
//! this module only defines the shapes and the URL builders derived from
//! them.

use serde::{Deserialize, Serialize};

/// Identity-provider configuration (Keycloak-shaped OIDC server)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpConfig {
    /// Base URL of the IdP, e.g. `https://id.example.com`.
    pub base_url: String,

    /// Realm name under the IdP.
    pub realm: String,

    /// OAuth client ID registered for this application.
    pub client_id: String,

    /// Redirect URI the IdP sends the authorization code back to.
    pub redirect_uri: String,

    /// Scopes requested at authorization time.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Where the IdP sends the browser after end-session. Defaults to the
    /// redirect URI when unset.
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "profile".to_string(), "email".to_string()]
}

impl IdpConfig {
    /// The realm's authorization endpoint:
    /// `{base}/realms/{realm}/protocol/openid-connect/auth`.
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/auth",
            self.base_url.trim_end_matches('/'),
            self.realm
        )
    }

    /// The realm's end-session endpoint:
    /// `{base}/realms/{realm}/protocol/openid-connect/logout`.
    #[must_use]
    pub fn end_session_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/logout",
            self.base_url.trim_end_matches('/'),
            self.realm
        )
    }

    /// Scopes as the space-separated string the wire format wants.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Post-logout destination, falling back to the redirect URI.
    #[must_use]
    pub fn post_logout_redirect(&self) -> &str {
        self.post_logout_redirect_uri.as_deref().unwrap_or(&self.redirect_uri)
    }
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for the backend, e.g. `https://api.example.com/v1`.
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the durable key-value store file.
    pub path: std::path::PathBuf,
}

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub idp: IdpConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
}

#[cfg(test)]
mod tests {
    //! Unit tests for config.
    use super::*;

    fn sample_idp() -> IdpConfig {
        IdpConfig {
            base_url: "https://id.example.com/".to_string(),
            realm: "helmgate".to_string(),
            client_id: "admin-console".to_string(),
            redirect_uri: "https://admin.example.com/".to_string(),
            scopes: default_scopes(),
            post_logout_redirect_uri: None,
        }
    }

    #[test]
    fn authorization_endpoint_shape() {
        let idp = sample_idp();
        assert_eq!(
            idp.authorization_endpoint(),
            "https://id.example.com/realms/helmgate/protocol/openid-connect/auth"
        );
    }

    #[test]
    fn end_session_endpoint_shape() {
        let idp = sample_idp();
        assert_eq!(
            idp.end_session_endpoint(),
            "https://id.example.com/realms/helmgate/protocol/openid-connect/logout"
        );
    }

    #[test]
    fn scope_string_joins_with_spaces() {
        let idp = sample_idp();
        assert_eq!(idp.scope_string(), "openid profile email");
    }

    #[test]
    fn post_logout_falls_back_to_redirect_uri() {
        let mut idp = sample_idp();
        assert_eq!(idp.post_logout_redirect(), "https://admin.example.com/");

        idp.post_logout_redirect_uri = Some("https://admin.example.com/bye".to_string());
        assert_eq!(idp.post_logout_redirect(), "https://admin.example.com/bye");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let toml_str = r#"
            [idp]
            base_url = "https://id.example.com"
            realm = "helmgate"
            client_id = "admin-console"
            redirect_uri = "https://admin.example.com/"

            [api]
            base_url = "https://api.example.com/v1"

            [storage]
            path = "/tmp/helmgate-storage.json"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.idp.scopes.len(), 3);
        assert_eq!(config.api.timeout_secs, 30);
    }
}
