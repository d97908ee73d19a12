//! Bearer-injecting API client for protected resource endpoints
//!
//! The production form of the interceptor pair:
//!
//! - **Request stage**: the current access token is read from the shared
//!   bearer slot on every outgoing request and attached as a bearer
//!   credential; the stage never blocks and never retries on its own.
//! - **Response stage**: a 401/403 from a non-auth endpoint hands control to
//!   the recovery coordinator (single-flight logout + hard navigation); auth
//!   endpoints are exempt so the auth flow itself can never loop.

use std::sync::Arc;

use helmgate_core::{BearerSlot, RecoveryCoordinator};
use helmgate_domain::{ApiConfig, AuthError, Result};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::http::client::HttpClient;

/// Paths whose 401/403 responses pass through unchanged. Triggering recovery
/// for the auth endpoints themselves would loop reauthentication forever.
const AUTH_EXEMPT_PATHS: [&str; 2] = ["/auth/callback", "/auth/logout"];

fn is_auth_endpoint(path: &str) -> bool {
    AUTH_EXEMPT_PATHS.iter().any(|exempt| path.starts_with(exempt))
}

/// API client wired with the interceptor pair
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    bearer: BearerSlot,
    recovery: Arc<RecoveryCoordinator>,
}

impl ApiClient {
    /// Create a client over the configured backend.
    ///
    /// `bearer` comes from the session store ([`helmgate_core::SessionStore::bearer`])
    /// and `recovery` owns the single-flight guard; both are injected here,
    /// at interceptor-build time.
    ///
    /// # Errors
    /// Returns [`AuthError::Config`] if the HTTP client cannot be built.
    pub fn new(
        config: &ApiConfig,
        bearer: BearerSlot,
        recovery: Arc<RecoveryCoordinator>,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer,
            recovery,
        })
    }

    /// Execute a GET request against a backend path.
    ///
    /// # Errors
    /// Returns [`AuthError::AuthRejected`] on 401/403 (after the response
    /// stage ran) and [`AuthError::Network`] on other failures.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, path, None).await?;
        Self::decode(response).await
    }

    /// Execute a POST request against a backend path.
    ///
    /// # Errors
    /// Returns [`AuthError::AuthRejected`] on 401/403 (after the response
    /// stage ran) and [`AuthError::Network`] on other failures.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body)
            .map_err(|e| AuthError::Network(format!("failed to serialize body: {e}")))?;
        let response = self.execute(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "api request");

        // Request stage: attach the current bearer token, if any.
        let mut request = self.http.request(method, &url).header("Content-Type", "application/json");
        if let Some(token) = self.bearer.current() {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = self.http.send(request).await?;

        // Response stage: auth rejections trigger recovery, once.
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = format!("{url} returned status {status}");

            if is_auth_endpoint(path) {
                // Pass through unchanged; the bootstrap handles its own
                // failures.
                return Err(AuthError::AuthRejected(message));
            }

            warn!(%url, %status, "auth rejected on protected endpoint");
            self.recovery.on_auth_rejected();
            return Err(AuthError::AuthRejected(message));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                format!("{url} returned status {status}")
            } else {
                format!("{url} returned status {status}: {body}")
            };
            return Err(AuthError::Network(message));
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();

        // 204/205 carry no body per RFC 9110; only `()`-shaped targets can
        // absorb them.
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                AuthError::Network(format!(
                    "no-content response ({status}) cannot fill the requested type"
                ))
            });
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Network(format!("failed to parse response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for api::client.
    use super::*;

    #[test]
    fn auth_endpoints_are_exempt() {
        assert!(is_auth_endpoint("/auth/callback"));
        assert!(is_auth_endpoint("/auth/logout"));
        assert!(!is_auth_endpoint("/messages"));
        assert!(!is_auth_endpoint("/profile/me"));
    }
}
