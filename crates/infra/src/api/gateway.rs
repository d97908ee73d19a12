//! HTTP implementation of the backend auth gateway

use async_trait::async_trait;
use helmgate_core::AuthGateway;
use helmgate_domain::{
    ApiConfig, AuthError, CodeExchangeRequest, ProfileResponse, Result, Session, TokenResponse,
    UserProfile,
};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::http::client::HttpClient;

/// Error body the backend returns on a failed exchange.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    error: String,
    message: Option<String>,
}

impl BackendErrorBody {
    fn describe(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.error, message),
            None => self.error.clone(),
        }
    }
}

/// Backend-mediated auth endpoints over HTTP
///
/// The code exchange runs on a single-attempt client: a failed exchange is
/// never retried automatically. The code it carries is single-use at the IdP
/// and the deduplication ledger has already recorded it as spent.
pub struct HttpAuthGateway {
    http: HttpClient,
    base_url: String,
}

impl HttpAuthGateway {
    /// Create a gateway against the configured backend.
    ///
    /// # Errors
    /// Returns [`AuthError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .max_attempts(1)
            .build()?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn exchange_code(&self, request: CodeExchangeRequest) -> Result<Session> {
        let url = self.url("/auth/callback");
        debug!(%url, "submitting authorization code");

        let response = self
            .http
            .send(self.http.request(Method::POST, &url).json(&request))
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Decode the backend's error body when there is one; the raw
            // status otherwise.
            let detail = match response.json::<BackendErrorBody>().await {
                Ok(body) => body.describe(),
                Err(_) => format!("backend returned status {status}"),
            };
            return Err(AuthError::ExchangeFailed(detail));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("malformed token response: {e}")))?;

        info!("authorization code exchanged");
        Ok(token_response.into())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile> {
        let url = self.url("/profile/me");
        debug!(%url, "fetching profile");

        let response = self
            .http
            .send(
                self.http
                    .request(Method::GET, &url)
                    .header("Authorization", format!("Bearer {access_token}")),
            )
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::AuthRejected(format!("{url} returned status {status}")));
        }
        if !status.is_success() {
            return Err(AuthError::Network(format!("{url} returned status {status}")));
        }

        let profile: ProfileResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Network(format!("malformed profile response: {e}")))?;

        Ok(profile.user)
    }
}
