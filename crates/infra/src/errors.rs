//! Conversions from external infrastructure errors into domain errors.

use helmgate_domain::AuthError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AuthError);

impl From<InfraError> for AuthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_decode() {
            "decode"
        } else if err.is_builder() {
            "builder"
        } else {
            "transport"
        };

        Self(AuthError::Network(format!("{kind} error: {err}")))
    }
}
