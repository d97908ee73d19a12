//! # Helmgate Infra
//!
//! Infrastructure adapters for the Helmgate client:
//!
//! - [`http`]: retrying HTTP client over `reqwest`
//! - [`api`]: the backend auth gateway and the bearer-injecting API client
//!   (the interceptor pair's production implementation)
//! - [`config`]: environment-first configuration loading with file fallback
//! - [`telemetry`]: tracing initialization
//!
//! Everything stateful is injected: the bearer slot and the recovery
//! coordinator come from `helmgate-core`, storage from `helmgate-common`.

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod telemetry;

pub use api::client::ApiClient;
pub use api::gateway::HttpAuthGateway;
pub use http::client::{HttpClient, HttpClientBuilder};
