//! # Helmgate Domain
//!
//! Pure types shared across the Helmgate client workspace.
//!
//! This crate contains:
//! - Session and user-profile types with token expiry bookkeeping
//! - Wire types for the backend auth endpoints
//! - Application configuration (IdP, backend API, storage)
//! - The application error taxonomy
//!
//! No infrastructure dependencies: no HTTP, no storage engines, no platform
//! code. Everything here is data plus small pure methods on it.

pub mod config;
pub mod errors;
pub mod keys;
pub mod types;

pub use config::{ApiConfig, Config, IdpConfig, StorageConfig};
pub use errors::{AuthError, Result};
pub use types::{CodeExchangeRequest, ProfileResponse, Session, TokenResponse, UserProfile};
