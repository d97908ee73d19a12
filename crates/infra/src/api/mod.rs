//! Backend API adapters
//!
//! [`gateway`] implements the auth endpoints port (`POST /auth/callback`,
//! `GET /profile/me`); [`client`] is the bearer-injecting client every
//! protected resource request goes through, carrying the response-stage
//! 401/403 recovery trigger.

pub mod client;
pub mod gateway;
