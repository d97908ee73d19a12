//! # Helmgate Core
//!
//! The authentication bootstrap and session-sync state machine.
//!
//! This crate contains:
//! - The bootstrap orchestrator run once per application load
//! - The code-exchange deduplicator, verifier preservation store,
//!   session persistence layer, and redirect-target memory it drives
//! - The single-flight 401/403 recovery coordinator
//! - Port traits for the two external collaborators with behavior (the
//!   backend auth gateway and the browser navigator)
//!
//! ## Architecture Principles
//! - Only depends on `helmgate-domain` and `helmgate-common`
//! - No HTTP or platform code; network and navigation go through traits
//! - Durable state goes through the storage provider, under fixed keys

pub mod auth;
pub mod testing;

pub use auth::bootstrap::{BootstrapOutcome, BootstrapService, BootstrapState};
pub use auth::ledger::AttemptedCodes;
pub use auth::ports::{AuthGateway, Navigator};
pub use auth::recovery::{RecoveryAction, RecoveryCoordinator, RecoveryGuard};
pub use auth::redirect::RedirectMemory;
pub use auth::session_store::{BearerSlot, SessionStore};
pub use auth::verifier_store::{
    ExternalPkceStorageAdapter, KeycloakCallbackAdapter, VerifierStore,
};
