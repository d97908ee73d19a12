//! Authentication bootstrap and session synchronization
//!
//! Establishes, persists, and recovers an authenticated session against the
//! IdP using the OAuth2 Authorization-Code-with-PKCE flow, surviving page
//! reloads, duplicate network retries, concurrent 401/403 failures, and
//! stale callback parameters.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │  BootstrapService  │  State machine, run once per application load
//! └─────────┬──────────┘
//!           │
//!           ├──► SessionStore        (token/user persistence + bearer mirror)
//!           ├──► AttemptedCodes      (code-exchange deduplication ledger)
//!           ├──► VerifierStore       (PKCE verifier across the IdP round-trip)
//!           ├──► RedirectMemory      (resume target after reauthentication)
//!           └──► AuthGateway/Navigator ports (backend HTTP, browser)
//!
//! ┌──────────────────────┐
//! │  RecoveryCoordinator │  Single-flight 401/403 recovery, injected into
//! └──────────────────────┘  the HTTP response stage at construction time
//! ```
//!
//! Execution is async but effectively serial; the races this design defends
//! against come from interleaved network completions and from full-page
//! reloads racing slow requests, not from parallelism.

pub mod bootstrap;
pub mod ledger;
pub mod ports;
pub mod recovery;
pub mod redirect;
pub mod session_store;
pub mod verifier_store;
