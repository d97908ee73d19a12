//! # Helmgate Common
//!
//! Side-effect-light primitives shared by the Helmgate client crates:
//!
//! - **[`pkce`]**: RFC 7636 verifier/challenge/state generation
//! - **[`storage`]**: the browser-storage collaborator modeled as a
//!   synchronous key-value provider, with durable (file-backed) and volatile
//!   (in-memory) implementations
//!
//! Nothing in this crate performs network I/O or knows about the auth state
//! machine; the core crate composes these pieces.

pub mod pkce;
pub mod storage;

pub use pkce::{derive_challenge, generate_state, generate_verifier, PkceError, PkceMaterial};
pub use storage::{FileStorage, MemoryStorage, StorageError, StorageProvider};
