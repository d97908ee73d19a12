//! Tracing initialization
//!
//! One-shot subscriber setup. Filtering is controlled through `RUST_LOG`
//! (`EnvFilter` syntax); `info` is the default when unset.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

#[cfg(test)]
mod tests {
    //! Unit tests for telemetry.
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
