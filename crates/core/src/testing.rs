//! Recording test doubles for the auth ports
//!
//! Used by this crate's tests and by the infra crate's interceptor tests.
//! The doubles record every interaction so tests can assert on exact call
//! counts; most of the state machine's guarantees are of the form "this
//! happened exactly once".

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use helmgate_domain::{AuthError, CodeExchangeRequest, Result, Session, UserProfile};
use parking_lot::{Mutex, RwLock};

use crate::auth::ports::{AuthGateway, Navigator};

/// Navigator double that records navigations instead of performing them
#[derive(Debug)]
pub struct RecordingNavigator {
    current: RwLock<String>,
    assigned: Mutex<Vec<String>>,
    replaced: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Create a navigator positioned at `initial_url`.
    #[must_use]
    pub fn new(initial_url: &str) -> Self {
        Self {
            current: RwLock::new(initial_url.to_string()),
            assigned: Mutex::new(Vec::new()),
            replaced: Mutex::new(Vec::new()),
        }
    }

    /// Every hard navigation performed, in order.
    #[must_use]
    pub fn assigned(&self) -> Vec<String> {
        self.assigned.lock().clone()
    }

    /// Every history replacement performed, in order.
    #[must_use]
    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_url(&self) -> String {
        self.current.read().clone()
    }

    fn replace(&self, url: &str) {
        self.replaced.lock().push(url.to_string());
        *self.current.write() = url.to_string();
    }

    fn assign(&self, url: &str) {
        self.assigned.lock().push(url.to_string());
        *self.current.write() = url.to_string();
    }
}

/// Gateway double with a scripted exchange outcome
pub struct MockAuthGateway {
    session: Option<Session>,
    profile: Option<UserProfile>,
    exchange_error: Option<AuthError>,
    exchanges: Mutex<Vec<CodeExchangeRequest>>,
    profile_calls: AtomicUsize,
}

impl MockAuthGateway {
    /// A gateway whose exchange succeeds with `session`.
    #[must_use]
    pub fn succeeding(session: Session) -> Self {
        Self {
            session: Some(session),
            profile: None,
            exchange_error: None,
            exchanges: Mutex::new(Vec::new()),
            profile_calls: AtomicUsize::new(0),
        }
    }

    /// A gateway whose exchange fails with `error`.
    #[must_use]
    pub fn failing(error: AuthError) -> Self {
        Self {
            session: None,
            profile: None,
            exchange_error: Some(error),
            exchanges: Mutex::new(Vec::new()),
            profile_calls: AtomicUsize::new(0),
        }
    }

    /// Script the profile returned by `fetch_profile`.
    #[must_use]
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Every exchange request received, in order.
    #[must_use]
    pub fn exchange_requests(&self) -> Vec<CodeExchangeRequest> {
        self.exchanges.lock().clone()
    }

    /// Number of exchange calls received.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.exchanges.lock().len()
    }

    /// Number of profile fetches received.
    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthGateway for MockAuthGateway {
    async fn exchange_code(&self, request: CodeExchangeRequest) -> Result<Session> {
        self.exchanges.lock().push(request);

        if let Some(error) = &self.exchange_error {
            return Err(error.clone());
        }

        self.session
            .clone()
            .ok_or_else(|| AuthError::Network("no exchange outcome scripted".to_string()))
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<UserProfile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);

        self.profile
            .clone()
            .ok_or_else(|| AuthError::Network("no profile scripted".to_string()))
    }
}
