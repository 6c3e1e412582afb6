//! Hand-written fakes for the controller's collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::api::{AuthBackend, BackendError, Credentials, TokenGrant};
use crate::auth::{
    Capabilities, Clock, MemoryTokenStore, RenewalPrompt, Router, SessionController,
    SessionSettings, Token, TokenStore,
};

/// Fixed "current time" the fakes start from
pub const NOW: i64 = 1_700_000_000;

/// Build an unsigned JWT expiring at `exp`
pub fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"staff","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}

#[derive(Default)]
pub struct ScriptedBackend {
    logins: Mutex<VecDeque<Result<TokenGrant, BackendError>>>,
    refreshes: Mutex<VecDeque<Result<TokenGrant, BackendError>>>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    last_login: Mutex<Option<Credentials>>,
    last_refreshed: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn push_login(&self, result: Result<TokenGrant, BackendError>) {
        self.logins.lock().unwrap().push_back(result);
    }

    pub fn push_refresh(&self, result: Result<TokenGrant, BackendError>) {
        self.refreshes.lock().unwrap().push_back(result);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn last_login_username(&self) -> Option<String> {
        self.last_login().map(|c| c.username)
    }

    pub fn last_login(&self) -> Option<Credentials> {
        self.last_login.lock().unwrap().clone()
    }

    pub fn last_refreshed(&self) -> Option<String> {
        self.last_refreshed.lock().unwrap().clone()
    }

    fn unscripted() -> Result<TokenGrant, BackendError> {
        Err(BackendError::Transport("no scripted response".to_string()))
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, BackendError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_login.lock().unwrap() = Some(credentials.clone());
        self.logins
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::unscripted)
    }

    async fn refresh(&self, current: &str) -> Result<TokenGrant, BackendError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refreshed.lock().unwrap() = Some(current.to_string());
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::unscripted)
    }
}

#[derive(Default)]
pub struct RecordingRouter {
    visited: Mutex<Vec<String>>,
}

impl RecordingRouter {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Router for RecordingRouter {
    fn navigate(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_string());
    }
}

/// Prompt with a fixed answer; `None` never answers.
#[derive(Default)]
pub struct ScriptedPrompt {
    answer: Mutex<Option<bool>>,
    asked: AtomicUsize,
    last_seconds_left: Mutex<Option<i64>>,
}

impl ScriptedPrompt {
    pub fn answer(&self, yes: bool) {
        *self.answer.lock().unwrap() = Some(yes);
    }

    pub fn never_answer(&self) {
        *self.answer.lock().unwrap() = None;
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }

    pub fn last_seconds_left(&self) -> Option<i64> {
        *self.last_seconds_left.lock().unwrap()
    }
}

#[async_trait]
impl RenewalPrompt for ScriptedPrompt {
    async fn stay_logged_in(&self, seconds_left: i64) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        *self.last_seconds_left.lock().unwrap() = Some(seconds_left);
        let answer = *self.answer.lock().unwrap();
        match answer {
            Some(yes) => yes,
            None => std::future::pending::<bool>().await,
        }
    }
}

pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A controller wired to fakes, with handles to inspect them.
pub struct Harness {
    pub controller: SessionController,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemoryTokenStore>,
    pub router: Arc<RecordingRouter>,
    pub prompt: Arc<ScriptedPrompt>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Fresh controller, not yet restored
    pub fn new() -> Self {
        let backend = Arc::new(ScriptedBackend::default());
        let store = Arc::new(MemoryTokenStore::new());
        let router = Arc::new(RecordingRouter::default());
        let prompt = Arc::new(ScriptedPrompt::default());
        let clock = Arc::new(ManualClock::new(NOW));

        let caps = Capabilities {
            backend: backend.clone(),
            store: store.clone(),
            router: router.clone(),
            prompt: prompt.clone(),
            clock: clock.clone(),
        };

        Self {
            controller: SessionController::new(caps, SessionSettings::default()),
            backend,
            store,
            router,
            prompt,
            clock,
        }
    }

    /// Restored with nothing stored
    pub fn restored() -> Self {
        let harness = Self::new();
        harness.controller.restore();
        harness
    }

    /// Restored with a stored token expiring at `exp`
    pub fn authenticated(exp: i64) -> Self {
        let harness = Self::new();
        harness.seed_store(&Token::new(make_token(exp)));
        harness.controller.restore();
        assert!(harness.controller.session().is_authenticated());
        harness
    }

    pub fn seed_store(&self, token: &Token) {
        self.store
            .set(token, chrono::Duration::days(1))
            .expect("memory store never fails");
    }

    pub fn stored(&self) -> Option<Token> {
        self.store.get().expect("memory store never fails")
    }
}
