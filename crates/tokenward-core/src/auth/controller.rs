//! The session controller: owns the current session and drives every
//! transition of it.
//!
//! ```text
//!                 restore()
//! [Initializing] ──────────┬──────────────→ [Unauthenticated]
//!                          │                   │        ▲
//!                          │     login() ok    │        │ logout() / refresh() failed /
//!                          ▼                   ▼        │ watch: declined, expired
//!                    [Authenticated] ◀─────────┘        │
//!                      │      ▲  └──────────────────────┘
//!                      └──────┘
//!                   refresh() ok
//! ```
//!
//! Transitions are not serialized against each other. If a manual logout
//! races a pending refresh, whichever finishes last decides the final state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{Clock, RenewalPrompt, Router, SessionError, Token, TokenStore};
use crate::api::{AuthBackend, Credentials};
use crate::config::Config;

/// Timing and routing knobs for the controller.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// How often the expiry watch looks at the token
    pub watch_interval: Duration,
    /// Renewal is offered once this many seconds or fewer remain
    pub renewal_threshold_secs: i64,
    /// How long the renewal prompt may stay unanswered. `None` waits forever.
    pub prompt_timeout: Option<Duration>,
    /// Advisory lifetime of the persisted copy
    pub store_ttl: chrono::Duration,
    pub landing_route: String,
    pub login_route: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            watch_interval: config.watch_interval(),
            renewal_threshold_secs: config.renewal_threshold_secs,
            prompt_timeout: Some(config.prompt_timeout()),
            store_ttl: config.store_ttl(),
            landing_route: config.landing_route.clone(),
            login_route: config.login_route.clone(),
        }
    }
}

/// Where a session stands in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Snapshot of the authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: Option<Token>,
    /// True until `restore` has run
    pub loading: bool,
    /// Message for the login form, set by the UI
    pub error: Option<String>,
}

impl Session {
    fn initializing() -> Self {
        Self {
            token: None,
            loading: true,
            error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.loading {
            SessionState::Initializing
        } else if self.token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }
}

/// What a single expiry watch tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nobody is logged in
    NoSession,
    /// Plenty of time left
    Healthy { seconds_left: i64 },
    /// The user agreed to extend and a refresh was attempted
    Renewed,
    /// The user declined, or did not answer in time
    Declined,
    /// The token had already expired or could not be read
    Expired,
}

/// Everything the controller talks to.
#[derive(Clone)]
pub struct Capabilities {
    pub backend: Arc<dyn AuthBackend>,
    pub store: Arc<dyn TokenStore>,
    pub router: Arc<dyn Router>,
    pub prompt: Arc<dyn RenewalPrompt>,
    pub clock: Arc<dyn Clock>,
}

struct Inner {
    caps: Capabilities,
    settings: SessionSettings,
    state: watch::Sender<Session>,
}

/// Owner of the client's session.
/// Clone is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(caps: Capabilities, settings: SessionSettings) -> Self {
        let (state, _) = watch::channel(Session::initializing());
        Self {
            inner: Arc::new(Inner {
                caps,
                settings,
                state,
            }),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// Current session snapshot
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Record or clear the message shown next to the login form
    pub fn set_error(&self, message: Option<String>) {
        self.inner.state.send_modify(|s| s.error = message);
    }

    fn now(&self) -> i64 {
        self.inner.caps.clock.now()
    }

    /// Pick up a token persisted by an earlier run.
    ///
    /// An expired or unreadable token is discarded through `logout`. Nothing
    /// here is reported to the caller. Only the first call has any effect.
    pub fn restore(&self) {
        if !self.inner.state.borrow().loading {
            debug!("Session already restored");
            return;
        }

        let stored = match self.inner.caps.store.get() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };

        match stored {
            None => debug!("No stored token found"),
            Some(token) => match token.seconds_until_expiry(self.now()) {
                Ok(seconds_left) if seconds_left > 0 => {
                    info!(seconds_left, "Restored session from stored token");
                    self.inner.state.send_modify(|s| s.token = Some(token));
                }
                Ok(seconds_left) => {
                    info!(seconds_left, "Stored token has expired");
                    self.logout();
                }
                Err(e) => {
                    warn!(error = %e, "Stored token is malformed");
                    self.logout();
                }
            },
        }

        self.inner.state.send_modify(|s| s.loading = false);
    }

    /// Exchange credentials for a token and enter the authenticated area.
    ///
    /// On any error the session is left exactly as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), SessionError> {
        info!(username = %credentials.username, "Logging in");

        let grant = match self.inner.caps.backend.login(credentials).await {
            Ok(grant) => grant,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(e.into());
            }
        };

        let token = Token::new(grant.access_token);
        let seconds_left = token.seconds_until_expiry(self.now()).map_err(|e| {
            error!(error = %e, "Backend issued a malformed token");
            SessionError::MalformedToken(e)
        })?;

        self.install(token);
        self.inner.state.send_modify(|s| s.error = None);
        self.inner
            .caps
            .router
            .navigate(&self.inner.settings.landing_route);

        info!(seconds_left, "Login successful");
        Ok(())
    }

    /// Trade the current token for a fresh one.
    ///
    /// Any failure ends the session instead of being returned.
    pub async fn refresh(&self) {
        let Some(current) = self.session().token else {
            warn!("No token to refresh, logging out");
            self.logout();
            return;
        };

        match self.inner.caps.backend.refresh(current.as_str()).await {
            Ok(grant) => {
                let token = Token::new(grant.access_token);
                match token.seconds_until_expiry(self.now()) {
                    Ok(seconds_left) => {
                        self.install(token);
                        info!(seconds_left, "Session renewed");
                    }
                    Err(e) => {
                        warn!(error = %e, "Refresh returned a malformed token, logging out");
                        self.logout();
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging out");
                self.logout();
            }
        }
    }

    /// Drop the token everywhere and go to the login route. Safe to repeat.
    pub fn logout(&self) {
        if let Err(e) = self.inner.caps.store.remove() {
            warn!(error = %e, "Failed to remove stored token");
        }
        self.inner.state.send_modify(|s| s.token = None);
        self.inner
            .caps
            .router
            .navigate(&self.inner.settings.login_route);
        info!("Logged out");
    }

    /// Persist `token` and make it the session token
    fn install(&self, token: Token) {
        if let Err(e) = self.inner.caps.store.set(&token, self.inner.settings.store_ttl) {
            warn!(error = %e, "Failed to persist token");
        }
        self.inner.state.send_modify(|s| s.token = Some(token));
    }

    /// One evaluation of the remaining token lifetime.
    pub async fn check_expiry(&self) -> TickOutcome {
        let Some(token) = self.session().token else {
            return TickOutcome::NoSession;
        };

        let seconds_left = match token.seconds_until_expiry(self.now()) {
            Ok(seconds_left) => seconds_left,
            Err(e) => {
                warn!(error = %e, "Session token is malformed, logging out");
                self.logout();
                return TickOutcome::Expired;
            }
        };

        if seconds_left <= 0 {
            info!(seconds_left, "Session token expired, logging out");
            self.logout();
            return TickOutcome::Expired;
        }

        if seconds_left > self.inner.settings.renewal_threshold_secs {
            debug!(seconds_left, "Session token still fresh");
            return TickOutcome::Healthy { seconds_left };
        }

        info!(seconds_left, "Session about to expire, asking to stay logged in");
        if self.ask_stay_logged_in(seconds_left).await {
            self.refresh().await;
            TickOutcome::Renewed
        } else {
            info!("Session extension declined");
            self.logout();
            TickOutcome::Declined
        }
    }

    async fn ask_stay_logged_in(&self, seconds_left: i64) -> bool {
        let question = self.inner.caps.prompt.stay_logged_in(seconds_left);
        match self.inner.settings.prompt_timeout {
            Some(limit) => match time::timeout(limit, question).await {
                Ok(answer) => answer,
                Err(_) => {
                    info!(timeout_secs = limit.as_secs(), "No answer to renewal prompt");
                    false
                }
            },
            None => question.await,
        }
    }

    /// Spawn the recurring expiry watch.
    ///
    /// The first tick fires one interval from now. Ticks never overlap: a
    /// tick waiting on the prompt or a refresh delays the next one, and
    /// ticks missed meanwhile are skipped. Must be called within a Tokio
    /// runtime.
    pub fn start_watch(&self) -> WatchHandle {
        let controller = self.clone();
        let period = self.inner.settings.watch_interval;

        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(period_secs = period.as_secs(), "Expiry watch started");

            loop {
                interval.tick().await;
                let outcome = controller.check_expiry().await;
                debug!(?outcome, "Expiry watch tick");
            }
        });

        WatchHandle { task: Some(task) }
    }
}

/// Keeps the expiry watch alive. Dropping it stops the watch.
pub struct WatchHandle {
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Stop the watch and wait until it has wound down
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!("Expiry watch stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
