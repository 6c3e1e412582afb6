//! Collaborators the session controller is handed at construction.

use async_trait::async_trait;
use chrono::Utc;

/// Moves the user between the login screen and the authenticated area.
pub trait Router: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Asks the user whether to extend a session that is about to expire.
#[async_trait]
pub trait RenewalPrompt: Send + Sync {
    /// `seconds_left` is the remaining token lifetime when the question is asked
    async fn stay_logged_in(&self, seconds_left: i64) -> bool;
}

/// Wall clock in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}
