//! Terminal implementations of the controller's front-end collaborators.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tokenward_core::{RenewalPrompt, Router, Session};
use tracing::{debug, warn};

/// There are no pages in a terminal; navigation is reported instead.
pub struct TerminalRouter;

impl Router for TerminalRouter {
    fn navigate(&self, path: &str) {
        debug!(path, "Navigating");
        match path {
            "/login" => println!("You are logged out. Run `tokenward login` to sign in again."),
            other => println!("-> {}", other),
        }
    }
}

/// Asks on stdout and reads a y/n answer from stdin.
pub struct StdinPrompt;

#[async_trait]
impl RenewalPrompt for StdinPrompt {
    async fn stay_logged_in(&self, seconds_left: i64) -> bool {
        print!(
            "Your session is about to expire (in {}). Do you want to stay logged in? [y/N]: ",
            format_remaining(seconds_left)
        );
        if let Err(e) = io::stdout().flush() {
            warn!(error = %e, "Failed to flush prompt");
        }

        // stdin has no async reader in std; a line read blocks its own thread
        let line = tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            io::stdin().lock().read_line(&mut input).map(|_| input)
        })
        .await;

        match line {
            Ok(Ok(input)) => is_yes(&input),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read renewal answer");
                false
            }
            Err(e) => {
                warn!(error = %e, "Renewal prompt task failed");
                false
            }
        }
    }
}

/// What the watch should report when the session goes from `previous` to
/// `current`. Changes that leave the token alone are not reported.
pub fn describe_change(previous: &Session, current: &Session) -> Option<&'static str> {
    if !current.is_authenticated() {
        Some("Session ended")
    } else if current.token != previous.token {
        Some("Session renewed")
    } else {
        None
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Format a remaining lifetime for display, e.g. `4m 05s` or `expired`
pub fn format_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        "expired".to_string()
    } else if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {:02}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
