use thiserror::Error;

use super::TokenError;
use crate::api::BackendError;

/// Shown when the backend gives a failure without any detail
const DEFAULT_LOGIN_DETAIL: &str = "Please try again later.";

/// Errors surfaced by `SessionController::login`.
///
/// The messages are meant to be shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unauthorized: Invalid credentials. Please try again.")]
    InvalidCredentials,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("An unexpected error occurred. Please try again.")]
    UnreachableBackend,

    #[error("Received a malformed token: {0}")]
    MalformedToken(#[from] TokenError),
}

impl From<BackendError> for SessionError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Rejected { status: 401, .. } => SessionError::InvalidCredentials,
            BackendError::Rejected { detail, .. } => SessionError::LoginFailed(
                detail
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| DEFAULT_LOGIN_DETAIL.to_string()),
            ),
            BackendError::Transport(_) => SessionError::UnreachableBackend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_mapping() {
        let unauthorized = BackendError::Rejected {
            status: 401,
            detail: Some("Incorrect username or password".to_string()),
        };
        assert_eq!(SessionError::from(unauthorized), SessionError::InvalidCredentials);

        let locked = BackendError::Rejected {
            status: 403,
            detail: Some("Account locked".to_string()),
        };
        assert_eq!(
            SessionError::from(locked).to_string(),
            "Login failed: Account locked"
        );

        let bare = BackendError::Rejected { status: 500, detail: None };
        assert_eq!(
            SessionError::from(bare).to_string(),
            "Login failed: Please try again later."
        );

        let down = BackendError::Transport("connection refused".to_string());
        assert_eq!(SessionError::from(down), SessionError::UnreachableBackend);
    }
}
