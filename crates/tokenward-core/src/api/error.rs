use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend answered with a non-success status
    #[error("Backend rejected request with status {status}: {detail:?}")]
    Rejected { status: u16, detail: Option<String> },

    /// No usable response came back (connect failure, timeout, bad body)
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Maximum length for detail messages lifted from response bodies
const MAX_DETAIL_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl BackendError {
    /// Truncate a detail message to avoid logging excessive data
    fn truncate_detail(detail: &str) -> String {
        if detail.len() <= MAX_DETAIL_LENGTH {
            detail.to_string()
        } else {
            let mut end = MAX_DETAIL_LENGTH;
            while !detail.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &detail[..end], detail.len())
        }
    }

    /// Build a rejection from a status code and the raw response body.
    ///
    /// The backend reports failures as `{"detail": ...}`. A string detail is
    /// taken as-is; any other JSON value is kept in its serialized form.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .map(|value| match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .map(|d| Self::truncate_detail(&d));

        BackendError::Rejected { status, detail }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Rejected { status, .. } => Some(*status),
            BackendError::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e.to_string())
    }
}
