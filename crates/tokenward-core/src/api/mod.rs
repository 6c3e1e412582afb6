//! Authentication backend access.
//!
//! This module provides the `AuthBackend` capability the session controller
//! talks to, and `HttpAuthBackend`, its implementation over HTTP.
//!
//! The backend exchanges form-encoded credentials for a JWT bearer token and
//! renews a still-valid token on request.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod client;
pub mod error;

pub use client::HttpAuthBackend;
pub use error::BackendError;

/// Login form submitted by the user.
///
/// Fields besides the username and password (`grant_type`, `scope`,
/// `client_id`, ...) are carried through to the backend untouched.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            extra: BTreeMap::new(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Successful token response.
///
/// Fields other than `access_token` (token type, user info) are kept so the
/// login relay can hand the backend's body back unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenGrant {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// The authentication backend the session is established against.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for a token
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, BackendError>;

    /// Exchange a still-valid token for a fresh one
    async fn refresh(&self, current: &str) -> Result<TokenGrant, BackendError>;
}
