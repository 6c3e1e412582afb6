//! HTTP client for the authentication backend.
//!
//! Login is a form-encoded POST; refresh is an empty JSON POST carrying the
//! current token as a bearer credential. Both answer `{"access_token": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::{AuthBackend, BackendError, Credentials, TokenGrant};
use crate::config::Config;

/// Path of the staff login endpoint, relative to the backend base URL
const LOGIN_PATH: &str = "/auth/staff-login";

/// Path of the token refresh endpoint, relative to the backend base URL
const REFRESH_PATH: &str = "/auth/token/refresh";

/// HTTP implementation of [`AuthBackend`].
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpAuthBackend {
    client: Client,
    login_url: String,
    refresh_url: String,
}

impl HttpAuthBackend {
    /// Create a backend rooted at `base_url` (e.g. `http://localhost:8000/api/v1`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base = base_url.trim_end_matches('/');
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            login_url: format!("{}{}", base, LOGIN_PATH),
            refresh_url: format!("{}{}", base, REFRESH_PATH),
        })
    }

    /// Create a backend from the application configuration
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let backend = Self::new(&config.base_url, config.request_timeout())?;
        Ok(match config.login_url {
            Some(ref url) => backend.with_login_url(url.clone()),
            None => backend,
        })
    }

    /// Send logins somewhere other than the backend itself, such as a relay
    pub fn with_login_url(mut self, url: String) -> Self {
        self.login_url = url;
        self
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }

    /// Turn a response into a grant, or a rejection carrying the body's detail.
    async fn read_grant(response: reqwest::Response) -> Result<TokenGrant, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to parse token response: {}", e)))
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, BackendError> {
        debug!(url = %self.login_url, username = %credentials.username, "Sending login request");

        let response = self
            .client
            .post(&self.login_url)
            .header(header::ACCEPT, "application/json")
            .form(credentials)
            .send()
            .await?;

        Self::read_grant(response).await
    }

    async fn refresh(&self, current: &str) -> Result<TokenGrant, BackendError> {
        debug!(url = %self.refresh_url, "Sending token refresh request");

        let response = self
            .client
            .post(&self.refresh_url)
            .bearer_auth(current)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        Self::read_grant(response).await
    }
}
