//! Bearer token decoding.
//!
//! Tokens are JWTs. Only the payload is read, to find the `exp` claim; the
//! signature is the backend's business and is never checked here.

use std::fmt;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token must have three dot-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("token payload is not valid base64url")]
    Encoding,

    #[error("token payload is not a valid claims object: {0}")]
    Claims(String),
}

/// Claims read out of a token payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
}

/// An issued bearer token. Never mutated; a refresh produces a new one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Decode the claims carried by this token
    pub fn decode(&self) -> Result<Claims, TokenError> {
        decode(&self.0)
    }

    /// Expiry timestamp in seconds since the epoch
    pub fn expiry(&self) -> Result<i64, TokenError> {
        self.decode().map(|claims| claims.exp)
    }

    /// Seconds left before expiry relative to `now`. Negative once expired.
    pub fn seconds_until_expiry(&self, now: i64) -> Result<i64, TokenError> {
        seconds_until_expiry(&self.0, now)
    }
}

// Keep credentials out of logs
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} bytes>)", self.0.len())
    }
}

/// Decode a raw token string into its claims.
pub fn decode(raw: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    let payload = segments[1];
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .map_err(|_| TokenError::Encoding)?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))
}

/// `decode(raw).exp - now`. An `exp` too far from `now` to subtract is
/// treated as an unreadable claim.
pub fn seconds_until_expiry(raw: &str, now: i64) -> Result<i64, TokenError> {
    let claims = decode(raw)?;
    claims
        .exp
        .checked_sub(now)
        .ok_or_else(|| TokenError::Claims(format!("exp {} is out of range", claims.exp)))
}
