//! Core library for tokenward.
//!
//! Keeps a client-side session backed by a short-lived JWT: restores it at
//! startup, logs in and out, watches the token's remaining lifetime and
//! offers renewal before it runs out.
//!
//! - [`auth`]: token decoding, token storage, and the [`auth::SessionController`]
//! - [`api`]: the [`api::AuthBackend`] capability and its HTTP client
//! - [`relay`]: HTTP route forwarding form logins to the backend
//! - [`config`]: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod relay;

#[cfg(test)]
mod testing;

pub use api::{AuthBackend, BackendError, Credentials, HttpAuthBackend, TokenGrant};
pub use auth::{
    Capabilities, Clock, FileTokenStore, KeyringTokenStore, MemoryTokenStore, RenewalPrompt,
    Router, Session, SessionController, SessionError, SessionSettings, SessionState,
    SystemClock, TickOutcome, Token, TokenError, TokenStore, WatchHandle,
};
pub use config::{Config, TokenStorage};
