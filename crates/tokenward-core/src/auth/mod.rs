//! Authentication module for managing the bearer token session.
//!
//! This module provides:
//! - `Token`: JWT bearer token with its decoded expiry
//! - `SessionController`: login, refresh, logout and the expiry watch
//! - `TokenStore`: persisted token slot (file, OS keychain, or memory)
//! - `Router`, `RenewalPrompt`, `Clock`: collaborators supplied by the front end
//!
//! The expiry watch checks the token every minute and offers renewal once two
//! minutes or less remain.

pub mod capabilities;
pub mod controller;
pub mod error;
pub mod keychain;
pub mod store;
pub mod token;

pub use capabilities::{Clock, RenewalPrompt, Router, SystemClock};
pub use controller::{
    Capabilities, Session, SessionController, SessionSettings, SessionState, TickOutcome,
    WatchHandle,
};
pub use error::SessionError;
pub use keychain::KeyringTokenStore;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{Claims, Token, TokenError};
