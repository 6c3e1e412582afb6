use anyhow::{Context, Result};
use chrono::Duration;
use keyring::Entry;

use super::{Token, TokenStore};

const SERVICE_NAME: &str = "tokenward";

/// Token kept in the OS keychain.
///
/// The keychain has no notion of expiry, so the ttl hint is not applied.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Result<Option<Token>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(Some(Token::new(raw))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, token: &Token, _ttl_hint: Duration) -> Result<()> {
        self.entry()?
            .set_password(token.as_str())
            .context("Failed to store token in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
