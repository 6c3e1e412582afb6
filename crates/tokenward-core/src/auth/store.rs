use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Token;

/// Token file name in cache directory
const TOKEN_FILE: &str = "session.json";

/// The persisted slot holding the current token.
///
/// `ttl_hint` is advisory: a store may drop its copy after that long, which
/// is unrelated to the expiry embedded in the token itself.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<Token>>;

    fn set(&self, token: &Token, ttl_hint: Duration) -> Result<()>;

    /// Removing an empty slot succeeds
    fn remove(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: Token,
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl StoredToken {
    fn is_stale(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Token persisted as JSON in the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn token_path(&self) -> PathBuf {
        self.cache_dir.join(TOKEN_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<Token>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let stored: StoredToken =
            serde_json::from_str(&contents).context("Failed to parse token file")?;

        if stored.is_stale() {
            debug!(expires_at = %stored.expires_at, "Stored token outlived its ttl, discarding");
            self.remove()?;
            return Ok(None);
        }

        Ok(Some(stored.token))
    }

    fn set(&self, token: &Token, ttl_hint: Duration) -> Result<()> {
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl_hint)
            .context("Token ttl is out of range")?;
        let stored = StoredToken {
            token: token.clone(),
            stored_at: now,
            expires_at,
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&path, contents).context("Failed to write token file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

/// Token kept in process memory only.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<Token>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<Token>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Token slot lock poisoned"))?;
        Ok(slot.clone())
    }

    fn set(&self, token: &Token, _ttl_hint: Duration) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Token slot lock poisoned"))?;
        *slot = Some(token.clone());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Token slot lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::make_token;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("cache"));
        assert!(store.get().expect("get").is_none());

        let token = Token::new(make_token(2_000_000_000));
        store.set(&token, Duration::days(1)).expect("set");
        assert_eq!(store.get().expect("get"), Some(token));

        store.remove().expect("remove");
        assert!(store.get().expect("get").is_none());
    }

    #[test]
    fn test_file_store_remove_when_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().to_path_buf());
        store.remove().expect("first remove");
        store.remove().expect("second remove");
    }

    #[test]
    fn test_file_store_honours_ttl_hint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().to_path_buf());

        // A negative hint puts the copy's expiry in the past
        let token = Token::new(make_token(2_000_000_000));
        store.set(&token, Duration::seconds(-1)).expect("set");

        assert!(store.get().expect("get").is_none());
        assert!(!dir.path().join(TOKEN_FILE).exists());
    }

    #[test]
    fn test_file_store_rejects_out_of_range_ttl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().to_path_buf());

        let token = Token::new(make_token(2_000_000_000));
        assert!(store.set(&token, Duration::days(100_000_000)).is_err());
        assert!(store.get().expect("get").is_none());
    }

    #[test]
    fn test_file_store_corrupt_file_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(TOKEN_FILE), "not json").expect("write");
        let store = FileTokenStore::new(dir.path().to_path_buf());
        assert!(store.get().is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::new();
        let token = Token::new("a.b.c");
        store.set(&token, Duration::days(1)).expect("set");
        assert_eq!(store.get().expect("get"), Some(token));
        store.remove().expect("remove");
        assert_eq!(store.get().expect("get"), None);
    }
}
