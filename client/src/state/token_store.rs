//! Bearer-token persistence.
//!
//! SYSTEM CONTEXT
//! ==============
//! The token is the only client state that survives a restart. It lives in a
//! key-value slot under [`TOKEN_KEY`]; the browser build used local storage,
//! native callers use [`FileSlot`], tests use [`MemorySlot`].
//!
//! Every value is trimmed on the way in and on the way out. A whitespace-only
//! value is the same as no value.

#[cfg(test)]
#[path = "token_store_test.rs"]
mod token_store_test;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Key of the token entry inside the slot.
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token slot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token slot is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("token slot lock poisoned")]
    Poisoned,
}

// =============================================================================
// SLOTS
// =============================================================================

/// A durable string-valued key-value slot.
pub trait TokenSlot: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, TokenStoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), TokenStoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), TokenStoreError>;
}

/// Process-local slot. Lost on exit.
#[derive(Default)]
pub struct MemorySlot {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-populated with a raw token value.
    #[must_use]
    pub fn with_token(raw: &str) -> Self {
        let slot = Self::new();
        if let Ok(mut entries) = slot.entries.lock() {
            entries.insert(TOKEN_KEY.to_owned(), raw.to_owned());
        }
        slot
    }
}

impl TokenSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        let entries = self.entries.lock().map_err(|_| TokenStoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        let mut entries = self.entries.lock().map_err(|_| TokenStoreError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        let mut entries = self.entries.lock().map_err(|_| TokenStoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON-object file slot (`{"token": "..."}`). A missing file is an empty slot.
pub struct FileSlot {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSlot {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, TokenStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl TokenSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        let _guard = self.lock.lock().map_err(|_| TokenStoreError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().map_err(|_| TokenStoreError::Poisoned)?;
        let mut entries = self.load()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().map_err(|_| TokenStoreError::Poisoned)?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// TOKEN STORE
// =============================================================================

/// Trimmed view over the `token` entry of a [`TokenSlot`].
///
/// Holds no cached copy: every `get` goes back to the slot, so independent
/// call sites always observe the latest write.
#[derive(Clone)]
pub struct TokenStore {
    slot: Arc<dyn TokenSlot>,
}

impl TokenStore {
    #[must_use]
    pub fn new(slot: Arc<dyn TokenSlot>) -> Self {
        Self { slot }
    }

    /// Current token, trimmed. `None` when absent, blank, or unreadable.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        match self.slot.read(TOKEN_KEY) {
            Ok(raw) => normalize(raw.as_deref()),
            Err(e) => {
                warn!(error = %e, "token store: read failed, treating as empty");
                None
            }
        }
    }

    /// Store `token`. A blank value clears the slot instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        match normalize(Some(token)) {
            Some(trimmed) => self.slot.write(TOKEN_KEY, &trimmed),
            None => self.slot.remove(TOKEN_KEY),
        }
    }

    /// Remove the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn clear(&self) -> Result<(), TokenStoreError> {
        self.slot.remove(TOKEN_KEY)
    }
}

fn normalize(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
