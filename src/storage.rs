//! Local storage collaborator.
//!
//! Operator consoles may cache session data locally. Clearing that cache is an
//! operator action of its own: it never touches the live session, its token,
//! or the configuration snapshot.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AdminError, Result};

/// A local key/value cache the operator can wipe.
pub trait LocalStorage: Send + Sync + 'static {
    /// Remove every cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be cleared.
    fn clear(&self) -> Result<()>;
}

/// An in-process [`LocalStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.entries()?.insert(key.into(), value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.entries()?.is_empty())
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AdminError::Io(std::io::Error::other("local storage lock poisoned")))
    }
}

impl LocalStorage for MemoryStorage {
    fn clear(&self) -> Result<()> {
        self.entries()?.clear();
        Ok(())
    }
}
