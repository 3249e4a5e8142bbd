//! In-memory storage backend.
//!
//! Thread-safe in-memory implementation of [`StateStore`]. Intended for
//! embedded usage, tests, and as a reference implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::state::UsageState;
use crate::storage::traits::{StateStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// In-memory [`StateStore`] over a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    records: RwLock<HashMap<String, UsageState>>,
}

impl InMemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<UsageState>, StorageError> {
        let guard = self.records.read().map_err(|_| lock_err("memory get"))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, state: &UsageState) -> Result<(), StorageError> {
        let mut guard = self.records.write().map_err(|_| lock_err("memory set"))?;
        guard.insert(key.to_string(), state.clone());
        Ok(())
    }
}
