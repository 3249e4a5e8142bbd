//! Abstract storage trait for cuepoint.
//!
//! The engine treats persistence as a dumb key-value store of whole usage
//! records. By using a trait, we enable:
//! - In-memory backends for testing and embedded use
//! - File-backed backends for production
//! - Host-provided backends (platform preference stores) without changes here

use thiserror::Error;

use crate::state::UsageState;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend error (poisoned lock, unavailable store).
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Key-value store of usage records.
///
/// One engine instance is the single logical writer per key; implementations
/// must keep individual `set` calls atomic from the reader's perspective but
/// are not required to coordinate multiple writers.
pub trait StateStore: Send + Sync {
    /// Reads the record stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<UsageState>, StorageError>;

    /// Overwrites the record stored under `key`.
    fn set(&self, key: &str, state: &UsageState) -> Result<(), StorageError>;
}
