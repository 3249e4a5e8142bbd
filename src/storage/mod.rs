//! Storage backends for persisted usage state.
//!
//! The [`StateStore`] trait defines the abstract key-value contract; the
//! in-memory and file-backed implementations live in their own modules.

mod file;
mod memory;
mod traits;

pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
pub use traits::{StateStore, StorageError};
