//! Error types for cuepoint.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific failure conditions and provides clear error
//! messages.

use thiserror::Error;

use crate::storage::StorageError;

/// Top-level error type for cuepoint.
///
/// This enum encompasses all possible errors that can occur when
/// constructing or operating a [`crate::ResponderEngine`].
#[derive(Debug, Error)]
pub enum CueError {
    /// The persistence backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The callback queue is full; the callback was dropped.
    #[error("Dispatch queue full (capacity {capacity}): callback dropped")]
    DispatchQueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The dispatch worker has terminated and no longer accepts callbacks.
    #[error("Dispatch worker disconnected")]
    DispatchDisconnected,

    /// The engine configuration is invalid.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// An internal invariant was violated.
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl CueError {
    /// Creates an invalid-configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a dispatch error.
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        matches!(
            self,
            Self::DispatchQueueFull { .. } | Self::DispatchDisconnected
        )
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Returns true if the operation that produced this error may succeed
    /// on a later attempt without the caller changing anything.
    ///
    /// Storage errors are recoverable: the engine keeps its in-memory
    /// state authoritative and the next successful persist catches the
    /// record up. Configuration errors are not.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage(_) | Self::DispatchQueueFull { .. } => true,
            Self::DispatchDisconnected | Self::InvalidConfig { .. } | Self::Internal { .. } => {
                false
            }
        }
    }
}

/// Result type alias for cuepoint operations.
pub type CueResult<T> = Result<T, CueError>;
