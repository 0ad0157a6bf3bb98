//! Error types for distributed mutex operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// Lock acquisition timed out before a token became available.
    #[error("lock acquisition timed out after {0:?}")]
    Timeout(Duration),

    /// Lock acquisition was cancelled by the caller.
    #[error("lock operation was cancelled")]
    Cancelled,

    /// The store could not be reached (I/O failure, dropped connection, timeout).
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid lock name.
    #[error("invalid lock name: {0}")]
    InvalidName(String),

    /// The store answered with an error.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LockError {
    /// Returns `true` if this is an acquisition timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns `true` if the failure came from the store rather than from the
    /// lock protocol itself.
    ///
    /// Callers branch on this to tell "the lock is busy" apart from "the
    /// store is broken".
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Backend(_))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
