//! Error types for the lock manager

use thiserror::Error;

/// Errors from lock acquisition and release
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Another holder owns the key
    #[error("Lock already held: {key}")]
    AlreadyHeld { key: String },

    /// Waited for the key until the acquire timeout expired
    #[error("Timed out after {waited_ms}ms waiting for lock: {key}")]
    Timeout { key: String, waited_ms: u64 },

    /// The lock backend failed
    #[error("Lock backend error: {0}")]
    Backend(String),
}

impl LockError {
    /// True when the key is simply busy (as opposed to a backend failure).
    pub fn is_contention(&self) -> bool {
        matches!(self, LockError::AlreadyHeld { .. } | LockError::Timeout { .. })
    }
}
