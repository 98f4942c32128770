//! Lock keys and stored lock entries

use std::fmt;
use tokio::time::Instant;

/// Key identifying one lockable unit of work, `"<scope>:<id>"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey(String);

impl LockKey {
    pub fn new(scope: &str, id: &str) -> Self {
        Self(format!("{scope}:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LockKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A held lock as stored by a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockEntry {
    /// Token of the acquisition that owns the lock
    pub owner: String,
    pub expires_at: Instant,
}

impl LockEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
