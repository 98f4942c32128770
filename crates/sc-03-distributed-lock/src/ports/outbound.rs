//! Outbound Ports (Driven Ports / SPI)

use crate::domain::entities::LockKey;
use crate::domain::errors::LockError;
use async_trait::async_trait;
use std::time::Duration;

/// Shared store holding lock entries.
///
/// Every process that must be mutually excluded talks to the same backend.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Atomically take `key` for `owner` unless someone else holds a live entry.
    ///
    /// Returns `Ok(false)` when the key is held by another owner.
    async fn try_acquire(&self, key: &LockKey, owner: &str, ttl: Duration)
        -> Result<bool, LockError>;

    /// Drop `key` if it is still owned by `owner`.
    ///
    /// Returns `Ok(false)` when the entry had expired or changed hands.
    async fn release(&self, key: &LockKey, owner: &str) -> Result<bool, LockError>;

    /// Current live owner of `key`, if any.
    async fn owner_of(&self, key: &LockKey) -> Result<Option<String>, LockError>;
}
