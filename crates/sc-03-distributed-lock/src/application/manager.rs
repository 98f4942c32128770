//! # Lock Manager
//!
//! Hands out `LockGuard`s for keys. A guard is the only proof of ownership:
//! a failed acquisition returns an error and no guard, so there is nothing
//! to release.

use crate::adapters::memory::InMemoryLockBackend;
use crate::config::LockConfig;
use crate::domain::entities::LockKey;
use crate::domain::errors::LockError;
use crate::ports::outbound::LockBackend;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Acquires keyed locks on a shared backend.
#[derive(Clone)]
pub struct LockManager {
    backend: Arc<dyn LockBackend>,
    config: LockConfig,
}

impl LockManager {
    pub fn new(backend: Arc<dyn LockBackend>, config: LockConfig) -> Self {
        Self { backend, config }
    }

    /// Manager over a fresh process-local backend.
    pub fn in_memory(config: LockConfig) -> Self {
        Self::new(Arc::new(InMemoryLockBackend::new()), config)
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Take `key`, retrying until `acquire_timeout` when configured to wait.
    ///
    /// # Errors
    ///
    /// - `LockError::AlreadyHeld` when the key is busy and waiting is disabled
    /// - `LockError::Timeout` when the key stayed busy for the whole timeout
    /// - `LockError::Backend` when the backend failed
    pub async fn acquire(&self, key: LockKey) -> Result<LockGuard, LockError> {
        let owner = Uuid::new_v4().to_string();
        let started = Instant::now();

        loop {
            if self
                .backend
                .try_acquire(&key, &owner, self.config.ttl)
                .await?
            {
                debug!(key = %key, "Lock acquired");
                return Ok(LockGuard {
                    key,
                    owner,
                    backend: self.backend.clone(),
                    released: false,
                });
            }

            if !self.config.waits() {
                return Err(LockError::AlreadyHeld {
                    key: key.to_string(),
                });
            }

            let waited = started.elapsed();
            if waited >= self.config.acquire_timeout {
                return Err(LockError::Timeout {
                    key: key.to_string(),
                    waited_ms: waited.as_millis() as u64,
                });
            }
            let remaining = self.config.acquire_timeout - waited;
            tokio::time::sleep(self.config.retry_interval.min(remaining)).await;
        }
    }

    /// Whether anyone currently holds `key`.
    pub async fn is_held(&self, key: &LockKey) -> Result<bool, LockError> {
        Ok(self.backend.owner_of(key).await?.is_some())
    }
}

/// Proof of ownership of one key.
///
/// Released explicitly with [`LockGuard::release`] or, failing that, on drop
/// (the release then runs as a task on the current tokio runtime).
pub struct LockGuard {
    key: LockKey,
    owner: String,
    backend: Arc<dyn LockBackend>,
    released: bool,
}

impl LockGuard {
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Release the key. Calling it again after success is a no-op.
    pub async fn release(&mut self) -> Result<(), LockError> {
        if self.released {
            return Ok(());
        }
        let still_owned = self.backend.release(&self.key, &self.owner).await?;
        self.released = true;
        if still_owned {
            debug!(key = %self.key, "Lock released");
        } else {
            warn!(key = %self.key, "Lock expired before release");
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let backend = self.backend.clone();
        let key = self.key.clone();
        let owner = std::mem::take(&mut self.owner);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = backend.release(&key, &owner).await {
                        warn!(key = %key, error = %e, "Deferred lock release failed");
                    }
                });
            }
            Err(_) => {
                warn!(key = %key, "Lock dropped outside a runtime, left to expire");
            }
        }
    }
}
