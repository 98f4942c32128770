//! Configuration for the lock manager

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lock acquisition settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long a lock lives if its holder never releases it
    pub ttl: Duration,
    /// How long `acquire` keeps retrying a held key (zero = single attempt)
    pub acquire_timeout: Duration,
    /// Delay between retries while waiting
    pub retry_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            acquire_timeout: Duration::ZERO,
            retry_interval: Duration::from_millis(100),
        }
    }
}

impl LockConfig {
    /// Fail fast on contention, with the given TTL.
    pub fn try_once(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn waits(&self) -> bool {
        !self.acquire_timeout.is_zero()
    }
}
