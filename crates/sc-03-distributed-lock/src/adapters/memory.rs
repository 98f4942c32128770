//! # In-Memory Lock Backend
//!
//! Process-local backend with per-entry expiry. Expired entries are
//! reclaimed when their key is touched and by a periodic sweep, which
//! bounds memory when keys are never reused.

use crate::domain::entities::{LockEntry, LockKey};
use crate::domain::errors::LockError;
use crate::ports::outbound::LockBackend;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct State {
    entries: HashMap<LockKey, LockEntry>,
    last_gc: Instant,
}

/// Expiring lock table guarded by a mutex.
pub struct InMemoryLockBackend {
    state: Mutex<State>,
    gc_interval: Duration,
}

impl InMemoryLockBackend {
    /// Default sweep interval.
    pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        Self::with_gc_interval(Self::DEFAULT_GC_INTERVAL)
    }

    pub fn with_gc_interval(gc_interval: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                last_gc: Instant::now(),
            }),
            gc_interval,
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn gc(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        Self::sweep(&mut state, now)
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(state: &mut State, now: Instant) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        state.last_gc = now;
        let removed = before - state.entries.len();
        if removed > 0 {
            debug!(removed, "Expired locks swept");
        }
        removed
    }

    fn maybe_gc(&self, state: &mut State, now: Instant) {
        if now.duration_since(state.last_gc) >= self.gc_interval {
            Self::sweep(state, now);
        }
    }
}

impl Default for InMemoryLockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockBackend for InMemoryLockBackend {
    async fn try_acquire(
        &self,
        key: &LockKey,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.maybe_gc(&mut state, now);

        if let Some(existing) = state.entries.get(key) {
            if !existing.is_expired(now) {
                return Ok(false);
            }
        }

        state.entries.insert(
            key.clone(),
            LockEntry {
                owner: owner.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &LockKey, owner: &str) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut state = self.state.lock();

        match state.entries.get(key) {
            Some(entry) if entry.owner == owner => {
                let live = !entry.is_expired(now);
                state.entries.remove(key);
                Ok(live)
            }
            _ => Ok(false),
        }
    }

    async fn owner_of(&self, key: &LockKey) -> Result<Option<String>, LockError> {
        let now = Instant::now();
        let state = self.state.lock();
        Ok(state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.owner.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> LockKey {
        LockKey::new("process_sync", id)
    }

    const TTL: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_second_owner_refused() {
        let backend = InMemoryLockBackend::new();
        assert!(backend.try_acquire(&key("a"), "one", TTL).await.unwrap());
        assert!(!backend.try_acquire(&key("a"), "two", TTL).await.unwrap());
        assert!(backend.try_acquire(&key("b"), "two", TTL).await.unwrap());
        assert_eq!(backend.owner_of(&key("a")).await.unwrap().as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_release_requires_owner() {
        let backend = InMemoryLockBackend::new();
        backend.try_acquire(&key("a"), "one", TTL).await.unwrap();

        assert!(!backend.release(&key("a"), "two").await.unwrap());
        assert!(backend.release(&key("a"), "one").await.unwrap());
        assert!(!backend.release(&key("a"), "one").await.unwrap());
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_can_be_taken_over() {
        let backend = InMemoryLockBackend::new();
        backend.try_acquire(&key("a"), "crashed", TTL).await.unwrap();

        tokio::time::advance(TTL).await;

        assert_eq!(backend.owner_of(&key("a")).await.unwrap(), None);
        assert!(backend.try_acquire(&key("a"), "next", TTL).await.unwrap());
        // The crashed holder can no longer release the new owner's lock
        assert!(!backend.release(&key("a"), "crashed").await.unwrap());
        assert_eq!(backend.owner_of(&key("a")).await.unwrap().as_deref(), Some("next"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_removes_expired_entries() {
        let backend = InMemoryLockBackend::with_gc_interval(Duration::from_secs(5));
        for id in ["a", "b", "c"] {
            backend
                .try_acquire(&key(id), "o", Duration::from_secs(1))
                .await
                .unwrap();
        }
        assert_eq!(backend.len(), 3);

        tokio::time::advance(Duration::from_secs(6)).await;

        // Touching any key past the interval sweeps the table
        backend.try_acquire(&key("d"), "o", TTL).await.unwrap();
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.gc(), 0);
    }
}
