//! # Attempt Plumbing
//!
//! Shared by the three pipelines: lock the record, re-read it, count the
//! attempt, persist it, and bound every blocking call.
//!
//! ```text
//! acquire "process_{action}:{id}" ──► reload ──► track Ready? ──► attempts += 1
//!        │ held                           │ no
//!        ▼                                ▼
//!   Outcome::Skipped               Outcome::Skipped
//! ```

use sc_03_distributed_lock::{LockGuard, LockKey, LockManager};
use settlement_telemetry::{metric_inc, LOCK_CONTENTION, SYNC_ATTEMPTS};
use shared_types::Transaction;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::domain::{
    CounterField, Outcome, PageParams, RecordFilter, SyncAction, SyncError, SyncRecord,
    SyncStatus, PROVIDER_INTERNAL,
};
use crate::ports::outbound::{SyncRecordStore, TransactionRepository};

/// Await `call`, failing with `SyncError::Timeout` once `limit` elapses.
pub(crate) async fn bounded<T, E, F>(
    operation: &str,
    limit: Duration,
    call: F,
) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, E>>,
    SyncError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(SyncError::from),
        Err(_) => Err(SyncError::Timeout {
            operation: operation.to_string(),
        }),
    }
}

/// Provider to blame in a result entry for `err`.
pub(crate) fn provider_of(err: &SyncError) -> String {
    match err {
        SyncError::Chain(e) => e.provider().to_string(),
        SyncError::Paymail(e) => e.endpoint().to_string(),
        _ => String::new(),
    }
}

/// Count one finished attempt.
pub(crate) fn observe(action: SyncAction, result: &Result<Outcome, SyncError>) {
    let outcome = match result {
        Ok(outcome) => outcome.as_str(),
        Err(_) => "failed",
    };
    metric_inc!(SYNC_ATTEMPTS, &[action.as_str(), outcome]);
}

/// A record locked for one attempt on one track.
pub(crate) struct Attempt {
    pub record: SyncRecord,
    guard: LockGuard,
}

impl Attempt {
    /// Release the lock. Failures are logged; the key expires anyway.
    pub async fn finish(mut self) {
        if let Err(e) = self.guard.release().await {
            warn!(key = %self.guard.key(), error = %e, "Lock release failed");
        }
    }
}

/// Store access shared by every pipeline.
#[derive(Clone)]
pub(crate) struct RecordAccess {
    store: Arc<dyn SyncRecordStore>,
    repository: Arc<dyn TransactionRepository>,
    locks: LockManager,
    timeout: Duration,
}

impl RecordAccess {
    pub fn new(
        store: Arc<dyn SyncRecordStore>,
        repository: Arc<dyn TransactionRepository>,
        locks: LockManager,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            repository,
            locks,
            timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn SyncRecordStore> {
        &self.store
    }

    pub fn repository(&self) -> &Arc<dyn TransactionRepository> {
        &self.repository
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// First page of records whose `action` track is `Ready`.
    pub async fn find_ready(
        &self,
        action: SyncAction,
        page: PageParams,
    ) -> Result<Vec<SyncRecord>, SyncError> {
        bounded(
            "find_sync_records",
            self.timeout,
            self.store.find(&RecordFilter::ready_for(action), &page),
        )
        .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<SyncRecord>, SyncError> {
        bounded("find_sync_record", self.timeout, self.store.find_by_id(id)).await
    }

    /// Lock the record's `action` track and reload it.
    ///
    /// `Ok(None)` when the lock is held elsewhere or the track is no longer
    /// `Ready`; the caller has nothing to do in either case.
    pub async fn begin(&self, action: SyncAction, id: &str) -> Result<Option<Attempt>, SyncError> {
        let mut guard = match self.locks.acquire(LockKey::new(action.lock_scope(), id)).await {
            Ok(guard) => guard,
            Err(e) if e.is_contention() => {
                metric_inc!(LOCK_CONTENTION, &[action.as_str()]);
                debug!(tx_id = %id, action = %action, "Record locked elsewhere, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let loaded = match self.find_by_id(id).await {
            Ok(loaded) => loaded,
            Err(e) => {
                release_quietly(&mut guard).await;
                return Err(e);
            }
        };
        let mut record = match loaded {
            Some(record) => record,
            None => {
                release_quietly(&mut guard).await;
                return Err(SyncError::RecordNotFound(id.to_string()));
            }
        };

        if record.status(action) != SyncStatus::Ready {
            debug!(
                tx_id = %id,
                action = %action,
                status = %record.status(action),
                "Track already progressed, skipping"
            );
            release_quietly(&mut guard).await;
            return Ok(None);
        }

        match bounded(
            "increment_attempts",
            self.timeout,
            self.store.increment_field(id, CounterField::Attempts, 1),
        )
        .await
        {
            Ok(attempts) => record.set_attempts(attempts),
            Err(e) => {
                release_quietly(&mut guard).await;
                return Err(e);
            }
        }

        Ok(Some(Attempt { record, guard }))
    }

    /// The record's transaction, loading and caching it when needed.
    pub async fn transaction(
        &self,
        record: &mut SyncRecord,
    ) -> Result<Option<Transaction>, SyncError> {
        if let Some(tx) = record.transaction() {
            return Ok(Some(tx.clone()));
        }
        let loaded = self.load_transaction(record.id()).await?;
        if let Some(tx) = &loaded {
            record.set_transaction(tx.clone());
        }
        Ok(loaded)
    }

    pub async fn load_transaction(&self, id: &str) -> Result<Option<Transaction>, SyncError> {
        bounded("get_transaction", self.timeout, self.repository.get_transaction(id)).await
    }

    /// Persist a successful transition.
    ///
    /// A failed save forces the track to `Error` with the store's message,
    /// tries once more to persist that, and surfaces the original error.
    pub async fn commit(
        &self,
        record: &mut SyncRecord,
        action: SyncAction,
    ) -> Result<(), SyncError> {
        match self.save(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                record.record_attempt(action, SyncStatus::Error, PROVIDER_INTERNAL, e.to_string());
                self.save_logged(record).await;
                Err(e)
            }
        }
    }

    /// Persist a failure transition; a save error is only logged.
    pub async fn save_logged(&self, record: &SyncRecord) {
        if let Err(e) = self.save(record).await {
            error!(tx_id = %record.id(), error = %e, "Failed to persist sync record");
        }
    }

    async fn save(&self, record: &SyncRecord) -> Result<(), SyncError> {
        bounded("save_sync_record", self.timeout, self.store.save(record)).await
    }
}

async fn release_quietly(guard: &mut LockGuard) {
    if let Err(e) = guard.release().await {
        warn!(key = %guard.key(), error = %e, "Lock release failed");
    }
}
