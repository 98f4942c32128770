//! # In-Memory Sync Record Store
//!
//! Records live in a map keyed by transaction id. Each insert gets a
//! sequence number so records created within the same clock tick still
//! page in insertion order.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::TxId;
use std::collections::HashMap;

use crate::domain::{
    CounterField, OrderDirection, PageParams, RecordFilter, StoreError, SyncRecord,
};
use crate::ports::outbound::SyncRecordStore;

struct Stored {
    seq: u64,
    record: SyncRecord,
}

#[derive(Default)]
struct State {
    records: HashMap<TxId, Stored>,
    next_seq: u64,
}

/// Process-local [`SyncRecordStore`].
#[derive(Default)]
pub struct InMemorySyncRecordStore {
    state: RwLock<State>,
}

impl InMemorySyncRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SyncRecordStore for InMemorySyncRecordStore {
    async fn create(&self, record: &SyncRecord) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if state.records.contains_key(record.id()) {
            return Err(StoreError::AlreadyExists(record.id().to_string()));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.records.insert(
            record.id().to_string(),
            Stored {
                seq,
                record: record.detached(),
            },
        );
        Ok(())
    }

    async fn find(
        &self,
        filter: &RecordFilter,
        page: &PageParams,
    ) -> Result<Vec<SyncRecord>, StoreError> {
        let state = self.state.read();
        let mut matching: Vec<&Stored> = state
            .records
            .values()
            .filter(|s| filter.matches(&s.record))
            .collect();

        matching.sort_by_key(|s| (s.record.created_at(), s.seq));
        if page.direction == OrderDirection::Descending {
            matching.reverse();
        }

        Ok(matching
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .map(|s| s.record.clone())
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SyncRecord>, StoreError> {
        Ok(self.state.read().records.get(id).map(|s| s.record.clone()))
    }

    async fn save(&self, record: &SyncRecord) -> Result<(), StoreError> {
        let mut state = self.state.write();
        match state.records.get_mut(record.id()) {
            Some(stored) => {
                stored.record = record.detached();
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id().to_string())),
        }
    }

    async fn increment_field(
        &self,
        id: &str,
        field: CounterField,
        by: u64,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write();
        let stored = state
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match field {
            CounterField::Attempts => {
                let next = stored.record.attempts().saturating_add(by);
                stored.record.set_attempts(next);
                Ok(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SyncAction, SyncConfig, SyncStatus};
    use shared_types::Transaction;

    fn record(id: &str) -> SyncRecord {
        SyncRecord::new(id, SyncConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate() {
        let store = InMemorySyncRecordStore::new();
        store.create(&record("aa")).await.unwrap();
        assert_eq!(
            store.create(&record("aa")).await,
            Err(StoreError::AlreadyExists("aa".to_string()))
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_orders_and_pages() {
        let store = InMemorySyncRecordStore::new();
        for id in ["a", "b", "c", "d"] {
            store.create(&record(id)).await.unwrap();
        }
        let filter = RecordFilter::ready_for(SyncAction::Broadcast);

        let first = store.find(&filter, &PageParams::oldest_first(3)).await.unwrap();
        let ids: Vec<&str> = first.iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let second = PageParams {
            page: 2,
            ..PageParams::oldest_first(3)
        };
        let rest = store.find(&filter, &second).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id(), "d");

        let newest = store.find(&filter, &PageParams::newest_first(2)).await.unwrap();
        let ids: Vec<&str> = newest.iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["d", "c"]);
    }

    #[tokio::test]
    async fn test_find_filters_by_status() {
        let store = InMemorySyncRecordStore::new();
        let mut done = record("done");
        store.create(&done).await.unwrap();
        store.create(&record("open")).await.unwrap();

        done.complete_broadcast("node");
        store.save(&done).await.unwrap();

        let ready = store
            .find(
                &RecordFilter::ready_for(SyncAction::Broadcast),
                &PageParams::oldest_first(10),
            )
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id(), "open");

        let p2p_ready = store
            .find(
                &RecordFilter::default().with_status(SyncAction::P2p, SyncStatus::Ready),
                &PageParams::oldest_first(10),
            )
            .await
            .unwrap();
        assert_eq!(p2p_ready.len(), 1);
        assert_eq!(p2p_ready[0].id(), "done");
    }

    #[tokio::test]
    async fn test_save_strips_transaction_and_requires_existing() {
        let store = InMemorySyncRecordStore::new();
        let mut rec = record("aa");
        assert_eq!(
            store.save(&rec).await,
            Err(StoreError::NotFound("aa".to_string()))
        );

        store.create(&rec).await.unwrap();
        rec.set_transaction(Transaction::new("aa", "00"));
        store.save(&rec).await.unwrap();

        let loaded = store.find_by_id("aa").await.unwrap().unwrap();
        assert!(loaded.transaction().is_none());
    }

    #[tokio::test]
    async fn test_increment_returns_new_value() {
        let store = InMemorySyncRecordStore::new();
        store.create(&record("aa")).await.unwrap();

        assert_eq!(store.increment_field("aa", CounterField::Attempts, 1).await, Ok(1));
        assert_eq!(store.increment_field("aa", CounterField::Attempts, 2).await, Ok(3));
        assert_eq!(
            store.find_by_id("aa").await.unwrap().unwrap().attempts(),
            3
        );
        assert!(store
            .increment_field("zz", CounterField::Attempts, 1)
            .await
            .is_err());
    }
}
