//! # Concurrent Processing
//!
//! Several service instances sharing one record store and one lock backend,
//! the way multiple engine processes share a cache server.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sc_03_distributed_lock::{InMemoryLockBackend, LockConfig, LockKey, LockManager};
    use sc_04_transaction_sync::test_utils::{mined_info, TestHarness};
    use sc_04_transaction_sync::{
        Outcome, SyncAction, SyncConfig, SyncService, SyncStatus, TransactionSyncApi,
    };

    /// One service per "process", each with its own lock manager over `backend`.
    fn instances(
        h: &TestHarness,
        backend: &Arc<InMemoryLockBackend>,
        count: usize,
    ) -> Vec<SyncService> {
        (0..count)
            .map(|_| {
                let mut ports = h.ports();
                ports.locks = LockManager::new(backend.clone(), LockConfig::default());
                SyncService::new(ports, h.config.clone())
            })
            .collect()
    }

    fn broadcast_only() -> SyncConfig {
        SyncConfig {
            broadcast_instant: false,
            paymail_p2p: false,
            sync_on_chain: false,
            ..SyncConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_racing_instances_broadcast_each_record_once() {
        let h = TestHarness::new();
        for (id, account) in [("a1", "xpub-a"), ("a2", "xpub-a"), ("b1", "xpub-b")] {
            h.record_owned(id, account, broadcast_only()).await;
        }
        h.broadcaster.delay(Duration::from_millis(50));

        let backend = Arc::new(InMemoryLockBackend::new());
        let services = instances(&h, &backend, 3);
        let reports = futures::future::join_all(
            services.iter().map(|s| s.process_broadcast_batch()),
        )
        .await;

        let completed: usize = reports
            .into_iter()
            .map(|r| r.unwrap().completed)
            .sum();
        assert_eq!(completed, 3);
        for id in ["a1", "a2", "b1"] {
            assert_eq!(h.broadcaster.calls(id), 1, "{id} broadcast more than once");
            assert_eq!(h.record(id).await.broadcast_status(), SyncStatus::Complete);
        }
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_lock_held_elsewhere_defers_the_attempt() {
        let h = TestHarness::new();
        h.record_transaction(
            "aa",
            SyncConfig {
                broadcast: false,
                paymail_p2p: false,
                ..SyncConfig::default()
            },
        )
        .await;
        h.chain.respond("aa", Ok(mined_info("aa", "node-1")));
        let poller = h.confirmation();

        let mut guard = h
            .locks
            .acquire(LockKey::new(SyncAction::Sync.lock_scope(), "aa"))
            .await
            .unwrap();

        assert_eq!(poller.process("aa").await.unwrap(), Outcome::Skipped);
        assert_eq!(h.chain.calls("aa"), 0);
        assert_eq!(h.record("aa").await.sync_status(), SyncStatus::Ready);

        guard.release().await.unwrap();
        assert_eq!(poller.process("aa").await.unwrap(), Outcome::Completed);
        assert_eq!(h.record("aa").await.sync_status(), SyncStatus::Complete);
    }

    #[tokio::test]
    async fn test_tracks_of_one_record_lock_independently() {
        let h = TestHarness::new();
        h.record_transaction(
            "aa",
            SyncConfig {
                broadcast_instant: false,
                paymail_p2p: false,
                ..SyncConfig::default()
            },
        )
        .await;
        h.chain.respond("aa", Ok(mined_info("aa", "node-1")));

        // A stuck broadcast lock does not block the confirmation track.
        let _broadcast_guard = h
            .locks
            .acquire(LockKey::new(SyncAction::Broadcast.lock_scope(), "aa"))
            .await
            .unwrap();

        let service = h.service();
        let broadcast = service.process_broadcast_batch().await.unwrap();
        assert_eq!(broadcast.skipped, 1);
        let sync = service.process_sync_batch().await.unwrap();
        assert_eq!(sync.completed, 1);

        let record = h.record("aa").await;
        assert_eq!(record.broadcast_status(), SyncStatus::Ready);
        assert_eq!(record.sync_status(), SyncStatus::Complete);
    }
}
