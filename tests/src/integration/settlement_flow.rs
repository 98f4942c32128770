//! # Settlement Flow
//!
//! A recorded transaction travelling through every track:
//!
//! 1. **Create**: the record is created with all tracks enabled and an
//!    instant broadcast
//! 2. **Broadcast**: the broadcast completes, its notification is queued on the
//!    real `NotificationDispatcher` and the P2P track is released
//! 3. **P2P**: chained directly after the broadcast, every paymail output is
//!    notified
//! 4. **Confirmation**: the periodic pass finds the transaction on-chain and
//!    attaches its Merkle proof

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use sc_01_compound_merkle_path::ToCompoundMerklePath;
    use sc_04_transaction_sync::test_utils::{mined_info, p2p_draft, TestHarness};
    use sc_04_transaction_sync::{
        ChainError, PaymailError, SyncAction, SyncConfig, SyncService, SyncStatus,
        TransactionSyncApi,
    };
    use shared_bus::{
        CollectingNotificationSink, EventPublisher, EventType, NotificationDispatcher,
        NotificationSink, NotifyError, SyncEvent,
    };
    use shared_types::Transaction;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    const ALICE: &str = "https://alice.example/p2p";
    const BOB: &str = "https://bob.example/p2p";

    /// Service whose broadcast notifications go through a real dispatcher.
    fn service_with_dispatcher(
        h: &TestHarness,
        sink: Arc<dyn NotificationSink>,
    ) -> (SyncService, Arc<NotificationDispatcher>) {
        let dispatcher = Arc::new(NotificationDispatcher::spawn(sink));
        let mut ports = h.ports();
        ports.events = dispatcher.clone();
        (SyncService::new(ports, h.config.clone()), dispatcher)
    }

    fn drafted_transaction(id: &str, draft_id: &str) -> Transaction {
        let mut tx = Transaction::new(id, format!("hex-{id}"));
        tx.draft_id = draft_id.to_string();
        tx.xpub_in_ids.push("xpub-owner".to_string());
        tx
    }

    /// Sink refusing every event.
    #[derive(Default)]
    struct RefusingSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSink for RefusingSink {
        async fn notify(&self, _event: &SyncEvent) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::Delivery("webhook unreachable".to_string()))
        }
    }

    // =========================================================================
    // FULL LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_record_settles_across_all_tracks() {
        let h = TestHarness::new();
        h.repository.insert_draft(p2p_draft("draft-1", &[ALICE, BOB]));
        h.repository
            .insert_transaction(drafted_transaction("aa", "draft-1"));

        let sink = Arc::new(CollectingNotificationSink::new());
        let (service, dispatcher) = service_with_dispatcher(&h, sink.clone());

        // Instant broadcast chains straight into P2P.
        let record = service
            .create_sync_record("aa", SyncConfig::default())
            .await
            .unwrap();
        assert_eq!(record.broadcast_status(), SyncStatus::Complete);
        assert_eq!(record.p2p_status(), SyncStatus::Complete);
        assert_eq!(record.sync_status(), SyncStatus::Ready);
        assert_eq!(h.paymail.sent().len(), 2);

        // Not mined yet: the record stays Ready.
        let report = service.process_sync_batch().await.unwrap();
        assert_eq!(report.deferred, 1);
        assert_eq!(h.record("aa").await.sync_status(), SyncStatus::Ready);

        h.chain.respond("aa", Ok(mined_info("aa", "node-2")));
        let report = service.process_sync_batch().await.unwrap();
        assert_eq!(report.completed, 1);

        let record = h.record("aa").await;
        assert!(record.is_settled());
        assert_eq!(
            record.last_message(),
            "transaction was found on-chain by node-2"
        );

        dispatcher.shutdown().await;
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Broadcast);
        assert_eq!(events[0].model_type, "sync_transaction");
        assert_eq!(events[0].id, "aa");
        assert_eq!(events[0].model["broadcastStatus"], "complete");
    }

    #[tokio::test]
    async fn test_confirmed_proof_converts_to_compound_path() {
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

        h.service().process_sync_batch().await.unwrap();

        let tx = h.transaction("aa").await;
        assert!(tx.is_mined());
        let proof = tx.merkle_proof.expect("proof attached on confirmation");
        let path = proof.to_compound_merkle_path();

        assert_eq!(path.height(), 3);
        assert_eq!(path.offset_of(0, "aa"), Some(3));
        assert_eq!(path.offset_of(0, "h0"), Some(2));
        assert_eq!(path.offset_of(1, "h1"), Some(0));
        assert_eq!(path.offset_of(2, "h2"), Some(1));
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_touch_records() {
        let h = TestHarness::new();
        h.insert_transaction("aa");

        let sink = Arc::new(RefusingSink::default());
        let (service, dispatcher) = service_with_dispatcher(&h, sink.clone());

        let record = service
            .create_sync_record(
                "aa",
                SyncConfig {
                    paymail_p2p: false,
                    ..SyncConfig::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(record.broadcast_status(), SyncStatus::Complete);

        dispatcher.shutdown().await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.events_delivered(), 0);
        assert_eq!(dispatcher.events_dropped(), 0);
        assert_eq!(
            h.record("aa").await.broadcast_status(),
            SyncStatus::Complete
        );
    }

    // =========================================================================
    // BATCH SEMANTICS
    // =========================================================================

    #[tokio::test]
    async fn test_failing_account_stops_only_its_own_group() {
        let h = TestHarness::new();
        let config = SyncConfig {
            broadcast_instant: false,
            paymail_p2p: false,
            ..SyncConfig::default()
        };
        h.record_owned("x1", "xpub-x", config).await;
        h.record_owned("y1", "xpub-y", config).await;
        h.record_owned("x2", "xpub-x", config).await;
        h.record_owned("y2", "xpub-y", config).await;
        h.broadcaster.fail(
            "x1",
            ChainError::Provider {
                provider: "node-1".to_string(),
                message: "mempool conflict".to_string(),
            },
        );

        let report = h.service().process_broadcast_batch().await.unwrap();

        assert_eq!(report.selected, 4);
        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.halted, 1);
        assert_eq!(h.record("x1").await.broadcast_status(), SyncStatus::Error);
        assert_eq!(h.record("x2").await.broadcast_status(), SyncStatus::Ready);
        assert_eq!(h.record("y1").await.broadcast_status(), SyncStatus::Complete);
        assert_eq!(h.record("y2").await.broadcast_status(), SyncStatus::Complete);
        assert_eq!(h.broadcaster.calls("x2"), 0);
    }

    #[tokio::test]
    async fn test_partial_p2p_failure_commits_nothing() {
        let h = TestHarness::new();
        h.repository.insert_draft(p2p_draft("draft-1", &[ALICE, BOB]));
        h.record_transaction_with_draft(
            "aa",
            "draft-1",
            SyncConfig {
                broadcast: false,
                sync_on_chain: false,
                ..SyncConfig::default()
            },
        )
        .await;
        h.release_p2p("aa").await;
        h.paymail.respond(
            BOB,
            Err(PaymailError::Delivery {
                endpoint: BOB.to_string(),
                message: "503 service unavailable".to_string(),
            }),
        );
        let before = h.record("aa").await.results().len();

        let report = h.service().process_p2p_batch().await.unwrap();
        assert_eq!(report.failed, 1);

        let record = h.record("aa").await;
        assert_eq!(record.p2p_status(), SyncStatus::Ready);
        assert_eq!(record.results().len(), before + 1);
        let last = record.results().last().unwrap();
        assert_eq!(last.action, SyncAction::P2p);
        assert_eq!(last.provider, BOB);
        assert!(record
            .results()
            .iter()
            .all(|r| !r.status_message.starts_with("success")));

        // Once the endpoint recovers the next pass completes.
        h.paymail.respond(BOB, Ok("remote-bob".to_string()));
        h.service().process_p2p_batch().await.unwrap();
        assert_eq!(h.record("aa").await.p2p_status(), SyncStatus::Complete);
    }

    #[tokio::test]
    async fn test_skipped_tracks_are_never_selected() {
        let h = TestHarness::new();
        h.record_transaction("aa", SyncConfig::disabled()).await;
        h.chain.respond("aa", Ok(mined_info("aa", "node-1")));
        let service = h.service();

        assert_eq!(service.process_broadcast_batch().await.unwrap().selected, 0);
        assert_eq!(service.process_sync_batch().await.unwrap().selected, 0);
        assert_eq!(service.process_p2p_batch().await.unwrap().selected, 0);

        let record = h.record("aa").await;
        assert!(record.is_skipped());
        assert_eq!(h.chain.calls("aa"), 0);
    }
}
