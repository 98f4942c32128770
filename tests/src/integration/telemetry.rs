//! # Telemetry Around Pipeline Passes
//!
//! Metrics recorded by real passes, read back through the Prometheus text
//! encoder the way a scrape endpoint would.

#[cfg(test)]
mod tests {
    use sc_03_distributed_lock::LockKey;
    use sc_04_transaction_sync::test_utils::TestHarness;
    use sc_04_transaction_sync::{Outcome, SyncAction, SyncConfig, TransactionSyncApi};
    use settlement_telemetry::{
        encode_metrics, init_telemetry, TelemetryConfig, BATCH_DURATION, LOCK_CONTENTION,
        SYNC_ATTEMPTS,
    };

    fn broadcast_only() -> SyncConfig {
        SyncConfig {
            broadcast_instant: false,
            paymail_p2p: false,
            sync_on_chain: false,
            ..SyncConfig::default()
        }
    }

    #[tokio::test]
    async fn test_pass_is_visible_in_scrape_output() {
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };
        let _guard = init_telemetry(&config).unwrap();

        let h = TestHarness::new();
        h.record_owned("aa", "xpub-a", broadcast_only()).await;
        let passes_before = BATCH_DURATION
            .with_label_values(&["broadcast"])
            .get_sample_count();

        let report = h.service().process_broadcast_batch().await.unwrap();
        assert_eq!(report.completed, 1);

        assert!(
            BATCH_DURATION
                .with_label_values(&["broadcast"])
                .get_sample_count()
                > passes_before
        );
        let text = encode_metrics().unwrap();
        assert!(text.contains("sc_sync_attempts_total"));
        assert!(text.contains(r#"action="broadcast",outcome="complete""#));
        assert!(text.contains("sc_batch_duration_seconds"));
    }

    #[tokio::test]
    async fn test_contention_and_failures_are_counted() {
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
        h.chain.panic_on("aa");

        let contended = LOCK_CONTENTION.with_label_values(&["sync"]).get();
        let failed = SYNC_ATTEMPTS.with_label_values(&["sync", "failed"]).get();

        let mut guard = h
            .locks
            .acquire(LockKey::new(SyncAction::Sync.lock_scope(), "aa"))
            .await
            .unwrap();
        let poller = h.confirmation();
        assert_eq!(poller.process("aa").await.unwrap(), Outcome::Skipped);
        assert!(LOCK_CONTENTION.with_label_values(&["sync"]).get() >= contended + 1.0);
        guard.release().await.unwrap();

        // A panicking collaborator surfaces as a failed attempt, not a crash.
        assert!(poller.process("aa").await.is_err());
        assert!(SYNC_ATTEMPTS.with_label_values(&["sync", "failed"]).get() >= failed + 1.0);
    }
}
