//! # Dependency Ordering Across Pipelines
//!
//! Ancestors-first ordering of real transaction batches, and the way the
//! broadcast scheduler holds children back until their tracked parents
//! have been broadcast.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sc_02_dependency_ordering::{sort_ancestors_first, OrderingError};
    use sc_04_transaction_sync::test_utils::TestHarness;
    use sc_04_transaction_sync::{SyncConfig, SyncStatus, TransactionSyncApi};
    use shared_types::{IncomingTransaction, Transaction, TransactionInput};

    fn spending(id: &str, account: &str, parents: &[&str]) -> Transaction {
        let mut tx = Transaction::new(id, format!("hex-{id}"));
        tx.xpub_in_ids.push(account.to_string());
        tx.inputs = parents
            .iter()
            .map(|p| TransactionInput::new(*p, 0))
            .collect();
        tx
    }

    fn position(sorted: &[Transaction], id: &str) -> usize {
        sorted.iter().position(|t| t.id == id).unwrap()
    }

    fn broadcast_only() -> SyncConfig {
        SyncConfig {
            broadcast_instant: false,
            paymail_p2p: false,
            sync_on_chain: false,
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_two_disconnected_chains_keep_their_own_order() {
        let batch = vec![
            spending("b2", "xpub-b", &["b1"]),
            spending("a2", "xpub-a", &["a1"]),
            spending("a1", "xpub-a", &["external"]),
            spending("b1", "xpub-b", &[]),
        ];

        let sorted = sort_ancestors_first(batch).unwrap();

        assert_eq!(sorted.len(), 4);
        assert!(position(&sorted, "a1") < position(&sorted, "a2"));
        assert!(position(&sorted, "b1") < position(&sorted, "b2"));
    }

    #[test]
    fn test_incoming_batch_sorts_like_recorded() {
        let mut child = IncomingTransaction::new("child", "hex-child");
        child.inputs.push(TransactionInput::new("parent", 1));
        let parent = IncomingTransaction::new("parent", "hex-parent");

        let sorted = sort_ancestors_first(vec![child, parent]).unwrap();
        let ids: Vec<&str> = sorted.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["parent", "child"]);
    }

    #[test]
    fn test_cyclic_batch_is_rejected() {
        let batch = vec![
            spending("a", "xpub", &["c"]),
            spending("b", "xpub", &["a"]),
            spending("c", "xpub", &["b"]),
        ];
        assert!(matches!(
            sort_ancestors_first(batch),
            Err(OrderingError::CycleDetected { .. })
        ));
    }

    #[tokio::test]
    async fn test_children_wait_for_parents_across_passes() {
        let h = TestHarness::new();
        // Recorded newest-first so the grandchild is the oldest record.
        h.record_custom(spending("c", "xpub-c", &["b"]), broadcast_only())
            .await;
        h.record_custom(spending("b", "xpub-b", &["a"]), broadcast_only())
            .await;
        h.record_custom(spending("a", "xpub-a", &[]), broadcast_only())
            .await;
        let service = h.service();

        let first = service.process_broadcast_batch().await.unwrap();
        assert_eq!(first.completed, 1);
        assert_eq!(first.waiting_on_parents, 2);

        let second = service.process_broadcast_batch().await.unwrap();
        assert_eq!(second.completed, 1);
        assert_eq!(second.waiting_on_parents, 1);

        let third = service.process_broadcast_batch().await.unwrap();
        assert_eq!(third.completed, 1);

        assert_eq!(h.broadcaster.order(), ["a", "b", "c"]);
        for id in ["a", "b", "c"] {
            assert_eq!(h.record(id).await.broadcast_status(), SyncStatus::Complete);
        }
    }

    proptest! {
        #[test]
        fn prop_any_permutation_of_a_chain_sorts_back(seed in any::<u64>(), len in 1usize..32) {
            let mut batch: Vec<Transaction> = (0..len)
                .map(|i| {
                    let parent = (i > 0).then(|| format!("t{}", i - 1));
                    let parents: Vec<&str> = parent.iter().map(String::as_str).collect();
                    spending(&format!("t{i}"), "xpub", &parents)
                })
                .collect();

            // Deterministic shuffle from the seed.
            let mut state = seed | 1;
            for i in (1..batch.len()).rev() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                batch.swap(i, (state % (i as u64 + 1)) as usize);
            }

            let sorted = sort_ancestors_first(batch).unwrap();
            let ids: Vec<String> = sorted.into_iter().map(|t| t.id).collect();
            let expected: Vec<String> = (0..len).map(|i| format!("t{i}")).collect();
            prop_assert_eq!(ids, expected);
        }
    }
}
