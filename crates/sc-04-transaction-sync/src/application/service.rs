//! # Sync Service
//!
//! Facade wiring the three pipelines over one set of ports. Hosts call it
//! from the transaction recording path and from the periodic tasks.

use async_trait::async_trait;
use sc_03_distributed_lock::LockManager;
use shared_bus::EventPublisher;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::attempt::{bounded, RecordAccess};
use super::broadcast::BroadcastScheduler;
use super::confirmation::ConfirmationPoller;
use super::p2p::P2pNotifier;
use crate::config::EngineConfig;
use crate::domain::{BatchReport, StoreError, SyncConfig, SyncError, SyncRecord};
use crate::ports::inbound::TransactionSyncApi;
use crate::ports::outbound::{
    Broadcaster, ChainQuery, PaymailClient, SyncRecordStore, TransactionRepository,
};

/// Collaborators handed to [`SyncService::new`].
///
/// Each pipeline keeps only the ones it uses.
#[derive(Clone)]
pub struct SyncPorts {
    pub store: Arc<dyn SyncRecordStore>,
    pub repository: Arc<dyn TransactionRepository>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub chain: Arc<dyn ChainQuery>,
    pub paymail: Arc<dyn PaymailClient>,
    pub events: Arc<dyn EventPublisher>,
    pub locks: LockManager,
}

/// Entry point for creating records and running batch passes.
pub struct SyncService {
    store: Arc<dyn SyncRecordStore>,
    broadcast: BroadcastScheduler,
    confirmation: ConfirmationPoller,
    p2p: P2pNotifier,
    config: Arc<EngineConfig>,
}

impl SyncService {
    pub fn new(ports: SyncPorts, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        let access = RecordAccess::new(
            ports.store.clone(),
            ports.repository,
            ports.locks,
            config.timeouts.store,
        );

        let confirmation = ConfirmationPoller::new(access.clone(), ports.chain, config.clone());
        let p2p = P2pNotifier::new(access.clone(), ports.paymail, config.clone());
        let broadcast = BroadcastScheduler::new(
            access,
            ports.broadcaster,
            ports.events,
            p2p.clone(),
            confirmation.clone(),
            config.clone(),
        );

        Self {
            store: ports.store,
            broadcast,
            confirmation,
            p2p,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn broadcast_scheduler(&self) -> &BroadcastScheduler {
        &self.broadcast
    }

    pub fn confirmation_poller(&self) -> &ConfirmationPoller {
        &self.confirmation
    }

    pub fn p2p_notifier(&self) -> &P2pNotifier {
        &self.p2p
    }

    /// [`TransactionSyncApi::create_sync_record`] with the configured default flags.
    pub async fn create_default_sync_record(&self, id: &str) -> Result<SyncRecord, SyncError> {
        self.create_sync_record(id, self.config.default_sync_config)
            .await
    }
}

#[async_trait]
impl TransactionSyncApi for SyncService {
    async fn create_sync_record(
        &self,
        id: &str,
        configuration: SyncConfig,
    ) -> Result<SyncRecord, SyncError> {
        let record = SyncRecord::new(id, configuration)?;

        match bounded(
            "create_sync_record",
            self.config.timeouts.store,
            self.store.create(&record),
        )
        .await
        {
            Ok(()) => {}
            Err(SyncError::Store(StoreError::AlreadyExists(id))) => {
                return Err(SyncError::DuplicateRecord(id));
            }
            Err(e) => return Err(e),
        }
        debug!(tx_id = %id, skipped = record.is_skipped(), "Sync record created");

        if configuration.broadcast && configuration.broadcast_instant {
            match self.broadcast.process(id).await {
                Ok(outcome) => {
                    info!(tx_id = %id, outcome = outcome.as_str(), "Instant broadcast finished");
                }
                Err(e) => {
                    warn!(
                        tx_id = %id,
                        error = %e,
                        "Instant broadcast failed, left to the scheduled pass"
                    );
                }
            }
        }

        self.get_sync_record(id).await
    }

    async fn get_sync_record(&self, id: &str) -> Result<SyncRecord, SyncError> {
        bounded(
            "find_sync_record",
            self.config.timeouts.store,
            self.store.find_by_id(id),
        )
        .await?
        .ok_or_else(|| SyncError::RecordNotFound(id.to_string()))
    }

    async fn process_broadcast_batch(&self) -> Result<BatchReport, SyncError> {
        self.broadcast.process_batch().await
    }

    async fn process_sync_batch(&self) -> Result<BatchReport, SyncError> {
        self.confirmation.process_batch().await
    }

    async fn process_p2p_batch(&self) -> Result<BatchReport, SyncError> {
        self.p2p.process_batch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainError, SyncStatus};
    use crate::test_utils::TestHarness;

    #[tokio::test]
    async fn test_create_without_instant_broadcast() {
        let h = TestHarness::new();
        h.insert_transaction("aa");
        let config = SyncConfig {
            broadcast_instant: false,
            ..SyncConfig::default()
        };

        let record = h.service().create_sync_record("aa", config).await.unwrap();

        assert_eq!(record.broadcast_status(), SyncStatus::Ready);
        assert_eq!(record.p2p_status(), SyncStatus::Pending);
        assert_eq!(record.sync_status(), SyncStatus::Ready);
        assert_eq!(h.broadcaster.calls("aa"), 0);
    }

    #[tokio::test]
    async fn test_create_with_instant_broadcast() {
        let h = TestHarness::new();
        h.insert_transaction("aa");

        let record = h
            .service()
            .create_sync_record("aa", SyncConfig::default())
            .await
            .unwrap();

        assert_eq!(record.broadcast_status(), SyncStatus::Complete);
        assert_eq!(h.broadcaster.calls("aa"), 1);
    }

    #[tokio::test]
    async fn test_instant_broadcast_failure_does_not_fail_creation() {
        let h = TestHarness::new();
        h.insert_transaction("aa");
        h.broadcaster.fail("aa", ChainError::Timeout { timeout_ms: 25_000 });

        let record = h
            .service()
            .create_sync_record("aa", SyncConfig::default())
            .await
            .unwrap();
        assert_eq!(record.broadcast_status(), SyncStatus::Error);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_and_missing_id() {
        let h = TestHarness::new();
        let service = h.service();
        let config = SyncConfig::disabled();

        service.create_sync_record("aa", config).await.unwrap();
        assert_eq!(
            service.create_sync_record("aa", config).await.err(),
            Some(SyncError::DuplicateRecord("aa".to_string()))
        );
        assert_eq!(
            service.create_sync_record("", config).await.err(),
            Some(SyncError::MissingId)
        );
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let h = TestHarness::new();
        assert_eq!(
            h.service().get_sync_record("nope").await.err(),
            Some(SyncError::RecordNotFound("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_default_flags_from_config() {
        let mut h = TestHarness::new();
        h.config.default_sync_config = SyncConfig::disabled();
        let record = h.service().create_default_sync_record("aa").await.unwrap();
        assert!(record.is_skipped());
        assert!(record.is_settled());
    }
}
