//! Scripted collaborators and a harness wiring them to in-memory adapters.
//!
//! Compiled for this crate's tests and, with the `test-utils` feature, for
//! the workspace integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use sc_03_distributed_lock::{LockConfig, LockKey, LockManager};
use shared_bus::{EventPublisher, SyncEvent};
use shared_types::{
    DraftOutput, DraftTransaction, MerkleProof, PaymailP4, ResolutionType, Transaction,
    TransactionInfo, TxId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{InMemorySyncRecordStore, InMemoryTransactionRepository};
use crate::application::{
    BroadcastScheduler, ConfirmationPoller, P2pNotifier, SyncPorts, SyncService,
};
use crate::config::EngineConfig;
use crate::domain::{
    ChainError, CounterField, P2pPayload, PageParams, PaymailError, QueryPolicy, RecordFilter,
    StoreError, SyncAction, SyncConfig, SyncRecord, SyncStatus,
};
use crate::ports::outbound::{
    Broadcaster, ChainQuery, PaymailClient, SyncRecordStore, TransactionRepository,
};

// =============================================================================
// FIXTURES
// =============================================================================

/// Chain answer for a mined transaction at index 3 of a height-3 tree.
pub fn mined_info(id: &str, provider: &str) -> TransactionInfo {
    TransactionInfo {
        id: id.to_string(),
        block_hash: format!("block-{id}"),
        block_height: 812_345,
        merkle_proof: Some(MerkleProof::new(
            id,
            3,
            vec!["h0".to_string(), "h1".to_string(), "h2".to_string()],
        )),
        provider: provider.to_string(),
    }
}

/// Draft with one peer-to-peer output per endpoint, plus one plain output.
pub fn p2p_draft(draft_id: &str, endpoints: &[&str]) -> DraftTransaction {
    let mut outputs: Vec<DraftOutput> = endpoints
        .iter()
        .enumerate()
        .map(|(i, endpoint)| DraftOutput {
            to: format!("1Address{i}"),
            satoshis: 1_000,
            paymail_p4: Some(PaymailP4 {
                alias: format!("user{i}"),
                domain: "example.com".to_string(),
                receive_endpoint: endpoint.to_string(),
                reference_id: format!("ref-{endpoint}"),
                resolution_type: ResolutionType::P2p,
            }),
        })
        .collect();
    outputs.push(DraftOutput {
        to: "1Change".to_string(),
        satoshis: 500,
        paymail_p4: None,
    });

    DraftTransaction {
        id: draft_id.to_string(),
        xpub_id: "xpub-owner".to_string(),
        outputs,
    }
}

// =============================================================================
// SCRIPTED COLLABORATORS
// =============================================================================

/// Broadcaster accepting everything as `node-1` unless told otherwise.
#[derive(Default)]
pub struct ScriptedBroadcaster {
    failures: Mutex<HashMap<TxId, ChainError>>,
    calls: Mutex<Vec<TxId>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedBroadcaster {
    pub fn fail(&self, id: &str, error: ChainError) {
        self.failures.lock().insert(id.to_string(), error);
    }

    /// Hold every broadcast for `delay` before answering.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self, id: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == id).count()
    }

    /// Every broadcast in call order.
    pub fn order(&self) -> Vec<TxId> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Broadcaster for ScriptedBroadcaster {
    async fn broadcast(
        &self,
        tx_id: &str,
        _hex: &str,
        _timeout: Duration,
    ) -> Result<String, ChainError> {
        self.calls.lock().push(tx_id.to_string());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().get(tx_id) {
            Some(e) => Err(e.clone()),
            None => Ok("node-1".to_string()),
        }
    }
}

/// Chain query answering from a script; unscripted ids are not found.
#[derive(Default)]
pub struct ScriptedChainQuery {
    responses: Mutex<HashMap<TxId, Result<TransactionInfo, ChainError>>>,
    panics: Mutex<HashSet<TxId>>,
    calls: Mutex<HashMap<TxId, usize>>,
}

impl ScriptedChainQuery {
    pub fn respond(&self, id: &str, response: Result<TransactionInfo, ChainError>) {
        self.responses.lock().insert(id.to_string(), response);
    }

    /// Panic when `id` is queried.
    pub fn panic_on(&self, id: &str) {
        self.panics.lock().insert(id.to_string());
    }

    pub fn calls(&self, id: &str) -> usize {
        self.calls.lock().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ChainQuery for ScriptedChainQuery {
    async fn query_transaction(
        &self,
        tx_id: &str,
        _policy: QueryPolicy,
        _timeout: Duration,
    ) -> Result<TransactionInfo, ChainError> {
        *self.calls.lock().entry(tx_id.to_string()).or_default() += 1;
        if self.panics.lock().contains(tx_id) {
            panic!("scripted chain query panic for {tx_id}");
        }
        self.responses
            .lock()
            .get(tx_id)
            .cloned()
            .unwrap_or_else(|| Err(ChainError::TransactionNotFound(tx_id.to_string())))
    }
}

/// Paymail client answering per endpoint; unscripted endpoints accept.
#[derive(Default)]
pub struct ScriptedPaymailClient {
    responses: Mutex<HashMap<String, Result<String, PaymailError>>>,
    sent: Mutex<Vec<(PaymailP4, P2pPayload)>>,
}

impl ScriptedPaymailClient {
    pub fn respond(&self, endpoint: &str, response: Result<String, PaymailError>) {
        self.responses.lock().insert(endpoint.to_string(), response);
    }

    /// Every delivery attempt in call order.
    pub fn sent(&self) -> Vec<(PaymailP4, P2pPayload)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PaymailClient for ScriptedPaymailClient {
    async fn send_p2p(
        &self,
        destination: &PaymailP4,
        payload: &P2pPayload,
    ) -> Result<String, PaymailError> {
        self.sent.lock().push((destination.clone(), payload.clone()));
        self.responses
            .lock()
            .get(&destination.receive_endpoint)
            .cloned()
            .unwrap_or_else(|| Ok(format!("remote-{}", destination.reference_id)))
    }
}

/// Publisher keeping events in memory, optionally refusing them all.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<SyncEvent>>,
    reject: AtomicBool,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl RecordingPublisher {
    /// Behave like a permanently full queue.
    pub fn reject_all(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: SyncEvent) -> bool {
        self.published.fetch_add(1, Ordering::Relaxed);
        if self.reject.load(Ordering::SeqCst) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.events.lock().push(event);
        true
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    fn events_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// In-memory store whose next `n` saves fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemorySyncRecordStore,
    failing_saves: AtomicUsize,
}

impl FlakyStore {
    pub fn fail_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl SyncRecordStore for FlakyStore {
    async fn create(&self, record: &SyncRecord) -> Result<(), StoreError> {
        self.inner.create(record).await
    }

    async fn find(
        &self,
        filter: &RecordFilter,
        page: &PageParams,
    ) -> Result<Vec<SyncRecord>, StoreError> {
        self.inner.find(filter, page).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SyncRecord>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, record: &SyncRecord) -> Result<(), StoreError> {
        let injected = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Backend("injected save failure".to_string()));
        }
        self.inner.save(record).await
    }

    async fn increment_field(
        &self,
        id: &str,
        field: CounterField,
        by: u64,
    ) -> Result<u64, StoreError> {
        self.inner.increment_field(id, field, by).await
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// Scripted collaborators over in-memory adapters, sharing one lock table.
pub struct TestHarness {
    pub store: Arc<FlakyStore>,
    pub repository: Arc<InMemoryTransactionRepository>,
    pub broadcaster: Arc<ScriptedBroadcaster>,
    pub chain: Arc<ScriptedChainQuery>,
    pub paymail: Arc<ScriptedPaymailClient>,
    pub events: Arc<RecordingPublisher>,
    pub locks: LockManager,
    pub config: EngineConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(FlakyStore::default()),
            repository: Arc::new(InMemoryTransactionRepository::new()),
            broadcaster: Arc::new(ScriptedBroadcaster::default()),
            chain: Arc::new(ScriptedChainQuery::default()),
            paymail: Arc::new(ScriptedPaymailClient::default()),
            events: Arc::new(RecordingPublisher::default()),
            locks: LockManager::in_memory(LockConfig::default()),
            config: EngineConfig::default(),
        }
    }

    pub fn ports(&self) -> SyncPorts {
        SyncPorts {
            store: self.store.clone(),
            repository: self.repository.clone(),
            broadcaster: self.broadcaster.clone(),
            chain: self.chain.clone(),
            paymail: self.paymail.clone(),
            events: self.events.clone(),
            locks: self.locks.clone(),
        }
    }

    /// Service over the harness ports with the current `config`.
    pub fn service(&self) -> SyncService {
        SyncService::new(self.ports(), self.config.clone())
    }

    pub fn broadcast(&self) -> BroadcastScheduler {
        self.service().broadcast_scheduler().clone()
    }

    pub fn confirmation(&self) -> ConfirmationPoller {
        self.service().confirmation_poller().clone()
    }

    pub fn p2p(&self) -> P2pNotifier {
        self.service().p2p_notifier().clone()
    }

    pub fn insert_transaction(&self, id: &str) {
        self.repository
            .insert_transaction(Transaction::new(id, format!("hex-{id}")));
    }

    pub async fn create_record(&self, id: &str, config: SyncConfig) {
        let record = SyncRecord::new(id, config).unwrap();
        self.store.create(&record).await.unwrap();
    }

    /// Recorded transaction plus its sync record, no instant broadcast.
    pub async fn record_transaction(&self, id: &str, config: SyncConfig) {
        self.insert_transaction(id);
        self.create_record(id, config).await;
    }

    /// Like [`record_transaction`](Self::record_transaction) for a prepared transaction.
    pub async fn record_custom(&self, transaction: Transaction, config: SyncConfig) {
        let id = transaction.id.clone();
        self.repository.insert_transaction(transaction);
        self.create_record(&id, config).await;
    }

    /// Transaction funded by `account`.
    pub async fn record_owned(&self, id: &str, account: &str, config: SyncConfig) {
        let mut tx = Transaction::new(id, format!("hex-{id}"));
        tx.xpub_in_ids.push(account.to_string());
        self.record_custom(tx, config).await;
    }

    pub async fn record_transaction_with_draft(
        &self,
        id: &str,
        draft_id: &str,
        config: SyncConfig,
    ) {
        let mut tx = Transaction::new(id, format!("hex-{id}"));
        tx.draft_id = draft_id.to_string();
        self.record_custom(tx, config).await;
    }

    /// Move a pending p2p track to `Ready`, as a broadcast would.
    pub async fn release_p2p(&self, id: &str) {
        let mut record = self.record(id).await;
        assert!(record.set_status(SyncAction::P2p, SyncStatus::Ready));
        self.store.save(&record).await.unwrap();
    }

    pub async fn record(&self, id: &str) -> SyncRecord {
        self.store.find_by_id(id).await.unwrap().unwrap()
    }

    pub async fn transaction(&self, id: &str) -> Transaction {
        self.repository.get_transaction(id).await.unwrap().unwrap()
    }

    /// Wait for a deferred (drop-time) lock release to land.
    pub async fn wait_unlocked(&self, action: SyncAction, id: &str) {
        let key = LockKey::new(action.lock_scope(), id);
        for _ in 0..50 {
            if !self.locks.is_held(&key).await.unwrap() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("{key} still held");
    }
}
