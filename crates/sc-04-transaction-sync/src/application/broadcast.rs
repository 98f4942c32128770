//! # Broadcast Scheduler
//!
//! Broadcasts `Ready` records, oldest first, grouped by the account that
//! owns the spent inputs.
//!
//! ```text
//! find Ready ──► resolve tx ──► parents broadcast? ──► group by account
//!                                   │ no                     │
//!                                   ▼                        ▼
//!                          wait for next pass    groups in parallel (bounded),
//!                                                records in a group in order;
//!                                                a failure halts its group
//! ```
//!
//! A successful broadcast releases the p2p track and chains straight into
//! the P2P notifier, or into the confirmation poller when P2P is skipped.

use serde_json::Value;
use settlement_telemetry::{start_batch_timer, NOTIFICATIONS_DROPPED};
use shared_bus::{EventPublisher, EventType, SyncEvent};
use shared_types::{IncomingTransaction, Transaction, TxId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::attempt::{bounded, observe, provider_of, RecordAccess};
use super::confirmation::ConfirmationPoller;
use super::p2p::P2pNotifier;
use super::supervisor::supervise;
use crate::config::EngineConfig;
use crate::domain::{
    BatchReport, Outcome, PageParams, SyncAction, SyncError, SyncRecord, SyncStatus,
};
use crate::ports::outbound::Broadcaster;

const ACTION: SyncAction = SyncAction::Broadcast;

/// Model type announced in broadcast events.
pub const SYNC_RECORD_MODEL_TYPE: &str = "sync_transaction";

/// Where the raw transaction came from.
#[derive(Debug, Clone)]
enum TxSource {
    Recorded(Transaction),
    /// Seen but not recorded yet; recorded after a successful broadcast
    Incoming(IncomingTransaction),
}

impl TxSource {
    fn hex(&self) -> &str {
        match self {
            TxSource::Recorded(tx) => &tx.hex,
            TxSource::Incoming(tx) => &tx.hex,
        }
    }

    fn parent_ids(&self) -> Vec<&str> {
        let inputs = match self {
            TxSource::Recorded(tx) => &tx.inputs,
            TxSource::Incoming(tx) => &tx.inputs,
        };
        inputs.iter().map(|i| i.previous_tx_id.as_str()).collect()
    }

    /// Account bucket for grouping.
    fn account(&self) -> &str {
        match self {
            TxSource::Recorded(tx) => tx.first_input_owner(),
            TxSource::Incoming(_) => "",
        }
    }
}

struct Candidate {
    id: TxId,
    source: TxSource,
}

/// What a successful broadcast leaves for after the lock is released.
struct Broadcasted {
    follow_up: Option<SyncAction>,
    transaction: Option<Transaction>,
}

/// Drives the broadcast track.
#[derive(Clone)]
pub struct BroadcastScheduler {
    access: RecordAccess,
    broadcaster: Arc<dyn Broadcaster>,
    events: Arc<dyn EventPublisher>,
    p2p: P2pNotifier,
    confirmation: ConfirmationPoller,
    config: Arc<EngineConfig>,
}

impl BroadcastScheduler {
    pub(crate) fn new(
        access: RecordAccess,
        broadcaster: Arc<dyn Broadcaster>,
        events: Arc<dyn EventPublisher>,
        p2p: P2pNotifier,
        confirmation: ConfirmationPoller,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            access,
            broadcaster,
            events,
            p2p,
            confirmation,
            config,
        }
    }

    /// One pass over `Ready` broadcast tracks.
    pub async fn process_batch(&self) -> Result<BatchReport, SyncError> {
        let _timer = start_batch_timer(ACTION.as_str());
        let page = PageParams::oldest_first(self.config.page_sizes.broadcast);
        let records = self.access.find_ready(ACTION, page).await?;
        let mut report = BatchReport::new(ACTION, records.len());

        let mut groups: Vec<(String, Vec<Candidate>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        for record in records {
            let id = record.id().to_string();
            let source = match self.resolve_source(&id).await {
                Ok(source) => source,
                Err(e) => {
                    warn!(tx_id = %id, error = %e, "Cannot resolve transaction for broadcast");
                    observe(ACTION, &Err(e.clone()));
                    report.record(&id, Err(e));
                    continue;
                }
            };

            match self.parents_broadcast(&source).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(tx_id = %id, "Parent not broadcast yet, waiting for a later pass");
                    report.waiting_on_parents += 1;
                    continue;
                }
                Err(e) => {
                    report.record(&id, Err(e));
                    continue;
                }
            }

            let account = source.account().to_string();
            let slot = *group_index.entry(account.clone()).or_insert_with(|| {
                groups.push((account, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(Candidate { id, source });
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_groups()));
        let mut workers = JoinSet::new();
        for (account, candidates) in groups {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SyncError::Internal(e.to_string()))?;
            let scheduler = self.clone();
            workers.spawn(async move {
                let _permit = permit;
                scheduler.run_group(account, candidates).await
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(group) => report.merge(group),
                Err(e) => error!(error = %e, "Broadcast group worker failed"),
            }
        }

        if report.selected > 0 {
            info!(
                selected = report.selected,
                completed = report.completed,
                failed = report.failed,
                halted = report.halted,
                waiting = report.waiting_on_parents,
                "Broadcast pass finished"
            );
        }
        Ok(report)
    }

    /// Broadcast one record outside a batch (instant broadcast).
    pub async fn process(&self, id: &str) -> Result<Outcome, SyncError> {
        self.process_candidate(id, None).await
    }

    /// Records of one account, strictly in order; stops at the first failure.
    async fn run_group(&self, account: String, candidates: Vec<Candidate>) -> BatchReport {
        let mut report = BatchReport::new(ACTION, 0);
        let total = candidates.len();

        for (position, candidate) in candidates.into_iter().enumerate() {
            let id = candidate.id.clone();
            let result = self.process_candidate(&id, Some(candidate.source)).await;
            let failed = result.is_err();
            report.record(&id, result);

            if failed {
                report.halted = total - position - 1;
                if report.halted > 0 {
                    warn!(
                        account = %account,
                        tx_id = %id,
                        halted = report.halted,
                        "Broadcast failed, halting the rest of the account group"
                    );
                }
                break;
            }
        }
        report
    }

    async fn process_candidate(
        &self,
        id: &str,
        source: Option<TxSource>,
    ) -> Result<Outcome, SyncError> {
        let result = supervise(ACTION, id, self.attempt(id, source)).await;
        observe(ACTION, &result);
        result
    }

    async fn attempt(&self, id: &str, source: Option<TxSource>) -> Result<Outcome, SyncError> {
        let Some(mut attempt) = self.access.begin(ACTION, id).await? else {
            return Ok(Outcome::Skipped);
        };
        let result = self.broadcast(&mut attempt.record, source).await;
        attempt.finish().await;

        let done = result?;
        if let Some(next) = done.follow_up {
            self.follow_up(id, next, done.transaction).await;
        }
        Ok(Outcome::Completed)
    }

    async fn broadcast(
        &self,
        record: &mut SyncRecord,
        source: Option<TxSource>,
    ) -> Result<Broadcasted, SyncError> {
        let id = record.id().to_string();
        let source = match source {
            Some(source) => source,
            None => match record.transaction() {
                Some(tx) => TxSource::Recorded(tx.clone()),
                None => self.resolve_source(&id).await?,
            },
        };
        if let TxSource::Recorded(tx) = &source {
            record.set_transaction(tx.clone());
        }

        let timeout = self.config.timeouts.broadcast;
        let sent = bounded(
            "broadcast",
            timeout,
            self.broadcaster.broadcast(&id, source.hex(), timeout),
        )
        .await;

        let provider = match sent {
            Ok(provider) => provider,
            Err(e) => {
                warn!(tx_id = %id, error = %e, "Broadcast failed");
                record.record_attempt(
                    ACTION,
                    SyncStatus::Error,
                    provider_of(&e),
                    format!("broadcast error: {e}"),
                );
                self.access.save_logged(record).await;
                return Err(e);
            }
        };

        record.complete_broadcast(provider.clone());
        self.access.commit(record, ACTION).await?;
        info!(tx_id = %id, provider = %provider, "Transaction broadcast");
        self.announce(record);

        if matches!(source, TxSource::Incoming(_)) {
            tokio::time::sleep(self.config.propagation_delay).await;
            self.record_incoming(record).await;
        }

        let follow_up = if record.transaction().is_none() {
            None
        } else if record.p2p_status() == SyncStatus::Ready {
            Some(SyncAction::P2p)
        } else if record.p2p_status() == SyncStatus::Skipped
            && record.sync_status() == SyncStatus::Ready
        {
            Some(SyncAction::Sync)
        } else {
            None
        };

        Ok(Broadcasted {
            follow_up,
            transaction: record.transaction().cloned(),
        })
    }

    /// Hand a broadcast incoming transaction to the repository, then reload it.
    async fn record_incoming(&self, record: &mut SyncRecord) {
        let id = record.id().to_string();
        let processed = bounded(
            "process_incoming",
            self.access.timeout(),
            self.access.repository().process_incoming(&id),
        )
        .await;
        if let Err(e) = processed {
            warn!(tx_id = %id, error = %e, "Processing incoming transaction failed");
        }

        match self.access.load_transaction(&id).await {
            Ok(Some(tx)) => record.set_transaction(tx),
            Ok(None) => debug!(tx_id = %id, "Incoming transaction not recorded yet"),
            Err(e) => warn!(tx_id = %id, error = %e, "Reloading broadcast transaction failed"),
        }
    }

    async fn follow_up(&self, id: &str, next: SyncAction, transaction: Option<Transaction>) {
        let result = match next {
            SyncAction::P2p => self.p2p.process_with(id, transaction).await,
            SyncAction::Sync => self.confirmation.process_with(id, transaction).await,
            SyncAction::Broadcast => return,
        };
        if let Err(e) = result {
            warn!(tx_id = %id, action = %next, error = %e, "Chained processing failed");
        }
    }

    fn announce(&self, record: &SyncRecord) {
        let model = match serde_json::to_value(record) {
            Ok(model) => model,
            Err(e) => {
                warn!(tx_id = %record.id(), error = %e, "Cannot encode sync record for event");
                Value::Null
            }
        };
        let event = SyncEvent::new(
            EventType::Broadcast,
            SYNC_RECORD_MODEL_TYPE,
            record.id(),
            model,
        );
        if !self.events.publish(event) {
            NOTIFICATIONS_DROPPED.inc();
        }
    }

    /// Recorded transaction, else the incoming one.
    async fn resolve_source(&self, id: &str) -> Result<TxSource, SyncError> {
        if let Some(tx) = self.access.load_transaction(id).await? {
            return Ok(TxSource::Recorded(tx));
        }
        let incoming = bounded(
            "get_incoming_transaction",
            self.access.timeout(),
            self.access.repository().get_incoming_transaction(id),
        )
        .await?;
        incoming
            .map(TxSource::Incoming)
            .ok_or_else(|| SyncError::TransactionNotFound(id.to_string()))
    }

    /// False when a tracked parent has not completed its broadcast.
    async fn parents_broadcast(&self, source: &TxSource) -> Result<bool, SyncError> {
        for parent in source.parent_ids() {
            if let Some(record) = self.access.find_by_id(parent).await? {
                if record.broadcast_status() != SyncStatus::Complete {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
