//! # Confirmation Poller
//!
//! Looks `Ready` sync tracks up on-chain and attaches block data and the
//! Merkle proof to the transaction once mined.
//!
//! | Chain answer | Track | Result provider |
//! |--------------|-------|-----------------|
//! | found | `Complete` | answering provider |
//! | not found | stays `Ready` | `all` |
//! | any other error | `Error` | provider from the error |

use settlement_telemetry::start_batch_timer;
use shared_types::Transaction;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::attempt::{bounded, observe, provider_of, RecordAccess};
use super::supervisor::supervise;
use crate::config::EngineConfig;
use crate::domain::{
    BatchReport, Outcome, PageParams, QueryPolicy, SyncAction, SyncError, SyncRecord, SyncStatus,
    PROVIDER_ALL, PROVIDER_INTERNAL,
};
use crate::ports::outbound::ChainQuery;

const ACTION: SyncAction = SyncAction::Sync;

/// Drives the sync track.
#[derive(Clone)]
pub struct ConfirmationPoller {
    access: RecordAccess,
    chain: Arc<dyn ChainQuery>,
    config: Arc<EngineConfig>,
}

impl ConfirmationPoller {
    pub(crate) fn new(
        access: RecordAccess,
        chain: Arc<dyn ChainQuery>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            access,
            chain,
            config,
        }
    }

    /// One pass over `Ready` sync tracks, newest first.
    ///
    /// Per-record failures are collected in the report; only a failed
    /// query for candidates fails the pass.
    pub async fn process_batch(&self) -> Result<BatchReport, SyncError> {
        let _timer = start_batch_timer(ACTION.as_str());
        let page = PageParams::newest_first(self.config.page_sizes.sync);
        let records = self.access.find_ready(ACTION, page).await?;

        let mut report = BatchReport::new(ACTION, records.len());
        for record in records {
            let result = self.process(record.id()).await;
            report.record(record.id(), result);
        }

        if report.selected > 0 {
            info!(
                selected = report.selected,
                completed = report.completed,
                deferred = report.deferred,
                failed = report.failed,
                "Sync pass finished"
            );
        }
        Ok(report)
    }

    /// Confirm one record.
    pub async fn process(&self, id: &str) -> Result<Outcome, SyncError> {
        self.process_with(id, None).await
    }

    /// Confirm one record, reusing an already loaded transaction.
    pub(crate) async fn process_with(
        &self,
        id: &str,
        transaction: Option<Transaction>,
    ) -> Result<Outcome, SyncError> {
        let result = supervise(ACTION, id, self.attempt(id, transaction)).await;
        observe(ACTION, &result);
        result
    }

    async fn attempt(
        &self,
        id: &str,
        transaction: Option<Transaction>,
    ) -> Result<Outcome, SyncError> {
        let Some(mut attempt) = self.access.begin(ACTION, id).await? else {
            return Ok(Outcome::Skipped);
        };
        if let Some(tx) = transaction {
            attempt.record.set_transaction(tx);
        }

        let result = self.confirm(&mut attempt.record).await;
        attempt.finish().await;
        result
    }

    async fn confirm(&self, record: &mut SyncRecord) -> Result<Outcome, SyncError> {
        let id = record.id().to_string();
        let timeout = self.config.timeouts.query;

        let queried = bounded(
            "query_transaction",
            timeout,
            self.chain
                .query_transaction(&id, QueryPolicy::RequiredOnChain, timeout),
        )
        .await;

        let info = match queried {
            Ok(info) => info,
            Err(SyncError::Chain(e)) if e.is_not_found() => {
                debug!(tx_id = %id, "Transaction not on-chain yet");
                record.record_attempt(
                    ACTION,
                    SyncStatus::Ready,
                    PROVIDER_ALL,
                    "transaction not found on-chain",
                );
                self.access.commit(record, ACTION).await?;
                return Ok(Outcome::Deferred);
            }
            Err(e) => {
                warn!(tx_id = %id, error = %e, "Chain query failed");
                record.record_attempt(ACTION, SyncStatus::Error, provider_of(&e), e.to_string());
                self.access.save_logged(record).await;
                return Err(e);
            }
        };

        let Some(mut transaction) = self.access.transaction(record).await? else {
            return Err(SyncError::TransactionNotFound(id));
        };
        transaction.apply_chain_info(&info);

        let saved = bounded(
            "save_transaction",
            self.access.timeout(),
            self.access.repository().save_transaction(&transaction),
        )
        .await;
        if let Err(e) = saved {
            warn!(tx_id = %id, error = %e, "Failed to persist confirmed transaction");
            record.record_attempt(ACTION, SyncStatus::Error, PROVIDER_INTERNAL, e.to_string());
            self.access.save_logged(record).await;
            return Err(e);
        }
        record.set_transaction(transaction);

        record.record_attempt(
            ACTION,
            SyncStatus::Complete,
            info.provider.clone(),
            format!("transaction was found on-chain by {}", info.provider),
        );
        self.access.commit(record, ACTION).await?;

        info!(
            tx_id = %id,
            block_height = info.block_height,
            provider = %info.provider,
            "Transaction confirmed on-chain"
        );
        Ok(Outcome::Completed)
    }
}
