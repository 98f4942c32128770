//! # P2P Notifier
//!
//! Sends the finished transaction to every paymail provider that resolved
//! a draft output peer-to-peer. All providers must accept before anything
//! is committed; one failure leaves the track `Ready` for the next pass.

use settlement_telemetry::start_batch_timer;
use shared_types::{PaymailP4, Transaction};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::attempt::{bounded, observe, RecordAccess};
use super::supervisor::supervise;
use crate::config::EngineConfig;
use crate::domain::{
    BatchReport, Outcome, P2pMetadata, P2pPayload, PageParams, SyncAction, SyncError, SyncRecord,
    SyncResult, SyncStatus, PROVIDER_ALL,
};
use crate::ports::outbound::PaymailClient;

const ACTION: SyncAction = SyncAction::P2p;

/// Drives the p2p track.
#[derive(Clone)]
pub struct P2pNotifier {
    access: RecordAccess,
    paymail: Arc<dyn PaymailClient>,
    config: Arc<EngineConfig>,
}

impl P2pNotifier {
    pub(crate) fn new(
        access: RecordAccess,
        paymail: Arc<dyn PaymailClient>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            access,
            paymail,
            config,
        }
    }

    /// One pass over `Ready` p2p tracks, oldest first. Continues past failures.
    pub async fn process_batch(&self) -> Result<BatchReport, SyncError> {
        let _timer = start_batch_timer(ACTION.as_str());
        let page = PageParams::oldest_first(self.config.page_sizes.p2p);
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
                failed = report.failed,
                "P2P pass finished"
            );
        }
        Ok(report)
    }

    /// Notify the providers of one record.
    pub async fn process(&self, id: &str) -> Result<Outcome, SyncError> {
        self.process_with(id, None).await
    }

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

        let result = self.notify(&mut attempt.record).await;
        attempt.finish().await;
        result
    }

    async fn notify(&self, record: &mut SyncRecord) -> Result<Outcome, SyncError> {
        let id = record.id().to_string();
        let Some(transaction) = self.access.transaction(record).await? else {
            return Err(SyncError::TransactionNotFound(id));
        };

        if !transaction.has_draft() {
            record.record_attempt(
                ACTION,
                SyncStatus::Complete,
                PROVIDER_ALL,
                "no draft found, cannot complete p2p",
            );
            self.access.commit(record, ACTION).await?;
            return Ok(Outcome::Completed);
        }

        let draft = bounded(
            "get_draft",
            self.access.timeout(),
            self.access.repository().get_draft(&transaction.draft_id),
        )
        .await?;
        let Some(draft) = draft else {
            debug!(tx_id = %id, draft_id = %transaction.draft_id, "Draft not found");
            record.record_attempt(
                ACTION,
                SyncStatus::Ready,
                PROVIDER_ALL,
                format!("draft not found: {}", transaction.draft_id),
            );
            self.access.commit(record, ACTION).await?;
            return Ok(Outcome::Deferred);
        };

        let mut results = Vec::new();
        for destination in draft.p2p_destinations() {
            match self.send(destination, &transaction).await {
                Ok(remote_id) => results.push(SyncResult::new(
                    ACTION,
                    destination.receive_endpoint.clone(),
                    format!("success: {remote_id}"),
                )),
                Err(e) => {
                    warn!(
                        tx_id = %id,
                        paymail = %destination.address(),
                        error = %e,
                        "P2P notification failed, nothing committed"
                    );
                    record.record_attempt(
                        ACTION,
                        SyncStatus::Ready,
                        destination.receive_endpoint.clone(),
                        e.to_string(),
                    );
                    self.access.save_logged(record).await;
                    return Err(e);
                }
            }
        }

        let notified = results.len();
        record.commit_results(
            ACTION,
            SyncStatus::Complete,
            results,
            format!("notified {notified} paymail provider(s)"),
        );
        self.access.commit(record, ACTION).await?;

        info!(tx_id = %id, notified, "Paymail providers notified");
        Ok(Outcome::Completed)
    }

    async fn send(
        &self,
        destination: &PaymailP4,
        transaction: &Transaction,
    ) -> Result<String, SyncError> {
        let payload = P2pPayload {
            hex: transaction.hex.clone(),
            reference: destination.reference_id.clone(),
            metadata: P2pMetadata {
                sender: self.config.default_from_paymail.clone(),
                note: self.config.default_note.clone(),
            },
        };
        bounded(
            "send_p2p",
            self.config.timeouts.paymail,
            self.paymail.send_p2p(destination, &payload),
        )
        .await
    }
}
