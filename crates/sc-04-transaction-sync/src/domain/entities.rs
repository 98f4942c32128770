//! # Sync Record
//!
//! One record per transaction under synchronization. Tracks are mutated
//! only through the methods below; a `Skipped` track refuses every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Transaction, TxId};
use std::collections::VecDeque;
use tracing::warn;

use super::errors::SyncError;
use super::status::{SyncAction, SyncStatus};

/// Maximum number of results kept on a record.
pub const MAX_RESULTS: usize = 20;

/// A broadcast success trims the log once it holds this many entries.
pub const BROADCAST_TRIM_THRESHOLD: usize = 19;

/// Provider name for results produced without contacting a provider.
pub const PROVIDER_ALL: &str = "all";

/// Provider name for results caused by local failures.
pub const PROVIDER_INTERNAL: &str = "internal";

/// Which tracks run for a transaction. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub broadcast: bool,
    /// Broadcast synchronously right after creation
    pub broadcast_instant: bool,
    #[serde(rename = "paymailP2P")]
    pub paymail_p2p: bool,
    pub sync_on_chain: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            broadcast: true,
            broadcast_instant: true,
            paymail_p2p: true,
            sync_on_chain: true,
        }
    }
}

impl SyncConfig {
    /// Every track off.
    pub fn disabled() -> Self {
        Self {
            broadcast: false,
            broadcast_instant: false,
            paymail_p2p: false,
            sync_on_chain: false,
        }
    }

    fn initial_status(&self, action: SyncAction) -> SyncStatus {
        match action {
            SyncAction::Broadcast if self.broadcast => SyncStatus::Ready,
            SyncAction::P2p if self.paymail_p2p => SyncStatus::Pending,
            SyncAction::Sync if self.sync_on_chain => SyncStatus::Ready,
            _ => SyncStatus::Skipped,
        }
    }
}

/// One entry of the results log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub action: SyncAction,
    pub executed_at: DateTime<Utc>,
    pub provider: String,
    pub status_message: String,
}

impl SyncResult {
    pub fn new(
        action: SyncAction,
        provider: impl Into<String>,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            action,
            executed_at: Utc::now(),
            provider: provider.into(),
            status_message: status_message.into(),
        }
    }
}

/// Capped, insertion-ordered results log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResults {
    pub last_message: String,
    results: VecDeque<SyncResult>,
}

impl SyncResults {
    /// Append, evicting the oldest entries beyond [`MAX_RESULTS`].
    pub fn push(&mut self, result: SyncResult) {
        self.results.push_back(result);
        while self.results.len() > MAX_RESULTS {
            self.results.pop_front();
        }
    }

    /// Drop the single oldest entry when the log holds `threshold` or more,
    /// then [`push`](Self::push).
    pub fn push_trimmed(&mut self, result: SyncResult, threshold: usize) {
        if self.results.len() >= threshold {
            self.results.pop_front();
        }
        self.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncResult> {
        self.results.iter()
    }

    pub fn last(&self) -> Option<&SyncResult> {
        self.results.back()
    }
}

/// Synchronization state of one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    id: TxId,
    configuration: SyncConfig,
    broadcast_status: SyncStatus,
    p2p_status: SyncStatus,
    sync_status: SyncStatus,
    last_attempt: Option<DateTime<Utc>>,
    results: SyncResults,
    attempts: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Loaded transaction, reused within one pass. Never persisted.
    #[serde(skip)]
    transaction: Option<Transaction>,
}

impl SyncRecord {
    /// New record with initial statuses derived from `configuration`.
    pub fn new(id: impl Into<TxId>, configuration: SyncConfig) -> Result<Self, SyncError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SyncError::MissingId);
        }
        let now = Utc::now();
        Ok(Self {
            id,
            broadcast_status: configuration.initial_status(SyncAction::Broadcast),
            p2p_status: configuration.initial_status(SyncAction::P2p),
            sync_status: configuration.initial_status(SyncAction::Sync),
            configuration,
            last_attempt: None,
            results: SyncResults::default(),
            attempts: 0,
            created_at: now,
            updated_at: now,
            transaction: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn configuration(&self) -> &SyncConfig {
        &self.configuration
    }

    pub fn status(&self, action: SyncAction) -> SyncStatus {
        match action {
            SyncAction::Broadcast => self.broadcast_status,
            SyncAction::P2p => self.p2p_status,
            SyncAction::Sync => self.sync_status,
        }
    }

    pub fn broadcast_status(&self) -> SyncStatus {
        self.broadcast_status
    }

    pub fn p2p_status(&self) -> SyncStatus {
        self.p2p_status
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        self.last_attempt
    }

    pub fn results(&self) -> &SyncResults {
        &self.results
    }

    pub fn last_message(&self) -> &str {
        &self.results.last_message
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Assign the value returned by the store's atomic increment.
    pub fn set_attempts(&mut self, attempts: u64) {
        self.attempts = attempts;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    pub fn set_transaction(&mut self, transaction: Transaction) {
        self.transaction = Some(transaction);
    }

    /// Copy suitable for persisting: the loaded transaction is dropped.
    pub fn detached(&self) -> Self {
        Self {
            transaction: None,
            ..self.clone()
        }
    }

    /// Move `action`'s track to `status`.
    ///
    /// Returns `false` and leaves the record untouched when the track is
    /// skipped or when `status` is `Skipped`.
    pub fn set_status(&mut self, action: SyncAction, status: SyncStatus) -> bool {
        let current = self.status(action);
        if current == SyncStatus::Skipped || status == SyncStatus::Skipped {
            if current != status {
                warn!(
                    tx_id = %self.id,
                    action = %action,
                    from = %current,
                    to = %status,
                    "Refusing transition on skipped track"
                );
            }
            return false;
        }
        match action {
            SyncAction::Broadcast => self.broadcast_status = status,
            SyncAction::P2p => self.p2p_status = status,
            SyncAction::Sync => self.sync_status = status,
        }
        self.touch();
        true
    }

    /// Log one attempt on `action` and move the track to `status`.
    pub fn record_attempt(
        &mut self,
        action: SyncAction,
        status: SyncStatus,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) {
        let result = SyncResult::new(action, provider, message);
        self.results.last_message = result.status_message.clone();
        self.results.push(result);
        self.last_attempt = Some(Utc::now());
        self.set_status(action, status);
        self.touch();
    }

    /// Successful broadcast: `Complete`, and release tracks waiting on it.
    pub fn complete_broadcast(&mut self, provider: impl Into<String>) {
        let result = SyncResult::new(SyncAction::Broadcast, provider, "broadcast success");
        self.results.last_message = result.status_message.clone();
        self.results.push_trimmed(result, BROADCAST_TRIM_THRESHOLD);
        self.last_attempt = Some(Utc::now());
        self.set_status(SyncAction::Broadcast, SyncStatus::Complete);
        if self.p2p_status == SyncStatus::Pending {
            self.set_status(SyncAction::P2p, SyncStatus::Ready);
        }
        if self.sync_status == SyncStatus::Pending {
            self.set_status(SyncAction::Sync, SyncStatus::Ready);
        }
        self.touch();
    }

    /// Append several results at once, then move `action` to `status`.
    pub fn commit_results(
        &mut self,
        action: SyncAction,
        status: SyncStatus,
        results: Vec<SyncResult>,
        message: impl Into<String>,
    ) {
        for result in results {
            self.results.push(result);
        }
        self.results.last_message = message.into();
        self.last_attempt = Some(Utc::now());
        self.set_status(action, status);
        self.touch();
    }

    /// All three tracks are skipped; nothing will ever run.
    pub fn is_skipped(&self) -> bool {
        SyncAction::ALL
            .iter()
            .all(|a| self.status(*a) == SyncStatus::Skipped)
    }

    /// All three tracks reached a terminal state.
    pub fn is_settled(&self) -> bool {
        SyncAction::ALL.iter().all(|a| self.status(*a).is_terminal())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
