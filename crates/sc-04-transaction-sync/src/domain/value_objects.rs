//! Query parameters, payloads and batch reports.

use serde::{Deserialize, Serialize};
use shared_types::TxId;

use super::entities::SyncRecord;
use super::errors::SyncError;
use super::status::{SyncAction, SyncStatus};

/// Sort direction on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

/// One page of a record query. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub page: usize,
    pub page_size: usize,
    pub direction: OrderDirection,
}

impl PageParams {
    /// First page, oldest records first.
    pub fn oldest_first(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size,
            direction: OrderDirection::Ascending,
        }
    }

    /// First page, newest records first.
    pub fn newest_first(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size,
            direction: OrderDirection::Descending,
        }
    }

    /// Number of records before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// Status conditions on a record query. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub broadcast_status: Option<SyncStatus>,
    pub p2p_status: Option<SyncStatus>,
    pub sync_status: Option<SyncStatus>,
}

impl RecordFilter {
    /// Records whose `action` track is `Ready`.
    pub fn ready_for(action: SyncAction) -> Self {
        Self::default().with_status(action, SyncStatus::Ready)
    }

    pub fn with_status(mut self, action: SyncAction, status: SyncStatus) -> Self {
        match action {
            SyncAction::Broadcast => self.broadcast_status = Some(status),
            SyncAction::P2p => self.p2p_status = Some(status),
            SyncAction::Sync => self.sync_status = Some(status),
        }
        self
    }

    pub fn matches(&self, record: &SyncRecord) -> bool {
        let check =
            |want: Option<SyncStatus>, action| want.map_or(true, |s| record.status(action) == s);
        check(self.broadcast_status, SyncAction::Broadcast)
            && check(self.p2p_status, SyncAction::P2p)
            && check(self.sync_status, SyncAction::Sync)
    }
}

/// Counters the store can increment atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterField {
    Attempts,
}

impl CounterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterField::Attempts => "attempts",
        }
    }
}

/// How strictly a chain query must see the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryPolicy {
    /// Only mined transactions count as found
    RequiredOnChain,
}

/// Sender details attached to a P2P delivery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct P2pMetadata {
    pub sender: String,
    pub note: String,
}

/// Body sent to a paymail provider's receive endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P2pPayload {
    pub hex: String,
    /// Reference the provider handed out during resolution
    pub reference: String,
    pub metadata: P2pMetadata,
}

/// What one attempt on one record did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The track moved to `Complete`
    Completed,
    /// Not-found condition; the track stays `Ready`
    Deferred,
    /// Lock held elsewhere or the track already progressed
    Skipped,
}

impl Outcome {
    /// Label for the attempts metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "complete",
            Outcome::Deferred => "deferred",
            Outcome::Skipped => "skipped",
        }
    }
}

/// Summary of one batch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub action: SyncAction,
    /// Records returned by the query
    pub selected: usize,
    pub completed: usize,
    pub deferred: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Records left unprocessed because an earlier one in their group failed
    pub halted: usize,
    /// Candidates left out because a parent is not broadcast yet
    pub waiting_on_parents: usize,
    pub errors: Vec<(TxId, SyncError)>,
}

impl BatchReport {
    pub fn new(action: SyncAction, selected: usize) -> Self {
        Self {
            action,
            selected,
            completed: 0,
            deferred: 0,
            skipped: 0,
            failed: 0,
            halted: 0,
            waiting_on_parents: 0,
            errors: Vec::new(),
        }
    }

    pub fn record(&mut self, id: &str, result: Result<Outcome, SyncError>) {
        match result {
            Ok(Outcome::Completed) => self.completed += 1,
            Ok(Outcome::Deferred) => self.deferred += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push((id.to_string(), e));
            }
        }
    }

    /// Fold a sub-report (one account group) into this one.
    pub fn merge(&mut self, other: BatchReport) {
        self.completed += other.completed;
        self.deferred += other.deferred;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.halted += other.halted;
        self.waiting_on_parents += other.waiting_on_parents;
        self.errors.extend(other.errors);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
