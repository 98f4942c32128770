//! Track statuses and actions.

use serde::{Deserialize, Serialize};
use shared_types::EntityError;
use std::fmt;
use std::str::FromStr;

/// State of one track of a sync record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Disabled at creation, never runs
    Skipped,
    /// Waiting for another track (p2p waits for broadcast)
    Pending,
    /// Eligible for the next pass
    Ready,
    Complete,
    /// Failed; needs external re-submission
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Skipped => "skipped",
            SyncStatus::Pending => "pending",
            SyncStatus::Ready => "ready",
            SyncStatus::Complete => "complete",
            SyncStatus::Error => "error",
        }
    }

    /// No pipeline will move this track any further on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncStatus::Skipped | SyncStatus::Complete | SyncStatus::Error
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skipped" => Ok(SyncStatus::Skipped),
            "pending" => Ok(SyncStatus::Pending),
            "ready" => Ok(SyncStatus::Ready),
            "complete" => Ok(SyncStatus::Complete),
            "error" => Ok(SyncStatus::Error),
            other => Err(EntityError::UnknownValue {
                kind: "sync status",
                value: other.to_string(),
            }),
        }
    }
}

/// The three settlement tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Broadcast,
    Sync,
    P2p,
}

impl SyncAction {
    pub const ALL: [SyncAction; 3] = [SyncAction::Broadcast, SyncAction::Sync, SyncAction::P2p];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Broadcast => "broadcast",
            SyncAction::Sync => "sync",
            SyncAction::P2p => "p2p",
        }
    }

    /// Lock key scope, e.g. `process_broadcast`.
    pub fn lock_scope(&self) -> &'static str {
        match self {
            SyncAction::Broadcast => "process_broadcast",
            SyncAction::Sync => "process_sync",
            SyncAction::P2p => "process_p2p",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
