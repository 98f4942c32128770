//! Error types for Dependency Ordering

use shared_types::TxId;
use thiserror::Error;

/// All errors that can occur while ordering a batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    /// Some transactions spend each other in a loop and cannot be ordered
    #[error("Cycle detected in dependency graph: {} unresolved", .unresolved.len())]
    CycleDetected { unresolved: Vec<TxId> },

    /// The same id appears twice in one batch
    #[error("Duplicate transaction in batch: {0}")]
    DuplicateTransaction(TxId),
}
