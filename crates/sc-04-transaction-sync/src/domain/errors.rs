//! Error types for transaction synchronization

use sc_03_distributed_lock::LockError;
use shared_types::TxId;
use thiserror::Error;

use super::status::SyncAction;

/// Errors surfaced by the sync pipelines and the facade
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Record created without a transaction id
    #[error("Missing transaction id for sync record")]
    MissingId,

    /// A record already exists for this transaction
    #[error("Sync record already exists: {0}")]
    DuplicateRecord(TxId),

    #[error("Sync record not found: {0}")]
    RecordNotFound(TxId),

    /// Neither a recorded nor an incoming transaction exists for the id
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TxId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Paymail error: {0}")]
    Paymail(#[from] PaymailError),

    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// A bounded call did not finish in time
    #[error("Timed out: {operation}")]
    Timeout { operation: String },

    /// An attempt panicked and was contained
    #[error("Panic while processing {action} for {id}: {message}")]
    Panicked {
        action: SyncAction,
        id: TxId,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from the sync record store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record already exists: {0}")]
    AlreadyExists(TxId),

    #[error("Record not found: {0}")]
    NotFound(TxId),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors from the transaction repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Repository backend error: {0}")]
    Backend(String),
}

/// Errors from the broadcaster and the chain query collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The transaction is unknown to every provider
    #[error("Transaction not found on-chain: {0}")]
    TransactionNotFound(TxId),

    #[error("Chain request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{provider}: {message}")]
    Provider { provider: String, message: String },
}

impl ChainError {
    /// Provider that produced the error, empty when none is known.
    pub fn provider(&self) -> &str {
        match self {
            ChainError::Provider { provider, .. } => provider,
            _ => "",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::TransactionNotFound(_))
    }
}

/// Errors from the paymail client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymailError {
    #[error("P2P delivery to {endpoint} failed: {message}")]
    Delivery { endpoint: String, message: String },

    #[error("P2P delivery to {endpoint} timed out")]
    Timeout { endpoint: String },
}

impl PaymailError {
    pub fn endpoint(&self) -> &str {
        match self {
            PaymailError::Delivery { endpoint, .. } | PaymailError::Timeout { endpoint } => {
                endpoint
            }
        }
    }
}

/// Invalid engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
