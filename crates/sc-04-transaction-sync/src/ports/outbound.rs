//! Outbound Ports (Driven Ports / SPI)
//!
//! Every collaborator the pipelines talk to. Each pipeline is constructed
//! with only the ports it uses.

use async_trait::async_trait;
use shared_types::{
    DraftTransaction, IncomingTransaction, PaymailP4, Transaction, TransactionInfo,
};
use std::time::Duration;

use crate::domain::{
    ChainError, CounterField, P2pPayload, PageParams, PaymailError, QueryPolicy, RecordFilter,
    RepositoryError, StoreError, SyncRecord,
};

/// Persistence for sync records.
#[async_trait]
pub trait SyncRecordStore: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    /// - `AlreadyExists`: a record with the same id is stored
    async fn create(&self, record: &SyncRecord) -> Result<(), StoreError>;

    /// Records matching `filter`, ordered by creation time per `page.direction`.
    async fn find(
        &self,
        filter: &RecordFilter,
        page: &PageParams,
    ) -> Result<Vec<SyncRecord>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<SyncRecord>, StoreError>;

    /// Overwrite an existing record as a unit.
    ///
    /// # Errors
    /// - `NotFound`: nothing stored under the record's id
    async fn save(&self, record: &SyncRecord) -> Result<(), StoreError>;

    /// Atomically add `by` to `field` and return the new value.
    async fn increment_field(
        &self,
        id: &str,
        field: CounterField,
        by: u64,
    ) -> Result<u64, StoreError>;
}

/// Access to recorded transactions, incoming transactions and drafts.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, RepositoryError>;

    async fn get_incoming_transaction(
        &self,
        id: &str,
    ) -> Result<Option<IncomingTransaction>, RepositoryError>;

    async fn save_transaction(&self, transaction: &Transaction) -> Result<(), RepositoryError>;

    /// Turn a broadcast incoming transaction into a recorded one.
    async fn process_incoming(&self, id: &str) -> Result<(), RepositoryError>;

    async fn get_draft(&self, id: &str) -> Result<Option<DraftTransaction>, RepositoryError>;
}

/// Submits raw transactions to the network.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Returns the name of the provider that accepted the transaction.
    async fn broadcast(
        &self,
        tx_id: &str,
        hex: &str,
        timeout: Duration,
    ) -> Result<String, ChainError>;
}

/// Looks transactions up on-chain.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// # Errors
    /// - `TransactionNotFound`: no provider knows the transaction (not a failure)
    async fn query_transaction(
        &self,
        tx_id: &str,
        policy: QueryPolicy,
        timeout: Duration,
    ) -> Result<TransactionInfo, ChainError>;
}

/// Delivers finished transactions to paymail providers.
#[async_trait]
pub trait PaymailClient: Send + Sync {
    /// Returns the transaction id assigned by the remote provider.
    async fn send_p2p(
        &self,
        destination: &PaymailP4,
        payload: &P2pPayload,
    ) -> Result<String, PaymailError>;
}
