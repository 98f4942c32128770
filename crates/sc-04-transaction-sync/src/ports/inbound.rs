//! # Inbound Port - TransactionSyncApi
//!
//! Driving port used by the host process: the creation hook and the three
//! batch passes a scheduler calls periodically.
//!
//! | Method | Typical caller |
//! |--------|----------------|
//! | `create_sync_record` | Transaction recording, right after persisting the transaction |
//! | `process_broadcast_batch` | Periodic task `broadcast` |
//! | `process_sync_batch` | Periodic task `sync` |
//! | `process_p2p_batch` | Periodic task `p2p` |

use async_trait::async_trait;

use crate::domain::{BatchReport, SyncConfig, SyncError, SyncRecord};

/// Primary API for transaction synchronization.
///
/// # Example
///
/// ```rust,ignore
/// use sc_04_transaction_sync::ports::TransactionSyncApi;
///
/// async fn example(api: &impl TransactionSyncApi) {
///     let record = api.create_sync_record("ab12...", SyncConfig::default()).await?;
///     let report = api.process_sync_batch().await?;
/// }
/// ```
#[async_trait]
pub trait TransactionSyncApi: Send + Sync {
    /// Create the record for a freshly recorded transaction.
    ///
    /// Broadcasts immediately when the configuration asks for an instant
    /// broadcast. The returned record reflects that attempt.
    ///
    /// # Errors
    /// - `MissingId`: empty transaction id
    /// - `DuplicateRecord`: a record already exists for the id
    async fn create_sync_record(
        &self,
        id: &str,
        configuration: SyncConfig,
    ) -> Result<SyncRecord, SyncError>;

    /// Load a record by transaction id.
    async fn get_sync_record(&self, id: &str) -> Result<SyncRecord, SyncError>;

    /// One pass over records whose broadcast track is `Ready`.
    async fn process_broadcast_batch(&self) -> Result<BatchReport, SyncError>;

    /// One pass over records whose sync track is `Ready`.
    async fn process_sync_batch(&self) -> Result<BatchReport, SyncError>;

    /// One pass over records whose p2p track is `Ready`.
    async fn process_p2p_batch(&self) -> Result<BatchReport, SyncError>;
}
