//! # SC-04: Transaction Sync
//!
//! Drives every recorded transaction through three independent, resumable
//! tracks: broadcast to the network, confirmation on-chain with a Merkle
//! proof, and P2P notification of paymail providers.
//!
//! ## State Machine (per track)
//!
//! ```text
//!            created (flag on)                       created (flag off)
//!                   │                                        │
//!   p2p only ──► [Pending] ──broadcast complete──┐           ▼
//!                   │                            │       [Skipped]  (never moves)
//!                   ▼                            ▼
//!               [Ready] ◄──── not found ──── attempt ────► [Complete]
//!                                                │
//!                                                └──────► [Error]  (re-submission only)
//! ```
//!
//! ## Pipelines
//!
//! | Pipeline | Selects | Lock key | Order |
//! |----------|---------|----------|-------|
//! | `BroadcastScheduler` | broadcast `Ready` | `process_broadcast:{id}` | oldest first, grouped by account |
//! | `ConfirmationPoller` | sync `Ready` | `process_sync:{id}` | newest first |
//! | `P2pNotifier` | p2p `Ready` | `process_p2p:{id}` | oldest first |
//!
//! Every attempt holds its lock for the whole attempt, re-reads the record
//! under the lock, and runs inside a panic boundary.
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `SyncRecordStore` | Record persistence and atomic counters |
//! | `TransactionRepository` | Transactions, incoming transactions, drafts |
//! | `Broadcaster` | Submit raw transactions |
//! | `ChainQuery` | On-chain lookup with Merkle proof |
//! | `PaymailClient` | P2P delivery to paymail providers |
//! | `EventPublisher` (shared-bus) | Best-effort broadcast notifications |
//! | `LockBackend` (sc-03) | Shared lock table |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! adapters/     - InMemorySyncRecordStore, InMemoryTransactionRepository
//! ports/        - TransactionSyncApi (inbound), collaborator traits (outbound)
//! application/  - pipelines, SyncService facade, SyncTaskRunner
//! domain/       - SyncRecord, SyncStatus, SyncAction, errors, reports
//! config.rs     - EngineConfig
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{InMemorySyncRecordStore, InMemoryTransactionRepository};
pub use application::{
    BroadcastScheduler, ConfirmationPoller, P2pNotifier, SyncPorts, SyncService, SyncTaskHandle,
    SyncTaskRunner,
};
pub use config::{EngineConfig, PageSizes, TaskPeriods, Timeouts};
pub use domain::{
    BatchReport, ChainError, ConfigError, Outcome, P2pPayload, PaymailError, RepositoryError,
    StoreError, SyncAction, SyncConfig, SyncError, SyncRecord, SyncResult, SyncStatus,
};
pub use ports::{
    Broadcaster, ChainQuery, PaymailClient, SyncRecordStore, TransactionRepository,
    TransactionSyncApi,
};
