//! Application layer: the three pipelines, the facade and the periodic tasks

mod attempt;
pub mod broadcast;
pub mod confirmation;
pub mod p2p;
pub mod service;
pub mod supervisor;
pub mod tasks;

pub use broadcast::{BroadcastScheduler, SYNC_RECORD_MODEL_TYPE};
pub use confirmation::ConfirmationPoller;
pub use p2p::P2pNotifier;
pub use service::{SyncPorts, SyncService};
pub use supervisor::supervise;
pub use tasks::{SyncTaskHandle, SyncTaskRunner};
