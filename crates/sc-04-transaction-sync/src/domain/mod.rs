//! # Domain Layer
//!
//! The per-transaction synchronization record and its three status tracks.
//!
//! ## Tracks
//!
//! | Track | Initial (enabled) | Initial (disabled) | Driven by |
//! |-------|-------------------|--------------------|-----------|
//! | broadcast | `Ready` | `Skipped` | `BroadcastScheduler` |
//! | p2p | `Pending` | `Skipped` | `P2pNotifier` |
//! | sync | `Ready` | `Skipped` | `ConfirmationPoller` |
//!
//! A `Skipped` track never transitions. `Error` requires external
//! re-submission; nothing retries it automatically.

pub mod entities;
pub mod errors;
pub mod status;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use status::*;
pub use value_objects::*;
