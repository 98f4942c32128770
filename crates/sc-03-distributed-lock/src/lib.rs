//! # SC-03: Distributed Lock
//!
//! Keyed mutual exclusion guaranteeing at most one concurrent attempt of a
//! given action on a given transaction, across every process that shares a
//! lock backend.
//!
//! ## Architecture
//!
//! - **Domain**: `LockKey`, `LockEntry`, `LockError`
//! - **Ports**: `LockBackend` (outbound; a shared cache or database in production)
//! - **Adapters**: `InMemoryLockBackend` (process-local, expiring)
//! - **Application**: `LockManager` handing out RAII `LockGuard`s
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | Mutual exclusion | Backend `try_acquire` is atomic per key |
//! | Safe release | Release is keyed by a per-acquisition owner token |
//! | Crash recovery | Every lock carries a TTL and expires on its own |
//! | Release on every path | `LockGuard` releases on drop if not released explicitly |

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::memory::InMemoryLockBackend;
pub use application::manager::{LockGuard, LockManager};
pub use config::LockConfig;
pub use domain::entities::{LockEntry, LockKey};
pub use domain::errors::LockError;
pub use ports::outbound::LockBackend;
