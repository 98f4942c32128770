//! # Shared Bus - Settlement Notifications
//!
//! Fire-and-forget delivery of settlement events (for example "transaction
//! broadcast") to an external sink such as a webhook.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐  publish()   ┌──────────────────┐  notify()  ┌──────────┐
//! │   Pipeline   │ ───────────▶ │ bounded mpsc     │ ─────────▶ │   Sink   │
//! │              │  (non-block) │ + worker task    │            │          │
//! └──────────────┘              └──────────────────┘            └──────────┘
//! ```
//!
//! - Publishing never blocks the caller. A full queue drops the event and
//!   bumps the dropped counter.
//! - Sink failures are logged and never reach the publisher.
//! - `shutdown()` closes the queue and waits for queued events to drain.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dispatcher;
pub mod events;
pub mod sink;

pub use dispatcher::{EventPublisher, NotificationDispatcher};
pub use events::{EventType, SyncEvent};
pub use sink::{CollectingNotificationSink, LoggingNotificationSink, NotificationSink, NotifyError};

/// Events buffered before new ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
