//! # Notification Sinks
//!
//! Destinations the dispatcher worker delivers events to.

use crate::events::SyncEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

/// Errors a sink may report. They are logged, never propagated.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The endpoint rejected or failed to receive the event.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The event could not be encoded.
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Destination for settlement events (webhook client, message queue, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &SyncEvent) -> Result<(), NotifyError>;
}

/// Sink used when no endpoint is configured: events are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, event: &SyncEvent) -> Result<(), NotifyError> {
        info!(
            event_type = %event.event_type,
            model_type = %event.model_type,
            id = %event.id,
            "NOTIFY"
        );
        Ok(())
    }
}

/// Sink that keeps every delivered event in memory.
#[derive(Debug, Default)]
pub struct CollectingNotificationSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl CollectingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the delivered events, oldest first.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl NotificationSink for CollectingNotificationSink {
    async fn notify(&self, event: &SyncEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
