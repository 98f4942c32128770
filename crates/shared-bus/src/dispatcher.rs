//! # Notification Dispatcher
//!
//! Bounded queue in front of a `NotificationSink`. One worker task drains
//! the queue so slow sinks never stall a settlement pipeline.

use crate::events::SyncEvent;
use crate::sink::NotificationSink;
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Publishing side used by the pipelines.
pub trait EventPublisher: Send + Sync {
    /// Queue an event for delivery. Returns `false` when it was dropped.
    fn publish(&self, event: SyncEvent) -> bool;

    /// Total events handed to `publish`.
    fn events_published(&self) -> u64;

    /// Events dropped because the queue was full or closed.
    fn events_dropped(&self) -> u64;
}

/// Bounded, drainable notification queue with a single delivery worker.
pub struct NotificationDispatcher {
    sender: Mutex<Option<mpsc::Sender<SyncEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    published: AtomicU64,
    dropped: AtomicU64,
    delivered: Arc<AtomicU64>,
    capacity: usize,
}

impl NotificationDispatcher {
    /// Spawn the worker on the current tokio runtime with default capacity.
    #[must_use]
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_capacity(sink, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Spawn the worker with an explicit queue capacity (minimum 1).
    #[must_use]
    pub fn with_capacity(sink: Arc<dyn NotificationSink>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, mut receiver) = mpsc::channel::<SyncEvent>(capacity);
        let delivered = Arc::new(AtomicU64::new(0));

        let worker_delivered = delivered.clone();
        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match sink.notify(&event).await {
                    Ok(()) => {
                        worker_delivered.fetch_add(1, Ordering::Relaxed);
                        debug!(id = %event.id, event_type = %event.event_type, "Event delivered");
                    }
                    Err(e) => {
                        warn!(
                            id = %event.id,
                            event_type = %event.event_type,
                            error = %e,
                            "Event delivery failed"
                        );
                    }
                }
            }
            debug!("Notification worker stopped");
        });

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            delivered,
            capacity,
        }
    }

    /// Events the sink accepted.
    pub fn events_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the queue and wait until every queued event was handed to the sink.
    ///
    /// Later `publish` calls are counted as dropped. Calling twice is a no-op.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "Notification worker ended abnormally");
            }
        }
    }
}

impl EventPublisher for NotificationDispatcher {
    fn publish(&self, event: SyncEvent) -> bool {
        self.published.fetch_add(1, Ordering::Relaxed);

        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(id = %event.id, "Event dropped (dispatcher shut down)");
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(id = %event.id, capacity = self.capacity, "Event dropped (queue full)");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(id = %event.id, "Event dropped (worker gone)");
                false
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    fn events_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
