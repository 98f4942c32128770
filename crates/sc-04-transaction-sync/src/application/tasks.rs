//! # Periodic Tasks
//!
//! One interval task per track, each running its batch pass until the
//! shutdown signal. A failed pass is logged and retried on the next tick.
//!
//! | Task | Default period | Pass |
//! |------|----------------|------|
//! | `broadcast` | 30s | `process_broadcast_batch` |
//! | `sync` | 120s | `process_sync_batch` |
//! | `p2p` | 60s | `process_p2p_batch` |

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::service::SyncService;
use crate::config::TaskPeriods;
use crate::domain::{ConfigError, SyncAction};
use crate::ports::inbound::TransactionSyncApi;

/// Schedules the batch passes of a [`SyncService`].
pub struct SyncTaskRunner {
    service: Arc<SyncService>,
    periods: TaskPeriods,
}

impl SyncTaskRunner {
    /// Runner using the service's configured periods. Fails on a zero period.
    pub fn new(service: Arc<SyncService>) -> Result<Self, ConfigError> {
        let periods = service.config().task_periods.clone();
        for action in SyncAction::ALL {
            check_period(action, periods.for_action(action))?;
        }
        Ok(Self { service, periods })
    }

    /// Override one task's period before starting. Fails on a zero period.
    pub fn with_period(
        mut self,
        action: SyncAction,
        period: Duration,
    ) -> Result<Self, ConfigError> {
        check_period(action, period)?;
        match action {
            SyncAction::Broadcast => self.periods.broadcast = period,
            SyncAction::Sync => self.periods.sync = period,
            SyncAction::P2p => self.periods.p2p = period,
        }
        Ok(self)
    }

    /// Spawn the three tasks on the current runtime.
    pub fn start(self) -> SyncTaskHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = SyncAction::ALL
            .into_iter()
            .map(|action| {
                let service = Arc::clone(&self.service);
                let period = self.periods.for_action(action);
                let mut shutdown = shutdown_rx.clone();

                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    info!(
                        task = %action,
                        period_ms = period.as_millis() as u64,
                        "Sync task started"
                    );

                    loop {
                        tokio::select! {
                            _ = ticker.tick() => run_pass(&service, action).await,
                            _ = shutdown.changed() => {
                                info!(task = %action, "Shutdown signal received");
                                break;
                            }
                        }
                    }
                })
            })
            .collect();

        SyncTaskHandle {
            shutdown_tx,
            tasks,
        }
    }
}

fn check_period(action: SyncAction, period: Duration) -> Result<(), ConfigError> {
    if period.is_zero() {
        return Err(ConfigError::Invalid(format!("{action} task period must be positive")));
    }
    Ok(())
}

async fn run_pass(service: &SyncService, action: SyncAction) {
    let result = match action {
        SyncAction::Broadcast => service.process_broadcast_batch().await,
        SyncAction::Sync => service.process_sync_batch().await,
        SyncAction::P2p => service.process_p2p_batch().await,
    };
    match result {
        Ok(report) if report.is_clean() => {
            debug!(task = %action, selected = report.selected, "Sync pass done");
        }
        Ok(report) => {
            for (id, e) in &report.errors {
                debug!(task = %action, tx_id = %id, error = %e, "Record failed in pass");
            }
        }
        Err(e) => error!(task = %action, error = %e, "Sync pass failed"),
    }
}

/// Running tasks. Dropping the handle without [`shutdown`](Self::shutdown)
/// stops the tasks at their next tick boundary.
pub struct SyncTaskHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncTaskHandle {
    /// Signal every task and wait for in-flight passes to finish.
    pub async fn shutdown(self) {
        info!("Stopping sync tasks...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Sync task ended abnormally");
            }
        }
        info!("Sync tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SyncConfig, SyncStatus};
    use crate::test_utils::{mined_info, TestHarness};

    #[tokio::test(start_paused = true)]
    async fn test_tasks_drive_records_and_stop() {
        let h = TestHarness::new();
        h.record_transaction(
            "aa",
            SyncConfig {
                paymail_p2p: false,
                broadcast_instant: false,
                ..SyncConfig::default()
            },
        )
        .await;
        h.chain.respond("aa", Ok(mined_info("aa", "node-1")));

        let handle = SyncTaskRunner::new(Arc::new(h.service()))
            .unwrap()
            .with_period(SyncAction::Broadcast, Duration::from_secs(1))
            .unwrap()
            .with_period(SyncAction::Sync, Duration::from_secs(5))
            .unwrap()
            .start();

        tokio::time::sleep(Duration::from_secs(6)).await;
        handle.shutdown().await;

        let record = h.record("aa").await;
        assert_eq!(record.broadcast_status(), SyncStatus::Complete);
        assert_eq!(record.sync_status(), SyncStatus::Complete);
        assert_eq!(h.broadcaster.calls("aa"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_work() {
        let h = TestHarness::new();
        let handle = SyncTaskRunner::new(Arc::new(h.service())).unwrap().start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let h = TestHarness::new();
        let runner = SyncTaskRunner::new(Arc::new(h.service())).unwrap();

        assert_eq!(
            runner.with_period(SyncAction::Sync, Duration::ZERO).err(),
            Some(ConfigError::Invalid("sync task period must be positive".to_string()))
        );
    }

    #[tokio::test]
    async fn test_zero_configured_period_is_rejected() {
        let mut h = TestHarness::new();
        h.config.task_periods.p2p = Duration::ZERO;

        assert!(matches!(
            SyncTaskRunner::new(Arc::new(h.service())),
            Err(ConfigError::Invalid(_))
        ));
    }
}
