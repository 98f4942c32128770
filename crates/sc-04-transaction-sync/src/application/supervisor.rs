//! Per-record fault boundary.
//!
//! A panic inside one attempt becomes `SyncError::Panicked`. Unwinding drops
//! the attempt's `LockGuard`, which still releases the lock.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

use crate::domain::{Outcome, SyncAction, SyncError};

/// Run one attempt, converting a panic into a structured error.
pub async fn supervise<F>(action: SyncAction, id: &str, attempt: F) -> Result<Outcome, SyncError>
where
    F: Future<Output = Result<Outcome, SyncError>>,
{
    match AssertUnwindSafe(attempt).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(&panic);
            error!(
                tx_id = %id,
                action = %action,
                panic = %message,
                backtrace = %std::backtrace::Backtrace::force_capture(),
                "Attempt panicked, continuing with the next record"
            );
            Err(SyncError::Panicked {
                action,
                id: id.to_string(),
                message,
            })
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}
