//! Prometheus metrics for the settlement pipelines.
//!
//! All metrics follow the naming convention: `sc_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, HistogramOpts, HistogramTimer,
    HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Pipeline attempts by action (broadcast/sync/p2p) and outcome
    /// (complete/deferred/skipped/failed)
    pub static ref SYNC_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("sc_sync_attempts_total", "Settlement attempts by action and outcome"),
        &["action", "outcome"]
    ).expect("metric creation failed");

    /// Attempts that lost the per-record lock race
    pub static ref LOCK_CONTENTION: CounterVec = CounterVec::new(
        Opts::new("sc_lock_contention_total", "Lock acquisitions refused because the key was held"),
        &["action"]
    ).expect("metric creation failed");

    /// Notifications dropped because the dispatch queue was full
    pub static ref NOTIFICATIONS_DROPPED: Counter = Counter::new(
        "sc_notifications_dropped_total",
        "Settlement notifications dropped before delivery"
    ).expect("metric creation failed");

    /// Wall time of one batch pass per action
    pub static ref BATCH_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "sc_batch_duration_seconds",
            "Time spent running one settlement batch pass"
        ).buckets(exponential_buckets(0.005, 2.0, 14).expect("valid bucket layout")),
        &["action"]
    ).expect("metric creation failed");
}

/// Handle keeping the registry alive
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Registering twice is accepted so tests and embedders can call this freely.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SYNC_ATTEMPTS.clone()),
        Box::new(LOCK_CONTENTION.clone()),
        Box::new(NOTIFICATIONS_DROPPED.clone()),
        Box::new(BATCH_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Start timing one batch pass. The duration is observed when the timer drops.
pub fn start_batch_timer(action: &str) -> HistogramTimer {
    BATCH_DURATION.with_label_values(&[action]).start_timer()
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
