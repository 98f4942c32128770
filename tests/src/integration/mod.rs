//! Cross-crate integration flows

pub mod concurrency;
pub mod ordering;
pub mod settlement_flow;
pub mod telemetry;
