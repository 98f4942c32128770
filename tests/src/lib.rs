//! # Settlement Core Test Suite
//!
//! Cross-crate flows that exercise the pipelines together with the real
//! lock manager, notification dispatcher and path/ordering algorithms.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── settlement_flow.rs   # create → broadcast → p2p → confirmation
//! │   ├── concurrency.rs       # shared locks across service instances
//! │   ├── ordering.rs          # dependency ordering and compound paths
//! │   └── telemetry.rs         # logging and metrics around a pass
//! └── benches/
//!     └── settlement_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sc-tests
//! cargo test -p sc-tests integration::ordering::
//!
//! # Benchmarks
//! cargo bench -p sc-tests
//! ```

pub mod integration;
