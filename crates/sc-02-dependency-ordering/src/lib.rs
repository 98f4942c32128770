//! # SC-02: Dependency Ordering
//!
//! Orders a batch of transactions so every parent appears before any
//! transaction spending its outputs. Parents outside the batch are ignored.
//!
//! ## Architecture
//!
//! - **Domain**: `DependencyNode` (what can be ordered), `DependencyGraph`, errors
//! - **Algorithms**: graph construction from inputs, Kahn's topological sort
//!
//! ## Ordering Rules
//!
//! | Rule | Behaviour |
//! |------|-----------|
//! | Ancestors first | A parent precedes every in-batch child |
//! | Determinism | Ties keep a stable order derived from input order |
//! | Cycles | Rejected with `OrderingError::CycleDetected` |
//! | Duplicates | Rejected with `OrderingError::DuplicateTransaction` |

pub mod algorithms;
pub mod domain;

pub use algorithms::{build_dependency_graph, kahns_topological_sort, sort_ancestors_first};
pub use domain::entities::{DependencyGraph, DependencyNode};
pub use domain::errors::OrderingError;
