//! Algorithms module for Dependency Ordering
//!
//! Contains:
//! - Dependency graph builder
//! - Kahn's topological sort

pub mod dependency_builder;
pub mod kahns;

pub use dependency_builder::build_dependency_graph;
pub use kahns::{kahns_topological_sort, sort_ancestors_first};
